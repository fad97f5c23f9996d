//! Guest access to social tasting sessions.
//!
//! Guests have no account. They exchange a join code and a display name for
//! a guest token scoped to that code, and present the token together with
//! the code on every later call.

use tracing::info;

use cellar_core::db::unix_timestamp;

use crate::auth::{GuestClaims, TokenService};
use crate::error::{ServiceError, ServiceResult};
use crate::notify::{GuestJoined, WebhookNotifier};
use crate::storage::{CellarDatabase, SessionGuest, TastingSession};

use super::join_code;

const MAX_DISPLAY_NAME_LEN: usize = 64;

/// Result of a successful join. `token` is the only cleartext copy.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub token: String,
    pub expires_in_secs: i64,
    pub guest: SessionGuest,
    pub session: TastingSession,
}

#[derive(Clone)]
pub struct GuestAccess {
    db: CellarDatabase,
    tokens: TokenService,
    notifier: WebhookNotifier,
}

impl GuestAccess {
    pub const fn new(db: CellarDatabase, tokens: TokenService, notifier: WebhookNotifier) -> Self {
        Self {
            db,
            tokens,
            notifier,
        }
    }

    /// Join a session by code.
    ///
    /// Every call creates a new guest identity, even for a repeated name.
    pub async fn join(&self, code: &str, display_name: &str) -> ServiceResult<JoinOutcome> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ServiceError::validation("Display name is required"));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(ServiceError::validation(format!(
                "Display name exceeds {MAX_DISPLAY_NAME_LEN} characters"
            )));
        }
        let code = join_code::normalize(code);
        if code.is_empty() {
            return Err(ServiceError::validation("Join code is required"));
        }

        let session = self
            .db
            .get_session_by_code(&code)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tasting session"))?;

        if !session.social_mode {
            return Err(ServiceError::forbidden("Session is not accepting guests"));
        }
        let now = unix_timestamp();
        if session.invite_expires_at.is_some_and(|exp| now > exp) {
            return Err(ServiceError::Expired("Invite has expired".into()));
        }

        let guest_id = uuid::Uuid::new_v4().to_string();
        let (token, expires_in_secs) = self
            .tokens
            .sign_guest_token(&guest_id, &code, display_name)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let token_hash = TokenService::hash_guest_token(&token);

        let guest = self
            .db
            .create_guest(&guest_id, &session.id, display_name, &token_hash)
            .await?;

        info!(session_id = %session.id, guest_id = %guest.id, "Guest joined");

        // Delivery runs detached.
        let _ = self.notifier.guest_joined(GuestJoined::new(
            &session.id,
            &session.name,
            &guest.id,
            &guest.display_name,
            guest.joined_at,
        ));

        Ok(JoinOutcome {
            token,
            expires_in_secs,
            guest,
            session,
        })
    }

    /// Check a guest token against the session code it is being used for.
    ///
    /// The stored token hash is not consulted; the signature is the proof.
    pub fn authorize(
        &self,
        token: Option<&str>,
        expected_code: &str,
    ) -> ServiceResult<GuestClaims> {
        let token =
            token.ok_or_else(|| ServiceError::Unauthorized("Missing guest token".into()))?;
        let claims = self
            .tokens
            .verify_guest_token(token)
            .map_err(|_| ServiceError::Unauthorized("Invalid guest token".into()))?;

        if join_code::normalize(claims.session_code()) != join_code::normalize(expected_code) {
            return Err(ServiceError::forbidden(
                "Guest token belongs to a different session",
            ));
        }
        Ok(claims)
    }

    /// The session an authorized guest belongs to.
    ///
    /// Works after social mode is switched off; issued tokens stay valid.
    pub async fn session_for(&self, claims: &GuestClaims) -> ServiceResult<TastingSession> {
        let code = join_code::normalize(claims.session_code());
        self.db
            .get_session_by_code(&code)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tasting session"))
    }

    /// Guests of an owned session, in join order.
    pub async fn list_guests(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> ServiceResult<Vec<SessionGuest>> {
        let session = self
            .db
            .get_session(user_id, session_id)
            .await
            .map_err(|e| ServiceError::from_db(e, "Tasting session"))?;
        Ok(self.db.list_guests(&session.id).await?)
    }
}
