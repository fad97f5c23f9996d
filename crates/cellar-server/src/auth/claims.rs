//! JWT claims for the two bearer token kinds.
//!
//! Owner and guest claims share a signing key but not a shape. Each carries a
//! `kind` tag that its verifier checks, so a token of one kind never decodes
//! as the other.

use serde::{Deserialize, Serialize};

pub(crate) const OWNER_KIND: &str = "owner";
pub(crate) const GUEST_KIND: &str = "guest";

/// Claims embedded in owner session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerClaims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (user ID).
    pub sub: String,
    pub email: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    pub kind: String,
}

impl OwnerClaims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Claims embedded in guest tokens. No user account is associated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestClaims {
    pub jti: String,
    /// Subject (guest ID).
    pub sub: String,
    /// Join code of the session the token is scoped to.
    pub code: String,
    /// Display name chosen when joining.
    pub name: String,
    pub iat: i64,
    pub exp: i64,
    pub kind: String,
}

impl GuestClaims {
    pub fn guest_id(&self) -> &str {
        &self.sub
    }

    pub fn session_code(&self) -> &str {
        &self.code
    }

    pub fn guest_name(&self) -> &str {
        &self.name
    }
}
