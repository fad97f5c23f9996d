//! JWT issuance and validation for owner and guest tokens.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use cellar_core::db::unix_timestamp;

use super::claims::{GUEST_KIND, GuestClaims, OWNER_KIND, OwnerClaims};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Bad signature, expired, malformed, or a token of the other kind.
    #[error("Invalid token")]
    InvalidToken,
}

/// Signs and verifies bearer tokens.
///
/// Owner and guest tokens use separate sign/verify pairs; callers pick the
/// verifier that matches the endpoint and never share one between kinds.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    owner_ttl_secs: i64,
    guest_ttl_secs: i64,
}

impl TokenService {
    /// Create a new `TokenService` with the given secret.
    pub fn new(secret: &[u8], owner_ttl_secs: i64, guest_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            owner_ttl_secs,
            guest_ttl_secs,
        }
    }

    /// Issue an owner session token. Returns the token and its TTL in seconds.
    pub fn sign_owner_token(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<(String, i64), TokenError> {
        let now = unix_timestamp();
        let claims = OwnerClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.owner_ttl_secs,
            kind: OWNER_KIND.to_string(),
        };
        Ok((self.encode(&claims)?, self.owner_ttl_secs))
    }

    /// Issue a guest token scoped to one session code.
    pub fn sign_guest_token(
        &self,
        guest_id: &str,
        session_code: &str,
        guest_name: &str,
    ) -> Result<(String, i64), TokenError> {
        let now = unix_timestamp();
        let claims = GuestClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: guest_id.to_string(),
            code: session_code.to_string(),
            name: guest_name.to_string(),
            iat: now,
            exp: now + self.guest_ttl_secs,
            kind: GUEST_KIND.to_string(),
        };
        Ok((self.encode(&claims)?, self.guest_ttl_secs))
    }

    pub fn verify_owner_token(&self, token: &str) -> Result<OwnerClaims, TokenError> {
        let claims: OwnerClaims = self.decode(token)?;
        if claims.kind != OWNER_KIND {
            return Err(TokenError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn verify_guest_token(&self, token: &str) -> Result<GuestClaims, TokenError> {
        let claims: GuestClaims = self.decode(token)?;
        if claims.kind != GUEST_KIND {
            return Err(TokenError::InvalidToken);
        }
        Ok(claims)
    }

    /// Digest a guest token for storage (raw tokens are never stored).
    pub fn hash_guest_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn encode<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        jsonwebtoken::decode::<C>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidToken)
    }
}
