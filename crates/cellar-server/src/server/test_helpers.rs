//! Shared test helpers for the service test modules.

use std::sync::Arc;

use tonic::metadata::MetadataValue;
use tonic::{Request, Status};

use crate::auth::claims::OWNER_KIND;
use crate::auth::{OwnerClaims, TokenService};
use crate::error::ERROR_KIND_METADATA;
use crate::storage::CellarDatabase;

pub fn test_tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(b"test-secret", 3600, 3600))
}

/// In-memory database with two owners, `u1` and `u2`.
pub async fn test_db() -> CellarDatabase {
    let db = CellarDatabase::open_in_memory().await.unwrap();
    db.create_user("u1", "alice@example.com", "hash", "Alice")
        .await
        .unwrap();
    db.create_user("u2", "bob@example.com", "hash", "Bob")
        .await
        .unwrap();
    db
}

pub fn owner_claims(user_id: &str) -> OwnerClaims {
    OwnerClaims {
        jti: "test-jti".into(),
        sub: user_id.into(),
        email: format!("{user_id}@example.com"),
        iat: 0,
        exp: i64::MAX,
        kind: OWNER_KIND.into(),
    }
}

/// A request that has already passed the owner interceptor.
pub fn owner_request<T>(inner: T, user_id: &str) -> Request<T> {
    let mut req = Request::new(inner);
    req.extensions_mut().insert(owner_claims(user_id));
    req
}

/// A request carrying `authorization: Bearer <token>`.
pub fn bearer_request<T>(inner: T, token: &str) -> Request<T> {
    let mut req = Request::new(inner);
    req.metadata_mut().insert(
        "authorization",
        MetadataValue::try_from(format!("Bearer {token}")).unwrap(),
    );
    req
}

pub fn error_kind(status: &Status) -> &str {
    status
        .metadata()
        .get(ERROR_KIND_METADATA)
        .unwrap()
        .to_str()
        .unwrap()
}
