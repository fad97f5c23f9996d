//! Bearer-token handling for gRPC requests.

use std::sync::Arc;

use tonic::metadata::MetadataMap;
use tonic::{Request, Status};

use crate::auth::{OwnerClaims, TokenService};
use crate::error::ServiceError;

/// The token from an `authorization: Bearer <token>` header, if present.
pub fn bearer_token(metadata: &MetadataMap) -> Option<&str> {
    metadata
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate an owner token and attach its claims to the request.
///
/// Guest tokens are rejected here even though they share the signing key.
pub fn owner_interceptor(
    tokens: Arc<TokenService>,
) -> impl Fn(Request<()>) -> Result<Request<()>, Status> + Clone {
    move |mut req: Request<()>| {
        let token = bearer_token(req.metadata()).ok_or_else(|| {
            Status::from(ServiceError::Unauthorized(
                "Missing authorization header".into(),
            ))
        })?;

        let claims = tokens
            .verify_owner_token(token)
            .map_err(|_| Status::from(ServiceError::Unauthorized("Invalid token".into())))?;

        req.extensions_mut().insert(claims);
        Ok(req)
    }
}

/// Extract owner claims from a request that has passed through the interceptor.
#[allow(clippy::result_large_err)]
pub fn extract_owner_claims<T>(req: &Request<T>) -> Result<&OwnerClaims, Status> {
    req.extensions()
        .get::<OwnerClaims>()
        .ok_or_else(|| Status::internal("Claims not found in request extensions"))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataValue;

    use crate::error::ERROR_KIND_METADATA;

    fn test_tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(b"test-secret", 3600, 3600))
    }

    fn with_bearer(token: &str) -> Request<()> {
        let mut req = Request::new(());
        req.metadata_mut().insert(
            "authorization",
            MetadataValue::try_from(format!("Bearer {token}")).unwrap(),
        );
        req
    }

    #[test]
    fn valid_owner_token_passes() {
        let tokens = test_tokens();
        let (token, _) = tokens.sign_owner_token("u1", "alice@example.com").unwrap();

        let interceptor = owner_interceptor(tokens);
        let req = interceptor(with_bearer(&token)).unwrap();
        let claims = extract_owner_claims(&req).unwrap();
        assert_eq!(claims.user_id(), "u1");
    }

    #[test]
    fn missing_header_fails() {
        let interceptor = owner_interceptor(test_tokens());
        let err = interceptor(Request::new(())).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
        let kind = err.metadata().get(ERROR_KIND_METADATA).unwrap();
        assert_eq!(kind.to_str().unwrap(), "unauthorized");
    }

    #[test]
    fn guest_token_rejected() {
        let tokens = test_tokens();
        let (token, _) = tokens.sign_guest_token("g1", "ABC234", "Sam").unwrap();

        let interceptor = owner_interceptor(tokens);
        let err = interceptor(with_bearer(&token)).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut metadata = MetadataMap::new();
        metadata.insert("authorization", MetadataValue::from_static("abc"));
        assert_eq!(bearer_token(&metadata), None);

        metadata.insert("authorization", MetadataValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&metadata), Some("abc"));

        metadata.insert("authorization", MetadataValue::from_static("Bearer "));
        assert_eq!(bearer_token(&metadata), None);
    }
}
