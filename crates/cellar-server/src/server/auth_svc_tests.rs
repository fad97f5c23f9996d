//! Tests for `AuthService` and `AccountService`.

use std::sync::Arc;

use tonic::Request;

use cellar_proto::v1::account_service_server::AccountService;
use cellar_proto::v1::auth_service_server::AuthService;
use cellar_proto::v1::{
    BeverageType, GetProfileRequest, LoginRequest, RegisterRequest, RegisterResponse,
    UpdateProfileRequest,
};

use super::account_svc::AccountServiceImpl;
use super::auth_svc::AuthServiceImpl;
use super::test_helpers::{error_kind, owner_request, test_tokens};
use crate::auth::TokenService;
use crate::storage::CellarDatabase;

async fn setup() -> (AuthServiceImpl, AccountServiceImpl, Arc<TokenService>) {
    let db = CellarDatabase::open_in_memory().await.unwrap();
    let tokens = test_tokens();
    let auth = AuthServiceImpl::new(db.clone(), Arc::clone(&tokens));
    let account = AccountServiceImpl::new(db);
    (auth, account, tokens)
}

fn alice_register() -> RegisterRequest {
    RegisterRequest {
        email: " Alice@Example.com".into(),
        password: "password123".into(),
        display_name: "Alice".into(),
    }
}

async fn register_alice(svc: &AuthServiceImpl) -> RegisterResponse {
    svc.register(Request::new(alice_register()))
        .await
        .unwrap()
        .into_inner()
}

fn login(email: &str, password: &str) -> Request<LoginRequest> {
    Request::new(LoginRequest {
        email: email.into(),
        password: password.into(),
    })
}

#[tokio::test]
async fn register_and_login() {
    let (svc, _, tokens) = setup().await;

    let resp = register_alice(&svc).await;
    assert!(!resp.user_id.is_empty());
    assert_eq!(resp.expires_in_secs, 3600);

    let claims = tokens.verify_owner_token(&resp.access_token).unwrap();
    assert_eq!(claims.user_id(), resp.user_id);
    assert_eq!(claims.email, "alice@example.com");

    let login_resp = svc
        .login(login("ALICE@example.com", "password123"))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(login_resp.user_id, resp.user_id);
    assert!(tokens.verify_owner_token(&login_resp.access_token).is_ok());
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let (svc, _, _) = setup().await;
    register_alice(&svc).await;

    let err = svc
        .register(Request::new(RegisterRequest {
            email: "alice@example.com".into(),
            ..alice_register()
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::AlreadyExists);
    assert_eq!(error_kind(&err), "conflict");
}

#[tokio::test]
async fn register_validates_input() {
    let (svc, _, _) = setup().await;

    let err = svc
        .register(Request::new(RegisterRequest {
            password: "short".into(),
            ..alice_register()
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::InvalidArgument);
    assert!(err.message().contains("at least 8"));

    let err = svc
        .register(Request::new(RegisterRequest {
            email: "not-an-email".into(),
            ..alice_register()
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::InvalidArgument);
}

#[tokio::test]
async fn login_failures_are_unauthenticated() {
    let (svc, _, _) = setup().await;
    register_alice(&svc).await;

    let err = svc
        .login(login("alice@example.com", "wrongpassword"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::Unauthenticated);
    assert_eq!(error_kind(&err), "unauthorized");

    let err = svc
        .login(login("nobody@example.com", "password123"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::Unauthenticated);
    assert_eq!(err.message(), "Invalid credentials");
}

#[tokio::test]
async fn blank_display_name_defaults_to_email_local_part() {
    let (svc, account, _) = setup().await;
    let resp = svc
        .register(Request::new(RegisterRequest {
            display_name: "  ".into(),
            ..alice_register()
        }))
        .await
        .unwrap()
        .into_inner();

    let profile = account
        .get_profile(owner_request(GetProfileRequest {}, &resp.user_id))
        .await
        .unwrap()
        .into_inner()
        .profile
        .unwrap();
    assert_eq!(profile.display_name, "alice");
    assert_eq!(profile.default_currency, "EUR");
    assert_eq!(profile.beverage_type(), BeverageType::Wine);
}

#[tokio::test]
async fn update_profile_changes_only_given_fields() {
    let (svc, account, _) = setup().await;
    let resp = register_alice(&svc).await;

    let profile = account
        .update_profile(owner_request(
            UpdateProfileRequest {
                display_name: None,
                default_currency: Some("usd".into()),
                beverage_type: Some(BeverageType::Beer.into()),
            },
            &resp.user_id,
        ))
        .await
        .unwrap()
        .into_inner()
        .profile
        .unwrap();
    assert_eq!(profile.display_name, "Alice");
    assert_eq!(profile.default_currency, "USD");
    assert_eq!(profile.beverage_type(), BeverageType::Beer);
}

#[tokio::test]
async fn update_profile_rejects_bad_values() {
    let (svc, account, _) = setup().await;
    let resp = register_alice(&svc).await;

    let bad_requests = [
        UpdateProfileRequest {
            default_currency: Some("euro".into()),
            ..UpdateProfileRequest::default()
        },
        UpdateProfileRequest {
            beverage_type: Some(BeverageType::Unspecified.into()),
            ..UpdateProfileRequest::default()
        },
        UpdateProfileRequest {
            display_name: Some(" ".into()),
            ..UpdateProfileRequest::default()
        },
    ];
    for req in bad_requests {
        let err = account
            .update_profile(owner_request(req, &resp.user_id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }
}

#[tokio::test]
async fn profile_without_claims_is_internal() {
    let (_, account, _) = setup().await;
    let err = account
        .get_profile(Request::new(GetProfileRequest {}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::Internal);
}
