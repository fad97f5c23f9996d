//! AuthService gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

use cellar_proto::v1::auth_service_server::AuthService;
use cellar_proto::v1::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::auth::TokenService;
use crate::auth::password;
use crate::error::ServiceError;
use crate::storage::{CellarDatabase, DatabaseError};

const MIN_PASSWORD_LEN: usize = 8;

pub struct AuthServiceImpl {
    db: CellarDatabase,
    tokens: Arc<TokenService>,
}

impl AuthServiceImpl {
    pub const fn new(db: CellarDatabase, tokens: Arc<TokenService>) -> Self {
        Self { db, tokens }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> Status {
    ServiceError::Unauthorized("Invalid credentials".into()).into()
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "Register"))]
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        let email = normalize_email(&req.email);

        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::validation("A valid email is required").into());
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            ))
            .into());
        }
        let display_name = match req.display_name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };

        let hash = password::hash_password(&req.password)
            .map_err(|e| ServiceError::Internal(format!("Password hashing failed: {e}")))?;

        let user_id = uuid::Uuid::new_v4().to_string();
        self.db
            .create_user(&user_id, &email, &hash, &display_name)
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => {
                    ServiceError::Conflict("An account with that email already exists".into())
                }
                other => ServiceError::from(other),
            })?;

        let (access_token, expires_in) = self
            .tokens
            .sign_owner_token(&user_id, &email)
            .map_err(|e| ServiceError::Internal(format!("Token creation failed: {e}")))?;

        info!(user_id = %user_id, "User registered");

        Ok(Response::new(RegisterResponse {
            user_id,
            access_token,
            expires_in_secs: expires_in,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "Login"))]
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let email = normalize_email(&req.email);

        let Some(user) = self.db.get_user_by_email(&email).await.map_err(ServiceError::from)?
        else {
            warn!("Failed login attempt for unknown email");
            return Err(invalid_credentials());
        };

        let valid = password::verify_password(&req.password, &user.password_hash)
            .map_err(|e| ServiceError::Internal(format!("Password verification failed: {e}")))?;
        if !valid {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(invalid_credentials());
        }

        let (access_token, expires_in) = self
            .tokens
            .sign_owner_token(&user.id, &user.email)
            .map_err(|e| ServiceError::Internal(format!("Token creation failed: {e}")))?;

        info!(user_id = %user.id, "User logged in");

        Ok(Response::new(LoginResponse {
            user_id: user.id,
            access_token,
            expires_in_secs: expires_in,
        }))
    }
}
