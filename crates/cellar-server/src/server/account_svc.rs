//! AccountService gRPC implementation.

use tonic::{Request, Response, Status};
use tracing::{info, instrument};

use cellar_proto::v1::account_service_server::AccountService;
use cellar_proto::v1::{
    BeverageType, GetProfileRequest, GetProfileResponse, UpdateProfileRequest,
    UpdateProfileResponse,
};

use crate::error::ServiceError;
use crate::storage::CellarDatabase;

use super::convert::{beverage_type_from_proto, user_to_proto};
use super::interceptor::extract_owner_claims;

pub struct AccountServiceImpl {
    db: CellarDatabase,
}

impl AccountServiceImpl {
    pub const fn new(db: CellarDatabase) -> Self {
        Self { db }
    }
}

/// ISO 4217 style: three ASCII letters, stored uppercase.
fn normalize_currency(code: &str) -> Result<String, ServiceError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ServiceError::validation(
            "Currency must be a three-letter code",
        ));
    }
    Ok(code)
}

#[tonic::async_trait]
impl AccountService for AccountServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "GetProfile"))]
    async fn get_profile(
        &self,
        request: Request<GetProfileRequest>,
    ) -> Result<Response<GetProfileResponse>, Status> {
        let claims = extract_owner_claims(&request)?;
        let user = self
            .db
            .get_user(claims.user_id())
            .await
            .map_err(|e| ServiceError::from_db(e, "User"))?;

        Ok(Response::new(GetProfileResponse {
            profile: Some(user_to_proto(&user)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "UpdateProfile"))]
    async fn update_profile(
        &self,
        request: Request<UpdateProfileRequest>,
    ) -> Result<Response<UpdateProfileResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();

        let display_name = match req.display_name.as_deref().map(str::trim) {
            Some("") => {
                return Err(ServiceError::validation("Display name must not be blank").into());
            }
            other => other,
        };
        let currency = req
            .default_currency
            .as_deref()
            .map(normalize_currency)
            .transpose()?;
        let beverage_type = match req.beverage_type {
            Some(raw) => {
                let parsed = BeverageType::try_from(raw)
                    .ok()
                    .and_then(beverage_type_from_proto)
                    .ok_or_else(|| ServiceError::validation("Unknown beverage type"))?;
                Some(parsed)
            }
            None => None,
        };

        let user = self
            .db
            .update_user_profile(&user_id, display_name, currency.as_deref(), beverage_type)
            .await
            .map_err(|e| ServiceError::from_db(e, "User"))?;

        info!(user_id = %user_id, "Profile updated");

        Ok(Response::new(UpdateProfileResponse {
            profile: Some(user_to_proto(&user)),
        }))
    }
}
