//! CellarService gRPC implementation.

use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

use cellar_core::db::unix_timestamp;
use cellar_proto::v1::cellar_service_server::{CellarService, CellarServiceServer};
use cellar_proto::v1::{
    CreateBottleRequest, CreateBottleResponse, CreateLocationRequest, CreateLocationResponse,
    DeleteBottleRequest, DeleteBottleResponse, DeleteLocationRequest, DeleteLocationResponse,
    GetBottleRequest, GetBottleResponse,
    GetCellarSummaryRequest, GetCellarSummaryResponse, ListBottlesRequest, ListBottlesResponse,
    ListDrinkLogsRequest, ListDrinkLogsResponse, ListLocationsRequest, ListLocationsResponse,
    LogDrinkRequest, LogDrinkResponse, RenameLocationRequest, RenameLocationResponse,
    ScanLabelRequest, ScanLabelResponse, SetBottleStatusRequest, SetBottleStatusResponse,
    UpdateBottleRequest, UpdateBottleResponse, UploadImageRequest, UploadImageResponse,
};

use crate::cellar::CellarManager;
use crate::error::ServiceError;
use crate::media::{LabelScanner, LocalObjectStore, ScanError};
use crate::storage::DrinkLogParams;

use super::convert::{
    bottle_params_from_proto, bottle_status_from_proto, bottle_to_proto, drink_log_to_proto,
    label_suggestion_to_proto, location_to_proto, scan_error_to_status, seconds,
    summary_to_proto,
};
use super::grpc_util::{page_limit, require_id};
use super::interceptor::extract_owner_claims;

/// Room for the non-image fields of an upload message.
const UPLOAD_MESSAGE_OVERHEAD: usize = 64 * 1024;

pub struct CellarServiceImpl {
    cellar: CellarManager,
    store: LocalObjectStore,
    scanner: Option<LabelScanner>,
}

impl CellarServiceImpl {
    pub const fn new(
        cellar: CellarManager,
        store: LocalObjectStore,
        scanner: Option<LabelScanner>,
    ) -> Self {
        Self {
            cellar,
            store,
            scanner,
        }
    }

    /// Wrap in a gRPC server whose decode limit admits images up to the
    /// store's upload limit, so oversized images fail validation instead.
    pub fn into_server(self) -> CellarServiceServer<Self> {
        let limit = self
            .store
            .max_bytes()
            .saturating_add(UPLOAD_MESSAGE_OVERHEAD);
        CellarServiceServer::new(self).max_decoding_message_size(limit)
    }
}

#[tonic::async_trait]
impl CellarService for CellarServiceImpl {
    // =========================================================================
    // Locations
    // =========================================================================

    #[instrument(skip(self, request), fields(rpc = "CreateLocation"))]
    async fn create_location(
        &self,
        request: Request<CreateLocationRequest>,
    ) -> Result<Response<CreateLocationResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let location = self.cellar.create_location(&user_id, &req.name).await?;
        Ok(Response::new(CreateLocationResponse {
            location: Some(location_to_proto(&location)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListLocations"))]
    async fn list_locations(
        &self,
        request: Request<ListLocationsRequest>,
    ) -> Result<Response<ListLocationsResponse>, Status> {
        let claims = extract_owner_claims(&request)?;
        let locations = self.cellar.list_locations(claims.user_id()).await?;
        Ok(Response::new(ListLocationsResponse {
            locations: locations.iter().map(location_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "RenameLocation"))]
    async fn rename_location(
        &self,
        request: Request<RenameLocationRequest>,
    ) -> Result<Response<RenameLocationResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.location_id, "location_id")?;
        let location = self.cellar.rename_location(&user_id, id, &req.name).await?;
        Ok(Response::new(RenameLocationResponse {
            location: Some(location_to_proto(&location)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "DeleteLocation"))]
    async fn delete_location(
        &self,
        request: Request<DeleteLocationRequest>,
    ) -> Result<Response<DeleteLocationResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.location_id, "location_id")?;
        self.cellar.delete_location(&user_id, id).await?;
        Ok(Response::new(DeleteLocationResponse { removed: true }))
    }

    // =========================================================================
    // Bottles
    // =========================================================================

    #[instrument(skip(self, request), fields(rpc = "CreateBottle"))]
    async fn create_bottle(
        &self,
        request: Request<CreateBottleRequest>,
    ) -> Result<Response<CreateBottleResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let fields = req
            .fields
            .ok_or_else(|| ServiceError::validation("Bottle fields are required"))?;

        let bottle = self
            .cellar
            .create_bottle(
                &user_id,
                bottle_params_from_proto(fields),
                req.quantity.map(i64::from),
            )
            .await?;
        Ok(Response::new(CreateBottleResponse {
            bottle: Some(bottle_to_proto(&bottle)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GetBottle"))]
    async fn get_bottle(
        &self,
        request: Request<GetBottleRequest>,
    ) -> Result<Response<GetBottleResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let bottle = self.cellar.get_bottle(&user_id, &req.bottle_id).await?;
        Ok(Response::new(GetBottleResponse {
            bottle: Some(bottle_to_proto(&bottle)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListBottles"))]
    async fn list_bottles(
        &self,
        request: Request<ListBottlesRequest>,
    ) -> Result<Response<ListBottlesResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let status = bottle_status_from_proto(req.status_filter());
        let location_id = req.location_id.as_deref().filter(|l| !l.is_empty());

        let bottles = self
            .cellar
            .list_bottles(
                &user_id,
                status,
                location_id,
                page_limit(req.limit),
                req.offset,
            )
            .await?;
        Ok(Response::new(ListBottlesResponse {
            bottles: bottles.iter().map(bottle_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "UpdateBottle"))]
    async fn update_bottle(
        &self,
        request: Request<UpdateBottleRequest>,
    ) -> Result<Response<UpdateBottleResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.bottle_id, "bottle_id")?;
        let fields = req
            .fields
            .ok_or_else(|| ServiceError::validation("Bottle fields are required"))?;

        let bottle = self
            .cellar
            .update_bottle(
                &user_id,
                id,
                bottle_params_from_proto(fields),
                req.quantity.map(i64::from),
            )
            .await?;
        Ok(Response::new(UpdateBottleResponse {
            bottle: Some(bottle_to_proto(&bottle)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "SetBottleStatus"))]
    async fn set_bottle_status(
        &self,
        request: Request<SetBottleStatusRequest>,
    ) -> Result<Response<SetBottleStatusResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.bottle_id, "bottle_id")?;
        let status = bottle_status_from_proto(req.status())
            .ok_or_else(|| ServiceError::validation("A bottle status is required"))?;

        let bottle = self.cellar.set_status(&user_id, id, status).await?;
        Ok(Response::new(SetBottleStatusResponse {
            bottle: Some(bottle_to_proto(&bottle)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "DeleteBottle"))]
    async fn delete_bottle(
        &self,
        request: Request<DeleteBottleRequest>,
    ) -> Result<Response<DeleteBottleResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.bottle_id, "bottle_id")?;
        self.cellar.delete_bottle(&user_id, id).await?;
        info!(bottle_id = %id, "Bottle deleted");
        Ok(Response::new(DeleteBottleResponse { removed: true }))
    }

    // =========================================================================
    // Drink logs and summary
    // =========================================================================

    #[instrument(skip(self, request), fields(rpc = "LogDrink"))]
    async fn log_drink(
        &self,
        request: Request<LogDrinkRequest>,
    ) -> Result<Response<LogDrinkResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();

        let params = DrinkLogParams {
            bottle_id: req.bottle_id,
            drunk_at: seconds(req.drunk_at.as_ref()).unwrap_or_else(unix_timestamp),
            context: req.context,
            venue: req.venue,
            notes: req.notes,
            rating: req.rating.map(i64::from),
            tasting_notes: req.tasting_notes.into_iter().collect(),
        };
        let (log, bottle) = self
            .cellar
            .log_drink(&user_id, params, req.quantity)
            .await?;

        Ok(Response::new(LogDrinkResponse {
            log: Some(drink_log_to_proto(&log)),
            bottle: bottle.as_ref().map(bottle_to_proto),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListDrinkLogs"))]
    async fn list_drink_logs(
        &self,
        request: Request<ListDrinkLogsRequest>,
    ) -> Result<Response<ListDrinkLogsResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let bottle_id = req.bottle_id.as_deref().filter(|b| !b.is_empty());

        let logs = self
            .cellar
            .list_drink_logs(&user_id, bottle_id, page_limit(req.limit), req.offset)
            .await?;
        Ok(Response::new(ListDrinkLogsResponse {
            logs: logs.iter().map(drink_log_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GetCellarSummary"))]
    async fn get_cellar_summary(
        &self,
        request: Request<GetCellarSummaryRequest>,
    ) -> Result<Response<GetCellarSummaryResponse>, Status> {
        let claims = extract_owner_claims(&request)?;
        let summary = self.cellar.summary(claims.user_id()).await?;
        Ok(Response::new(GetCellarSummaryResponse {
            summary: Some(summary_to_proto(&summary)),
        }))
    }

    // =========================================================================
    // Media
    // =========================================================================

    #[instrument(skip(self, request), fields(rpc = "UploadImage"))]
    async fn upload_image(
        &self,
        request: Request<UploadImageRequest>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let url = self.store.put(&req.data, &req.content_type).await?;
        info!(user_id = %user_id, url = %url, "Image uploaded");
        Ok(Response::new(UploadImageResponse { url }))
    }

    #[instrument(skip(self, request), fields(rpc = "ScanLabel"))]
    async fn scan_label(
        &self,
        request: Request<ScanLabelRequest>,
    ) -> Result<Response<ScanLabelResponse>, Status> {
        extract_owner_claims(&request)?;
        let Some(scanner) = &self.scanner else {
            return Err(scan_error_to_status(ScanError::Config(
                "Label scanning is not configured".into(),
            )));
        };

        let req = request.into_inner();
        self.store.check(&req.data, &req.content_type)?;

        let suggestion = scanner
            .scan(req.data, &req.content_type)
            .await
            .map_err(|e| {
                warn!(error = %e, "Label scan failed");
                scan_error_to_status(e)
            })?;

        Ok(Response::new(ScanLabelResponse {
            suggestion: Some(label_suggestion_to_proto(suggestion)),
        }))
    }
}
