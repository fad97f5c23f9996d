//! InviteService gRPC implementation.

use tonic::{Request, Response, Status};
use tracing::instrument;

use cellar_core::db::unix_timestamp;
use cellar_proto::v1::invite_service_server::InviteService;
use cellar_proto::v1::{JoinRequest, JoinResponse};

use crate::tasting::GuestAccess;

use super::convert::guest_view_to_proto;

pub struct InviteServiceImpl {
    guests: GuestAccess,
}

impl InviteServiceImpl {
    pub const fn new(guests: GuestAccess) -> Self {
        Self { guests }
    }
}

#[tonic::async_trait]
impl InviteService for InviteServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "Join"))]
    async fn join(&self, request: Request<JoinRequest>) -> Result<Response<JoinResponse>, Status> {
        let req = request.into_inner();
        let outcome = self.guests.join(&req.code, &req.display_name).await?;

        Ok(Response::new(JoinResponse {
            guest_token: outcome.token,
            guest_id: outcome.guest.id,
            expires_in_secs: outcome.expires_in_secs,
            session: Some(guest_view_to_proto(&outcome.session, unix_timestamp())),
        }))
    }
}
