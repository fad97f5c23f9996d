//! GuestTastingService gRPC implementation.
//!
//! Every call carries a guest token in `authorization` and the join code in
//! the request body; the two must match.

use tonic::{Request, Response, Status};
use tracing::instrument;

use cellar_core::db::unix_timestamp;
use cellar_proto::v1::guest_tasting_service_server::GuestTastingService;
use cellar_proto::v1::{
    GuestGetResultsRequest, GuestGetResultsResponse, GuestGetSessionRequest,
    GuestGetSessionResponse, GuestListEntriesRequest, GuestListEntriesResponse,
    GuestScoreEntryRequest, GuestScoreEntryResponse,
};

use crate::auth::GuestClaims;
use crate::storage::TastingSession;
use crate::tasting::{GuestAccess, ScoreActor, SessionManager};

use super::convert::{
    entry_to_proto, guest_view_to_proto, results_to_proto, score_payload_from_proto,
};
use super::interceptor::bearer_token;

/// Guest requests name the session they act on by join code.
trait JoinCoded {
    fn join_code(&self) -> &str;
}

macro_rules! impl_join_coded {
    ($($ty:ty),* $(,)?) => {
        $(impl JoinCoded for $ty {
            fn join_code(&self) -> &str {
                &self.join_code
            }
        })*
    };
}

impl_join_coded!(
    GuestGetSessionRequest,
    GuestListEntriesRequest,
    GuestScoreEntryRequest,
    GuestGetResultsRequest,
);

pub struct GuestTastingServiceImpl {
    guests: GuestAccess,
    sessions: SessionManager,
}

impl GuestTastingServiceImpl {
    pub const fn new(guests: GuestAccess, sessions: SessionManager) -> Self {
        Self { guests, sessions }
    }

    /// Verify the caller's guest token against the request's join code and
    /// load the session.
    async fn authorize<T: JoinCoded>(
        &self,
        request: Request<T>,
    ) -> Result<(GuestClaims, TastingSession, T), Status> {
        let token = bearer_token(request.metadata()).map(str::to_string);
        let req = request.into_inner();
        let claims = self.guests.authorize(token.as_deref(), req.join_code())?;
        let session = self.guests.session_for(&claims).await?;
        Ok((claims, session, req))
    }
}

#[tonic::async_trait]
impl GuestTastingService for GuestTastingServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "GuestGetSession"))]
    async fn get_session(
        &self,
        request: Request<GuestGetSessionRequest>,
    ) -> Result<Response<GuestGetSessionResponse>, Status> {
        let (_, session, _) = self.authorize(request).await?;
        Ok(Response::new(GuestGetSessionResponse {
            session: Some(guest_view_to_proto(&session, unix_timestamp())),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GuestListEntries"))]
    async fn list_entries(
        &self,
        request: Request<GuestListEntriesRequest>,
    ) -> Result<Response<GuestListEntriesResponse>, Status> {
        let (claims, session, _) = self.authorize(request).await?;
        let (hosts, mine) = self
            .sessions
            .guest_entries(&session, claims.guest_id())
            .await?;
        Ok(Response::new(GuestListEntriesResponse {
            entries: hosts.iter().map(entry_to_proto).collect(),
            my_scores: mine.iter().map(entry_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GuestScoreEntry"))]
    async fn score_entry(
        &self,
        request: Request<GuestScoreEntryRequest>,
    ) -> Result<Response<GuestScoreEntryResponse>, Status> {
        let (claims, session, req) = self.authorize(request).await?;
        let actor = ScoreActor::Guest {
            guest_id: claims.guest_id().to_string(),
            guest_name: claims.guest_name().to_string(),
        };
        let entry = self
            .sessions
            .score_entry(
                &session,
                &req.entry_id,
                &actor,
                score_payload_from_proto(req.score),
            )
            .await?;
        Ok(Response::new(GuestScoreEntryResponse {
            entry: Some(entry_to_proto(&entry)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GuestGetResults"))]
    async fn get_results(
        &self,
        request: Request<GuestGetResultsRequest>,
    ) -> Result<Response<GuestGetResultsResponse>, Status> {
        let (_, session, _) = self.authorize(request).await?;
        let results = self.sessions.results(&session).await?;
        Ok(Response::new(GuestGetResultsResponse {
            results: Some(results_to_proto(&results)),
        }))
    }
}
