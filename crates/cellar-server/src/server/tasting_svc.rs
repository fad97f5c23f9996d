//! TastingService gRPC implementation (host side).

use tonic::{Request, Response, Status};
use tracing::instrument;

use cellar_proto::v1::tasting_service_server::TastingService;
use cellar_proto::v1::{
    AddEntryRequest, AddEntryResponse, CreateSessionRequest, CreateSessionResponse,
    DeleteSessionRequest, DeleteSessionResponse, GetResultsRequest, GetResultsResponse,
    GetSessionRequest, GetSessionResponse, ListEntriesRequest, ListEntriesResponse,
    ListGuestsRequest, ListGuestsResponse, ListSessionsRequest, ListSessionsResponse,
    MaterializeEntryRequest, MaterializeEntryResponse, RemoveEntryRequest, RemoveEntryResponse,
    ScoreEntryRequest, ScoreEntryResponse, SetSocialModeRequest, SetSocialModeResponse,
    UpdateEntryRequest, UpdateEntryResponse, UpdateSessionRequest, UpdateSessionResponse,
};

use crate::storage::{NewSession, SessionUpdate};
use crate::tasting::{EntryDraft, EntryEdit, GuestAccess, ScoreActor, SessionManager};

use super::convert::{
    entry_to_proto, guest_to_proto, results_to_proto, score_payload_from_proto, seconds,
    session_to_proto,
};
use super::grpc_util::{page_limit, require_id};
use super::interceptor::extract_owner_claims;

pub struct TastingServiceImpl {
    sessions: SessionManager,
    guests: GuestAccess,
}

impl TastingServiceImpl {
    pub const fn new(sessions: SessionManager, guests: GuestAccess) -> Self {
        Self { sessions, guests }
    }
}

#[tonic::async_trait]
impl TastingService for TastingServiceImpl {
    // =========================================================================
    // Sessions
    // =========================================================================

    #[instrument(skip(self, request), fields(rpc = "CreateSession"))]
    async fn create_session(
        &self,
        request: Request<CreateSessionRequest>,
    ) -> Result<Response<CreateSessionResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();

        let new = NewSession {
            name: req.name,
            occurred_at: seconds(req.occurred_at.as_ref()).unwrap_or_default(),
            venue: req.venue,
            participants: req.participants,
            notes: req.notes,
        };
        let session = self.sessions.create_session(&user_id, new).await?;
        Ok(Response::new(CreateSessionResponse {
            session: Some(session_to_proto(&session)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GetSession"))]
    async fn get_session(
        &self,
        request: Request<GetSessionRequest>,
    ) -> Result<Response<GetSessionResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let session = self.sessions.get_session(&user_id, &req.session_id).await?;
        Ok(Response::new(GetSessionResponse {
            session: Some(session_to_proto(&session)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListSessions"))]
    async fn list_sessions(
        &self,
        request: Request<ListSessionsRequest>,
    ) -> Result<Response<ListSessionsResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let sessions = self
            .sessions
            .list_sessions(&user_id, page_limit(req.limit), req.offset)
            .await?;
        Ok(Response::new(ListSessionsResponse {
            sessions: sessions.iter().map(session_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "UpdateSession"))]
    async fn update_session(
        &self,
        request: Request<UpdateSessionRequest>,
    ) -> Result<Response<UpdateSessionResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.session_id, "session_id")?;

        let update = SessionUpdate {
            name: req.name,
            occurred_at: seconds(req.occurred_at.as_ref()),
            venue: req.venue,
            participants: req.participants,
            notes: req.notes,
            summary: req.summary,
        };
        let session = self.sessions.update_session(&user_id, id, update).await?;
        Ok(Response::new(UpdateSessionResponse {
            session: Some(session_to_proto(&session)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "DeleteSession"))]
    async fn delete_session(
        &self,
        request: Request<DeleteSessionRequest>,
    ) -> Result<Response<DeleteSessionResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.session_id, "session_id")?;
        self.sessions.delete_session(&user_id, id).await?;
        Ok(Response::new(DeleteSessionResponse { removed: true }))
    }

    #[instrument(skip(self, request), fields(rpc = "SetSocialMode"))]
    async fn set_social_mode(
        &self,
        request: Request<SetSocialModeRequest>,
    ) -> Result<Response<SetSocialModeResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let id = require_id(&req.session_id, "session_id")?;

        let session = if req.enabled {
            self.sessions.enable_social(&user_id, id).await?
        } else {
            self.sessions.disable_social(&user_id, id).await?
        };
        Ok(Response::new(SetSocialModeResponse {
            session: Some(session_to_proto(&session)),
        }))
    }

    // =========================================================================
    // Entries
    // =========================================================================

    #[instrument(skip(self, request), fields(rpc = "AddEntry"))]
    async fn add_entry(
        &self,
        request: Request<AddEntryRequest>,
    ) -> Result<Response<AddEntryResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();

        let draft = EntryDraft {
            bottle_id: req.bottle_id,
            ad_hoc_name: req.ad_hoc_name,
            ad_hoc_photo_url: req.ad_hoc_photo_url,
            materialize_bottle: req.materialize_bottle,
        };
        let entry = self
            .sessions
            .add_entry(&user_id, &req.session_id, draft)
            .await?;
        Ok(Response::new(AddEntryResponse {
            entry: Some(entry_to_proto(&entry)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListEntries"))]
    async fn list_entries(
        &self,
        request: Request<ListEntriesRequest>,
    ) -> Result<Response<ListEntriesResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let entries = self
            .sessions
            .list_entries(&user_id, &req.session_id)
            .await?;
        Ok(Response::new(ListEntriesResponse {
            entries: entries.iter().map(entry_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "UpdateEntry"))]
    async fn update_entry(
        &self,
        request: Request<UpdateEntryRequest>,
    ) -> Result<Response<UpdateEntryResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();

        let edit = EntryEdit {
            ad_hoc_name: req.ad_hoc_name,
            ad_hoc_photo_url: req.ad_hoc_photo_url,
            materialize_bottle: req.materialize_bottle,
        };
        let entry = self
            .sessions
            .update_entry(&user_id, &req.session_id, &req.entry_id, edit)
            .await?;
        Ok(Response::new(UpdateEntryResponse {
            entry: Some(entry_to_proto(&entry)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "RemoveEntry"))]
    async fn remove_entry(
        &self,
        request: Request<RemoveEntryRequest>,
    ) -> Result<Response<RemoveEntryResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        self.sessions
            .remove_entry(&user_id, &req.session_id, &req.entry_id)
            .await?;
        Ok(Response::new(RemoveEntryResponse { removed: true }))
    }

    #[instrument(skip(self, request), fields(rpc = "MaterializeEntry"))]
    async fn materialize_entry(
        &self,
        request: Request<MaterializeEntryRequest>,
    ) -> Result<Response<MaterializeEntryResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let (entry, bottle) = self
            .sessions
            .materialize_entry(&user_id, &req.session_id, &req.entry_id)
            .await?;
        Ok(Response::new(MaterializeEntryResponse {
            entry: Some(entry_to_proto(&entry)),
            bottle_id: bottle.id,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ScoreEntry"))]
    async fn score_entry(
        &self,
        request: Request<ScoreEntryRequest>,
    ) -> Result<Response<ScoreEntryResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();

        let session = self.sessions.get_session(&user_id, &req.session_id).await?;
        let entry = self
            .sessions
            .score_entry(
                &session,
                &req.entry_id,
                &ScoreActor::Owner,
                score_payload_from_proto(req.score),
            )
            .await?;
        Ok(Response::new(ScoreEntryResponse {
            entry: Some(entry_to_proto(&entry)),
        }))
    }

    // =========================================================================
    // Guests and results
    // =========================================================================

    #[instrument(skip(self, request), fields(rpc = "ListGuests"))]
    async fn list_guests(
        &self,
        request: Request<ListGuestsRequest>,
    ) -> Result<Response<ListGuestsResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let guests = self.guests.list_guests(&user_id, &req.session_id).await?;
        Ok(Response::new(ListGuestsResponse {
            guests: guests.iter().map(guest_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GetResults"))]
    async fn get_results(
        &self,
        request: Request<GetResultsRequest>,
    ) -> Result<Response<GetResultsResponse>, Status> {
        let user_id = extract_owner_claims(&request)?.user_id().to_string();
        let req = request.into_inner();
        let session = self.sessions.get_session(&user_id, &req.session_id).await?;
        let results = self.sessions.results(&session).await?;
        Ok(Response::new(GetResultsResponse {
            results: Some(results_to_proto(&results)),
        }))
    }
}
