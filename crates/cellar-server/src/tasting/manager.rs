//! Tasting session lifecycle, entries and scoring.
//!
//! [`SessionManager`] owns everything an owner does to a session:
//! - session CRUD and the social-mode switch (join code + invite expiry)
//! - host (template) entries, including turning ad-hoc wines into bottles
//! - scoring by the owner or by a guest, upserted per (guest, host entry)
//! - recomputing aggregated results on demand

use tracing::{debug, info, warn};

use cellar_core::db::unix_timestamp;

use crate::error::{ServiceError, ServiceResult};
use crate::storage::{
    Bottle, BottleParams, BottleStatus, CellarDatabase, DatabaseError, EntryScore, NewEntry,
    NewSession, SessionUpdate, TastingEntry, TastingSession,
};

use super::aggregate::{SessionResults, aggregate};
use super::join_code;
use super::score::ScorePayload;

/// Who is submitting a score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreActor {
    /// The session owner, scoring the host entry itself.
    Owner,
    /// A joined guest, scoring into their own row.
    Guest { guest_id: String, guest_name: String },
}

/// A host entry as requested by the owner.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    pub bottle_id: Option<String>,
    pub ad_hoc_name: Option<String>,
    pub ad_hoc_photo_url: Option<String>,
    pub materialize_bottle: bool,
}

/// Edits to a host entry; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntryEdit {
    pub ad_hoc_name: Option<String>,
    pub ad_hoc_photo_url: Option<String>,
    pub materialize_bottle: Option<bool>,
}

/// Session settings used by the manager.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub invite_ttl_secs: i64,
    pub join_code_attempts: u32,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            invite_ttl_secs: 24 * 60 * 60,
            join_code_attempts: 5,
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    db: CellarDatabase,
    policy: SessionPolicy,
}

fn session_err(e: DatabaseError) -> ServiceError {
    ServiceError::from_db(e, "Tasting session")
}

fn entry_err(e: DatabaseError) -> ServiceError {
    ServiceError::from_db(e, "Tasting entry")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SessionManager {
    pub const fn new(db: CellarDatabase, policy: SessionPolicy) -> Self {
        Self { db, policy }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub async fn create_session(
        &self,
        user_id: &str,
        mut session: NewSession,
    ) -> ServiceResult<TastingSession> {
        session.name = session.name.trim().to_string();
        if session.name.is_empty() {
            return Err(ServiceError::validation("Session name is required"));
        }
        if session.occurred_at == 0 {
            session.occurred_at = unix_timestamp();
        }

        let id = uuid::Uuid::new_v4().to_string();
        let created = self
            .db
            .create_session(&id, user_id, &session)
            .await
            .map_err(session_err)?;

        info!(session_id = %id, user_id, "Tasting session created");
        Ok(created)
    }

    pub async fn get_session(&self, user_id: &str, id: &str) -> ServiceResult<TastingSession> {
        self.db.get_session(user_id, id).await.map_err(session_err)
    }

    pub async fn list_sessions(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Vec<TastingSession>> {
        Ok(self.db.list_sessions(user_id, limit, offset).await?)
    }

    pub async fn update_session(
        &self,
        user_id: &str,
        id: &str,
        mut update: SessionUpdate,
    ) -> ServiceResult<TastingSession> {
        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::validation("Session name must not be blank"));
            }
        }
        self.db
            .update_session(user_id, id, &update)
            .await
            .map_err(session_err)
    }

    pub async fn delete_session(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        if !self.db.delete_session(user_id, id).await? {
            return Err(ServiceError::not_found("Tasting session"));
        }
        info!(session_id = %id, user_id, "Tasting session deleted");
        Ok(())
    }

    /// Open the session to guests.
    ///
    /// Mints a join code on first use and keeps it afterwards; every call
    /// pushes the invite expiry to now + invite TTL.
    pub async fn enable_social(&self, user_id: &str, id: &str) -> ServiceResult<TastingSession> {
        let session = self.get_session(user_id, id).await?;

        if session.join_code.is_none() {
            self.mint_join_code(user_id, id).await?;
        }

        let expires_at = unix_timestamp() + self.policy.invite_ttl_secs;
        let session = self
            .db
            .open_invite(user_id, id, expires_at)
            .await
            .map_err(session_err)?;

        info!(
            session_id = %id,
            join_code = session.join_code.as_deref().unwrap_or_default(),
            expires_at,
            "Social mode enabled"
        );
        Ok(session)
    }

    /// Stop accepting new guests. Code, expiry and issued guest tokens stay valid.
    pub async fn disable_social(&self, user_id: &str, id: &str) -> ServiceResult<TastingSession> {
        let session = self
            .db
            .close_invite(user_id, id)
            .await
            .map_err(session_err)?;
        info!(session_id = %id, "Social mode disabled");
        Ok(session)
    }

    async fn mint_join_code(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        for attempt in 1..=self.policy.join_code_attempts {
            let code = join_code::generate();
            match self.db.assign_join_code(user_id, id, &code).await {
                // `false` means a concurrent call already assigned one.
                Ok(_) => return Ok(()),
                Err(DatabaseError::Conflict(_)) => {
                    debug!(attempt, "Join code collision, retrying");
                }
                Err(e) => return Err(session_err(e)),
            }
        }
        warn!(session_id = %id, "Exhausted join code attempts");
        Err(ServiceError::Internal(
            "Could not mint a unique join code".into(),
        ))
    }

    // =========================================================================
    // Host entries
    // =========================================================================

    pub async fn add_entry(
        &self,
        user_id: &str,
        session_id: &str,
        draft: EntryDraft,
    ) -> ServiceResult<TastingEntry> {
        let session = self.get_session(user_id, session_id).await?;

        let bottle_id = non_blank(draft.bottle_id);
        let mut ad_hoc_name = non_blank(draft.ad_hoc_name);
        if bottle_id.is_none() && ad_hoc_name.is_none() {
            return Err(ServiceError::validation(
                "An entry needs a bottle or an ad-hoc name",
            ));
        }
        if let Some(bottle_id) = &bottle_id {
            let bottle = self
                .db
                .get_bottle(&session.user_id, bottle_id)
                .await
                .map_err(|e| ServiceError::from_db(e, "Bottle"))?;
            // Keeps the entry (and guest copies) named if the bottle is deleted.
            if ad_hoc_name.is_none() {
                ad_hoc_name = Some(bottle.name);
            }
        }

        let entry = NewEntry {
            bottle_id,
            ad_hoc_name,
            ad_hoc_photo_url: non_blank(draft.ad_hoc_photo_url),
            materialize_bottle: draft.materialize_bottle,
            guest_id: None,
            parent_entry_id: None,
        };
        let id = uuid::Uuid::new_v4().to_string();
        let created = self
            .db
            .create_entry(&id, &session.id, &entry, &EntryScore::default())
            .await
            .map_err(entry_err)?;

        debug!(session_id = %session.id, entry_id = %id, "Host entry added");
        Ok(created)
    }

    /// Host entries of an owned session, in insertion order.
    pub async fn list_entries(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> ServiceResult<Vec<TastingEntry>> {
        let session = self.get_session(user_id, session_id).await?;
        Ok(self.db.list_host_entries(&session.id).await?)
    }

    pub async fn update_entry(
        &self,
        user_id: &str,
        session_id: &str,
        entry_id: &str,
        edit: EntryEdit,
    ) -> ServiceResult<TastingEntry> {
        let session = self.get_session(user_id, session_id).await?;
        let entry = self.host_entry(&session, entry_id).await?;

        let ad_hoc_name = match edit.ad_hoc_name {
            Some(name) if name.trim().is_empty() => {
                if entry.bottle_id.is_none() {
                    return Err(ServiceError::validation(
                        "An entry without a bottle needs an ad-hoc name",
                    ));
                }
                None
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        self.db
            .update_entry_fields(
                &session.id,
                entry_id,
                ad_hoc_name.as_deref(),
                edit.ad_hoc_photo_url.as_deref(),
                edit.materialize_bottle,
            )
            .await
            .map_err(entry_err)
    }

    /// Remove a host entry together with every guest score for it.
    pub async fn remove_entry(
        &self,
        user_id: &str,
        session_id: &str,
        entry_id: &str,
    ) -> ServiceResult<()> {
        let session = self.get_session(user_id, session_id).await?;
        self.host_entry(&session, entry_id).await?;
        if !self.db.delete_entry(&session.id, entry_id).await? {
            return Err(ServiceError::not_found("Tasting entry"));
        }
        Ok(())
    }

    /// Turn an ad-hoc host entry into a permanent bottle record.
    ///
    /// The bottle starts consumed with quantity 0: it was drunk at the
    /// tasting, not added to the cellar.
    pub async fn materialize_entry(
        &self,
        user_id: &str,
        session_id: &str,
        entry_id: &str,
    ) -> ServiceResult<(TastingEntry, Bottle)> {
        let session = self.get_session(user_id, session_id).await?;
        let entry = self.host_entry(&session, entry_id).await?;

        if entry.bottle_id.is_some() {
            return Err(ServiceError::validation(
                "Entry already references a bottle",
            ));
        }
        let Some(name) = non_blank(entry.ad_hoc_name.clone()) else {
            return Err(ServiceError::validation("Entry has no name to materialize"));
        };

        let params = BottleParams {
            name,
            photo_url: entry.ad_hoc_photo_url.clone(),
            ..BottleParams::default()
        };
        let bottle_id = uuid::Uuid::new_v4().to_string();
        let bottle = self
            .db
            .create_bottle(
                &bottle_id,
                &session.user_id,
                &params,
                0,
                BottleStatus::Consumed.as_str(),
            )
            .await
            .map_err(|e| ServiceError::from_db(e, "Bottle"))?;

        let entry = self
            .db
            .link_entry_bottle(&session.id, entry_id, &bottle.id)
            .await
            .map_err(entry_err)?;

        info!(session_id = %session.id, entry_id, bottle_id = %bottle.id, "Entry materialized");
        Ok((entry, bottle))
    }

    async fn host_entry(
        &self,
        session: &TastingSession,
        entry_id: &str,
    ) -> ServiceResult<TastingEntry> {
        let entry = self
            .db
            .get_entry(&session.id, entry_id)
            .await
            .map_err(entry_err)?;
        if !entry.is_host_entry() {
            return Err(ServiceError::not_found("Tasting entry"));
        }
        Ok(entry)
    }

    // =========================================================================
    // Scoring and results
    // =========================================================================

    /// Record a score for a host entry.
    ///
    /// The caller resolves `session` with the matching authority: by owner for
    /// [`ScoreActor::Owner`], by join code for [`ScoreActor::Guest`]. Owners
    /// write into the host entry. Guests write into their own row for that
    /// entry, created on first score with the wine reference copied from the
    /// host entry; later scores overwrite it.
    pub async fn score_entry(
        &self,
        session: &TastingSession,
        entry_id: &str,
        actor: &ScoreActor,
        payload: ScorePayload,
    ) -> ServiceResult<TastingEntry> {
        let score = payload.validate()?;
        let parent = self.host_entry(session, entry_id).await?;

        match actor {
            ScoreActor::Owner => self
                .db
                .update_entry_score(&session.id, &parent.id, &score)
                .await
                .map_err(entry_err),
            ScoreActor::Guest {
                guest_id,
                guest_name,
            } => {
                self.db
                    .get_guest(&session.id, guest_id)
                    .await
                    .map_err(|e| match e {
                        DatabaseError::NotFound(_) => {
                            ServiceError::forbidden("Guest does not belong to this session")
                        }
                        other => ServiceError::from(other),
                    })?;

                let row = self
                    .upsert_guest_score(session, &parent, guest_id, &score)
                    .await?;
                debug!(
                    session_id = %session.id,
                    entry_id,
                    guest = %guest_name,
                    "Guest score recorded"
                );
                Ok(row)
            }
        }
    }

    async fn upsert_guest_score(
        &self,
        session: &TastingSession,
        parent: &TastingEntry,
        guest_id: &str,
        score: &EntryScore,
    ) -> ServiceResult<TastingEntry> {
        if let Some(existing) = self
            .db
            .find_guest_entry(&session.id, guest_id, &parent.id)
            .await?
        {
            return self
                .db
                .update_entry_score(&session.id, &existing.id, score)
                .await
                .map_err(entry_err);
        }
        self.insert_guest_score(session, parent, guest_id, score).await
    }

    /// Insert a guest's score row, or update the row a concurrent submission
    /// inserted first.
    pub(super) async fn insert_guest_score(
        &self,
        session: &TastingSession,
        parent: &TastingEntry,
        guest_id: &str,
        score: &EntryScore,
    ) -> ServiceResult<TastingEntry> {
        let row = NewEntry {
            bottle_id: parent.bottle_id.clone(),
            ad_hoc_name: parent.ad_hoc_name.clone(),
            ad_hoc_photo_url: parent.ad_hoc_photo_url.clone(),
            materialize_bottle: false,
            guest_id: Some(guest_id.to_string()),
            parent_entry_id: Some(parent.id.clone()),
        };
        let id = uuid::Uuid::new_v4().to_string();
        match self.db.create_entry(&id, &session.id, &row, score).await {
            Ok(created) => Ok(created),
            Err(DatabaseError::Conflict(_)) => {
                let existing = self
                    .db
                    .find_guest_entry(&session.id, guest_id, &parent.id)
                    .await?
                    .ok_or_else(|| ServiceError::Internal("Guest score row vanished".into()))?;
                self.db
                    .update_entry_score(&session.id, &existing.id, score)
                    .await
                    .map_err(entry_err)
            }
            Err(e) => Err(entry_err(e)),
        }
    }

    /// The host entries of a session and the calling guest's own score rows.
    pub async fn guest_entries(
        &self,
        session: &TastingSession,
        guest_id: &str,
    ) -> ServiceResult<(Vec<TastingEntry>, Vec<TastingEntry>)> {
        let hosts = self.db.list_host_entries(&session.id).await?;
        let mine = self.db.list_entries_by_guest(&session.id, guest_id).await?;
        Ok((hosts, mine))
    }

    /// Aggregate every score in the session.
    pub async fn results(&self, session: &TastingSession) -> ServiceResult<SessionResults> {
        let hosts = self.db.list_host_entries(&session.id).await?;
        let guest_rows = self.db.list_guest_entries(&session.id).await?;
        let guests = self.db.list_guests(&session.id).await?;
        Ok(aggregate(&hosts, &guest_rows, &guests))
    }
}
