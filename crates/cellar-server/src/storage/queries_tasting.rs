//! Tasting session, entry and guest queries.

use std::collections::BTreeMap;

use cellar_core::db::{DatabaseError, unix_timestamp};

use super::db::CellarDatabase;
use super::models::{SessionGuest, TastingEntry, TastingSession};

/// Entry rows joined with the referenced bottle's name.
macro_rules! select_entries {
    ($tail:literal) => {
        concat!(
            "SELECT e.*, b.name AS bottle_name FROM tasting_entries e \
             LEFT JOIN bottles b ON b.id = e.bottle_id ",
            $tail
        )
    };
}

#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub name: String,
    pub occurred_at: i64,
    pub venue: String,
    pub participants: String,
    pub notes: String,
}

/// Partial session update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub name: Option<String>,
    pub occurred_at: Option<i64>,
    pub venue: Option<String>,
    pub participants: Option<String>,
    pub notes: Option<String>,
    pub summary: Option<String>,
}

/// Identity and wine reference of a new entry.
///
/// Host entries leave `guest_id` and `parent_entry_id` empty; guest score
/// entries set both and copy the wine reference from the parent.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub bottle_id: Option<String>,
    pub ad_hoc_name: Option<String>,
    pub ad_hoc_photo_url: Option<String>,
    pub materialize_bottle: bool,
    pub guest_id: Option<String>,
    pub parent_entry_id: Option<String>,
}

/// Score fields of an entry. Writing one replaces all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryScore {
    pub total_score: Option<i64>,
    pub tasting_notes: BTreeMap<String, String>,
    pub short_notes: Option<String>,
    pub long_notes: Option<String>,
    pub tags: Vec<String>,
}

impl EntryScore {
    fn notes_json(&self) -> String {
        serde_json::to_string(&self.tasting_notes).unwrap_or_else(|_| "{}".to_string())
    }

    fn tags_json(&self) -> String {
        serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string())
    }
}

impl CellarDatabase {
    // =========================================================================
    // Session queries
    // =========================================================================

    pub async fn create_session(
        &self,
        id: &str,
        user_id: &str,
        session: &NewSession,
    ) -> Result<TastingSession, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO tasting_sessions (id, user_id, name, occurred_at, venue, participants, \
             notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&session.name)
        .bind(session.occurred_at)
        .bind(&session.venue)
        .bind(&session.participants)
        .bind(&session.notes)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_session(user_id, id).await
    }

    /// Get a session owned by `user_id`.
    pub async fn get_session(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<TastingSession, DatabaseError> {
        sqlx::query_as::<_, TastingSession>(
            "SELECT * FROM tasting_sessions WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Tasting session {id}")))
    }

    /// Look up a session by its (normalised) join code, regardless of owner.
    pub async fn get_session_by_code(
        &self,
        code: &str,
    ) -> Result<Option<TastingSession>, DatabaseError> {
        let session = sqlx::query_as::<_, TastingSession>(
            "SELECT * FROM tasting_sessions WHERE join_code = ?",
        )
        .bind(code)
        .fetch_optional(self.pool())
        .await?;
        Ok(session)
    }

    /// Most recent first.
    pub async fn list_sessions(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TastingSession>, DatabaseError> {
        let sessions = sqlx::query_as::<_, TastingSession>(
            "SELECT * FROM tasting_sessions WHERE user_id = ? \
             ORDER BY occurred_at DESC, created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        Ok(sessions)
    }

    pub async fn update_session(
        &self,
        user_id: &str,
        id: &str,
        update: &SessionUpdate,
    ) -> Result<TastingSession, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE tasting_sessions SET \
             name = COALESCE(?, name), \
             occurred_at = COALESCE(?, occurred_at), \
             venue = COALESCE(?, venue), \
             participants = COALESCE(?, participants), \
             notes = COALESCE(?, notes), \
             summary = COALESCE(?, summary), \
             updated_at = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(update.name.as_deref())
        .bind(update.occurred_at)
        .bind(update.venue.as_deref())
        .bind(update.participants.as_deref())
        .bind(update.notes.as_deref())
        .bind(update.summary.as_deref())
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Tasting session {id}")));
        }
        self.get_session(user_id, id).await
    }

    /// Delete a session together with its entries and guests.
    pub async fn delete_session(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tasting_sessions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store a join code if the session has none yet.
    ///
    /// Returns `false` when a code was already present (the existing code
    /// wins). A code already used by another session surfaces as
    /// `DatabaseError::Conflict`.
    pub async fn assign_join_code(
        &self,
        user_id: &str,
        id: &str,
        code: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasting_sessions SET join_code = ?, updated_at = ? \
             WHERE id = ? AND user_id = ? AND join_code IS NULL",
        )
        .bind(code)
        .bind(unix_timestamp())
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Turn social mode on and set a new invite expiry.
    pub async fn open_invite(
        &self,
        user_id: &str,
        id: &str,
        expires_at: i64,
    ) -> Result<TastingSession, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasting_sessions SET social_mode = 1, invite_expires_at = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(expires_at)
        .bind(unix_timestamp())
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Tasting session {id}")));
        }
        self.get_session(user_id, id).await
    }

    /// Turn social mode off. Code and expiry are kept.
    pub async fn close_invite(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<TastingSession, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasting_sessions SET social_mode = 0, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(unix_timestamp())
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Tasting session {id}")));
        }
        self.get_session(user_id, id).await
    }

    // =========================================================================
    // Entry queries
    // =========================================================================

    /// Insert an entry. A second score row for the same (guest, parent entry)
    /// surfaces as `DatabaseError::Conflict`.
    pub async fn create_entry(
        &self,
        id: &str,
        session_id: &str,
        entry: &NewEntry,
        score: &EntryScore,
    ) -> Result<TastingEntry, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO tasting_entries (id, tasting_session_id, bottle_id, ad_hoc_name, \
             ad_hoc_photo_url, materialize_bottle, total_score, tasting_notes, short_notes, \
             long_notes, tags, guest_id, parent_entry_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(session_id)
        .bind(entry.bottle_id.as_deref())
        .bind(entry.ad_hoc_name.as_deref())
        .bind(entry.ad_hoc_photo_url.as_deref())
        .bind(entry.materialize_bottle)
        .bind(score.total_score)
        .bind(score.notes_json())
        .bind(score.short_notes.as_deref())
        .bind(score.long_notes.as_deref())
        .bind(score.tags_json())
        .bind(entry.guest_id.as_deref())
        .bind(entry.parent_entry_id.as_deref())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_entry(session_id, id).await
    }

    pub async fn get_entry(
        &self,
        session_id: &str,
        id: &str,
    ) -> Result<TastingEntry, DatabaseError> {
        sqlx::query_as::<_, TastingEntry>(select_entries!(
            "WHERE e.id = ? AND e.tasting_session_id = ?"
        ))
        .bind(id)
        .bind(session_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Tasting entry {id}")))
    }

    /// Host (template) entries in insertion order.
    pub async fn list_host_entries(
        &self,
        session_id: &str,
    ) -> Result<Vec<TastingEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, TastingEntry>(select_entries!(
            "WHERE e.tasting_session_id = ? AND e.guest_id IS NULL AND e.parent_entry_id IS NULL \
             ORDER BY e.created_at, e.rowid"
        ))
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    /// Every guest score row of a session.
    pub async fn list_guest_entries(
        &self,
        session_id: &str,
    ) -> Result<Vec<TastingEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, TastingEntry>(select_entries!(
            "WHERE e.tasting_session_id = ? AND e.guest_id IS NOT NULL \
             ORDER BY e.created_at, e.rowid"
        ))
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    /// Score rows written by one guest.
    pub async fn list_entries_by_guest(
        &self,
        session_id: &str,
        guest_id: &str,
    ) -> Result<Vec<TastingEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, TastingEntry>(select_entries!(
            "WHERE e.tasting_session_id = ? AND e.guest_id = ? ORDER BY e.created_at, e.rowid"
        ))
        .bind(session_id)
        .bind(guest_id)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    /// The score row of `guest_id` for `parent_entry_id`, if any.
    pub async fn find_guest_entry(
        &self,
        session_id: &str,
        guest_id: &str,
        parent_entry_id: &str,
    ) -> Result<Option<TastingEntry>, DatabaseError> {
        let entry = sqlx::query_as::<_, TastingEntry>(select_entries!(
            "WHERE e.tasting_session_id = ? AND e.guest_id = ? AND e.parent_entry_id = ?"
        ))
        .bind(session_id)
        .bind(guest_id)
        .bind(parent_entry_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(entry)
    }

    /// Overwrite all score fields of an entry.
    pub async fn update_entry_score(
        &self,
        session_id: &str,
        id: &str,
        score: &EntryScore,
    ) -> Result<TastingEntry, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasting_entries SET total_score = ?, tasting_notes = ?, short_notes = ?, \
             long_notes = ?, tags = ?, updated_at = ? WHERE id = ? AND tasting_session_id = ?",
        )
        .bind(score.total_score)
        .bind(score.notes_json())
        .bind(score.short_notes.as_deref())
        .bind(score.long_notes.as_deref())
        .bind(score.tags_json())
        .bind(unix_timestamp())
        .bind(id)
        .bind(session_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Tasting entry {id}")));
        }
        self.get_entry(session_id, id).await
    }

    /// Edit the ad-hoc fields of a host entry; `None` leaves a field unchanged.
    pub async fn update_entry_fields(
        &self,
        session_id: &str,
        id: &str,
        ad_hoc_name: Option<&str>,
        ad_hoc_photo_url: Option<&str>,
        materialize_bottle: Option<bool>,
    ) -> Result<TastingEntry, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasting_entries SET \
             ad_hoc_name = COALESCE(?, ad_hoc_name), \
             ad_hoc_photo_url = COALESCE(?, ad_hoc_photo_url), \
             materialize_bottle = COALESCE(?, materialize_bottle), \
             updated_at = ? \
             WHERE id = ? AND tasting_session_id = ? AND guest_id IS NULL",
        )
        .bind(ad_hoc_name)
        .bind(ad_hoc_photo_url)
        .bind(materialize_bottle)
        .bind(unix_timestamp())
        .bind(id)
        .bind(session_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Tasting entry {id}")));
        }
        self.get_entry(session_id, id).await
    }

    /// Point a host entry and its guest copies at a bottle.
    pub async fn link_entry_bottle(
        &self,
        session_id: &str,
        id: &str,
        bottle_id: &str,
    ) -> Result<TastingEntry, DatabaseError> {
        let result = sqlx::query(
            "UPDATE tasting_entries SET bottle_id = ?, materialize_bottle = 0, updated_at = ? \
             WHERE tasting_session_id = ? AND (id = ? OR parent_entry_id = ?)",
        )
        .bind(bottle_id)
        .bind(unix_timestamp())
        .bind(session_id)
        .bind(id)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Tasting entry {id}")));
        }
        self.get_entry(session_id, id).await
    }

    /// Delete an entry; guest score rows pointing at it cascade.
    pub async fn delete_entry(&self, session_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let result =
            sqlx::query("DELETE FROM tasting_entries WHERE id = ? AND tasting_session_id = ?")
                .bind(id)
                .bind(session_id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Guest queries
    // =========================================================================

    pub async fn create_guest(
        &self,
        id: &str,
        session_id: &str,
        display_name: &str,
        token_hash: &str,
    ) -> Result<SessionGuest, DatabaseError> {
        sqlx::query(
            "INSERT INTO session_guests (id, tasting_session_id, display_name, token_hash, joined_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(session_id)
        .bind(display_name)
        .bind(token_hash)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_guest(session_id, id).await
    }

    pub async fn get_guest(
        &self,
        session_id: &str,
        id: &str,
    ) -> Result<SessionGuest, DatabaseError> {
        sqlx::query_as::<_, SessionGuest>(
            "SELECT * FROM session_guests WHERE id = ? AND tasting_session_id = ?",
        )
        .bind(id)
        .bind(session_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Session guest {id}")))
    }

    /// Guests in join order.
    pub async fn list_guests(&self, session_id: &str) -> Result<Vec<SessionGuest>, DatabaseError> {
        let guests = sqlx::query_as::<_, SessionGuest>(
            "SELECT * FROM session_guests WHERE tasting_session_id = ? ORDER BY joined_at, rowid",
        )
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;
        Ok(guests)
    }
}
