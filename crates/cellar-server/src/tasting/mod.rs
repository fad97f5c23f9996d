//! Tasting sessions: lifecycle, guest access and scoring.
//!
//! - [`SessionManager`]: sessions, host entries, social mode and scoring.
//! - [`GuestAccess`]: join codes exchanged for scoped guest tokens.
//! - [`aggregate`]: per-wine and per-guest averages with superlatives.

pub mod aggregate;
pub mod guest;
pub mod join_code;
pub mod manager;
pub mod score;


pub use aggregate::{SessionResults, aggregate};
pub use guest::{GuestAccess, JoinOutcome};
pub use manager::{EntryDraft, EntryEdit, ScoreActor, SessionManager, SessionPolicy};
pub use score::{ScorePayload, TastingMode};
