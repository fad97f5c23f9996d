//! SQLite storage for the Cellar server.
//!
//! Provides persistence for users, locations, bottles, drink logs, tasting
//! sessions, tasting entries and session guests.

mod db;
mod models;
mod queries;
mod queries_cellar;
mod queries_tasting;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests;

pub use cellar_core::db::DatabaseError;
pub use db::CellarDatabase;
pub use models::*;
pub use queries_cellar::{BottleParams, DrinkLogParams};
pub use queries_tasting::{EntryScore, NewEntry, NewSession, SessionUpdate};
