//! Cellar Server Library
//!
//! Core functionality for the Cellar server:
//! - SQLite storage for owners, bottles, drink logs and tasting sessions
//! - Owner and guest bearer tokens, password hashing
//! - Cellar bookkeeping (locations, bottle lifecycle, drink logs, summary)
//! - Tasting sessions with join codes, guest scoring and aggregated results
//! - Image storage, label scanning and webhook notifications
//! - gRPC services

pub mod auth;
pub mod cellar;
pub mod error;
pub mod media;
pub mod notify;
pub mod server;
pub mod storage;
pub mod tasting;
