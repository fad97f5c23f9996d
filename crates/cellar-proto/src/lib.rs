//! Cellar Protocol Buffers
//!
//! Generated protobuf code for the Cellar gRPC API.
//!
//! This crate contains:
//! - `AuthService` and `AccountService` for owner accounts
//! - `CellarService` for locations, bottles, drink logs and media
//! - `TastingService` for host-side tasting sessions
//! - `InviteService` and `GuestTastingService` for the guest flow

#![allow(clippy::derive_partial_eq_without_eq)]

/// Cellar v1 API definitions.
///
/// All generated types and services are included here.
pub mod v1 {
    tonic::include_proto!("cellar.v1");
}

// Re-export v1 as the default API version for convenience
pub use v1::*;

// Re-export prost_types for downstream crates that build timestamps
pub use prost_types;
