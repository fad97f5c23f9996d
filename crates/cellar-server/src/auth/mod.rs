//! Credential and token service.
//!
//! Provides argon2id password hashing and two non-interchangeable JWT kinds:
//! owner session tokens and session-scoped guest tokens.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::{GuestClaims, OwnerClaims};
pub use jwt::{TokenError, TokenService};
