//! gRPC server implementations for the Cellar server.

pub mod account_svc;
pub mod auth_svc;
pub mod cellar_svc;
pub mod convert;
pub mod grpc_util;
pub mod guest_svc;
pub mod interceptor;
pub mod invite_svc;
pub mod tasting_svc;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod auth_svc_tests;
#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod cellar_svc_tests;
#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod test_helpers;

pub use account_svc::AccountServiceImpl;
pub use auth_svc::AuthServiceImpl;
pub use cellar_svc::CellarServiceImpl;
pub use guest_svc::GuestTastingServiceImpl;
pub use interceptor::owner_interceptor;
pub use invite_svc::InviteServiceImpl;
pub use tasting_svc::TastingServiceImpl;
