//! Shared gRPC utility helpers.

use tonic::Status;

use crate::error::ServiceError;

/// Page size used when a list request leaves `limit` at 0.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a list request may ask for.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Clamp a requested page size.
pub const fn page_limit(requested: u32) -> u32 {
    if requested == 0 {
        DEFAULT_PAGE_SIZE
    } else if requested > MAX_PAGE_SIZE {
        MAX_PAGE_SIZE
    } else {
        requested
    }
}

/// Reject an empty identifier field before it reaches storage.
#[allow(clippy::result_large_err)]
pub fn require_id<'a>(value: &'a str, field: &str) -> Result<&'a str, Status> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")).into());
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn page_limit_defaults_and_caps() {
        assert_eq!(page_limit(0), DEFAULT_PAGE_SIZE);
        assert_eq!(page_limit(10), 10);
        assert_eq!(page_limit(10_000), MAX_PAGE_SIZE);
    }

    #[test]
    fn empty_ids_are_invalid() {
        assert_eq!(require_id("s1", "session_id").unwrap(), "s1");
        let err = require_id(" ", "session_id").unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
        assert_eq!(err.message(), "session_id is required");
    }
}
