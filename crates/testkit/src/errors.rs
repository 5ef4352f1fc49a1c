//! Test fixtures for shared error codes and envelopes.

use fritzbox_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::invalid_input(),
        ErrorCode::not_found(),
        ErrorCode::unavailable(),
        ErrorCode::timeout(),
        ErrorCode::io(),
        ErrorCode::internal(),
    ]
}

/// A device-side action fault, as returned by a failing remote call.
pub fn action_fault(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected_with_class(
        ErrorCode::new("device", "action_fault"),
        message,
        ErrorClass::NonRetriable,
    )
}

/// A retriable "device unreachable" error fixture.
pub fn unreachable_error(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::unavailable(), message, ErrorClass::Retriable)
}
