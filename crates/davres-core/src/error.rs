//! Error taxonomy shared by the whole resource-adaptation core.
//!
//! Every kind maps to one protocol-level failure signal and propagates
//! unchanged from handlers through nodes to the method dispatcher. The core
//! performs no retries and no silent suppression; the only documented
//! exception is the legacy access-control-list read, which degrades to a
//! logged warning plus an absent result.

use std::io;
use thiserror::Error;

/// Failures surfaced by resource operations.
#[derive(Debug, Error)]
pub enum DavError {
    /// Authentication or authorization failed.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Operation cannot proceed due to a resource-state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input to an operation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource is held by a lock incompatible with the operation.
    #[error("resource is locked: {0}")]
    Locked(String),

    /// Lock token mismatch, expired token, or failed request precondition.
    #[error("precondition failed: {0}")]
    PreConditionFailed(String),

    /// No resolvable target for the requested content or operation.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing type has no handler for this capability.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// Startup-time wiring error; never a per-request recoverable condition.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error while streaming content.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for resource operations.
pub type DavResult<T> = Result<T, DavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_convert() {
        let e = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        let dav: DavError = e.into();
        assert!(matches!(dav, DavError::Io(_)));
    }

    #[test]
    fn test_display_carries_context() {
        let e = DavError::Conflict("destination exists".to_string());
        assert_eq!(e.to_string(), "conflict: destination exists");
    }
}
