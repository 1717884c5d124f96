//! Error classification shared by repository and domain services.
//!
//! Callers at the boundary map an [`ErrorKind`] to their own response model
//! (for example HTTP 400/404/500). Core never formats user-facing messages.

use std::fmt::{Display, Formatter};

/// Coarse failure category exposed by every core error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was missing, empty or malformed.
    InvalidArgument,
    /// The referenced entity does not exist.
    NotFound,
    /// A domain rule was violated.
    Validation,
    /// The underlying store failed or returned unusable data.
    StoreFailure,
}

impl ErrorKind {
    /// Stable lowercase label used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::StoreFailure => "store_failure",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
