//! Error status - how an error should be handled

use std::fmt;

/// Whether an error is worth retrying.
///
/// - `Permanent`: retrying will not help
/// - `Temporary`: safe to retry after a pause (e.g. rate limits)
/// - `Persistent`: was temporary, but retries were exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// The error is final; retrying the same operation cannot succeed
    Permanent,

    /// The error is transient; the same operation may succeed if retried
    Temporary,

    /// A temporary error that kept happening across retries
    Persistent,
}

impl ErrorStatus {
    /// Check whether an operation that failed with this status may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    /// Transition a temporary status to persistent after exhausted retries
    pub fn persist(self) -> Self {
        match self {
            ErrorStatus::Temporary => ErrorStatus::Persistent,
            other => other,
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        };
        write!(f, "{}", s)
    }
}
