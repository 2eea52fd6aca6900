//! Error kinds for toolsmith operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on ErrorKind to decide how a failure is handled: most kinds
/// become command-result text threaded back into the conversation, a few
/// (ConfigInvalid, IoFailed at startup) are allowed to stop the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Parser errors
    // =========================================================================
    /// The model response does not fit the supported command grammar
    GrammarViolation,

    // =========================================================================
    // Dispatch errors
    // =========================================================================
    /// No module is registered under the command id
    UnknownCommand,

    /// A module is already registered under this id
    RegistryCollision,

    // =========================================================================
    // Plugin errors
    // =========================================================================
    /// Malformed plugin submission (bad id, missing brace-delimited source)
    InvalidSubmission,

    /// Plugin command body is not a valid structured payload
    PayloadInvalid,

    /// The external build tool failed to produce an artifact
    CompileFailed,

    /// A compiled artifact could not be loaded or verified
    LoadFailed,

    /// The operator declined the supervised-mode confirmation
    OperatorBlocked,

    /// A loaded plugin reported an error while executing
    PluginFailed,

    // =========================================================================
    // Completion errors
    // =========================================================================
    /// The completion call failed
    InferenceFailed,

    /// The completion endpoint rate-limited the request
    RateLimited,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// Filesystem or process IO failed
    IoFailed,

    /// Serialization or deserialization failed
    SerializationFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            ErrorKind::GrammarViolation => "GrammarViolation",

            ErrorKind::UnknownCommand => "UnknownCommand",
            ErrorKind::RegistryCollision => "RegistryCollision",

            ErrorKind::InvalidSubmission => "InvalidSubmission",
            ErrorKind::PayloadInvalid => "PayloadInvalid",
            ErrorKind::CompileFailed => "CompileFailed",
            ErrorKind::LoadFailed => "LoadFailed",
            ErrorKind::OperatorBlocked => "OperatorBlocked",
            ErrorKind::PluginFailed => "PluginFailed",

            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::RateLimited => "RateLimited",

            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::InferenceFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::UnknownCommand.to_string(), "UnknownCommand");
        assert_eq!(ErrorKind::CompileFailed.to_string(), "CompileFailed");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::InferenceFailed.is_retryable());
        assert!(!ErrorKind::OperatorBlocked.is_retryable());
        assert!(!ErrorKind::GrammarViolation.is_retryable());
    }
}
