//! The main Error type for toolsmith

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The unified error type for all toolsmith operations.
///
/// Carries:
/// - `kind`: what type of error occurred
/// - `message`: human-readable description (this is the text the agent sees
///   when a command fails, so it should be self-correcting)
/// - `status`: whether the error is retryable
/// - `operation`: the operation that raised it
/// - `context`: key-value pairs for debugging
/// - `source`: the underlying error (if any)
///
/// # Example
///
/// ```rust
/// use toolsmith_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::RateLimited, "completion endpoint returned 429")
///     .with_operation("client::complete")
///     .with_context("model", "gpt-4");
///
/// assert_eq!(err.kind(), ErrorKind::RateLimited);
/// assert!(err.status().is_retryable());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error status
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Get the source error (if any)
    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the error status
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Mark as temporary (retryable)
    pub fn temporary(mut self) -> Self {
        self.status = ErrorStatus::Temporary;
        self
    }

    /// Mark as permanent (not retryable)
    pub fn permanent(mut self) -> Self {
        self.status = ErrorStatus::Permanent;
        self
    }

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    // =========================================================================
    // Status mutations
    // =========================================================================

    /// Mark as persistent after failed retries
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }
}

// =============================================================================
// Display - compact, single-line format for logs and command results
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// From implementations (be careful not to leak raw errors!)
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::IoFailed, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create an Unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// Create a GrammarViolation error
    pub fn grammar_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GrammarViolation, message)
    }

    /// Create an UnknownCommand error for the given command text
    pub fn unknown_command(command: impl Into<String>) -> Self {
        let command = command.into();
        Self::new(
            ErrorKind::UnknownCommand,
            format!("unrecognized command: {}", command),
        )
        .with_context("command", command)
    }

    /// Create a RegistryCollision error
    pub fn registry_collision(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(
            ErrorKind::RegistryCollision,
            format!("a module with id '{}' is already registered", id),
        )
        .with_context("id", id)
    }

    /// Create an InvalidSubmission error
    pub fn invalid_submission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSubmission, message)
    }

    /// Create a CompileFailed error carrying the build tool's raw output
    pub fn compile_failed(output: impl Into<String>) -> Self {
        Self::new(ErrorKind::CompileFailed, format!("error compiling plugin:\n{}", output.into()))
    }

    /// Create a LoadFailed error
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LoadFailed, message)
    }

    /// Create an OperatorBlocked error
    pub fn operator_blocked() -> Self {
        Self::new(
            ErrorKind::OperatorBlocked,
            "the operator blocked this action",
        )
    }

    /// Create an InferenceFailed error
    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InferenceFailed, message)
    }

    /// Create a RateLimited error
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a SerializationFailed error
    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationFailed, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::UnknownCommand, "unrecognized command: /nope");
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
        assert_eq!(err.message(), "unrecognized command: /nope");
        assert_eq!(err.status(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::CompileFailed, "exit status 101")
            .with_operation("forge::compile")
            .with_context("plugin", "add-one")
            .with_context("tool", "cargo");

        assert_eq!(err.operation(), "forge::compile");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context()[0], ("plugin", "add-one".to_string()));
    }

    #[test]
    fn test_operation_chaining() {
        let err = Error::new(ErrorKind::IoFailed, "write failed")
            .with_operation("forge::persist")
            .with_operation("forge::create");

        assert_eq!(err.operation(), "forge::create");
        assert_eq!(err.context().len(), 1);
        assert_eq!(err.context()[0], ("called", "forge::persist".to_string()));
    }

    #[test]
    fn test_temporary_status() {
        let err = Error::new(ErrorKind::RateLimited, "429");
        assert!(err.is_retryable());

        let err = Error::new(ErrorKind::OperatorBlocked, "blocked");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_persist() {
        let err = Error::new(ErrorKind::RateLimited, "429").temporary();
        assert!(err.is_retryable());

        let err = err.persist();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), ErrorStatus::Persistent);
    }

    #[test]
    fn test_display_is_agent_facing() {
        // Display is threaded back into the conversation, so it must read as
        // plain prose, not as a debug dump.
        let err = Error::unknown_command("/frobnicate");
        assert_eq!(format!("{}", err), "unrecognized command: /frobnicate");
    }

    #[test]
    fn test_display_includes_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::new(ErrorKind::IoFailed, "could not persist plugin source")
            .set_source(io_err);

        let display = format!("{}", err);
        assert!(display.contains("could not persist plugin source"));
        assert!(display.contains("no such file"));
    }

    #[test]
    fn test_convenience_constructors() {
        let err = Error::registry_collision("memory");
        assert_eq!(err.kind(), ErrorKind::RegistryCollision);
        assert!(err.message().contains("memory"));

        let err = Error::operator_blocked();
        assert_eq!(err.kind(), ErrorKind::OperatorBlocked);

        let err = Error::compile_failed("error[E0425]: cannot find function");
        assert_eq!(err.kind(), ErrorKind::CompileFailed);
        assert!(err.message().contains("E0425"));
    }
}
