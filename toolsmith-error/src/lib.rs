//! # toolsmith-error
//!
//! Unified error handling for the toolsmith runtime.
//!
//! ## Design
//!
//! - **ErrorKind**: what went wrong (e.g. UnknownCommand, CompileFailed)
//! - **ErrorStatus**: how to handle it (Permanent, Temporary, Persistent)
//! - **Context**: key-value pairs that locate the failure
//! - **Source**: the underlying error, wrapped without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use toolsmith_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::UnknownCommand, "unrecognized command: /frobnicate")
//!         .with_operation("registry::dispatch")
//!         .with_context("command", "/frobnicate"))
//! }
//! ```
//!
//! ## Principles
//!
//! - Fallible functions return `Result<T, toolsmith_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is classified once; later frames only append context

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the toolsmith Error
pub type Result<T> = std::result::Result<T, Error>;
