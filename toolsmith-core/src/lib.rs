//! # Toolsmith Core
//!
//! The runtime underneath a self-extending conversational agent.
//!
//! ## Core Concepts
//! - **Parser**: turns raw model text into residual chat plus an ordered
//!   list of embedded slash commands
//! - **Modules**: named capabilities the agent can invoke by command id
//! - **Registry**: id -> module map with a sequential dispatcher
//! - **Forge**: compiles agent-authored plugin source out-of-process and
//!   registers the result as a new module, behind an operator gate
//! - **Sidecar**: compiled plugins run as child processes spoken to over a
//!   narrow JSON request/response protocol - never loaded in-process

pub mod config;
pub mod lexer;
pub mod memory;
pub mod module;
pub mod parser;
pub mod plugin;
pub mod provider;
pub mod terminal;

pub use config::RuntimeConfig;
pub use lexer::{lex, Token, TokenKind};
pub use module::{CommandResult, Module, ModuleRegistry};
pub use parser::{parse, ParseResult, ParsedCommand};
pub use plugin::{discover_compiled, Plugin, PluginForge, PluginModule, SidecarPlugin};
pub use provider::{ChatMessage, CompletionClient, OpenAiClient, Role};
pub use terminal::Terminal;

pub use toolsmith_error::{Error, ErrorKind, ErrorStatus, Result};
