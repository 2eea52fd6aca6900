//! # Module Registry & Dispatcher
//!
//! A module is a named capability the agent reaches through a slash
//! command. The registry maps ids to modules, keeps registration order for
//! reproducible `/help` listings, and dispatches parsed commands one at a
//! time.
//!
//! The registry is an explicit object owned by the orchestrator and passed
//! where it is needed - there is no process-wide singleton. Registration is
//! append-only; nothing is ever removed.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use toolsmith_error::{Error, Result};

use crate::config::RuntimeConfig;

/// A named capability reachable by command id.
#[async_trait]
pub trait Module: Send + Sync {
    /// The command id, without the leading slash.
    fn id(&self) -> &str;

    /// Self-describing usage text, returned when the command is invoked
    /// with no arguments and no body.
    fn usage(&self) -> String;

    /// Execute the command with its argument line and verbatim body.
    async fn execute(&self, args: &str, body: &str) -> Result<String>;

    /// Live configuration delivery. Plugin-backed modules never receive
    /// this call - configuration may carry secrets.
    fn update_config(&self, _config: &RuntimeConfig) {}

    /// Whether this module is part of the trusted host. Agent-authored
    /// plugins report `false`.
    fn trusted(&self) -> bool {
        true
    }
}

/// The dispatcher's answer to one executed command.
#[derive(Debug)]
pub struct CommandResult {
    /// Text to thread back into the conversation
    pub prompt: String,
    /// The failure, if the command failed
    pub error: Option<Error>,
}

impl CommandResult {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: text.into(),
            error: None,
        }
    }

    pub fn error(error: Error) -> Self {
        Self {
            prompt: String::new(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Id -> module map with a sequential dispatcher.
#[derive(Default)]
pub struct ModuleRegistry {
    // Insertion-ordered so /help lists modules in registration order. The
    // lock makes the check-then-insert atomic if a caller ever adds
    // concurrency around dispatch.
    modules: Mutex<IndexMap<String, Arc<dyn Module>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Fails without side effects if the id is taken.
    pub fn register(&self, module: Arc<dyn Module>) -> Result<()> {
        let id = module.id().to_string();
        let mut modules = self.modules.lock();
        if modules.contains_key(&id) {
            return Err(Error::registry_collision(&id).with_operation("registry::register"));
        }
        modules.insert(id, module);
        Ok(())
    }

    /// Whether a module is registered under the id (no leading slash).
    pub fn is_registered(&self, id: &str) -> bool {
        self.modules.lock().contains_key(id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.modules.lock().keys().cloned().collect()
    }

    fn get(&self, id: &str) -> Option<Arc<dyn Module>> {
        self.modules.lock().get(id).cloned()
    }

    /// Execute one parsed command against the registry.
    ///
    /// `/help` is synthesized here and always succeeds. A bare invocation
    /// (no args, no body) of a registered module returns its usage text
    /// without running it, so the agent can discover commands safely.
    pub async fn dispatch(&self, command: &str, args: &str, body: &str) -> CommandResult {
        if command == "/help" {
            return CommandResult::prompt(self.help_text());
        }

        let id = command.strip_prefix('/').unwrap_or(command);
        let module = match self.get(id) {
            Some(module) => module,
            None => {
                return CommandResult::error(
                    Error::unknown_command(command).with_operation("registry::dispatch"),
                )
            }
        };

        if args.is_empty() && body.is_empty() {
            return CommandResult::prompt(module.usage());
        }

        match module.execute(args, body).await {
            Ok(prompt) => CommandResult::prompt(prompt),
            Err(error) => CommandResult::error(error),
        }
    }

    /// Deliver configuration to every trusted module.
    pub fn broadcast_config(&self, config: &RuntimeConfig) {
        let modules: Vec<Arc<dyn Module>> = self.modules.lock().values().cloned().collect();
        for module in modules {
            if module.trusted() {
                module.update_config(config);
            }
        }
    }

    fn help_text(&self) -> String {
        let mut text = String::from("Here are the commands you have available:\n\n");
        for id in self.ids() {
            text.push_str(&format!("    * /{}\n", id));
        }
        text.push_str(
            "\nYou can call commands using the /command syntax.\n\n\
             Calling a command without any additional arguments will explain its usage. \
             You should do this to learn how the command works.",
        );
        text
    }
}
