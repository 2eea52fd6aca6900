//! # Plugin Subsystem
//!
//! Plugins are modules the agent writes for itself at runtime. Submitted
//! source is persisted, gated behind an operator confirmation, compiled
//! out-of-process, and the resulting artifact is registered as a module.
//!
//! Compiled plugins are never loaded into this process: each artifact is a
//! standalone sidecar executable spoken to over a narrow JSON
//! request/response protocol (see [`sidecar`]). A misbehaving plugin can
//! fail its own command, nothing else.

pub mod forge;
pub mod sidecar;

pub use forge::PluginForge;
pub use sidecar::SidecarPlugin;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use toolsmith_error::{Error, ErrorKind, Result};

use crate::module::{Module, ModuleRegistry};

/// The capability a loaded plugin exposes.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The id the plugin reports for itself.
    fn id(&self) -> &str;

    /// An example invocation, shown as the plugin's usage text.
    fn example(&self) -> String;

    /// Execute with a structured payload decoded from the command body.
    async fn execute(&self, payload: Map<String, Value>) -> Result<Map<String, Value>>;
}

/// Adapter that makes a [`Plugin`] dispatchable as a [`Module`].
///
/// The command body is decoded as a JSON object (an empty body becomes an
/// empty payload) and the plugin's reply is re-encoded as the command's
/// output text.
pub struct PluginModule {
    id: String,
    plugin: Arc<dyn Plugin>,
}

impl PluginModule {
    pub fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            id: plugin.id().to_string(),
            plugin,
        }
    }
}

#[async_trait]
impl Module for PluginModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn usage(&self) -> String {
        self.plugin.example()
    }

    async fn execute(&self, _args: &str, body: &str) -> Result<String> {
        let payload: Map<String, Value> = if body.is_empty() {
            Map::new()
        } else {
            serde_json::from_str(body).map_err(|e| {
                Error::new(
                    ErrorKind::PayloadInvalid,
                    format!("plugin body must be valid JSON: {}", e),
                )
                .with_operation("plugin::execute")
                .with_context("plugin", &self.id)
            })?
        };

        let output = self.plugin.execute(payload).await.map_err(|e| {
            Error::new(
                ErrorKind::PluginFailed,
                format!("error executing plugin: {}", e),
            )
            .with_operation("plugin::execute")
            .with_context("plugin", &self.id)
        })?;

        serde_json::to_string(&Value::Object(output)).map_err(|e| {
            Error::serialization_failed("error converting plugin output to JSON")
                .with_operation("plugin::execute")
                .set_source(e)
        })
    }

    // Agent-authored code never receives live configuration; it may carry
    // secrets.
    fn trusted(&self) -> bool {
        false
    }
}

/// Scan the compiled-artifact directory once and register every loadable
/// plugin. Returns how many were registered.
///
/// Individual failures - artifacts that do not speak the protocol, ids that
/// are already taken - are logged and skipped so one bad artifact cannot
/// block the rest. Artifacts load in file-name order, so a duplicate id is
/// resolved first-loaded-wins.
pub fn discover_compiled(registry: &ModuleRegistry, bin_dir: &Path) -> usize {
    let entries = match std::fs::read_dir(bin_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!(dir = %bin_dir.display(), error = %e, "could not scan plugin directory");
            return 0;
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut loaded = 0;
    for path in paths {
        let plugin = match SidecarPlugin::open(&path) {
            Ok(plugin) => plugin,
            Err(e) => {
                tracing::warn!(artifact = %path.display(), error = %e, "skipping plugin that failed to load");
                continue;
            }
        };

        if registry.is_registered(plugin.id()) {
            tracing::warn!(
                artifact = %path.display(),
                id = plugin.id(),
                "skipping plugin with an already-registered id"
            );
            continue;
        }

        match registry.register(Arc::new(PluginModule::new(Arc::new(plugin)))) {
            Ok(()) => loaded += 1,
            Err(e) => {
                tracing::warn!(artifact = %path.display(), error = %e, "could not register plugin");
            }
        }
    }

    loaded
}
