//! Runtime configuration.
//!
//! An immutable-style config passed by value; toggles produce a new value
//! via the `with_*` builders and are broadcast to trusted modules through
//! [`crate::ModuleRegistry::broadcast_config`]. Plugin-backed modules never
//! see this struct - it may carry secrets.

use std::path::{Path, PathBuf};

use toolsmith_error::{Error, Result};

/// Default OpenAI-compatible endpoint.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default completion model.
const DEFAULT_MODEL: &str = "gpt-4";

/// Default data directory holding plugin trees and the memory log.
const DEFAULT_DATA_DIR: &str = ".toolsmith";

/// Runtime configuration for the agent and its modules.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    api_key: String,
    api_base: String,
    model: String,
    data_dir: PathBuf,
    supervised_mode: bool,
    debug_mode: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            supervised_mode: true,
            debug_mode: false,
        }
    }
}

impl RuntimeConfig {
    /// Create a config with defaults: supervised mode on, debug off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment.
    ///
    /// `TOOLSMITH_API_KEY` (falling back to `OPENAI_API_KEY`) is required for
    /// chat use; `TOOLSMITH_API_BASE`, `TOOLSMITH_MODEL`, `TOOLSMITH_DATA_DIR`
    /// and `TOOLSMITH_DEBUG` are optional overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::new();

        if let Some(key) = read_env("TOOLSMITH_API_KEY").or_else(|| read_env("OPENAI_API_KEY")) {
            cfg.api_key = key;
        }
        if let Some(base) = read_env("TOOLSMITH_API_BASE") {
            cfg.api_base = base;
        }
        if let Some(model) = read_env("TOOLSMITH_MODEL") {
            cfg.model = model;
        }
        if let Some(dir) = read_env("TOOLSMITH_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(debug) = read_env("TOOLSMITH_DEBUG") {
            cfg.debug_mode = debug.parse::<bool>().map_err(|e| {
                Error::config_invalid(format!("TOOLSMITH_DEBUG must be true or false: {}", e))
            })?;
        }

        Ok(cfg)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Root of the on-disk state: plugin trees and the memory log.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory plugin source is persisted to, keyed by plugin id.
    pub fn plugin_source_dir(&self) -> PathBuf {
        self.data_dir.join("plugins").join("source")
    }

    /// Directory plugin build scaffolds are generated in, keyed by plugin id.
    pub fn plugin_build_dir(&self) -> PathBuf {
        self.data_dir.join("plugins").join("build")
    }

    /// Directory compiled plugin artifacts land in; scanned once at startup.
    pub fn plugin_bin_dir(&self) -> PathBuf {
        self.data_dir.join("plugins").join("bin")
    }

    /// Path of the flat JSON memory log.
    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.join("memories.json")
    }

    pub fn is_supervised_mode(&self) -> bool {
        self.supervised_mode
    }

    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_supervised_mode(mut self, supervised_mode: bool) -> Self {
        self.supervised_mode = supervised_mode;
        self
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
