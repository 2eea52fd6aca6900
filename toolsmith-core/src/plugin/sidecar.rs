//! Sidecar plugin processes.
//!
//! A compiled plugin is a standalone executable. The host never loads it
//! in-process; it spawns the artifact per request and speaks a two-verb
//! protocol over stdin/stdout:
//!
//! - `<artifact> describe` -> `{"id": "...", "example": "..."}`
//! - `<artifact> execute` with a JSON object on stdin
//!   -> `{"ok": {...}}` or `{"err": "..."}`
//!
//! Anything that breaks the protocol - bad JSON, a nonzero exit - fails
//! that plugin's load or command and nothing else.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolsmith_error::{Error, ErrorKind, Result};

use super::Plugin;

/// What a sidecar reports about itself for the `describe` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    pub id: String,
    pub example: String,
}

/// Reply envelope for the `execute` request.
#[derive(Debug, Deserialize)]
struct ExecuteReply {
    #[serde(default)]
    ok: Option<Map<String, Value>>,
    #[serde(default)]
    err: Option<String>,
}

/// A plugin backed by a sidecar executable.
#[derive(Debug)]
pub struct SidecarPlugin {
    descriptor: Descriptor,
    artifact: PathBuf,
}

impl SidecarPlugin {
    /// Open an artifact: run its `describe` request and keep the reply.
    ///
    /// The descriptor's id is what the plugin claims to be; the caller is
    /// responsible for checking it against the expected id before
    /// registering.
    pub fn open(artifact: &Path) -> Result<Self> {
        let output = Command::new(artifact)
            .arg("describe")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::load_failed(format!(
                    "could not run plugin artifact {}",
                    artifact.display()
                ))
                .with_operation("sidecar::open")
                .set_source(e)
            })?;

        if !output.status.success() {
            return Err(Error::load_failed(format!(
                "plugin artifact {} exited with {} during describe",
                artifact.display(),
                output.status
            ))
            .with_operation("sidecar::open")
            .with_context("stderr", String::from_utf8_lossy(&output.stderr)));
        }

        let descriptor: Descriptor = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::load_failed(format!(
                "plugin artifact {} did not produce a valid descriptor",
                artifact.display()
            ))
            .with_operation("sidecar::open")
            .set_source(e)
        })?;

        if descriptor.id.trim().is_empty() {
            return Err(Error::load_failed(format!(
                "plugin artifact {} reports an empty id",
                artifact.display()
            ))
            .with_operation("sidecar::open"));
        }

        Ok(Self {
            descriptor,
            artifact: artifact.to_path_buf(),
        })
    }

    /// Where the artifact lives on disk.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }
}

#[async_trait]
impl Plugin for SidecarPlugin {
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    fn example(&self) -> String {
        self.descriptor.example.clone()
    }

    async fn execute(&self, payload: Map<String, Value>) -> Result<Map<String, Value>> {
        let encoded = serde_json::to_vec(&Value::Object(payload)).map_err(|e| {
            Error::serialization_failed("could not encode plugin payload").set_source(e)
        })?;

        // The runtime is sequential by design; blocking on the child here
        // matches the execution model.
        let mut child = Command::new(&self.artifact)
            .arg("execute")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::new(
                    ErrorKind::PluginFailed,
                    format!("could not spawn plugin {}", self.descriptor.id),
                )
                .with_operation("sidecar::execute")
                .set_source(e)
            })?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                Error::new(ErrorKind::PluginFailed, "plugin stdin was not captured")
                    .with_operation("sidecar::execute")
            })?;
            stdin.write_all(&encoded).map_err(|e| {
                Error::new(
                    ErrorKind::PluginFailed,
                    format!("could not write payload to plugin {}", self.descriptor.id),
                )
                .with_operation("sidecar::execute")
                .set_source(e)
            })?;
            // Dropping stdin closes the pipe so the child sees end of input.
        }

        let output = child.wait_with_output().map_err(|e| {
            Error::new(
                ErrorKind::PluginFailed,
                format!("plugin {} did not finish", self.descriptor.id),
            )
            .with_operation("sidecar::execute")
            .set_source(e)
        })?;

        if !output.status.success() {
            return Err(Error::new(
                ErrorKind::PluginFailed,
                format!(
                    "plugin {} exited with {}",
                    self.descriptor.id, output.status
                ),
            )
            .with_operation("sidecar::execute")
            .with_context("stderr", String::from_utf8_lossy(&output.stderr)));
        }

        let reply: ExecuteReply = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::new(
                ErrorKind::PluginFailed,
                format!("plugin {} produced an invalid reply", self.descriptor.id),
            )
            .with_operation("sidecar::execute")
            .set_source(e)
        })?;

        if let Some(message) = reply.err {
            return Err(Error::new(ErrorKind::PluginFailed, message)
                .with_operation("sidecar::execute")
                .with_context("plugin", &self.descriptor.id));
        }

        reply.ok.ok_or_else(|| {
            Error::new(
                ErrorKind::PluginFailed,
                format!(
                    "plugin {} replied with neither output nor error",
                    self.descriptor.id
                ),
            )
            .with_operation("sidecar::execute")
        })
    }
}
