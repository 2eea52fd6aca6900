//! The `/plugin` module - the forge that turns submitted source into a
//! registered sidecar plugin.
//!
//! `create` walks a strict pipeline: validate, persist, operator gate,
//! out-of-process compile, load and verify, register. Validation runs
//! before anything touches the filesystem, and the gate runs before the
//! compiler, so a blocked or malformed submission leaves no executable
//! behind.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use toolsmith_error::{Error, ErrorKind, Result};

use crate::config::RuntimeConfig;
use crate::module::{Module, ModuleRegistry};
use crate::plugin::{Plugin, PluginModule, SidecarPlugin};
use crate::terminal::Terminal;

/// Name of the binary the generated build scaffold produces.
const SCAFFOLD_BIN: &str = "plugin";

/// The token the operator must type to let a compile proceed.
const CONFIRM_TOKEN: &str = "confirm";

/// The `/plugin` module.
pub struct PluginForge {
    config: Mutex<RuntimeConfig>,
    terminal: Arc<dyn Terminal>,
    // Weak because the registry owns this module; upgraded per request.
    registry: Weak<ModuleRegistry>,
}

impl PluginForge {
    pub fn new(
        config: RuntimeConfig,
        terminal: Arc<dyn Terminal>,
        registry: &Arc<ModuleRegistry>,
    ) -> Self {
        Self {
            config: Mutex::new(config),
            terminal,
            registry: Arc::downgrade(registry),
        }
    }

    fn registry(&self) -> Result<Arc<ModuleRegistry>> {
        self.registry.upgrade().ok_or_else(|| {
            Error::unexpected("module registry is gone").with_operation("forge::registry")
        })
    }

    /// `/plugin create <plugin-id> { <source> }`
    async fn create(&self, id: &str, body: &str) -> Result<String> {
        let config = self.config.lock().clone();
        let registry = self.registry()?;

        // 1. Validate - nothing on disk changes until this passes.
        let source = validate_submission(id, body)?;
        let id = id.trim();
        if registry.is_registered(id) {
            return Err(Error::registry_collision(id)
                .with_operation("forge::create")
                .with_context("hint", "a plugin with this id already exists"));
        }

        // 2. Persist the source verbatim.
        let source_path = persist_source(&config.plugin_source_dir(), id, source)?;

        // 3. Operator gate.
        if config.is_supervised_mode() {
            let answer = self.terminal.read_line(&gate_prompt(&source_path));
            if answer.trim() != CONFIRM_TOKEN {
                return Err(Error::operator_blocked()
                    .with_operation("forge::create")
                    .with_context("plugin", id));
            }
        }

        // 4. Compile out-of-process.
        let build_dir = config.plugin_build_dir().join(id);
        scaffold_build(&build_dir, source)?;
        compile(&build_dir, id)?;

        // 5. Install the artifact, then load and verify it.
        let artifact = install_artifact(&build_dir, &config.plugin_bin_dir(), id)?;
        let plugin = SidecarPlugin::open(&artifact)?;
        if plugin.id() != id {
            return Err(Error::load_failed(format!(
                "the compiled plugin reports id '{}', but it was created as '{}'; \
                 id() must return the id given to '/plugin create'",
                plugin.id(),
                id
            ))
            .with_operation("forge::verify"));
        }

        // 6. Register. A collision that appeared since validation still
        // aborts here.
        registry.register(Arc::new(PluginModule::new(Arc::new(plugin))))?;

        Ok("Great! Your plugin has been compiled and loaded successfully.\n\n\
            Why don't you check the /help command to see if your new plugin is available."
            .to_string())
    }
}

#[async_trait]
impl Module for PluginForge {
    fn id(&self) -> &str {
        "plugin"
    }

    fn usage(&self) -> String {
        PLUGIN_USAGE.to_string()
    }

    async fn execute(&self, args: &str, body: &str) -> Result<String> {
        let (subcommand, rest) = match args.split_once(' ') {
            Some((subcommand, rest)) => (subcommand, rest),
            None => (args, ""),
        };

        match subcommand {
            "create" => self.create(rest, body).await,
            other => Err(Error::new(
                ErrorKind::UnknownCommand,
                format!("subcommand not implemented: /plugin {}", other),
            )
            .with_operation("forge::execute")),
        }
    }

    fn update_config(&self, config: &RuntimeConfig) {
        *self.config.lock() = config.clone();
    }
}

/// Check the submission shape and return the source inside the braces.
fn validate_submission<'a>(id: &str, body: &'a str) -> Result<&'a str> {
    let body = body.trim();
    if body.is_empty() {
        return Err(Error::invalid_submission("plugin source not found")
            .with_operation("forge::validate"));
    }
    if !body.starts_with('{') || !body.ends_with('}') || body.len() < 2 {
        return Err(Error::invalid_submission(
            "plugin source must be between {} in the '/plugin create <plugin-id> {}' command",
        )
        .with_operation("forge::validate"));
    }

    let id = id.trim();
    if id.is_empty() {
        return Err(
            Error::invalid_submission("plugin id is invalid").with_operation("forge::validate")
        );
    }
    // The id becomes a directory and file name.
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::invalid_submission(
            "plugin id may only contain letters, digits, '-' and '_'",
        )
        .with_operation("forge::validate")
        .with_context("id", id));
    }

    let source = &body[1..body.len() - 1];
    Ok(source)
}

/// Write the submitted source verbatim under the per-id source tree.
fn persist_source(source_root: &Path, id: &str, source: &str) -> Result<PathBuf> {
    let dir = source_root.join(id);
    std::fs::create_dir_all(&dir).map_err(|e| {
        Error::from(e)
            .with_operation("forge::persist")
            .with_context("dir", dir.display().to_string())
    })?;

    let path = dir.join("plugin.rs");
    std::fs::write(&path, source).map_err(|e| {
        Error::from(e)
            .with_operation("forge::persist")
            .with_context("path", path.display().to_string())
    })?;

    Ok(path)
}

/// Generate the Cargo project the external compiler runs against.
fn scaffold_build(build_dir: &Path, source: &str) -> Result<()> {
    let src_dir = build_dir.join("src");
    std::fs::create_dir_all(&src_dir).map_err(|e| {
        Error::from(e)
            .with_operation("forge::scaffold")
            .with_context("dir", src_dir.display().to_string())
    })?;

    std::fs::write(build_dir.join("Cargo.toml"), SCAFFOLD_MANIFEST)
        .map_err(|e| Error::from(e).with_operation("forge::scaffold"))?;

    let mut main = String::with_capacity(source.len() + SIDECAR_HARNESS.len() + 2);
    main.push_str(source);
    main.push_str("\n\n");
    main.push_str(SIDECAR_HARNESS);
    std::fs::write(src_dir.join("main.rs"), main)
        .map_err(|e| Error::from(e).with_operation("forge::scaffold"))?;

    Ok(())
}

/// Run the external build tool; a nonzero exit surfaces its raw output.
fn compile(build_dir: &Path, id: &str) -> Result<()> {
    let output = Command::new("cargo")
        .arg("build")
        .arg("--release")
        .current_dir(build_dir)
        .env("CARGO_TERM_COLOR", "never")
        .output()
        .map_err(|e| {
            Error::from(e)
                .with_operation("forge::compile")
                .with_context("tool", "cargo")
        })?;

    if !output.status.success() {
        let mut raw = String::from_utf8_lossy(&output.stdout).into_owned();
        raw.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(Error::compile_failed(raw)
            .with_operation("forge::compile")
            .with_context("plugin", id));
    }

    Ok(())
}

/// Copy the built binary into the scanned artifact directory.
fn install_artifact(build_dir: &Path, bin_dir: &Path, id: &str) -> Result<PathBuf> {
    let built = build_dir
        .join("target")
        .join("release")
        .join(format!("{}{}", SCAFFOLD_BIN, std::env::consts::EXE_SUFFIX));

    std::fs::create_dir_all(bin_dir).map_err(|e| {
        Error::from(e)
            .with_operation("forge::install")
            .with_context("dir", bin_dir.display().to_string())
    })?;

    let artifact = bin_dir.join(id);
    std::fs::copy(&built, &artifact).map_err(|e| {
        Error::from(e)
            .with_operation("forge::install")
            .with_context("from", built.display().to_string())
            .with_context("to", artifact.display().to_string())
    })?;

    Ok(artifact)
}

fn gate_prompt(source_path: &Path) -> String {
    format!(
        "============================================================\n\
         \n\
         WARNING: agent-written plugins are untrusted code.\n\
         \n\
         You should review this code before allowing it to be compiled and executed.\n\
         If you allow this action, the agent is able to execute code with the same\n\
         permissions as your user. This is potentially dangerous.\n\
         \n\
         The source code the agent has written can be found here:\n\
         {}\n\
         \n\
         Enter '{}' to confirm, anything else will block:",
        source_path.display(),
        CONFIRM_TOKEN
    )
}

/// Manifest for the generated build scaffold. The empty `[workspace]`
/// table keeps the scaffold out of any workspace enclosing the data dir.
const SCAFFOLD_MANIFEST: &str = r#"[package]
name = "toolsmith-plugin"
version = "0.0.0"
edition = "2021"
publish = false

[[bin]]
name = "plugin"
path = "src/main.rs"

[dependencies]
serde_json = "1"

[workspace]
"#;

/// Entry point appended to the submitted source; implements the sidecar
/// wire protocol around the three functions the source must define.
const SIDECAR_HARNESS: &str = r#"// ---- generated sidecar harness ----
fn main() {
    let request = std::env::args().nth(1).unwrap_or_default();
    match request.as_str() {
        "describe" => {
            let reply = serde_json::json!({ "id": id(), "example": example() });
            println!("{}", reply);
        }
        "execute" => {
            let mut raw = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut raw)
                .expect("read stdin");
            let payload: serde_json::Map<String, serde_json::Value> = if raw.trim().is_empty() {
                serde_json::Map::new()
            } else {
                match serde_json::from_str(&raw) {
                    Ok(payload) => payload,
                    Err(e) => {
                        println!("{}", serde_json::json!({ "err": format!("invalid payload: {}", e) }));
                        return;
                    }
                }
            };
            match execute(payload) {
                Ok(output) => println!("{}", serde_json::json!({ "ok": output })),
                Err(e) => println!("{}", serde_json::json!({ "err": e })),
            }
        }
        other => {
            eprintln!("unknown request: {}", other);
            std::process::exit(2);
        }
    }
}
"#;

const PLUGIN_USAGE: &str = r#"You can add new plugins which you can call using a slash command.

They're written in Rust as a single source file which is compiled into a standalone tool. Your source must define these three functions:

```
fn id() -> &'static str
fn example() -> String
fn execute(input: serde_json::Map<String, serde_json::Value>)
    -> Result<serde_json::Map<String, serde_json::Value>, String>
```

The only external crate available is serde_json. You don't need to write a main function or any other supporting code; the runtime generates the wiring around your three functions.

Here's the full source for the "add-one" plugin you can use to guide your output:

```
fn id() -> &'static str {
    "add-one"
}

fn example() -> String {
    "/add-one {\n\t\"value\": 5\n}".to_string()
}

fn execute(
    input: serde_json::Map<String, serde_json::Value>,
) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    let value = input
        .get("value")
        .and_then(|v| v.as_i64())
        .ok_or("expected a numeric 'value' field")?;

    let mut output = serde_json::Map::new();
    output.insert("result".to_string(), serde_json::json!(value + 1));
    Ok(output)
}
```

The input to execute is decoded from the JSON body of your command, so use appropriate data types. The id() your source reports must equal the <plugin-id> you give to the create command.

It's best if the plugins you create don't have any external dependencies. You can call external programs if you want to, but you should avoid anything which requires authentication since you won't have the required access.

To create a plugin, use the "/plugin create <plugin-id> {}" command, for example:

```
/plugin create add-one {
	fn id() -> &'static str {
		"add-one"
	}

	// the rest of your plugin source here
}
```

Your code inside the '/plugin create' body must be valid Rust which compiles without any errors. Do not include quotes or attempt to use a JSON body."#;
