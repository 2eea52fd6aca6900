//! # Toolsmith CLI
//!
//! Interactive chat client for the toolsmith agent.
//!
//! Usage:
//!   toolsmith                 start the chat client
//!   toolsmith --unsupervised  skip the plugin confirmation gate
//!   toolsmith --debug         echo raw exchanges with the model
//!   toolsmith parse [FILE]    dump the token stream and parse result

mod commands;
mod ui;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use toolsmith_agent::Agent;
use toolsmith_core::{
    discover_compiled, lex, memory::MemoryModule, parse, CompletionClient, ModuleRegistry,
    OpenAiClient, PluginForge, RuntimeConfig,
};
use toolsmith_error::ErrorKind;

use commands::{parse_local_command, LocalAction};

#[derive(Parser)]
#[command(name = "toolsmith")]
#[command(author, version, about = "A chat client whose agent forges its own tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Skip the operator confirmation gate before compiling agent-written plugins
    #[arg(long, global = true)]
    unsupervised: bool,

    /// Echo raw exchanges with the model
    #[arg(long, global = true)]
    debug: bool,

    /// Completion model override
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Data directory override (plugin trees and the memory log)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive chat client (the default)
    Chat,
    /// Lex and parse text, dumping the token stream and parse result
    Parse {
        /// File to read; stdin if omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Parse { ref file }) => run_parse(file.clone()),
        _ => run_chat(cli).await,
    }
}

/// Counterpart of the agent-facing parser: dump what the lexer and parser
/// see, for debugging command grammar issues.
fn run_parse(file: Option<PathBuf>) {
    let input = match file {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(input) => input,
            Err(e) => {
                ui::error(&format!("could not read {}", path.display()), &e);
                std::process::exit(1);
            }
        },
        None => {
            let mut input = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut input) {
                ui::error("could not read stdin", &e);
                std::process::exit(1);
            }
            input
        }
    };

    let tokens = lex(&input);
    println!("Tokens:");
    for token in &tokens {
        println!("    {:>10?} => {:?}", token.kind, token.value);
    }
    println!();

    match parse(&input) {
        Ok(result) => {
            println!("Result:");
            println!("    Chat:");
            for line in result.chat.lines() {
                println!("        {}", line);
            }
            println!("    Commands:");
            for command in &result.commands {
                println!("        - Command: {}", command.command);
                println!("          Args: {}", command.args);
                println!("          Body:");
                for line in command.body.lines() {
                    println!("              {}", line);
                }
            }
        }
        Err(e) => {
            ui::error("input does not fit the command grammar", &e);
            std::process::exit(1);
        }
    }
}

async fn run_chat(cli: Cli) {
    let mut config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            ui::error("invalid configuration", &e);
            std::process::exit(1);
        }
    };
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if cli.unsupervised {
        config = config.with_supervised_mode(false);
    }
    if cli.debug {
        config = config.with_debug_mode(true);
    }

    if let Err(e) = std::fs::create_dir_all(config.data_dir()) {
        ui::error(
            &format!("could not create data dir {}", config.data_dir().display()),
            &e,
        );
        std::process::exit(1);
    }

    let client: Arc<dyn CompletionClient> = match OpenAiClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            ui::error("invalid configuration", &e);
            std::process::exit(1);
        }
    };

    let registry = Arc::new(ModuleRegistry::new());
    let terminal = Arc::new(ui::TerminalPrompt);

    let memory = match MemoryModule::open(config.memory_path(), client.clone()) {
        Ok(memory) => memory,
        Err(e) => {
            ui::error("could not open the memory log", &e);
            std::process::exit(1);
        }
    };

    let forge = PluginForge::new(config.clone(), terminal, &registry);
    if let Err(e) = registry
        .register(Arc::new(memory))
        .and_then(|_| registry.register(Arc::new(forge)))
    {
        ui::error("could not register host modules", &e);
        std::process::exit(1);
    }

    let loaded = discover_compiled(&registry, &config.plugin_bin_dir());
    if loaded > 0 {
        tracing::info!(count = loaded, "loaded compiled plugins");
    }

    ui::welcome(
        "Welcome to toolsmith.",
        "You can talk directly to the model, or you can use /commands to interact with the client.\n\n\
         Use /help to see a list of available commands.",
    );

    chat_loop(config, client, registry).await;
}

async fn chat_loop(
    mut config: RuntimeConfig,
    client: Arc<dyn CompletionClient>,
    registry: Arc<ModuleRegistry>,
) {
    let mut agent = Agent::new(client, registry.clone());

    if config.is_debug_mode() {
        for message in agent.messages() {
            ui::print_chat_debug(ui::MODULE, &message.content);
        }
    } else {
        ui::print_chat(
            ui::APP,
            "Setting up the chat environment, please wait for the model to respond - this may take a few moments.",
        );
    }

    // The opening prompt is already queued, so the first turn runs without
    // asking the user for input.
    let mut skip_user_input = true;

    loop {
        if !skip_user_input {
            let input = ui::prompt_chat_input();
            if input.is_empty() {
                continue;
            }

            match parse_local_command(&input) {
                Some(LocalAction::Exit) => return,
                Some(LocalAction::Handled) => continue,
                Some(LocalAction::Reset) => {
                    agent.reset();
                    ui::print_chat(ui::APP, "Conversation reset.");
                    // Fall through and let the fresh opening prompt run.
                }
                Some(LocalAction::Retry) => {
                    // Fall through: respond again over the same history.
                }
                Some(LocalAction::ToggleDebug) => {
                    let next = !config.is_debug_mode();
                    config = config.with_debug_mode(next);
                    registry.broadcast_config(&config);
                    let state = if config.is_debug_mode() { "enabled" } else { "disabled" };
                    ui::print_chat(ui::APP, &format!("Debug mode is now {}", state));
                    continue;
                }
                Some(LocalAction::ToggleSupervised) => {
                    let next = !config.is_supervised_mode();
                    config = config.with_supervised_mode(next);
                    registry.broadcast_config(&config);
                    let state = if config.is_supervised_mode() { "enabled" } else { "disabled" };
                    ui::print_chat(ui::APP, &format!("Supervised mode is now {}", state));
                    continue;
                }
                Some(LocalAction::Prompt(prompt)) => {
                    ui::print_chat(ui::USER, &prompt);
                    agent.append_user(&prompt);
                }
                None => agent.append_user(&input),
            }
        }

        skip_user_input = false;

        match agent.respond().await {
            Ok(report) => {
                if config.is_debug_mode() {
                    ui::print_chat_debug(ui::AI, &report.raw);
                } else if !report.chat.is_empty() {
                    ui::print_chat(ui::AI, &report.chat);
                }

                if config.is_debug_mode() {
                    for execution in &report.executions {
                        let text = match &execution.result.error {
                            Some(error) => format!("{} -> error: {}", execution.command, error),
                            None => format!("{} -> {}", execution.command, execution.result.prompt),
                        };
                        ui::print_chat_debug(ui::MODULE, &text);
                    }
                }

                // Command output was threaded back into the conversation;
                // respond again so the model sees it.
                if report.executed_commands() {
                    skip_user_input = true;
                }
            }
            Err(e) if e.kind() == ErrorKind::GrammarViolation => {
                ui::warn(&format!(
                    "the response could not be parsed ({}); use /retry to ask again",
                    e
                ));
            }
            Err(e) => {
                ui::error("completion failed", &e);
                if ui::prompt_confirm("Would you like to try again?") {
                    skip_user_input = true;
                }
            }
        }
    }
}
