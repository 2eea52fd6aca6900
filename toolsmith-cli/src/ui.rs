//! Terminal rendering and prompts.
//!
//! Chat output is speaker-tagged and colored per speaker; module and debug
//! traffic use a muted style so the conversation stays readable.

use console::style;
use toolsmith_core::Terminal;

pub const USER: &str = "USER";
pub const AI: &str = "AI";
pub const APP: &str = "APP";
pub const MODULE: &str = "MODULE";

fn indent(input: &str) -> String {
    input
        .lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the startup banner.
pub fn welcome(title: &str, message: &str) {
    println!("{}\n", style(title).green().bold());
    println!("{}\n", message);
}

/// Print a speaker-tagged chat message.
pub fn print_chat(speaker: &str, message: &str) {
    let tag = match speaker {
        USER => style(speaker).yellow(),
        AI => style(speaker).green(),
        APP => style(speaker).green().bold(),
        _ => style(speaker).red(),
    };
    println!("{}:\n\n{}\n", tag, indent(message));
}

/// Print a chat message only shown in debug mode.
pub fn print_chat_debug(speaker: &str, message: &str) {
    print!("{} ", style("[DEBUG]").dim());
    print_chat(speaker, message);
}

pub fn warn(message: &str) {
    println!("{} {}", style("WARNING:").yellow().bold(), message);
}

pub fn error(message: &str, err: &dyn std::fmt::Display) {
    println!("{} {}: {}\n", style("ERROR:").red().bold(), message, err);
}

/// Prompt the user for their next chat message.
pub fn prompt_chat_input() -> String {
    println!("{}:\n", style(USER).yellow());
    let line = dialoguer::Input::<String>::new()
        .with_prompt(" ")
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    println!();
    line.trim().to_string()
}

/// Ask a yes/no question.
pub fn prompt_confirm(prompt: &str) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// The interactive terminal handed to the core (the plugin forge blocks on
/// it for its operator gate).
pub struct TerminalPrompt;

impl Terminal for TerminalPrompt {
    fn read_line(&self, prompt: &str) -> String {
        println!("{}", prompt);
        dialoguer::Input::<String>::new()
            .with_prompt(">")
            .allow_empty(true)
            .interact_text()
            .map(|line| line.trim().to_string())
            .unwrap_or_default()
    }

    fn confirm(&self, prompt: &str) -> bool {
        prompt_confirm(prompt)
    }
}
