//! Client-side slash commands.
//!
//! These are handled locally and never reach the model: controlling the
//! client (/exit, /retry, /reset), toggling modes (/debug, /supervisor),
//! and canned demonstration prompts (/example). An unrecognized slash
//! command falls through and is sent to the model as ordinary chat.

use crate::ui;

/// What a locally handled command asks the chat loop to do.
pub enum LocalAction {
    /// Output was printed; prompt the user again
    Handled,
    /// Quit the client
    Exit,
    /// Resend the conversation as-is
    Retry,
    /// Forget the conversation and start over
    Reset,
    /// Flip debug mode
    ToggleDebug,
    /// Flip supervised mode
    ToggleSupervised,
    /// Send this canned prompt to the model
    Prompt(String),
}

const LOCAL_COMMANDS: &[(&str, &str)] = &[
    ("exit", "quit the client"),
    ("retry", "resend the most recent conversation"),
    ("reset", "forget the conversation history"),
    ("debug", "toggle debug mode"),
    ("supervisor", "toggle supervised mode"),
    ("example", "show or send a demonstration prompt"),
];

struct Example {
    id: &'static str,
    prompt: &'static str,
}

const EXAMPLES: &[Example] = &[
    Example {
        id: "1",
        prompt: "I want you to generate 5 random numbers and add them together.",
    },
    Example {
        id: "2",
        prompt: "I want you to generate 5 random numbers. Multiply the first and second number, then add the result to the remaining numbers.",
    },
    Example {
        id: "3",
        prompt: "I want you to generate 2 random numbers. Add them together then multiply the result by -1.",
    },
    Example {
        id: "4",
        prompt: "Can you summarise the tools you have available?",
    },
    Example {
        id: "5",
        prompt: "Can you suggest a task which might somehow use all of the available tools?",
    },
];

/// Try to handle `input` as a client-side command. `None` means the input
/// is ordinary chat (including unrecognized slash commands).
pub fn parse_local_command(input: &str) -> Option<LocalAction> {
    let input = input.strip_prefix('/')?;

    if input == "help" {
        return Some(help());
    }

    let (command, args) = match input.split_once(' ') {
        Some((command, args)) => (command, args),
        None => (input, ""),
    };

    match command {
        "exit" => Some(LocalAction::Exit),
        "retry" => Some(LocalAction::Retry),
        "reset" => Some(LocalAction::Reset),
        "debug" => Some(LocalAction::ToggleDebug),
        "supervisor" => Some(LocalAction::ToggleSupervised),
        "example" => Some(example(args)),
        _ => None,
    }
}

fn help() -> LocalAction {
    let mut listing = String::from("The following commands are available:\n");
    for (name, description) in LOCAL_COMMANDS {
        listing.push_str(&format!("\n    /{} - {}", name, description));
    }
    ui::print_chat(ui::APP, &listing);
    LocalAction::Handled
}

fn example(args: &str) -> LocalAction {
    for example in EXAMPLES {
        if example.id == args {
            return LocalAction::Prompt(example.prompt.to_string());
        }
    }

    let mut listing = String::from("The following examples are available:");
    for example in EXAMPLES {
        listing.push_str(&format!("\n\n/example {}\n        {}", example.id, example.prompt));
    }
    ui::print_chat(ui::APP, &listing);
    LocalAction::Handled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_slash_input_is_chat() {
        assert!(parse_local_command("hello there").is_none());
    }

    #[test]
    fn test_unrecognized_slash_command_is_chat() {
        // Unknown slash commands go to the model, which has its own set.
        assert!(parse_local_command("/memory store").is_none());
    }

    #[test]
    fn test_client_commands() {
        assert!(matches!(parse_local_command("/exit"), Some(LocalAction::Exit)));
        assert!(matches!(parse_local_command("/retry"), Some(LocalAction::Retry)));
        assert!(matches!(parse_local_command("/reset"), Some(LocalAction::Reset)));
        assert!(matches!(
            parse_local_command("/debug"),
            Some(LocalAction::ToggleDebug)
        ));
        assert!(matches!(
            parse_local_command("/supervisor"),
            Some(LocalAction::ToggleSupervised)
        ));
    }

    #[test]
    fn test_example_with_known_id_is_a_prompt() {
        match parse_local_command("/example 1") {
            Some(LocalAction::Prompt(prompt)) => {
                assert!(prompt.contains("5 random numbers"));
            }
            _ => panic!("expected a canned prompt"),
        }
    }

    #[test]
    fn test_example_without_id_lists_examples() {
        assert!(matches!(
            parse_local_command("/example"),
            Some(LocalAction::Handled)
        ));
    }
}
