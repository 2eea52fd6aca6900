//! # Command Parser
//!
//! Consumes the lexer's token stream and splits a model response into
//! residual chat text and an ordered list of embedded commands.
//!
//! A command occupies one line: `/id args... { body }`, where the balanced
//! brace body may also follow on subsequent lines and spans newlines
//! verbatim. Commands keep their encounter order. Chat text collapses runs
//! of blank lines and is trimmed at both ends.
//!
//! Inputs that assign `args` or `body` twice to one command do not fit the
//! grammar; parsing returns a `GrammarViolation` error and the whole
//! response should be discarded (and usually retried) by the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use toolsmith_error::{Error, Result};

use crate::lexer::{lex, Token, TokenKind};

/// One embedded command, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// The command id, leading slash included (e.g. `/memory`)
    pub command: String,
    /// Trimmed argument text from the command line
    pub args: String,
    /// Verbatim balanced-brace body, braces included; empty if absent
    pub body: String,
}

impl fmt::Display for ParsedCommand {
    /// Reconstructs the command roughly as the model wrote it; used when
    /// echoing a failed or executed command back into the conversation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args)?;
        }
        if !self.body.is_empty() {
            write!(f, "\n{}", self.body)?;
        }
        Ok(())
    }
}

/// The parsed form of one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Residual chat text, blank runs collapsed, trimmed
    pub chat: String,
    /// Embedded commands in encounter order
    pub commands: Vec<ParsedCommand>,
}

/// Parse raw model text.
pub fn parse(input: &str) -> Result<ParseResult> {
    parse_tokens(lex(input))
}

/// Parse an already-lexed token stream.
pub fn parse_tokens(tokens: Vec<Token>) -> Result<ParseResult> {
    let mut chat = String::new();
    let mut commands: Vec<ParsedCommand> = Vec::new();
    // The command opened on the current line, if any.
    let mut active: Option<usize> = None;
    // Set from the first Command token until plain chat text resumes; a
    // Body on the line after a command line still attaches to that command.
    let mut in_command_context = false;

    for token in tokens {
        match token.kind {
            TokenKind::Plaintext => match active {
                None => {
                    chat.push_str(&token.value);
                    in_command_context = false;
                }
                Some(index) => {
                    let command = &mut commands[index];
                    if !command.args.is_empty() {
                        return Err(violation("command already has args", &command.command));
                    }
                    command.args = token.value.trim().to_string();
                }
            },

            TokenKind::Newline => {
                // A newline ends the command line but not the command
                // context: a body may still follow on the next line.
                if active.take().is_some() {
                    continue;
                }
                // Collapse runs of blank lines to a single blank line.
                if chat.ends_with("\n\n") {
                    continue;
                }
                chat.push_str(&token.value);
            }

            TokenKind::Command => {
                // Appended immediately so argument- and body-less commands
                // still show up in the output.
                commands.push(ParsedCommand {
                    command: token.value,
                    ..ParsedCommand::default()
                });
                active = Some(commands.len() - 1);
                in_command_context = true;
            }

            TokenKind::Body => {
                let target = match active {
                    Some(index) => Some(index),
                    None if in_command_context => commands.len().checked_sub(1),
                    None => None,
                };
                match target {
                    Some(index) => {
                        let command = &mut commands[index];
                        if !command.body.is_empty() {
                            return Err(violation("command already has a body", &command.command));
                        }
                        command.body = token.value;
                    }
                    None => chat.push_str(&token.value),
                }
            }
        }
    }

    Ok(ParseResult {
        chat: chat.trim().to_string(),
        commands,
    })
}

fn violation(message: &str, command: &str) -> Error {
    Error::grammar_violation(message)
        .with_operation("parser::parse_tokens")
        .with_context("command", command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolsmith_error::ErrorKind;

    struct Case {
        name: &'static str,
        input: &'static str,
        chat: &'static str,
        commands: Vec<ParsedCommand>,
    }

    fn command(command: &str, args: &str, body: &str) -> ParsedCommand {
        ParsedCommand {
            command: command.to_string(),
            args: args.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_table() {
        let cases = vec![
            Case {
                name: "basic command",
                input: "/api get /path",
                chat: "",
                commands: vec![command("/api", "get /path", "")],
            },
            Case {
                name: "command with inline body",
                input: "/api get /path { something }",
                chat: "",
                commands: vec![command("/api", "get /path", "{ something }")],
            },
            Case {
                name: "command with multiline body on the same line",
                input: "/api get /path {\n\tsomething\n}",
                chat: "",
                commands: vec![command("/api", "get /path", "{\n\tsomething\n}")],
            },
            Case {
                name: "command with body on the following line",
                input: "/api get /path\n{\n\tsomething\n}",
                chat: "",
                commands: vec![command("/api", "get /path", "{\n\tsomething\n}")],
            },
            Case {
                name: "chat before a command",
                input: "This is some chat\n\n/api get /path\n{\n\tsomething\n}",
                chat: "This is some chat",
                commands: vec![command("/api", "get /path", "{\n\tsomething\n}")],
            },
            Case {
                name: "chat interleaved with two commands",
                input: "This is some chat\n\n/api get /path\n{\n\tsomething\n}\n\nThis is some more chat\n\n/api post /another-path\n{\n\tsomething else\n}",
                chat: "This is some chat\n\nThis is some more chat",
                commands: vec![
                    command("/api", "get /path", "{\n\tsomething\n}"),
                    command("/api", "post /another-path", "{\n\tsomething else\n}"),
                ],
            },
            Case {
                name: "source code body",
                input: "/plugin create my-plugin\n{\n\tfn id() -> &'static str {\n\t\t\"my-plugin\"\n\t}\n}",
                chat: "",
                commands: vec![command(
                    "/plugin",
                    "create my-plugin",
                    "{\n\tfn id() -> &'static str {\n\t\t\"my-plugin\"\n\t}\n}",
                )],
            },
        ];

        for case in cases {
            let result = parse(case.input).unwrap_or_else(|e| {
                panic!("case '{}' failed to parse: {:?}", case.name, e)
            });
            assert_eq!(result.chat, case.chat, "chat mismatch in '{}'", case.name);
            assert_eq!(
                result.commands, case.commands,
                "commands mismatch in '{}'",
                case.name
            );
        }
    }

    #[test]
    fn test_chat_only_text_is_trimmed_and_collapsed() {
        let result = parse("  hello there  ").unwrap();
        assert_eq!(result.chat, "hello there");
        assert!(result.commands.is_empty());
    }

    #[test]
    fn test_blank_line_runs_collapse_to_one_blank_line() {
        // Three or more consecutive newlines collapse to exactly two.
        let result = parse("first\n\n\n\n\nsecond").unwrap();
        assert_eq!(result.chat, "first\n\nsecond");
    }

    #[test]
    fn test_commands_keep_encounter_order() {
        let result = parse("/first one\n/second two").unwrap();
        assert_eq!(result.commands.len(), 2);
        assert_eq!(result.commands[0].command, "/first");
        assert_eq!(result.commands[1].command, "/second");
    }

    #[test]
    fn test_bare_command_still_appears() {
        let result = parse("/help").unwrap();
        assert_eq!(result.commands, vec![command("/help", "", "")]);
        assert_eq!(result.chat, "");
    }

    #[test]
    fn test_body_with_nested_braces_is_one_string() {
        let result = parse("/api x { a { b } c }").unwrap();
        assert_eq!(result.commands[0].body, "{ a { b } c }");
    }

    #[test]
    fn test_body_separated_by_blank_line_still_attaches() {
        // The command context survives newlines until plain chat resumes.
        let result = parse("/api get\n\n{ body }").unwrap();
        assert_eq!(result.commands[0].body, "{ body }");
    }

    #[test]
    fn test_body_without_command_lands_in_chat() {
        let result = parse("look at this\n{ not a body for anyone }").unwrap();
        assert_eq!(result.chat, "look at this\n{ not a body for anyone }");
        assert!(result.commands.is_empty());
    }

    #[test]
    fn test_duplicate_args_is_a_grammar_violation() {
        // A second plaintext run on the command line after a body would
        // re-assign args.
        let err = parse("/api first { b } second").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GrammarViolation);
    }

    #[test]
    fn test_duplicate_body_is_a_grammar_violation() {
        let err = parse("/api x { one }\n{ two }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GrammarViolation);
    }

    #[test]
    fn test_display_reconstructs_the_command() {
        let cmd = command("/api", "get /path", "{\n\tsomething\n}");
        assert_eq!(cmd.to_string(), "/api get /path\n{\n\tsomething\n}");

        let bare = command("/help", "", "");
        assert_eq!(bare.to_string(), "/help");
    }
}
