//! # Command Lexer
//!
//! Single forward pass over raw model text, producing a flat token stream
//! for the parser. The stream is finite and consumed once.
//!
//! Rules:
//! - `/` starts a Command token only at the start of input or of a line
//! - a space closes an open Command token
//! - `{` opens a Body token; nested braces are tracked with a counter and
//!   kept verbatim, newlines included, until the balancing `}`
//! - a `}` outside an open Body degrades to ordinary text (the asymmetry is
//!   deliberate and documented; see the parser module docs)
//! - `\n` outside a Body closes the open token and becomes a Newline token

use serde::{Deserialize, Serialize};

/// What a lexed token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Ordinary text
    Plaintext,
    /// A line break outside any body
    Newline,
    /// A slash command, leading slash included
    Command,
    /// A balanced brace block, braces included
    Body,
}

/// One lexed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Lex raw model text into a flat token sequence.
pub fn lex(input: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut current: Option<Token> = None;
    // Brace depth of the open Body token; reset whenever a new Body opens.
    let mut nesting: usize = 0;
    let mut prev: Option<char> = None;

    for c in input.chars() {
        let at_line_start = matches!(prev, None | Some('\n'));
        let open_kind = current.as_ref().map(|token| token.kind);

        match c {
            // A slash at the start of input or of a line opens a Command,
            // closing whatever token was open.
            '/' if at_line_start => {
                if let Some(token) = current.take() {
                    tokens.push(token);
                }
                current = Some(Token::new(TokenKind::Command, "/"));
            }
            '/' => {
                if let Some(token) = current.as_mut() {
                    token.value.push('/');
                } else {
                    current = Some(Token::new(TokenKind::Plaintext, "/"));
                }
            }

            // A space ends an open Command token; anywhere else it is text.
            ' ' => {
                if open_kind == Some(TokenKind::Command) {
                    if let Some(token) = current.take() {
                        tokens.push(token);
                    }
                } else if let Some(token) = current.as_mut() {
                    token.value.push(' ');
                } else {
                    current = Some(Token::new(TokenKind::Plaintext, " "));
                }
            }

            '{' => {
                if open_kind == Some(TokenKind::Body) {
                    nesting += 1;
                    if let Some(token) = current.as_mut() {
                        token.value.push('{');
                    }
                } else {
                    if let Some(token) = current.take() {
                        tokens.push(token);
                    }
                    current = Some(Token::new(TokenKind::Body, "{"));
                    nesting = 1;
                }
            }

            '}' => {
                if open_kind == Some(TokenKind::Body) {
                    nesting = nesting.saturating_sub(1);
                    if let Some(token) = current.as_mut() {
                        token.value.push('}');
                    }
                    if nesting == 0 {
                        if let Some(token) = current.take() {
                            tokens.push(token);
                        }
                    }
                } else if let Some(token) = current.as_mut() {
                    // Outside a body a closing brace is ordinary text.
                    token.value.push('}');
                } else {
                    current = Some(Token::new(TokenKind::Plaintext, "}"));
                }
            }

            '\n' => {
                if open_kind == Some(TokenKind::Body) {
                    // Bodies keep their newlines verbatim.
                    if let Some(token) = current.as_mut() {
                        token.value.push('\n');
                    }
                } else {
                    if let Some(token) = current.take() {
                        tokens.push(token);
                    }
                    tokens.push(Token::new(TokenKind::Newline, "\n"));
                }
            }

            _ => {
                if let Some(token) = current.as_mut() {
                    token.value.push(c);
                } else {
                    current = Some(Token::new(TokenKind::Plaintext, c));
                }
            }
        }

        prev = Some(c);
    }

    if let Some(token) = current {
        tokens.push(token);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_plain_text_is_one_token() {
        let tokens = lex("just some text");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Plaintext);
        assert_eq!(tokens[0].value, "just some text");
    }

    #[test]
    fn test_command_at_start_of_input() {
        let tokens = lex("/api get /path");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Command, TokenKind::Plaintext]
        );
        assert_eq!(tokens[0].value, "/api");
        // The second slash is mid-line, so it stays ordinary text.
        assert_eq!(tokens[1].value, "get /path");
    }

    #[test]
    fn test_command_after_newline() {
        let tokens = lex("chat\n/help");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Plaintext, TokenKind::Newline, TokenKind::Command]
        );
        assert_eq!(tokens[2].value, "/help");
    }

    #[test]
    fn test_mid_line_slash_is_text() {
        let tokens = lex("a/b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Plaintext);
        assert_eq!(tokens[0].value, "a/b");
    }

    #[test]
    fn test_body_keeps_nested_braces() {
        let tokens = lex("{ a { b } c }");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Body);
        assert_eq!(tokens[0].value, "{ a { b } c }");
    }

    #[test]
    fn test_body_keeps_newlines() {
        let tokens = lex("{\n\tsomething\n}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Body);
        assert_eq!(tokens[0].value, "{\n\tsomething\n}");
    }

    #[test]
    fn test_unmatched_closing_brace_degrades_to_text() {
        let tokens = lex("oops }");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Plaintext);
        assert_eq!(tokens[0].value, "oops }");
    }

    #[test]
    fn test_unmatched_closing_brace_at_start() {
        let tokens = lex("} after");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Plaintext);
        assert_eq!(tokens[0].value, "} after");
    }

    #[test]
    fn test_newline_flushes_and_is_its_own_token() {
        let tokens = lex("one\ntwo");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Plaintext, TokenKind::Newline, TokenKind::Plaintext]
        );
    }

    #[test]
    fn test_end_of_input_flushes_open_token() {
        let tokens = lex("/api");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Command);
        assert_eq!(tokens[0].value, "/api");
    }

    #[test]
    fn test_body_on_command_line() {
        let tokens = lex("/api get { x }");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Command, TokenKind::Plaintext, TokenKind::Body]
        );
        assert_eq!(tokens[1].value, "get ");
        assert_eq!(tokens[2].value, "{ x }");
    }
}
