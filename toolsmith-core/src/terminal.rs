//! Interactive terminal seam.
//!
//! The plugin forge blocks on an operator confirmation before compiling
//! agent-authored code; this trait is the narrow interface it talks through,
//! so the gate can be driven by a real terminal in the CLI and by a scripted
//! fake in tests.

/// Operator-facing terminal interaction.
pub trait Terminal: Send + Sync {
    /// Print the prompt and block until the operator enters a line.
    /// The returned line is trimmed.
    fn read_line(&self, prompt: &str) -> String;

    /// Print the prompt and block until the operator answers yes or no.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Scripted terminal for tests - pops pre-seeded answers in order.
#[cfg(test)]
pub mod scripted {
    use super::Terminal;
    use std::sync::Mutex;

    pub struct ScriptedTerminal {
        lines: Mutex<Vec<String>>,
        confirms: Mutex<Vec<bool>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedTerminal {
        pub fn new(lines: Vec<&str>, confirms: Vec<bool>) -> Self {
            Self {
                lines: Mutex::new(lines.into_iter().rev().map(String::from).collect()),
                confirms: Mutex::new(confirms.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Every prompt shown so far, in order.
        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl Terminal for ScriptedTerminal {
        fn read_line(&self, prompt: &str) -> String {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.lines.lock().unwrap().pop().unwrap_or_default()
        }

        fn confirm(&self, prompt: &str) -> bool {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.confirms.lock().unwrap().pop().unwrap_or(false)
        }
    }
}
