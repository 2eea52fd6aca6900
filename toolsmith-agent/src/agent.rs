//! The agent orchestrator - drives one conversation turn at a time.
//!
//! A turn: send the conversation to the completion client (retrying rate
//! limits), parse the response into chat plus commands, dispatch each
//! command strictly in encounter order, and thread every command result
//! back into the conversation as a system message so the model can react -
//! or self-correct - on the next turn.

use std::sync::Arc;
use std::time::Duration;

use toolsmith_core::{
    parse, ChatMessage, CommandResult, CompletionClient, ModuleRegistry, ParsedCommand,
};
use toolsmith_error::{ErrorKind, Result};

use crate::conversation::Conversation;
use crate::prompts;

/// How many times a rate-limited completion is attempted before giving up.
const MAX_RATE_LIMIT_ATTEMPTS: usize = 5;

/// How often (in turns) the interval prompt is injected.
const INTERVAL_PROMPT_EVERY: usize = 5;

/// One dispatched command and what came back.
#[derive(Debug)]
pub struct CommandExecution {
    pub command: ParsedCommand,
    pub result: CommandResult,
}

/// What one turn produced.
#[derive(Debug)]
pub struct TurnReport {
    /// The raw model response, for debug display
    pub raw: String,
    /// Residual chat text for the user
    pub chat: String,
    /// Commands executed, in encounter order
    pub executions: Vec<CommandExecution>,
}

impl TurnReport {
    /// Whether the model called any commands this turn. If it did, the
    /// loop should respond again without waiting for user input, so the
    /// model sees its command output.
    pub fn executed_commands(&self) -> bool {
        !self.executions.is_empty()
    }
}

/// The agent orchestrator.
pub struct Agent {
    client: Arc<dyn CompletionClient>,
    registry: Arc<ModuleRegistry>,
    conversation: Conversation,
    turns: usize,
}

impl Agent {
    /// Create an agent with a freshly seeded conversation.
    pub fn new(client: Arc<dyn CompletionClient>, registry: Arc<ModuleRegistry>) -> Self {
        let mut agent = Self {
            client,
            registry,
            conversation: Conversation::new(),
            turns: 0,
        };
        agent.seed();
        agent
    }

    fn seed(&mut self) {
        self.conversation
            .append(ChatMessage::system(prompts::SYSTEM_PROMPT));
        self.conversation
            .append(ChatMessage::user(prompts::OPENING_PROMPT));
    }

    /// Forget the conversation and start over.
    pub fn reset(&mut self) {
        self.conversation.reset();
        self.turns = 0;
        self.seed();
    }

    /// The message log, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    /// Add a user message to the conversation.
    pub fn append_user(&mut self, input: &str) {
        self.conversation.append(ChatMessage::user(input));
    }

    /// Run one turn: complete, parse, dispatch, thread results back.
    ///
    /// A response that violates the command grammar is discarded - it does
    /// not stay in the conversation - and returned as an error so the
    /// caller can decide to retry.
    pub async fn respond(&mut self) -> Result<TurnReport> {
        self.turns += 1;
        if self.turns % INTERVAL_PROMPT_EVERY == 0 {
            self.conversation
                .append(ChatMessage::system(prompts::interval_prompt()));
        }

        let raw = self.complete_with_retry().await?;
        self.conversation.append(ChatMessage::assistant(&raw));

        let parsed = match parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.conversation.pop();
                return Err(e);
            }
        };

        let mut executions = Vec::with_capacity(parsed.commands.len());
        for command in parsed.commands {
            let result = self
                .registry
                .dispatch(&command.command, &command.args, &command.body)
                .await;

            let feedback = if result.is_error() {
                error_feedback(&command, &result)
            } else {
                success_feedback(&command, &result)
            };
            self.conversation.append(ChatMessage::system(feedback));

            executions.push(CommandExecution { command, result });
        }

        Ok(TurnReport {
            raw,
            chat: parsed.chat,
            executions,
        })
    }

    async fn complete_with_retry(&self) -> Result<String> {
        let mut attempts = 1;
        loop {
            match self.client.complete(self.conversation.messages()).await {
                Ok(text) => return Ok(text),
                Err(err) if err.kind() == ErrorKind::RateLimited => {
                    if attempts >= MAX_RATE_LIMIT_ATTEMPTS {
                        return Err(err.persist());
                    }
                    attempts += 1;
                    tracing::warn!(attempt = attempts, "rate limited, trying again in 1 second");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Told to the model when its command failed, with enough detail to
/// self-correct: the command as it wrote it plus the error text.
fn error_feedback(command: &ParsedCommand, result: &CommandResult) -> String {
    let error = result
        .error
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_default();

    let mut feedback = format!(
        "An error occurred executing your command.\n\n\
         The command was:\n```\n{}\n```\n\n\
         The error was:\n```\n{}\n```",
        command, error
    );

    if !result.prompt.is_empty() {
        feedback.push_str(&format!(
            "\n\nThe command provided this additional output:\n```\n{}\n```",
            result.prompt
        ));
    }

    feedback
}

fn success_feedback(command: &ParsedCommand, result: &CommandResult) -> String {
    format!(
        "Your command returned some output.\n\n\
         The command was:\n```\n{}\n```\n\n\
         The output was:\n\n{}",
        command, result.prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use toolsmith_core::{Module, Role};
    use toolsmith_error::Error;

    struct ScriptedClient {
        responses: Mutex<Vec<Result<String>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            self.responses
                .lock()
                .pop()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    struct EchoModule;

    #[async_trait]
    impl Module for EchoModule {
        fn id(&self) -> &str {
            "echo"
        }
        fn usage(&self) -> String {
            "usage for echo".to_string()
        }
        async fn execute(&self, args: &str, _body: &str) -> Result<String> {
            Ok(format!("echo says {}", args))
        }
    }

    fn registry_with_echo() -> Arc<ModuleRegistry> {
        let registry = Arc::new(ModuleRegistry::new());
        registry.register(Arc::new(EchoModule)).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_seeded_conversation() {
        let agent = Agent::new(ScriptedClient::new(vec![]), registry_with_echo());

        let messages = agent.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[tokio::test]
    async fn test_respond_returns_chat_only() {
        let client = ScriptedClient::new(vec![Ok("Hello there!".to_string())]);
        let mut agent = Agent::new(client, registry_with_echo());

        let report = agent.respond().await.unwrap();
        assert_eq!(report.chat, "Hello there!");
        assert!(!report.executed_commands());
    }

    #[tokio::test]
    async fn test_respond_dispatches_and_threads_feedback() {
        let client = ScriptedClient::new(vec![Ok("On it.\n\n/echo hello".to_string())]);
        let mut agent = Agent::new(client, registry_with_echo());

        let report = agent.respond().await.unwrap();
        assert_eq!(report.chat, "On it.");
        assert_eq!(report.executions.len(), 1);
        assert_eq!(report.executions[0].result.prompt, "echo says hello");

        // Feedback landed in the conversation: seeded 2 + assistant + system.
        let last = agent.messages().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.content.contains("/echo hello"));
        assert!(last.content.contains("echo says hello"));
    }

    #[tokio::test]
    async fn test_respond_reports_unknown_command_error() {
        let client = ScriptedClient::new(vec![Ok("/nonsense go".to_string())]);
        let mut agent = Agent::new(client, registry_with_echo());

        let report = agent.respond().await.unwrap();
        assert!(report.executions[0].result.is_error());

        let last = agent.messages().last().unwrap();
        assert!(last.content.contains("An error occurred"));
        assert!(last.content.contains("/nonsense go"));
        assert!(last.content.contains("unrecognized command"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_retried() {
        let client = ScriptedClient::new(vec![
            Err(Error::rate_limited("429")),
            Err(Error::rate_limited("429")),
            Ok("finally".to_string()),
        ]);
        let mut agent = Agent::new(client, registry_with_echo());

        let report = agent.respond().await.unwrap();
        assert_eq!(report.chat, "finally");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_after_max_attempts() {
        let responses = (0..MAX_RATE_LIMIT_ATTEMPTS + 1)
            .map(|_| Err(Error::rate_limited("429")))
            .collect();
        let mut agent = Agent::new(ScriptedClient::new(responses), registry_with_echo());

        let err = agent.respond().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(!err.is_retryable(), "exhausted retries must be persistent");
    }

    #[tokio::test]
    async fn test_grammar_violation_discards_the_response() {
        let client = ScriptedClient::new(vec![Ok("/echo a { b } c { d }".to_string())]);
        let mut agent = Agent::new(client, registry_with_echo());
        let before = agent.messages().len();

        let err = agent.respond().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GrammarViolation);
        // The malformed response must not linger in the history.
        assert_eq!(agent.messages().len(), before);
    }

    #[tokio::test]
    async fn test_interval_prompt_appears_every_fifth_turn() {
        let responses = (0..INTERVAL_PROMPT_EVERY)
            .map(|_| Ok("ok".to_string()))
            .collect();
        let mut agent = Agent::new(ScriptedClient::new(responses), registry_with_echo());

        for _ in 0..INTERVAL_PROMPT_EVERY {
            agent.respond().await.unwrap();
        }

        assert!(agent
            .messages()
            .iter()
            .any(|m| m.content.contains("current date and time")));
    }

    #[tokio::test]
    async fn test_reset_reseeds() {
        let client = ScriptedClient::new(vec![Ok("hi".to_string())]);
        let mut agent = Agent::new(client, registry_with_echo());
        agent.append_user("hello");
        agent.respond().await.unwrap();
        assert!(agent.messages().len() > 2);

        agent.reset();
        assert_eq!(agent.messages().len(), 2);
    }
}
