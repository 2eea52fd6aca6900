//! # Memory Module
//!
//! A working long-term memory for the agent: `/memory store` appends an
//! entry to a flat JSON-backed log, `/memory recall` asks the completion
//! client to match a free-text query against everything stored so far.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use toolsmith_error::{Error, ErrorKind, Result};

use crate::module::Module;
use crate::provider::{ChatMessage, CompletionClient};

/// One remembered fact, with the date it was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub date_stored: String,
    pub memory: String,
}

/// The `/memory` module.
pub struct MemoryModule {
    path: PathBuf,
    entries: Mutex<Vec<MemoryEntry>>,
    client: Arc<dyn CompletionClient>,
}

impl MemoryModule {
    /// Open the memory log at `path`, creating an empty one lazily if the
    /// file does not exist yet.
    pub fn open(path: impl Into<PathBuf>, client: Arc<dyn CompletionClient>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| Error::from(e).with_operation("memory::open"))?;
            serde_json::from_str(&raw).map_err(|e| {
                Error::serialization_failed("memory log is not valid JSON")
                    .with_operation("memory::open")
                    .with_context("path", path.display().to_string())
                    .set_source(e)
            })?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            client,
        })
    }

    fn append(&self, entry: MemoryEntry) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.push(entry);
        let raw = serde_json::to_string_pretty(&*entries).map_err(|e| {
            Error::serialization_failed("could not encode memory log").set_source(e)
        })?;
        std::fs::write(&self.path, raw)
            .map_err(|e| Error::from(e).with_operation("memory::append"))?;
        Ok(())
    }

    async fn store(&self, input: &str) -> Result<String> {
        self.append(MemoryEntry {
            date_stored: chrono::Local::now()
                .format("%d %B %Y, %I:%M%P")
                .to_string(),
            memory: input.to_string(),
        })?;

        Ok(format!(
            "You have successfully stored this memory:\n\n```\n{}\n```",
            input
        ))
    }

    async fn recall(&self, query: &str) -> Result<String> {
        let memories = {
            let entries = self.entries.lock();
            serde_json::to_string(&*entries).map_err(|e| {
                Error::serialization_failed("could not encode memory log").set_source(e)
            })?
        };

        let messages = vec![
            ChatMessage::system(
                "You are a helpful assistant.\n\n\
                 I'll give you a list of existing memories, and a prompt which asks you to \
                 identify the memory I'm looking for.\n\n\
                 You should review the listed memories and suggest which memories might match \
                 the request.",
            ),
            ChatMessage::system(format!(
                "Here are your memories in JSON format:\n\n```\n{}\n```",
                memories
            )),
            ChatMessage::system(format!(
                "Help me find any memories which may match this request:\n\n```\n{}\n```",
                query
            )),
        ];

        let response = self.client.complete(&messages).await?;

        Ok(format!(
            "You have successfully recalled this memory:\n\n```\n{}\n```",
            response
        ))
    }
}

#[async_trait]
impl Module for MemoryModule {
    fn id(&self) -> &str {
        "memory"
    }

    fn usage(&self) -> String {
        MEMORY_USAGE.to_string()
    }

    async fn execute(&self, args: &str, body: &str) -> Result<String> {
        match args {
            "store" => self.store(body).await,
            "recall" => self.recall(body).await,
            other => Err(Error::new(
                ErrorKind::UnknownCommand,
                format!("subcommand not implemented: /memory {}", other),
            )
            .with_operation("memory::execute")),
        }
    }
}

const MEMORY_USAGE: &str = r#"You also have a working long term memory.

You can remember something using the '/memory store' command, or you can recall it using the '/memory recall' command.

For example, if you want to store a fact I give you, you might reply with a message such as:

```
/memory store {
	"memory": "I bought cookies yesterday",
	"context": "The user was discussing what they'd eaten"
}
```

You should always include useful context in the memory to help with recall later.

Later, you may try to recall this memory. You only need to use related concepts, for example:

```
/memory recall {
	When did I buy cookies?
}
```

You should always consult your long term memory using the '/memory recall' command if you think I'm asking about something you don't have information about.

If I give you information that you don't already know, you must store this information in your memory. If you're unsure, you should store it just in case.

You must not remember the current date. The current date changes and is not a useful memory."#;

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct StubClient {
        reply: String,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl StubClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.requests.lock().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn log_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("memories.json")
    }

    #[tokio::test]
    async fn test_store_appends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let client = StubClient::new("");
        let module = MemoryModule::open(log_path(&dir), client.clone()).unwrap();

        let reply = module
            .execute("store", "{ \"memory\": \"the sky is blue\" }")
            .await
            .unwrap();
        assert!(reply.contains("the sky is blue"));

        // A fresh module instance sees the persisted entry.
        let reopened = MemoryModule::open(log_path(&dir), client).unwrap();
        let entries = reopened.entries.lock();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].memory.contains("the sky is blue"));
        assert!(!entries[0].date_stored.is_empty());
    }

    #[tokio::test]
    async fn test_recall_sends_memories_and_query_to_the_client() {
        let dir = tempfile::tempdir().unwrap();
        let client = StubClient::new("You bought cookies on Tuesday");
        let module = MemoryModule::open(log_path(&dir), client.clone()).unwrap();

        module
            .execute("store", "{ I bought cookies }")
            .await
            .unwrap();
        let reply = module
            .execute("recall", "{ When did I buy cookies? }")
            .await
            .unwrap();

        assert!(reply.contains("You bought cookies on Tuesday"));

        let requests = client.requests.lock();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert!(sent.iter().any(|m| m.content.contains("I bought cookies")));
        assert!(sent
            .iter()
            .any(|m| m.content.contains("When did I buy cookies?")));
    }

    #[tokio::test]
    async fn test_unknown_subcommand() {
        let dir = tempfile::tempdir().unwrap();
        let module = MemoryModule::open(log_path(&dir), StubClient::new("")).unwrap();

        let err = module.execute("forget", "").await.unwrap_err();
        assert!(err.message().contains("/memory forget"));
    }

    #[test]
    fn test_missing_log_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let module = MemoryModule::open(log_path(&dir), StubClient::new("")).unwrap();
        assert!(module.entries.lock().is_empty());
    }
}
