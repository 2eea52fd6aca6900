//! OpenAI-compatible completion client.
//!
//! Speaks the `/chat/completions` shape, which most hosted and local
//! endpoints accept; the base URL comes from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use toolsmith_error::{Error, Result};

use super::{ChatMessage, CompletionClient};
use crate::config::RuntimeConfig;

/// Completion client for OpenAI-compatible endpoints.
#[derive(Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client from runtime configuration.
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        if config.api_key().is_empty() {
            return Err(Error::config_invalid(
                "no API key configured; set TOOLSMITH_API_KEY or OPENAI_API_KEY",
            ));
        }
        Ok(Self::from_parts(
            config.api_key(),
            config.api_base(),
            config.model(),
        ))
    }

    /// Build a client from explicit parts.
    pub fn from_parts(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: api_base.into(),
            model: model.into(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::inference_failed("completion request failed")
                    .with_operation("client::complete")
                    .with_context("model", &self.model)
                    .set_source(e)
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::rate_limited("completion endpoint rate limited the request")
                .with_operation("client::complete")
                .with_context("model", &self.model));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Error::inference_failed(format!(
                "completion endpoint returned {}: {}",
                status, body
            ))
            .with_operation("client::complete")
            .with_context("model", &self.model);
            // Client-side mistakes will not fix themselves on retry.
            return Err(if status.is_server_error() {
                err
            } else {
                err.permanent()
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            Error::inference_failed("could not decode completion response")
                .with_operation("client::complete")
                .set_source(e)
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                Error::inference_failed("completion response contained no content")
                    .with_operation("client::complete")
            })
    }
}
