//! Blocking client for Mistral-style completion endpoints
//!
//! One call per attempt, no conversation history. Configured agents go through
//! `/agents/completions`; a bare model name goes through `/chat/completions`.

use crate::config::{AgentTarget, Settings};
use crate::data::Completion;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response contained no choices")]
    NoChoices,
    #[error("Response message has no text content")]
    NoContent,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [Message<'a>; 1],
}

impl<'a> CompletionRequest<'a> {
    fn new(target: &'a AgentTarget, query: &'a str) -> Self {
        let (agent_id, model) = match target {
            AgentTarget::Agent(id) => (Some(id.as_str()), None),
            AgentTarget::Model(name) => (None, Some(name.as_str())),
        };
        Self {
            agent_id,
            model,
            messages: [Message {
                role: "user",
                content: query,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<serde_json::Value>,
}

/// Agent client for Mistral API interactions
pub struct MistralAgentClient {
    http: Client,
    api_key: String,
    target: AgentTarget,
    api_base: String,
}

impl MistralAgentClient {
    /// Creates a client from loaded settings
    pub fn new(settings: &Settings) -> Result<Self, AgentClientError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(AgentClientError::Build)?;

        Ok(Self::from_parts(
            http,
            settings.api_key.clone(),
            settings.target.clone(),
            settings.api_base.clone(),
        ))
    }

    /// Creates a client around an already configured HTTP client
    pub fn from_parts(
        http: Client,
        api_key: impl Into<String>,
        target: AgentTarget,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            target,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        match self.target {
            AgentTarget::Agent(_) => format!("{}/agents/completions", self.api_base),
            AgentTarget::Model(_) => format!("{}/chat/completions", self.api_base),
        }
    }

    /// Sends `query` and returns the first choice's text, surfacing every failure
    pub fn request(&self, query: &str) -> Result<String, AgentClientError> {
        let body = CompletionRequest::new(&self.target, query);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(AgentClientError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        tracing::debug!("Full Response: {}", text);

        let parsed: CompletionResponse = serde_json::from_str(&text)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(AgentClientError::NoChoices)?;

        choice
            .message
            .content
            .and_then(content_text)
            .ok_or(AgentClientError::NoContent)
    }
}

impl Completion for MistralAgentClient {
    fn complete(&self, query: &str) -> Option<String> {
        tracing::info!("User query: {}", query);

        match self.request(query) {
            Ok(content) => {
                tracing::info!("Response Content: {}", content);
                Some(content)
            }
            Err(e) => {
                tracing::warn!("Request failed: {}. Please check your request.", e);
                None
            }
        }
    }
}

/// Message content is either a plain string or a list of typed chunks
fn content_text(content: serde_json::Value) -> Option<String> {
    match content {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(chunks) => {
            let text: String = chunks
                .iter()
                .filter_map(|chunk| chunk.get("text").and_then(|t| t.as_str()))
                .collect();
            if text.is_empty() { None } else { Some(text) }
        }
        _ => None,
    }
}
