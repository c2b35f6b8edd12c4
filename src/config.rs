//! Process settings loaded from the environment
//!
//! Values come from the process environment after an optional `.env` file has been
//! merged in by dotenvy. Everything except the credential and the agent target has a
//! default.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_LANGUAGE: &str = "JavaScript";
pub const DEFAULT_INTERPRETER: &str = "node";
pub const DEFAULT_EXTENSION: &str = "js";
pub const DEFAULT_FORMAT: &str = "fenced";
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 30;

const API_KEY: &str = "MISTRAL_API_KEY";
const AGENT_ID: &str = "AGENT_ID";
const MODEL: &str = "AGENTGEN_MODEL";
const API_BASE: &str = "AGENTGEN_API_BASE";
const LANGUAGE: &str = "AGENTGEN_LANGUAGE";
const INTERPRETER: &str = "AGENTGEN_INTERPRETER";
const EXTENSION: &str = "AGENTGEN_EXTENSION";
const FORMAT: &str = "AGENTGEN_FORMAT";
const MAX_RETRIES: &str = "AGENTGEN_MAX_RETRIES";
const EXEC_TIMEOUT: &str = "AGENTGEN_EXEC_TIMEOUT_SECS";
const REQUEST_TIMEOUT: &str = "AGENTGEN_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("Neither AGENT_ID nor AGENTGEN_MODEL is set; one of them selects the remote agent")]
    NoTarget,
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

/// What the completion request is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentTarget {
    /// A pre-configured agent, called through the agents endpoint
    Agent(String),
    /// A plain model, called through the chat completions endpoint
    Model(String),
}

impl fmt::Display for AgentTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AgentTarget::Agent(id) => write!(f, "agent {}", id),
            AgentTarget::Model(name) => write!(f, "model {}", name),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub target: AgentTarget,
    pub api_base: String,
    pub language: String,
    pub interpreter: String,
    pub extension: String,
    pub format: String,
    pub max_retries: usize,
    pub exec_timeout: Duration,
    pub request_timeout: Option<Duration>,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment
    pub fn load() -> Result<Self, SettingsError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(API_KEY).ok_or(SettingsError::Missing(API_KEY))?;

        let target = match (get(AGENT_ID), get(MODEL)) {
            (Some(id), _) => AgentTarget::Agent(id),
            (None, Some(model)) => AgentTarget::Model(model),
            (None, None) => return Err(SettingsError::NoTarget),
        };

        let max_retries = match get(MAX_RETRIES) {
            Some(raw) => parse_positive(MAX_RETRIES, &raw)? as usize,
            None => DEFAULT_MAX_RETRIES,
        };

        let exec_timeout = match get(EXEC_TIMEOUT) {
            Some(raw) => parse_positive(EXEC_TIMEOUT, &raw)?,
            None => DEFAULT_EXEC_TIMEOUT_SECS,
        };

        let request_timeout = get(REQUEST_TIMEOUT)
            .map(|raw| parse_positive(REQUEST_TIMEOUT, &raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            api_key,
            target,
            api_base: get(API_BASE)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            language: get(LANGUAGE).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            interpreter: get(INTERPRETER).unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            extension: get(EXTENSION)
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            format: get(FORMAT).unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            max_retries,
            exec_timeout: Duration::from_secs(exec_timeout),
            request_timeout,
        })
    }
}

// The credential never shows up in logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("target", &self.target)
            .field("api_base", &self.api_base)
            .field("language", &self.language)
            .field("interpreter", &self.interpreter)
            .field("extension", &self.extension)
            .field("format", &self.format)
            .field("max_retries", &self.max_retries)
            .field("exec_timeout", &self.exec_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, SettingsError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SettingsError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}
