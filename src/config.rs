//! Server configuration from the environment

use crate::llm::LlmConfig;
use crate::state_machine::state::DEFAULT_INITIAL_QUESTION;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} in env var {key}")]
    Invalid { key: String, value: String },
    #[error("env var {0} must be greater than zero")]
    Zero(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL of the inference backend; the relay posts to `<url>/inference`
    pub backend_url: String,
    pub gateway_timeout: Duration,
    /// Sessions with no stream attached are closed after this long untouched
    pub session_idle: Duration,
    pub initial_question: String,
    pub llm: LlmConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_env(&lookup, "QA_PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_env(&lookup, "QA_GATEWAY_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Zero("QA_GATEWAY_TIMEOUT_SECS".to_string()));
        }
        let idle_secs = parse_env(&lookup, "QA_SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;
        if idle_secs == 0 {
            return Err(ConfigError::Zero("QA_SESSION_IDLE_SECS".to_string()));
        }

        Ok(Self {
            port,
            backend_url: lookup("QA_BACKEND_URL")
                .map_or_else(|| DEFAULT_BACKEND_URL.to_string(), |v| v.trim().to_string()),
            gateway_timeout: Duration::from_secs(timeout_secs),
            session_idle: Duration::from_secs(idle_secs),
            initial_question: lookup("QA_INITIAL_QUESTION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INITIAL_QUESTION.to_string()),
            llm: LlmConfig::from_lookup(&lookup),
        })
    }

    /// Endpoint the follow-up gateway posts to
    pub fn inference_endpoint(&self) -> String {
        format!("{}/inference", self.backend_url.trim_end_matches('/'))
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
