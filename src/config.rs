//! Runtime configuration
//!
//! Values come from the process environment (after `.env` is loaded by the
//! binaries). Every setting has a default except the Gemini API key.

use crate::chunker::{QueryChunker, DEFAULT_CHUNK_SIZE};
use crate::error::PipelineError;
use crate::gemini::DEFAULT_BASE_URL;
use crate::memory::{HistoryConfig, SummaryLimits, SummaryTruncation, DEFAULT_HISTORY_WINDOW};
use crate::session::SessionLimits;
use crate::Result;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chunk_size: usize,
    pub history: HistoryConfig,
    pub sessions: SessionLimits,
    pub gemini_api_key: Option<String>,
    /// Explicit model; when unset the first available preferred model is used
    pub gemini_model: Option<String>,
    pub gemini_base_url: String,
    pub gemini_timeout: Duration,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            history: HistoryConfig::default(),
            sessions: SessionLimits::default(),
            gemini_api_key: None,
            gemini_model: None,
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            gemini_timeout: Duration::from_secs(60),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Read configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(&vars, key);

        let chunk_size = parse_or(get("CHUNK_SIZE"), "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        // Rejects a zero chunk size up front
        QueryChunker::new(chunk_size)?;

        let truncation = match get("SUMMARY_TRUNCATION") {
            Some(raw) => SummaryTruncation::parse(raw).ok_or_else(|| {
                PipelineError::ConfigError(format!(
                    "SUMMARY_TRUNCATION must be 'legacy' or 'words', got '{}'",
                    raw
                ))
            })?,
            None => SummaryTruncation::default(),
        };

        let summary_defaults = SummaryLimits::default();
        let history = HistoryConfig {
            window: parse_or(get("HISTORY_WINDOW"), "HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW)?,
            summary: SummaryLimits {
                word_cap: parse_or(
                    get("SUMMARY_WORD_CAP"),
                    "SUMMARY_WORD_CAP",
                    summary_defaults.word_cap,
                )?,
                keep_chars: parse_or(
                    get("SUMMARY_CHAR_KEEP"),
                    "SUMMARY_CHAR_KEEP",
                    summary_defaults.keep_chars,
                )?,
                truncation,
            },
        };

        let idle_secs = parse_or(
            get("SESSION_IDLE_SECS"),
            "SESSION_IDLE_SECS",
            defaults.sessions.idle_timeout.as_secs(),
        )?;
        let max_sessions = parse_or(
            get("MAX_SESSIONS"),
            "MAX_SESSIONS",
            defaults.sessions.max_sessions,
        )?;
        if max_sessions == 0 {
            return Err(PipelineError::ConfigError(
                "MAX_SESSIONS must be greater than zero".to_string(),
            ));
        }

        let timeout_secs = parse_or(
            get("GEMINI_TIMEOUT_SECS"),
            "GEMINI_TIMEOUT_SECS",
            defaults.gemini_timeout.as_secs(),
        )?;

        let port = match get("PORT") {
            Some(raw) => parse_value(raw, "PORT")?,
            None => parse_or(get("API_PORT"), "API_PORT", defaults.port)?,
        };

        Ok(Self {
            chunk_size,
            history,
            sessions: SessionLimits {
                idle_timeout: Duration::from_secs(idle_secs),
                max_sessions,
            },
            gemini_api_key: get("GEMINI_API_KEY")
                .or_else(|| get("GOOGLE_API_KEY"))
                .map(str::to_string),
            gemini_model: get("GEMINI_MODEL").map(str::to_string),
            gemini_base_url: get("GEMINI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_base_url),
            gemini_timeout: Duration::from_secs(timeout_secs),
            port,
        })
    }

    pub fn chunker(&self) -> Result<QueryChunker> {
        QueryChunker::new(self.chunk_size)
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(raw: Option<&str>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(value) => parse_value(value, key),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        PipelineError::ConfigError(format!("{} has an invalid value: '{}'", key, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(HashMap::new()).unwrap();

        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.history.window, 3);
        assert_eq!(config.history.summary.word_cap, 200);
        assert_eq!(config.history.summary.keep_chars, 200);
        assert_eq!(
            config.history.summary.truncation,
            SummaryTruncation::LegacyTrailingChars
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.sessions.idle_timeout, Duration::from_secs(1800));
        assert_eq!(config.sessions.max_sessions, 1000);
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_vars(vars(&[
            ("CHUNK_SIZE", "128"),
            ("HISTORY_WINDOW", "5"),
            ("SUMMARY_TRUNCATION", "words"),
            ("GOOGLE_API_KEY", "key-123"),
            ("GEMINI_BASE_URL", "http://localhost:9000/v1beta/"),
            ("API_PORT", "9090"),
            ("SESSION_IDLE_SECS", "120"),
            ("MAX_SESSIONS", "50"),
        ]))
        .unwrap();

        assert_eq!(config.sessions.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.sessions.max_sessions, 50);

        assert_eq!(config.chunk_size, 128);
        assert_eq!(config.history.window, 5);
        assert_eq!(config.history.summary.truncation, SummaryTruncation::TrailingWords);
        assert_eq!(config.gemini_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.gemini_base_url, "http://localhost:9000/v1beta");
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_port_takes_precedence() {
        let config =
            AppConfig::from_vars(vars(&[("PORT", "3000"), ("API_PORT", "9090")])).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let result = AppConfig::from_vars(vars(&[("CHUNK_SIZE", "0")]));
        assert!(matches!(result, Err(PipelineError::ChunkingError(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AppConfig::from_vars(vars(&[("HISTORY_WINDOW", "three")])),
            Err(PipelineError::ConfigError(_))
        ));
        assert!(matches!(
            AppConfig::from_vars(vars(&[("SUMMARY_TRUNCATION", "tokens")])),
            Err(PipelineError::ConfigError(_))
        ));
        assert!(matches!(
            AppConfig::from_vars(vars(&[("MAX_SESSIONS", "0")])),
            Err(PipelineError::ConfigError(_))
        ));
    }
}
