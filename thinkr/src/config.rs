//! Runtime configuration from CLI flags, environment, and `.env`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::session::ContextWindow;

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DATA_DIR: &str = "thinkr";
const STORE_FILE: &str = "chats.json";

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub db_path: PathBuf,
    pub context: ContextWindow,
    pub timeout: Duration,
}

/// Values given on the command line, which win over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db: Option<PathBuf>,
    pub model: Option<String>,
}

impl Config {
    /// Load `.env` (if present) and resolve from the process environment.
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::resolve(|key| std::env::var(key).ok(), overrides)
    }

    /// Resolve using `lookup` for environment values.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var(API_KEY_VAR).ok_or(ConfigError::MissingCredential(API_KEY_VAR))?;

        let db_path = match overrides.db.or_else(|| var("THINKR_DB").map(PathBuf::from)) {
            Some(path) => path,
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join(DATA_DIR)
                .join(STORE_FILE),
        };

        let defaults = ContextWindow::default();

        Ok(Self {
            api_key,
            api_url: var("THINKR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: overrides
                .model
                .or_else(|| var("THINKR_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or(
                "THINKR_TEMPERATURE",
                var("THINKR_TEMPERATURE"),
                DEFAULT_TEMPERATURE,
            )?,
            db_path,
            context: ContextWindow {
                max_chars: parse_or(
                    "THINKR_CONTEXT_CHARS",
                    var("THINKR_CONTEXT_CHARS"),
                    defaults.max_chars,
                )?,
                max_messages: parse_or(
                    "THINKR_CONTEXT_MESSAGES",
                    var("THINKR_CONTEXT_MESSAGES"),
                    defaults.max_messages,
                )?,
            },
            timeout: Duration::from_secs(parse_or(
                "THINKR_TIMEOUT_SECS",
                var("THINKR_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
