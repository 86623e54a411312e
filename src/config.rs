use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::ChatId;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// DeepSeek API key for chat completions.
    deepseek_api_key: String,
    /// Tavily API key for web-search grounding. Empty disables search.
    #[serde(default)]
    tavily_api_key: String,
    /// Override for the completion API base URL.
    llm_base_url: Option<String>,
    /// How many logged lines go into each prompt (5-150).
    #[serde(default = "default_context_window")]
    context_window: usize,
    /// Per-line character budget when rendering history into a prompt.
    #[serde(default = "default_line_budget")]
    history_line_chars: usize,
    #[serde(default = "default_true")]
    rate_limit_enabled: bool,
    #[serde(default = "default_cooldown_secs")]
    rate_limit_cooldown_secs: u64,
    /// Violations within the cooldown before the bot answers with a throttle notice.
    #[serde(default = "default_violation_threshold")]
    rate_limit_violations: u32,
    /// Chat that receives operator log mirroring.
    log_chat_id: Option<i64>,
    /// Directory for state files (database, logs). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_context_window() -> usize {
    25
}

fn default_line_budget() -> usize {
    120
}

fn default_true() -> bool {
    true
}

fn default_cooldown_secs() -> u64 {
    8
}

fn default_violation_threshold() -> u32 {
    3
}

pub struct Config {
    pub telegram_bot_token: String,
    pub deepseek_api_key: String,
    pub tavily_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub context_window: usize,
    pub history_line_chars: usize,
    pub rate_limit_enabled: bool,
    pub rate_limit_cooldown_secs: u64,
    pub rate_limit_violations: u32,
    pub log_chat_id: Option<ChatId>,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.deepseek_api_key.is_empty() {
            return Err(ConfigError::Validation("deepseek_api_key is required".into()));
        }

        if !(5..=150).contains(&file.context_window) {
            return Err(ConfigError::Validation(format!(
                "context_window must be between 5 and 150, got {}",
                file.context_window
            )));
        }
        if file.history_line_chars == 0 {
            return Err(ConfigError::Validation("history_line_chars must be positive".into()));
        }
        if file.rate_limit_cooldown_secs == 0 || file.rate_limit_violations == 0 {
            return Err(ConfigError::Validation(
                "rate_limit_cooldown_secs and rate_limit_violations must be positive".into(),
            ));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let tavily_api_key = if file.tavily_api_key.is_empty() {
            None
        } else {
            Some(file.tavily_api_key)
        };

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            deepseek_api_key: file.deepseek_api_key,
            tavily_api_key,
            llm_base_url: file.llm_base_url,
            context_window: file.context_window,
            history_line_chars: file.history_line_chars,
            rate_limit_enabled: file.rate_limit_enabled,
            rate_limit_cooldown_secs: file.rate_limit_cooldown_secs,
            rate_limit_violations: file.rate_limit_violations,
            log_chat_id: file.log_chat_id.map(ChatId),
            data_dir,
        })
    }
}
