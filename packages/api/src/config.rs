use std::str::FromStr;
use std::time::Duration;

use duel_shared::models::game::GameSettings;
use duel_shared::services::game_engine::EngineConfig;
use duel_shared::services::oracle::openai::{DEFAULT_API_URL, DEFAULT_MODEL};
use duel_shared::services::oracle::{OpenAiConfig, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(String),
    Invalid { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Missing required environment variable {}", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    DynamoDb {
        games_table: String,
        turns_table: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub storage: StorageBackend,
    pub openai: OpenAiConfig,
    pub retry: RetryPolicy,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let storage = match get("STORAGE_BACKEND").as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("dynamodb") => StorageBackend::DynamoDb {
                games_table: require("GAMES_TABLE")?,
                turns_table: require("GAME_TURNS_TABLE")?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let openai = OpenAiConfig {
            api_url: get("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: require("OPENAI_API_KEY")?,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        let retry = RetryPolicy {
            max_attempts: parse_positive_or(&get, "ORACLE_MAX_ATTEMPTS", 3)?,
            call_timeout: Duration::from_secs(parse_or(&get, "ORACLE_TIMEOUT_SECS", 10)?),
            base_backoff: Duration::from_millis(parse_or(&get, "ORACLE_BACKOFF_MS", 500)?),
        };

        let defaults = GameSettings::default();
        let engine = EngineConfig {
            settings: GameSettings {
                max_turns_per_phase: parse_positive_or(
                    &get,
                    "MAX_TURNS_PER_PHASE",
                    defaults.max_turns_per_phase,
                )?,
                max_chars_per_message: parse_positive_or(
                    &get,
                    "MAX_CHARS_PER_MESSAGE",
                    defaults.max_chars_per_message,
                )?,
            },
            transition_countdown: Duration::from_secs(parse_or(&get, "TRANSITION_COUNTDOWN_SECS", 5)?),
            include_defense_summary: parse_flag(&get, "INCLUDE_DEFENSE_SUMMARY")?,
        };

        Ok(AppConfig {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            storage,
            openai,
            retry,
            engine,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}

/// Like `parse_or`, but zero is rejected.
fn parse_positive_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq + ToString,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse_flag<G>(get: &G, key: &str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}
