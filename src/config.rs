use std::time::Duration;

use teloxide::types::UserId;
use thiserror::Error;

const DEFAULT_DB_PATH: &str = "db.sqlite";
const DEFAULT_POLL_SPACING_MS: u64 = 1000;
const DEFAULT_MAX_FILE_BYTES: u32 = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// The only user allowed to talk to the bot.
    pub owner_id: UserId,
    pub db_path: String,
    pub poll_spacing: Duration,
    pub max_file_bytes: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .or_else(|| lookup("TELOXIDE_TOKEN"))
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let owner_id = lookup("BOT_OWNER_ID").ok_or(ConfigError::Missing("BOT_OWNER_ID"))?;
        let owner_id = UserId(parse_number("BOT_OWNER_ID", &owner_id)?);

        let db_path = lookup("QUIZ_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let poll_spacing = match lookup("POLL_SPACING_MS") {
            Some(value) => Duration::from_millis(parse_number("POLL_SPACING_MS", &value)?),
            None => Duration::from_millis(DEFAULT_POLL_SPACING_MS),
        };

        let max_file_bytes = match lookup("MAX_FILE_BYTES") {
            Some(value) => parse_number("MAX_FILE_BYTES", &value)?,
            None => DEFAULT_MAX_FILE_BYTES,
        };

        Ok(Self {
            bot_token,
            owner_id,
            db_path,
            poll_spacing,
            max_file_bytes,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
