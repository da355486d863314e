use std::{env, fmt, time::Duration};

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";
pub const DEFAULT_RETRY_PERIOD: Duration = Duration::from_secs(600);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed configuration, read once at startup.
#[derive(Clone)]
pub struct Config {
    // Credentials
    pub practicum_token: String,
    pub telegram_token: String,
    pub chat_id: ChatId,

    // Review API
    pub endpoint: String,
    pub request_timeout: Duration,

    // Loop
    pub retry_period: Duration,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn load() -> Result<Self> {
        // Existing env always wins over `.env`.
        if let Some(e) = unexpected_dotenv_error(dotenvy::dotenv()) {
            tracing::warn!(error = %e, "ignoring unreadable .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let practicum_token = required(get("PRACTICUM_TOKEN"), "PRACTICUM_TOKEN")?;
        let telegram_token = required(get("TOKEN").or_else(|| get("TELEGRAM_TOKEN")), "TOKEN")?;

        let raw_chat_id = required(get("CHAT_ID").or_else(|| get("TELEGRAM_CHAT_ID")), "CHAT_ID")?;
        let chat_id = raw_chat_id
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| Error::Config(format!("CHAT_ID must be an integer, got {raw_chat_id:?}")))?;

        let endpoint = get("PRACTICUM_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let request_timeout = parse_secs(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let retry_period = parse_secs(get("RETRY_PERIOD_SECS"), "RETRY_PERIOD_SECS")?
            .unwrap_or(DEFAULT_RETRY_PERIOD);

        Ok(Self {
            practicum_token,
            telegram_token,
            chat_id,
            endpoint,
            request_timeout,
            retry_period,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("endpoint", &self.endpoint)
            .field("request_timeout", &self.request_timeout)
            .field("retry_period", &self.retry_period)
            .finish()
    }
}

/// A missing `.env` is normal; anything else is worth a warning.
fn unexpected_dotenv_error<T>(
    res: std::result::Result<T, dotenvy::Error>,
) -> Option<dotenvy::Error> {
    match res {
        Ok(_) => None,
        Err(e) if e.not_found() => None,
        Err(e) => Some(e),
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value.ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn parse_secs(value: Option<String>, key: &str) -> Result<Option<Duration>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(Error::Config(format!(
            "{key} must be a positive number of seconds, got {raw:?}"
        ))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
