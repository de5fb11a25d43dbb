use anyhow::{bail, Context, Result};
use chrono::Duration;

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Application configuration loaded from environment variables.
///
/// Nothing here is secret: the OpenAI key is supplied per session by the user.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_url: String,
    pub session_idle_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),
            session_idle_ttl: parse_idle_ttl(
                &std::env::var("SESSION_IDLE_TTL_SECS").unwrap_or_else(|_| "3600".to_string()),
            )?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Idle session lifetime: a positive number of seconds that fits a `chrono::Duration`.
fn parse_idle_ttl(raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .context("SESSION_IDLE_TTL_SECS must be a positive whole number of seconds")?;
    if secs == 0 {
        bail!("SESSION_IDLE_TTL_SECS must be greater than zero");
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .context("SESSION_IDLE_TTL_SECS is out of range")
}

#[cfg(test)]
impl Config {
    /// Config pointing at a local mock endpoint.
    pub fn for_tests(openai_api_url: &str) -> Self {
        Config {
            openai_api_url: openai_api_url.to_string(),
            session_idle_ttl: Duration::seconds(3600),
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
