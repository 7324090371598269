use std::time::Duration;

use anyhow::{Context, Result};

use crate::layout::FontFamily;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every variable has a default; a missing `ANTHROPIC_API_KEY` only disables
/// the AI endpoints.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub anthropic_api_key: Option<String>,
    /// Override for the Messages API endpoint, e.g. a proxy.
    pub anthropic_api_url: Option<String>,
    pub ai_timeout: Duration,
    /// Delay before a rasterized export takes its capture.
    pub raster_settle: Duration,
    pub resume_font: FontFamily,
    /// Largest accepted decoded upload, in bytes.
    pub max_upload_bytes: usize,
    /// A session untouched this long is dropped by the idle reaper.
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            anthropic_api_url: optional_env("ANTHROPIC_API_URL"),
            ai_timeout: Duration::from_secs(parse_env("AI_TIMEOUT_SECS", 60u64)?),
            raster_settle: Duration::from_millis(parse_env("RASTER_SETTLE_MS", 300u64)?),
            resume_font: std::env::var("RESUME_FONT")
                .ok()
                .map(|v| v.parse::<FontFamily>())
                .transpose()
                .map_err(anyhow::Error::msg)
                .context("RESUME_FONT must be 'times' or 'helvetica'")?
                .unwrap_or(FontFamily::Times),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            session_idle: Duration::from_secs(parse_env("SESSION_IDLE_SECS", 3600u64)?),
        })
    }

    /// Request body limit: a base64 data URL of the largest upload plus JSON overhead.
    pub fn body_limit_bytes(&self) -> usize {
        self.max_upload_bytes / 3 * 4 + 64 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            anthropic_api_key: None,
            anthropic_api_url: None,
            ai_timeout: Duration::from_secs(60),
            raster_settle: Duration::from_millis(300),
            resume_font: FontFamily::Times,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_idle: Duration::from_secs(3600),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limit_covers_base64_upload() {
        let config = Config::default();
        assert!(config.body_limit_bytes() > config.max_upload_bytes * 4 / 3);
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u64 = parse_env("RESUME_FORGE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
