//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HEARTBEAT_SECS: u64 = domain::realtime::HEARTBEAT_INTERVAL_SECS;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Project base URL, without trailing slash.
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
    /// Where verification emails send the user back to.
    pub email_redirect_to: Option<String>,
    pub timeouts: Timeouts,
    pub heartbeat_secs: u64,
    /// Restores a session at startup when set.
    pub refresh_token: Option<String>,
}

impl ClientConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `MURMUR_EMAIL_REDIRECT_TO`: sign-up verification redirect
    /// - `MURMUR_REQUEST_TIMEOUT_SECS`: default 30
    /// - `MURMUR_CONNECT_TIMEOUT_SECS`: default 10
    /// - `MURMUR_HEARTBEAT_SECS`: default 25
    /// - `MURMUR_REFRESH_TOKEN`: session to restore at startup
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the URL is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase_url = required("SUPABASE_URL")?.trim_end_matches('/').to_owned();
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid { var: "SUPABASE_URL", value: supabase_url });
        }
        let anon_key = required("SUPABASE_ANON_KEY")?;
        let timeouts = Timeouts {
            request_secs: env_parse_u64("MURMUR_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("MURMUR_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let heartbeat_secs = env_parse_u64("MURMUR_HEARTBEAT_SECS", DEFAULT_HEARTBEAT_SECS).max(1);

        Ok(Self {
            supabase_url,
            anon_key,
            email_redirect_to: optional("MURMUR_EMAIL_REDIRECT_TO"),
            timeouts,
            heartbeat_secs,
            refresh_token: optional("MURMUR_REFRESH_TOKEN"),
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::Missing { var })
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
