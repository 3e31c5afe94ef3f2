use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scheduler::Pacing;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// The server runs its four AI players one after another and gives each
/// model call up to 60 s, then waits 5 s before tallying votes.
pub const DEFAULT_AI_REQUEST_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Runtime settings for the client binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Applied to quick requests: state polls, votes, chat.
    pub request_timeout: Duration,
    /// Applied to requests that wait on the server's AI players.
    pub ai_request_timeout: Duration,
    pub poll_interval: Duration,
    /// Multiplier over the reference pacing delays.
    pub pacing_scale: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            ai_request_timeout: Duration::from_millis(DEFAULT_AI_REQUEST_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            pacing_scale: 1.0,
        }
    }
}

impl ClientConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let api_base_url = lookup("MAFIA_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.api_base_url);
        let request_timeout = millis_var(&lookup, "MAFIA_REQUEST_TIMEOUT_MS")?
            .unwrap_or(defaults.request_timeout);
        let ai_request_timeout = millis_var(&lookup, "MAFIA_AI_REQUEST_TIMEOUT_MS")?
            .unwrap_or(defaults.ai_request_timeout);
        let poll_interval =
            millis_var(&lookup, "MAFIA_POLL_INTERVAL_MS")?.unwrap_or(defaults.poll_interval);
        let pacing_scale = match lookup("MAFIA_PACING_SCALE") {
            Some(raw) => parse_scale("MAFIA_PACING_SCALE", &raw)?,
            None => defaults.pacing_scale,
        };

        Ok(Self {
            api_base_url,
            request_timeout,
            ai_request_timeout,
            poll_interval,
            pacing_scale,
        })
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::default().scaled(self.pacing_scale)
    }
}

fn millis_var<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let ms = raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidVar {
        var,
        detail: format!("expected milliseconds, got '{raw}': {e}"),
    })?;
    if ms == 0 {
        return Err(ConfigError::InvalidVar {
            var,
            detail: "must be greater than zero".to_string(),
        });
    }
    Ok(Some(Duration::from_millis(ms)))
}

pub(crate) fn parse_scale(var: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let scale = raw.trim().parse::<f64>().map_err(|e| ConfigError::InvalidVar {
        var,
        detail: format!("expected a number, got '{raw}': {e}"),
    })?;
    if !scale.is_finite() || scale < 0.0 {
        return Err(ConfigError::InvalidVar {
            var,
            detail: format!("must be a non-negative number, got {scale}"),
        });
    }
    Ok(scale)
}
