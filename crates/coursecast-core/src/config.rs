//! Environment-based configuration.
//!
//! The service is deployed with environment variables; the three upstream
//! identifiers are required and startup fails without them. Everything else
//! has a default.

use std::time::Duration;

use crate::error::{CastError, Result};

/// Which transport backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Browser-automation bridge with a file-backed session store.
    Local,
    /// Browser-automation bridge with a remote session store.
    Remote,
    /// Delegate sends to an external HTTP dispatch service.
    Relay,
}

impl std::str::FromStr for TransportMode {
    type Err = CastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "relay" => Ok(Self::Relay),
            other => Err(CastError::config(format!(
                "unknown TRANSPORT_MODE '{other}' (expected local|remote|relay)"
            ))),
        }
    }
}

/// Service configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Feed endpoint returning the JSON array of items (FETCH_API_URL).
    pub feed_url: String,
    /// External dispatch endpoint for relay mode (SEND_MESSAGE_ENDPOINT).
    pub send_endpoint: String,
    /// Target group identifier (GROUP_ID).
    pub group_id: String,
    /// WebSocket URL of the chat bridge (BRIDGE_URL).
    pub bridge_url: String,
    /// Remote session store base URL (SESSION_STORE_URL, remote mode only).
    pub session_store_url: Option<String>,
    /// Directory for the file-backed session store (SESSION_DIR).
    pub session_dir: String,
    pub transport_mode: TransportMode,
    /// Gateway listen port (PORT).
    pub port: u16,
    /// Delay between two item sends within a cycle (PACING_SECS).
    pub pacing: Duration,
    /// Delay between the end of one cycle and the start of the next (CADENCE_SECS).
    pub cadence: Duration,
    /// Delay before a reconnect attempt after a disconnect (RECONNECT_DELAY_SECS).
    pub reconnect_delay: Duration,
    /// Pause before a gateway-forwarded send, so link previews resolve
    /// (SEND_PREVIEW_DELAY_SECS).
    pub send_preview_delay: Duration,
}

impl Config {
    /// Load from process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an injectable lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CastError::MissingEnv(key.to_string()))
        };
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| CastError::config(format!("{key} must be an integer: '{raw}'"))),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let transport_mode = match lookup("TRANSPORT_MODE") {
            Some(raw) => raw.parse()?,
            None => TransportMode::Local,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| CastError::config(format!("PORT must be a port number: '{raw}'")))?,
            None => 3000,
        };

        let config = Self {
            feed_url: required("FETCH_API_URL")?,
            send_endpoint: required("SEND_MESSAGE_ENDPOINT")?,
            group_id: required("GROUP_ID")?,
            bridge_url: lookup("BRIDGE_URL").unwrap_or_else(|| "ws://127.0.0.1:8799".into()),
            session_store_url: lookup("SESSION_STORE_URL"),
            session_dir: lookup("SESSION_DIR").unwrap_or_else(|| ".coursecast/session".into()),
            transport_mode,
            port,
            pacing: secs("PACING_SECS", 90)?,
            cadence: secs("CADENCE_SECS", 90)?,
            reconnect_delay: secs("RECONNECT_DELAY_SECS", 5)?,
            send_preview_delay: secs("SEND_PREVIEW_DELAY_SECS", 5)?,
        };

        if config.transport_mode == TransportMode::Remote && config.session_store_url.is_none() {
            return Err(CastError::MissingEnv("SESSION_STORE_URL".into()));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("FETCH_API_URL", "http://feed.example/api"),
            ("SEND_MESSAGE_ENDPOINT", "http://dispatch.example/send"),
            ("GROUP_ID", "group-123@g.us"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.pacing, Duration::from_secs(90));
        assert_eq!(config.cadence, Duration::from_secs(90));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.transport_mode, TransportMode::Local);
    }

    #[test]
    fn test_missing_required_var_fails() {
        let mut env = base_env();
        env.remove("GROUP_ID");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, CastError::MissingEnv(ref k) if k == "GROUP_ID"));
    }

    #[test]
    fn test_remote_mode_requires_store_url() {
        let mut env = base_env();
        env.insert("TRANSPORT_MODE", "remote");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, CastError::MissingEnv(ref k) if k == "SESSION_STORE_URL"));

        env.insert("SESSION_STORE_URL", "http://kv.example/sessions");
        let config = load(&env).unwrap();
        assert_eq!(config.transport_mode, TransportMode::Remote);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let mut env = base_env();
        env.insert("TRANSPORT_MODE", "carrier-pigeon");
        assert!(matches!(load(&env), Err(CastError::Config(_))));
    }

    #[test]
    fn test_duration_overrides() {
        let mut env = base_env();
        env.insert("PACING_SECS", "2");
        env.insert("CADENCE_SECS", "10");
        let config = load(&env).unwrap();
        assert_eq!(config.pacing, Duration::from_secs(2));
        assert_eq!(config.cadence, Duration::from_secs(10));
    }
}
