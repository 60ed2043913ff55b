use std::time::Duration;

/// Session tunables. Defaults match the server deployment; each knob can be
/// overridden from the environment.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on waiting for the connect confirmation.
    pub connect_timeout: Duration,
    /// Retry ceiling after a connection loss or failed dial.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay; the actual delay scales linearly by attempt.
    pub reconnect_delay: Duration,
    /// How long a typing signal stays live without a refresh.
    pub typing_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(3000),
            typing_ttl: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connect_timeout: env_ms("CHAT_CONNECT_TIMEOUT_MS").unwrap_or(defaults.connect_timeout),
            max_reconnect_attempts: env_parse("CHAT_MAX_RECONNECT_ATTEMPTS")
                .unwrap_or(defaults.max_reconnect_attempts),
            reconnect_delay: env_ms("CHAT_RECONNECT_DELAY_MS").unwrap_or(defaults.reconnect_delay),
            typing_ttl: env_ms("CHAT_TYPING_TTL_MS").unwrap_or(defaults.typing_ttl),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.parse().ok())
}

fn env_ms(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_reconnect_attempts, 5);
        assert_eq!(cfg.reconnect_delay, Duration::from_millis(3000));
    }
}
