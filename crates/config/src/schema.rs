//! Config schema: Discord credentials, tracker tuning, health listener.

use std::{path::PathBuf, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HushwatchConfig {
    pub discord: DiscordConfig,
    pub tracker: TrackerConfig,
    pub health: HealthConfig,
}

/// Discord bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied via `DISCORD_TOKEN`.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,

    /// Register the slash commands globally once the gateway is ready.
    pub sync_commands: bool,
}

impl DiscordConfig {
    /// The token, if present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("sync_commands", &self.sync_commands)
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            sync_commands: true,
        }
    }
}

/// Tracker engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Where tracker state is persisted. Defaults to `trackers.json` in the
    /// data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub repeat_delay_ms: u64,
    pub stop_grace_ms: u64,
    /// Upper bound on `timeout_minutes`. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timeout_minutes: Option<u64>,
    /// Upper bound on `repeat`. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_repeat: Option<u32>,
    /// Longest reply chunk sent in one message.
    pub reply_chunk_len: usize,
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn repeat_delay(&self) -> Duration {
        Duration::from_millis(self.repeat_delay_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            poll_interval_secs: 10,
            repeat_delay_ms: 1000,
            stop_grace_ms: 2000,
            max_timeout_minutes: None,
            max_repeat: None,
            reply_chunk_len: 1900,
        }
    }
}

/// Liveness endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl HealthConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: HushwatchConfig = toml::from_str("").unwrap();
        assert!(cfg.discord.token.is_none());
        assert!(cfg.discord.sync_commands);
        assert_eq!(cfg.tracker, TrackerConfig::default());
        assert_eq!(cfg.tracker.poll_interval(), Duration::from_secs(10));
        assert_eq!(cfg.tracker.repeat_delay(), Duration::from_secs(1));
        assert_eq!(cfg.health.address(), "0.0.0.0:8000");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: HushwatchConfig = toml::from_str(
            r#"
[tracker]
max_repeat = 10

[health]
port = 9090
"#,
        )
        .unwrap();
        assert_eq!(cfg.tracker.max_repeat, Some(10));
        assert_eq!(cfg.tracker.poll_interval_secs, 10);
        assert_eq!(cfg.health.port, 9090);
        assert!(cfg.health.enabled);
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let cfg: HushwatchConfig = toml::from_str("[discord]\ntoken = \"super-secret\"\n").unwrap();
        let debug = format!("{:?}", cfg.discord);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(cfg.discord.token(), Some("super-secret"));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let cfg: HushwatchConfig = toml::from_str("[discord]\ntoken = \"  \"\n").unwrap();
        assert!(cfg.discord.token().is_none());
    }

    #[test]
    fn token_survives_serialization() {
        let cfg: HushwatchConfig = toml::from_str("[discord]\ntoken = \"abc\"\n").unwrap();
        let out = toml::to_string(&cfg).unwrap();
        assert!(out.contains("token = \"abc\""));
    }
}
