//! Core data types for channel idle tracking.

use std::{collections::BTreeMap, time::Duration};

use {
    chrono::{DateTime, TimeDelta, Utc},
    hushwatch_channels::ChannelId,
    serde::{Deserialize, Serialize},
};

/// Message sent when a persisted record lost its text.
pub const DEFAULT_MESSAGE: &str = "ping";

/// Smallest accepted timeout window, in minutes.
pub const MIN_TIMEOUT_MINUTES: u64 = 1;

/// Smallest accepted number of sends per firing.
pub const MIN_REPEAT: u32 = 1;

/// A start request as it arrives from the command layer, before clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSpec {
    pub message: String,
    pub timeout_minutes: i64,
    pub repeat: i64,
}

impl TrackerSpec {
    pub fn new(message: impl Into<String>, timeout_minutes: i64, repeat: i64) -> Self {
        Self {
            message: message.into(),
            timeout_minutes,
            repeat,
        }
    }
}

/// Optional upper bounds on tracker settings. `None` leaves a field unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerLimits {
    pub max_timeout_minutes: Option<u64>,
    pub max_repeat: Option<u32>,
}

/// Validated, immutable settings of one tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSettings {
    pub message: String,
    pub timeout_minutes: u64,
    pub repeat: u32,
}

impl TrackerSettings {
    /// Clamp a raw request: both numbers are raised to at least 1 and lowered
    /// to the configured caps, if any.
    pub fn clamped(spec: TrackerSpec, limits: &TrackerLimits) -> Self {
        let timeout_minutes = u64::try_from(spec.timeout_minutes.max(1)).unwrap_or(u64::MAX);
        let repeat = u32::try_from(spec.repeat.max(1)).unwrap_or(u32::MAX);
        Self::bounded(spec.message, timeout_minutes, repeat, limits)
    }

    /// Settings for a tracker re-created from a persisted record.
    pub fn from_record(record: &TrackerRecord, limits: &TrackerLimits) -> Self {
        Self::bounded(
            record.message.clone(),
            record.timeout_minutes,
            record.repeat,
            limits,
        )
    }

    fn bounded(message: String, timeout_minutes: u64, repeat: u32, limits: &TrackerLimits) -> Self {
        let mut timeout_minutes = timeout_minutes.max(MIN_TIMEOUT_MINUTES);
        if let Some(cap) = limits.max_timeout_minutes {
            timeout_minutes = timeout_minutes.min(cap.max(MIN_TIMEOUT_MINUTES));
        }
        let mut repeat = repeat.max(MIN_REPEAT);
        if let Some(cap) = limits.max_repeat {
            repeat = repeat.min(cap.max(MIN_REPEAT));
        }
        Self {
            message,
            timeout_minutes,
            repeat,
        }
    }

    /// Length of the silence window.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes.saturating_mul(60))
    }

    /// When a tracker whose clock was last reset at `last_activity` is due.
    pub fn deadline_after(&self, last_activity: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.timeout_minutes.saturating_mul(60)).ok()?;
        last_activity.checked_add_signed(TimeDelta::try_seconds(secs)?)
    }
}

/// Persisted state of one tracker. Missing fields fall back to the defaults
/// a freshly started tracker would get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerRecord {
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default = "Utc::now")]
    pub last_activity: DateTime<Utc>,
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

fn default_timeout_minutes() -> u64 {
    MIN_TIMEOUT_MINUTES
}

fn default_repeat() -> u32 {
    MIN_REPEAT
}

/// Full persisted mapping, keyed by channel id.
pub type TrackerSnapshot = BTreeMap<ChannelId, TrackerRecord>;

/// Read-only view of a tracker for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSummary {
    pub channel_id: ChannelId,
    pub message: String,
    pub timeout_minutes: u64,
    pub repeat: u32,
    pub last_activity: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_at: Option<DateTime<Utc>>,
}

/// Timing knobs of the monitor loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTiming {
    /// How often each loop wakes to compare idle time against its window.
    pub poll_interval: Duration,
    /// Pause between consecutive sends of one firing.
    pub repeat_delay: Duration,
    /// How long `stop` waits for a loop to wind down before aborting it.
    pub stop_grace: Duration,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            repeat_delay: Duration::from_secs(1),
            stop_grace: Duration::from_secs(2),
        }
    }
}

/// Registry-wide status, used by the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStatus {
    pub tracker_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_at: Option<DateTime<Utc>>,
}
