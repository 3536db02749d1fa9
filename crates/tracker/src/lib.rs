//! Channel idle tracking: one monitor loop per watched channel that posts a
//! reminder after a configurable stretch of silence, then re-arms.
//!
//! State is written through to a [`store::TrackerStore`] after every mutation
//! and restored on startup with a fresh countdown.

pub mod error;
pub mod registry;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod tracker;
pub mod types;

pub use {
    error::{Error, Result},
    registry::TrackerRegistry,
    tracker::ActivityTracker,
    types::{
        MonitorTiming, RegistryStatus, TrackerLimits, TrackerRecord, TrackerSettings,
        TrackerSnapshot, TrackerSpec, TrackerSummary,
    },
};
