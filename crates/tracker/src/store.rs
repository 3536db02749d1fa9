//! Persistence trait for tracker state.

use async_trait::async_trait;

use crate::{Result, types::TrackerSnapshot};

/// Durable backing store for the full tracker mapping.
///
/// The registry always writes the complete mapping, so implementations only
/// need whole-snapshot load and save.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Load the persisted mapping. A store that has never been written loads
    /// as an empty mapping.
    async fn load(&self) -> Result<TrackerSnapshot>;

    /// Replace the persisted mapping with `snapshot`.
    async fn save(&self, snapshot: &TrackerSnapshot) -> Result<()>;
}
