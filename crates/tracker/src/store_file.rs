//! JSON file-backed tracker store with atomic writes.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    hushwatch_channels::ChannelId,
    tokio::fs,
    tracing::{debug, warn},
};

use crate::{
    Result,
    store::TrackerStore,
    types::{TrackerRecord, TrackerSnapshot},
};

/// File-backed store. The whole mapping lives in one JSON object keyed by
/// channel id.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn atomic_write(&self, json: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::copy(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Decode a stored mapping, dropping entries whose key is not a channel id or
/// whose value is not a record. Only a document that is not a JSON object at
/// all is an error.
fn decode_snapshot(data: &str) -> Result<TrackerSnapshot> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(data)?;
    let mut snapshot = TrackerSnapshot::new();
    for (key, value) in raw {
        let Ok(channel_id) = key.parse::<ChannelId>() else {
            warn!(key = %key, "skipping tracker record with invalid channel id");
            continue;
        };
        match serde_json::from_value::<TrackerRecord>(value) {
            Ok(record) => {
                snapshot.insert(channel_id, record);
            },
            Err(e) => {
                warn!(channel_id, error = %e, "skipping malformed tracker record");
            },
        }
    }
    Ok(snapshot)
}

#[async_trait]
impl TrackerStore for FileStore {
    async fn load(&self) -> Result<TrackerSnapshot> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(TrackerSnapshot::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        decode_snapshot(&data)
    }

    async fn save(&self, snapshot: &TrackerSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        self.atomic_write(&json).await?;
        debug!(path = %self.path.display(), count = snapshot.len(), "saved trackers");
        Ok(())
    }
}
