//! In-memory store for testing.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{Error, Result, store::TrackerStore, types::TrackerSnapshot};

/// In-memory store for tests. Nothing survives the process.
///
/// Counts saves and can be switched into a failing mode to exercise the
/// registry's error paths.
#[derive(Default)]
pub struct InMemoryStore {
    snapshot: Mutex<TrackerSnapshot>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `snapshot` already persisted.
    pub fn with_snapshot(snapshot: TrackerSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Current persisted mapping.
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every subsequent load and save fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::message("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackerStore for InMemoryStore {
    async fn load(&self) -> Result<TrackerSnapshot> {
        self.check()?;
        Ok(self.snapshot())
    }

    async fn save(&self, snapshot: &TrackerSnapshot) -> Result<()> {
        self.check()?;
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
