//! Process-wide tracker registry: one tracker per channel, write-through
//! persistence after every mutation.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use {
    hushwatch_channels::{ChannelHandle, ChannelId, ChannelOutbound},
    tokio::sync::{Mutex, RwLock},
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    store::TrackerStore,
    tracker::{ActivityTracker, FiredFn},
    types::{
        MonitorTiming, RegistryStatus, TrackerLimits, TrackerSettings, TrackerSnapshot,
        TrackerSpec, TrackerSummary,
    },
};

/// State shared with the monitor loops. Loops only hold a [`Weak`] to it so
/// dropping the registry does not keep them persisting.
struct Shared {
    trackers: RwLock<HashMap<ChannelId, Arc<ActivityTracker>>>,
    store: Arc<dyn TrackerStore>,
    /// Serializes snapshot + write so an older snapshot never lands after a
    /// newer one.
    persist_lock: Mutex<()>,
}

impl Shared {
    async fn snapshot(&self) -> TrackerSnapshot {
        self.trackers
            .read()
            .await
            .iter()
            .map(|(id, tracker)| (*id, tracker.record()))
            .collect()
    }

    /// Write the full mapping to the store. Failures are logged and dropped.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.snapshot().await;
        match self.store.save(&snapshot).await {
            Ok(()) => debug!(trackers = snapshot.len(), "tracker state persisted"),
            Err(e) => warn!(error = %e, "failed to persist tracker state"),
        }
    }
}

/// Owns every [`ActivityTracker`] in the process.
///
/// Created once at startup and handed to the event bridge and the command
/// layer. All operations are safe to call concurrently.
pub struct TrackerRegistry {
    shared: Arc<Shared>,
    outbound: Arc<dyn ChannelOutbound>,
    timing: MonitorTiming,
    limits: TrackerLimits,
}

impl TrackerRegistry {
    pub fn new(store: Arc<dyn TrackerStore>, outbound: Arc<dyn ChannelOutbound>) -> Arc<Self> {
        Self::with_config(
            store,
            outbound,
            MonitorTiming::default(),
            TrackerLimits::default(),
        )
    }

    pub fn with_config(
        store: Arc<dyn TrackerStore>,
        outbound: Arc<dyn ChannelOutbound>,
        timing: MonitorTiming,
        limits: TrackerLimits,
    ) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                trackers: RwLock::new(HashMap::new()),
                store,
                persist_lock: Mutex::new(()),
            }),
            outbound,
            timing,
            limits,
        })
    }

    pub fn timing(&self) -> MonitorTiming {
        self.timing
    }

    pub fn limits(&self) -> TrackerLimits {
        self.limits
    }

    /// Begin tracking `channel`.
    ///
    /// The request is clamped (at least one minute, at least one send, and
    /// the configured caps) before the tracker is created.
    pub async fn start(
        &self,
        channel: ChannelHandle,
        spec: TrackerSpec,
    ) -> Result<Arc<ActivityTracker>> {
        if !channel.is_text() {
            return Err(Error::invalid_channel_type(channel.id, channel.kind));
        }
        let channel_id = channel.id;
        let settings = TrackerSettings::clamped(spec, &self.limits);

        let tracker = {
            let mut trackers = self.shared.trackers.write().await;
            if trackers.contains_key(&channel_id) {
                return Err(Error::already_tracked(channel_id));
            }
            let tracker = ActivityTracker::new(channel, settings);
            trackers.insert(channel_id, Arc::clone(&tracker));
            tracker.spawn_monitor(
                Arc::clone(&self.outbound),
                self.timing,
                self.persist_callback(),
            );
            tracker
        };

        self.shared.persist().await;
        info!(
            channel_id,
            timeout_minutes = tracker.settings().timeout_minutes,
            repeat = tracker.settings().repeat,
            "tracker started"
        );
        Ok(tracker)
    }

    /// Stop tracking `channel_id`. The loop is cancelled and awaited before
    /// the updated mapping is written.
    pub async fn stop(&self, channel_id: ChannelId) -> Result<()> {
        let tracker = {
            let mut trackers = self.shared.trackers.write().await;
            let tracker = trackers
                .remove(&channel_id)
                .ok_or_else(|| Error::not_tracked(channel_id))?;
            tracker.deactivate();
            tracker
        };

        tracker.join(self.timing.stop_grace).await;
        self.shared.persist().await;
        info!(channel_id, "tracker stopped");
        Ok(())
    }

    /// Record a message in `channel_id`. Messages the bot itself sent never
    /// reset a clock. Returns whether a tracker was reset.
    pub async fn notify_activity(&self, channel_id: ChannelId, actor_is_self: bool) -> bool {
        if actor_is_self {
            return false;
        }
        let Some(tracker) = self.get(channel_id).await else {
            return false;
        };
        tracker.reset_clock();
        debug!(channel_id, "activity observed, clock reset");
        self.shared.persist().await;
        true
    }

    /// Reset every clock after a reconnect so the outage is not mistaken
    /// for silence.
    pub async fn resume_all(&self) {
        let count = {
            let trackers = self.shared.trackers.read().await;
            for tracker in trackers.values() {
                tracker.reset_clock();
            }
            trackers.len()
        };
        self.shared.persist().await;
        info!(trackers = count, "connection resumed, all tracker clocks reset");
    }

    /// Summaries of every tracker, ordered by channel id.
    pub async fn list(&self) -> Vec<TrackerSummary> {
        let mut summaries: Vec<_> = self
            .shared
            .trackers
            .read()
            .await
            .values()
            .map(|tracker| tracker.summary())
            .collect();
        summaries.sort_by_key(|s| s.channel_id);
        summaries
    }

    /// Re-create trackers from the store with a fresh countdown.
    ///
    /// Records for channels already tracked are ignored. A record whose
    /// channel cannot be resolved, or resolves to a non-text channel, is
    /// skipped with a warning. Returns the number of trackers restored.
    pub async fn restore(&self) -> usize {
        let snapshot = match self.shared.store.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "failed to load tracker state, starting empty");
                return 0;
            },
        };

        let mut restored = 0;
        for (channel_id, record) in snapshot {
            if self.contains(channel_id).await {
                debug!(channel_id, "already tracked, skipping persisted record");
                continue;
            }

            let channel = match self.outbound.resolve_channel(channel_id).await {
                Ok(channel) => channel,
                Err(e) => {
                    let err = Error::channel_resolution(channel_id, e);
                    warn!(error = %err, "skipping persisted tracker");
                    continue;
                },
            };
            if !channel.is_text() {
                let err = Error::invalid_channel_type(channel_id, channel.kind);
                warn!(error = %err, "skipping persisted tracker");
                continue;
            }

            let settings = TrackerSettings::from_record(&record, &self.limits);
            let mut trackers = self.shared.trackers.write().await;
            if trackers.contains_key(&channel_id) {
                continue;
            }
            let tracker = ActivityTracker::new(channel, settings);
            trackers.insert(channel_id, Arc::clone(&tracker));
            tracker.spawn_monitor(
                Arc::clone(&self.outbound),
                self.timing,
                self.persist_callback(),
            );
            restored += 1;
        }

        self.shared.persist().await;
        info!(restored, "trackers restored");
        restored
    }

    /// Stop every monitor loop and write a final snapshot. Entries stay in
    /// the mapping and in the store so the next process restores them.
    pub async fn shutdown(&self) {
        let trackers: Vec<_> = self
            .shared
            .trackers
            .read()
            .await
            .values()
            .cloned()
            .collect();
        for tracker in &trackers {
            tracker.deactivate();
        }
        for tracker in &trackers {
            tracker.join(self.timing.stop_grace).await;
        }
        self.shared.persist().await;
        info!(trackers = trackers.len(), "tracker registry shut down");
    }

    pub async fn status(&self) -> RegistryStatus {
        let trackers = self.shared.trackers.read().await;
        RegistryStatus {
            tracker_count: trackers.len(),
            next_fire_at: trackers.values().filter_map(|t| t.next_fire_at()).min(),
        }
    }

    pub async fn get(&self, channel_id: ChannelId) -> Option<Arc<ActivityTracker>> {
        self.shared.trackers.read().await.get(&channel_id).cloned()
    }

    pub async fn contains(&self, channel_id: ChannelId) -> bool {
        self.shared.trackers.read().await.contains_key(&channel_id)
    }

    pub async fn len(&self) -> usize {
        self.shared.trackers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn persist_callback(&self) -> FiredFn {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        Arc::new(move || {
            let shared = shared.clone();
            Box::pin(async move {
                if let Some(shared) = shared.upgrade() {
                    shared.persist().await;
                }
            })
        })
    }
}
