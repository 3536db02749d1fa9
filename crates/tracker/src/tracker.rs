//! One channel's idle clock and the monitor loop that fires its reminder.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    chrono::{DateTime, Utc},
    hushwatch_channels::{ChannelHandle, ChannelId, ChannelOutbound},
    tokio::{task::JoinHandle, time::Instant},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    Error,
    types::{MonitorTiming, TrackerRecord, TrackerSettings, TrackerSummary},
};

/// Callback invoked after a firing re-armed the clock.
pub type FiredFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Monotonic instant for elapsed-time checks plus the wall-clock time that
/// gets persisted. Both are always set together.
#[derive(Debug, Clone, Copy)]
struct LastActivity {
    instant: Instant,
    at: DateTime<Utc>,
}

impl LastActivity {
    fn now() -> Self {
        Self {
            instant: Instant::now(),
            at: Utc::now(),
        }
    }
}

/// Idle tracker for a single channel.
///
/// Settings are fixed at creation. The clock is reset by observed activity,
/// by a resume, and after every firing. The tracker is `Running` until
/// [`deactivate`](Self::deactivate) flips it to `Stopped`; there is no way
/// back.
pub struct ActivityTracker {
    channel: ChannelHandle,
    settings: TrackerSettings,
    last_activity: Mutex<LastActivity>,
    active: AtomicBool,
    cancel: CancellationToken,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ActivityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityTracker")
            .field("channel_id", &self.channel.id)
            .field("settings", &self.settings)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl ActivityTracker {
    /// Create a tracker whose clock starts now. The monitor loop is not
    /// running until [`spawn_monitor`](Self::spawn_monitor) is called.
    pub fn new(channel: ChannelHandle, settings: TrackerSettings) -> Arc<Self> {
        Arc::new(Self {
            channel,
            settings,
            last_activity: Mutex::new(LastActivity::now()),
            active: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            monitor: Mutex::new(None),
        })
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel.id
    }

    pub fn channel(&self) -> &ChannelHandle {
        &self.channel
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wall-clock time of the last reset.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.read_clock().at
    }

    /// Time since the last reset.
    pub fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(self.read_clock().instant)
    }

    /// Restart the silence window from now.
    pub fn reset_clock(&self) {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner()) = LastActivity::now();
    }

    /// When the tracker will fire if nothing happens, to poll granularity.
    pub fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.settings.deadline_after(self.last_activity())
    }

    pub fn record(&self) -> TrackerRecord {
        TrackerRecord {
            message: self.settings.message.clone(),
            timeout_minutes: self.settings.timeout_minutes,
            repeat: self.settings.repeat,
            last_activity: self.last_activity(),
        }
    }

    pub fn summary(&self) -> TrackerSummary {
        let last_activity = self.last_activity();
        TrackerSummary {
            channel_id: self.channel.id,
            message: self.settings.message.clone(),
            timeout_minutes: self.settings.timeout_minutes,
            repeat: self.settings.repeat,
            last_activity,
            next_fire_at: self.settings.deadline_after(last_activity),
        }
    }

    fn read_clock(&self) -> LastActivity {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Launch the monitor loop as a background task owned by this tracker.
    pub fn spawn_monitor(
        self: &Arc<Self>,
        outbound: Arc<dyn ChannelOutbound>,
        timing: MonitorTiming,
        on_fired: FiredFn,
    ) {
        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracker.monitor(outbound.as_ref(), timing, on_fired).await;
        });
        let previous = self
            .monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            warn!(channel_id = self.channel.id, "replacing a running monitor loop");
            previous.abort();
        }
    }

    /// Flip to `Stopped` and signal the loop. Returns `false` if the tracker
    /// was already stopped.
    pub fn deactivate(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        self.cancel.cancel();
        was_active
    }

    /// Wait for the monitor loop to exit, aborting it after `grace`.
    /// An in-flight send may finish; nothing after it will run.
    pub async fn join(&self, grace: Duration) {
        let handle = self
            .monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(mut handle) = handle else {
            return;
        };
        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            warn!(
                channel_id = self.channel.id,
                grace_ms = grace.as_millis() as u64,
                "monitor loop did not exit in time, aborting"
            );
            handle.abort();
        }
    }

    async fn monitor(
        &self,
        outbound: &dyn ChannelOutbound,
        timing: MonitorTiming,
        on_fired: FiredFn,
    ) {
        debug!(
            channel_id = self.channel.id,
            timeout_minutes = self.settings.timeout_minutes,
            "monitor loop started"
        );

        while self.is_active() {
            if !self.pause(timing.poll_interval).await {
                break;
            }
            if self.idle_for() < self.settings.timeout() {
                continue;
            }
            if !self.fire(outbound, timing.repeat_delay).await {
                break;
            }
            // Stop may have landed during the last send.
            if !self.is_active() {
                break;
            }
            self.reset_clock();
            on_fired().await;
        }

        debug!(channel_id = self.channel.id, "monitor loop exited");
    }

    /// Sleep for `duration`. Returns `false` when the tracker was stopped
    /// before or during the sleep.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => self.is_active(),
        }
    }

    /// Send the reminder `repeat` times. Send failures are logged and do not
    /// stop the remaining sends. Returns `false` if stopped midway.
    async fn fire(&self, outbound: &dyn ChannelOutbound, repeat_delay: Duration) -> bool {
        info!(
            channel_id = self.channel.id,
            idle_secs = self.idle_for().as_secs(),
            repeat = self.settings.repeat,
            "channel went quiet, sending reminder"
        );

        for attempt in 1..=self.settings.repeat {
            if !self.is_active() {
                return false;
            }
            if let Err(e) = outbound
                .send_text(&self.channel, &self.settings.message)
                .await
            {
                let err = Error::send_failed(self.channel.id, e);
                warn!(attempt, error = %err, "reminder send failed");
            }
            if attempt < self.settings.repeat && !self.pause(repeat_delay).await {
                return false;
            }
        }
        true
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use {super::*, crate::types::TrackerSpec, async_trait::async_trait, hushwatch_channels::Result};

    /// Records every send with the (paused) tokio clock.
    #[derive(Default)]
    struct RecordingOutbound {
        sent: Mutex<Vec<(Instant, String)>>,
        fail: AtomicBool,
    }

    impl RecordingOutbound {
        fn sends(&self) -> Vec<(Instant, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChannelOutbound for RecordingOutbound {
        async fn resolve_channel(&self, channel_id: ChannelId) -> Result<ChannelHandle> {
            Ok(ChannelHandle::text(channel_id))
        }

        async fn send_text(&self, _channel: &ChannelHandle, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((Instant::now(), text.to_string()));
            if self.fail.load(Ordering::SeqCst) {
                return Err(hushwatch_channels::Error::unavailable("rate limited"));
            }
            Ok(())
        }
    }

    fn settings(timeout_minutes: i64, repeat: i64) -> TrackerSettings {
        TrackerSettings::clamped(
            TrackerSpec::new("ping", timeout_minutes, repeat),
            &Default::default(),
        )
    }

    fn counting_fired(counter: Arc<AtomicUsize>) -> FiredFn {
        Arc::new(move || {
            let c = Arc::clone(&counter);
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_repeat_times_after_timeout() {
        let outbound = Arc::new(RecordingOutbound::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let tracker = ActivityTracker::new(ChannelHandle::text(42), settings(1, 3));
        let started = Instant::now();
        tracker.spawn_monitor(
            outbound.clone(),
            MonitorTiming::default(),
            counting_fired(fired.clone()),
        );

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(outbound.sends().is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let sends = outbound.sends();
        assert_eq!(sends.len(), 3);
        assert!(sends.iter().all(|(_, text)| text == "ping"));
        let first_at = sends[0].0 - started;
        assert!(first_at >= Duration::from_secs(60) && first_at <= Duration::from_secs(61));
        assert!(sends[1].0 - sends[0].0 >= Duration::from_secs(1));
        assert!(sends[2].0 - sends[1].0 >= Duration::from_secs(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tracker.deactivate();
        tracker.join(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_abort_firing() {
        let outbound = Arc::new(RecordingOutbound::default());
        outbound.fail.store(true, Ordering::SeqCst);
        let fired = Arc::new(AtomicUsize::new(0));
        let tracker = ActivityTracker::new(ChannelHandle::text(1), settings(1, 2));
        tracker.spawn_monitor(
            outbound.clone(),
            MonitorTiming::default(),
            counting_fired(fired.clone()),
        );

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(outbound.sends().len(), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(tracker.is_active());

        tracker.deactivate();
        tracker.join(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_postpones_firing() {
        let outbound = Arc::new(RecordingOutbound::default());
        let tracker = ActivityTracker::new(ChannelHandle::text(1), settings(1, 1));
        tracker.spawn_monitor(
            outbound.clone(),
            MonitorTiming::default(),
            counting_fired(Arc::new(AtomicUsize::new(0))),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        tracker.reset_clock();
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(outbound.sends().is_empty());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(outbound.sends().len(), 1);

        tracker.deactivate();
        tracker.join(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_mid_firing_stops_remaining_sends() {
        let outbound = Arc::new(RecordingOutbound::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let tracker = ActivityTracker::new(ChannelHandle::text(1), settings(1, 5));
        tracker.spawn_monitor(
            outbound.clone(),
            MonitorTiming::default(),
            counting_fired(fired.clone()),
        );

        // First send at 60s, second at 61s; stop between the second and third.
        tokio::time::sleep(Duration::from_millis(61_500)).await;
        assert_eq!(outbound.sends().len(), 2);
        assert!(tracker.deactivate());
        tracker.join(Duration::from_secs(1)).await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(outbound.sends().len(), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!tracker.is_active());
        assert!(!tracker.deactivate());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_without_monitor_returns() {
        let tracker = ActivityTracker::new(ChannelHandle::text(1), settings(1, 1));
        tracker.deactivate();
        tracker.join(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_record_and_summary_mirror_settings() {
        let tracker = ActivityTracker::new(ChannelHandle::text(9), settings(0, 4));
        let record = tracker.record();
        assert_eq!(record.message, "ping");
        assert_eq!(record.timeout_minutes, 1);
        assert_eq!(record.repeat, 4);

        let summary = tracker.summary();
        assert_eq!(summary.channel_id, 9);
        assert_eq!(summary.last_activity, record.last_activity);
        assert_eq!(summary.next_fire_at, tracker.next_fire_at());
    }
}
