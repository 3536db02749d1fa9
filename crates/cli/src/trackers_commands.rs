//! `hushwatch trackers`: inspect the persisted tracker file offline.

use std::fmt::Write as _;

use {
    anyhow::{Context, Result},
    hushwatch_config::HushwatchConfig,
    hushwatch_tracker::{TrackerSnapshot, store::TrackerStore, store_file::FileStore},
};

pub async fn handle_trackers(config: &HushwatchConfig, json: bool) -> Result<()> {
    let path = hushwatch_config::resolved_state_path(config);
    let snapshot = FileStore::new(&path)
        .load()
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_table(&snapshot));
    }
    Ok(())
}

fn render_table(snapshot: &TrackerSnapshot) -> String {
    if snapshot.is_empty() {
        return "No persisted trackers.\n".to_string();
    }
    let mut out = String::new();
    for (channel_id, record) in snapshot {
        let _ = writeln!(
            out,
            "{channel_id}  every {}m x{}  last activity {}  {:?}",
            record.timeout_minutes,
            record.repeat,
            record.last_activity.to_rfc3339(),
            record.message,
        );
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::{TimeZone, Utc},
        hushwatch_tracker::TrackerRecord,
    };

    #[test]
    fn empty_snapshot_says_so() {
        assert_eq!(
            render_table(&TrackerSnapshot::new()),
            "No persisted trackers.\n"
        );
    }

    #[test]
    fn one_line_per_channel_in_id_order() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut snapshot = TrackerSnapshot::new();
        for (id, message) in [(20, "second"), (10, "first")] {
            snapshot.insert(id, TrackerRecord {
                message: message.into(),
                timeout_minutes: 5,
                repeat: 2,
                last_activity: at,
            });
        }

        let table = render_table(&snapshot);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "10  every 5m x2  last activity 2024-05-01T12:00:00+00:00  \"first\""
        );
        assert!(lines[1].starts_with("20  "));
    }

    #[tokio::test]
    async fn missing_state_file_prints_nothing_tracked() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = HushwatchConfig::default();
        config.tracker.state_path = Some(temp.path().join("trackers.json"));
        handle_trackers(&config, false).await.unwrap();
        handle_trackers(&config, true).await.unwrap();
    }
}
