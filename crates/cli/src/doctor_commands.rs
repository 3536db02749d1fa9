//! `hushwatch doctor`: config validation and environment checks.
//!
//! Prints a structured report with `[ok]`, `[warn]`, `[fail]`, `[skip]` or
//! `[info]` per item and exits non-zero when anything failed.

use std::path::Path;

use {
    anyhow::Result,
    hushwatch_config::{HushwatchConfig, Severity, ValidationResult},
    hushwatch_tracker::{store::TrackerStore, store_file::FileStore},
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Skip,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Skip => DIM,
            Self::Info => CYAN,
        }
    }

    fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }

    fn push_diagnostics(&mut self, result: &ValidationResult) {
        for d in &result.diagnostics {
            let message = if d.path.is_empty() {
                d.message.clone()
            } else {
                format!("{}: {}", d.path, d.message)
            };
            self.push(Status::from_severity(d.severity), message);
        }
    }
}

// ── Printing ────────────────────────────────────────────────────────────────

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
            match item.status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub async fn handle_doctor(config: &HushwatchConfig, config_path: Option<&Path>) -> Result<()> {
    eprintln!("{BOLD}hushwatch doctor{RESET}");
    eprintln!("{BOLD}================{RESET}\n");

    let token_from_env = std::env::var("DISCORD_TOKEN").is_ok_and(|t| !t.trim().is_empty());

    let sections = vec![
        check_config_file(config_path),
        check_runtime(config, token_from_env),
        check_state_file(&hushwatch_config::resolved_state_path(config)).await,
        check_health(config),
    ];

    let (errors, warnings) = print_report(&sections);

    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

// ── 1. Config file ──────────────────────────────────────────────────────────

fn check_config_file(config_path: Option<&Path>) -> Section {
    let result = hushwatch_config::validate(config_path);
    let label = result
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".into());
    let mut section = Section::new(format!("Config ({label})"));

    if result.config_path.is_none() {
        section.push_diagnostics(&result);
        return section;
    }

    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "All fields recognized");
    } else {
        section.push_diagnostics(&result);
    }
    section
}

// ── 2. Runtime settings ─────────────────────────────────────────────────────

fn check_runtime(config: &HushwatchConfig, token_from_env: bool) -> Section {
    let mut section = Section::new("Runtime");
    let result = hushwatch_config::validate_config(config);

    if config.discord.token().is_some() {
        if token_from_env {
            section.push(Status::Ok, "Discord token set (from DISCORD_TOKEN)");
        } else {
            section.push(
                Status::Warn,
                "Discord token is stored in the config file, prefer DISCORD_TOKEN",
            );
        }
    }

    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "Tracker settings valid");
    } else {
        section.push_diagnostics(&result);
    }

    if !config.discord.sync_commands {
        section.push(Status::Info, "Slash command sync disabled");
    }
    section
}

// ── 3. State file ───────────────────────────────────────────────────────────

async fn check_state_file(path: &Path) -> Section {
    let mut section = Section::new(format!("State file ({})", path.display()));

    if !path.exists() {
        section.push(
            Status::Info,
            "No state file yet (created when the first tracker starts)",
        );
    } else {
        match FileStore::new(path).load().await {
            Ok(snapshot) => {
                section.push(
                    Status::Ok,
                    format!("State file readable ({} tracker(s))", snapshot.len()),
                );
            },
            Err(e) => {
                section.push(Status::Fail, format!("State file unreadable: {e}"));
            },
        }
    }

    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) if dir.is_dir() => check_writable(&mut section, dir),
        Some(dir) => section.push(
            Status::Info,
            format!("Directory {} will be created", dir.display()),
        ),
        None => section.push(Status::Skip, "State file has no parent directory"),
    }

    section
}

fn check_writable(section: &mut Section, dir: &Path) {
    let probe = dir.join(".hushwatch-doctor-probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            section.push(Status::Ok, format!("{} is writable", dir.display()));
        },
        Err(e) => {
            section.push(
                Status::Fail,
                format!("{} is not writable: {e}", dir.display()),
            );
        },
    }
}

// ── 4. Health endpoint ──────────────────────────────────────────────────────

fn check_health(config: &HushwatchConfig) -> Section {
    let mut section = Section::new("Health endpoint");

    if !config.health.enabled {
        section.push(Status::Skip, "Disabled");
        return section;
    }

    let addr = config.health.address();
    match std::net::TcpListener::bind(&addr) {
        Ok(_) => section.push(Status::Ok, format!("{addr} is available")),
        Err(e) => section.push(
            Status::Warn,
            format!("{addr} cannot be bound ({e}); the bot runs without it"),
        ),
    }
    section
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        hushwatch_tracker::{TrackerRecord, TrackerSnapshot},
    };

    fn find<'a>(section: &'a Section, needle: &str) -> &'a CheckItem {
        section
            .items
            .iter()
            .find(|i| i.message.contains(needle))
            .unwrap_or_else(|| panic!("no item containing {needle:?}"))
    }

    #[test]
    fn unknown_field_in_config_file_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("hushwatch.toml");
        std::fs::write(&path, "[tracker]\npoll_intervall_secs = 5\n").unwrap();

        let section = check_config_file(Some(&path));
        assert!(section.items.iter().any(|i| i.status == Status::Fail));
    }

    #[test]
    fn clean_config_file_is_ok() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("hushwatch.toml");
        std::fs::write(&path, "[tracker]\npoll_interval_secs = 5\n").unwrap();

        let section = check_config_file(Some(&path));
        assert_eq!(find(&section, "All fields recognized").status, Status::Ok);
    }

    #[test]
    fn missing_token_fails_runtime_check() {
        let config = HushwatchConfig::default();
        let section = check_runtime(&config, false);
        assert_eq!(find(&section, "discord.token").status, Status::Fail);
    }

    #[test]
    fn token_in_config_file_warns() {
        let mut config = HushwatchConfig::default();
        config.discord.token = Some(secrecy::Secret::new("abc".to_string()));

        let section = check_runtime(&config, false);
        assert_eq!(find(&section, "prefer DISCORD_TOKEN").status, Status::Warn);

        let section = check_runtime(&config, true);
        assert_eq!(find(&section, "from DISCORD_TOKEN").status, Status::Ok);
        assert_eq!(find(&section, "Tracker settings valid").status, Status::Ok);
    }

    #[tokio::test]
    async fn missing_state_file_is_informational() {
        let temp = tempfile::TempDir::new().unwrap();
        let section = check_state_file(&temp.path().join("trackers.json")).await;
        assert_eq!(find(&section, "No state file yet").status, Status::Info);
        assert_eq!(find(&section, "is writable").status, Status::Ok);
    }

    #[tokio::test]
    async fn existing_state_file_reports_tracker_count() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("trackers.json");
        let store = FileStore::new(&path);
        let mut snapshot = TrackerSnapshot::new();
        snapshot.insert(7, TrackerRecord {
            message: "ping".into(),
            timeout_minutes: 5,
            repeat: 1,
            last_activity: chrono::Utc::now(),
        });
        store.save(&snapshot).await.unwrap();

        let section = check_state_file(&path).await;
        assert_eq!(find(&section, "1 tracker(s)").status, Status::Ok);
    }

    #[tokio::test]
    async fn corrupt_state_file_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("trackers.json");
        std::fs::write(&path, "not json").unwrap();

        let section = check_state_file(&path).await;
        assert_eq!(find(&section, "unreadable").status, Status::Fail);
    }

    #[test]
    fn disabled_health_is_skipped() {
        let mut config = HushwatchConfig::default();
        config.health.enabled = false;
        let section = check_health(&config);
        assert_eq!(section.items[0].status, Status::Skip);
    }

    #[test]
    fn busy_health_port_warns() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config = HushwatchConfig::default();
        config.health.bind = "127.0.0.1".into();
        config.health.port = port;

        let section = check_health(&config);
        assert_eq!(section.items[0].status, Status::Warn);
    }
}
