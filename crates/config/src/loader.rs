use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    schema::HushwatchConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "hushwatch.toml",
    "hushwatch.yaml",
    "hushwatch.yml",
    "hushwatch.json",
];

const STATE_FILENAME: &str = "trackers.json";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<HushwatchConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./hushwatch.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/hushwatch/hushwatch.{toml,yaml,yml,json}` (user-global)
///
/// Returns `HushwatchConfig::default()` if no config file is found or the
/// file cannot be parsed. Env overrides are not applied here.
pub fn discover_and_load() -> HushwatchConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    HushwatchConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "hushwatch")
}

/// Returns the user-global config directory (`~/.config/hushwatch/`).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Returns the user data directory, falling back to the working directory
/// when no home directory can be determined.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where tracker state lives: the configured path, else `trackers.json` in
/// the data dir.
pub fn resolved_state_path(config: &HushwatchConfig) -> PathBuf {
    config
        .tracker
        .state_path
        .clone()
        .unwrap_or_else(|| data_dir().join(STATE_FILENAME))
}

/// Apply `DISCORD_TOKEN`, `PORT` and `HUSHWATCH_STATE_PATH` on top of the
/// file config.
pub fn apply_env_overrides(config: &mut HushwatchConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut HushwatchConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.trim().is_empty()) {
        config.discord.token = Some(secrecy::Secret::new(token));
    }

    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.health.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }

    if let Some(path) = lookup("HUSHWATCH_STATE_PATH").filter(|p| !p.trim().is_empty()) {
        config.tracker.state_path = Some(PathBuf::from(path));
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<HushwatchConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat {
            ext: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("hushwatch.toml", "[health]\nport = 8123\n")]
    #[case("hushwatch.yaml", "health:\n  port: 8123\n")]
    #[case("hushwatch.yml", "health:\n  port: 8123\n")]
    #[case("hushwatch.json", r#"{"health": {"port": 8123}}"#)]
    fn loads_every_format(#[case] name: &str, #[case] body: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.health.port, 8123);
        assert_eq!(cfg.tracker.poll_interval_secs, 10);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hushwatch.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { ext }) if ext == "ini"
        ));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hushwatch.toml");
        std::fs::write(&path, "[tracker\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("hushwatch.toml"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("hushwatch.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut cfg = HushwatchConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "DISCORD_TOKEN" => Some("from-env".into()),
            "PORT" => Some("8080".into()),
            "HUSHWATCH_STATE_PATH" => Some("/var/lib/hushwatch/state.json".into()),
            _ => None,
        });
        assert_eq!(cfg.discord.token(), Some("from-env"));
        assert_eq!(cfg.health.port, 8080);
        assert_eq!(
            resolved_state_path(&cfg),
            PathBuf::from("/var/lib/hushwatch/state.json")
        );
    }

    #[test]
    fn invalid_or_blank_env_values_are_ignored() {
        let mut cfg = HushwatchConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "DISCORD_TOKEN" => Some("   ".into()),
            "PORT" => Some("not-a-port".into()),
            _ => None,
        });
        assert!(cfg.discord.token.is_none());
        assert_eq!(cfg.health.port, 8000);
    }

    #[test]
    fn default_state_path_is_in_data_dir() {
        let cfg = HushwatchConfig::default();
        let path = resolved_state_path(&cfg);
        assert_eq!(path.file_name().unwrap(), "trackers.json");
        assert!(path.starts_with(data_dir()));
    }
}
