//! Configuration validation.
//!
//! Flags unknown or misspelled keys in TOML files and checks the loaded
//! values for settings the bot cannot run with.

use std::path::{Path, PathBuf};

use crate::schema::HushwatchConfig;

/// Discord rejects messages longer than this.
const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "missing", "range"
    pub category: &'static str,
    /// Dotted path, e.g. "tracker.poll_interval_secs"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Errors only, in order.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

// ── Known keys ──────────────────────────────────────────────────────────────

const SECTIONS: &[(&str, &[&str])] = &[
    ("discord", &["token", "sync_commands"]),
    ("tracker", &[
        "state_path",
        "poll_interval_secs",
        "repeat_delay_ms",
        "stop_grace_ms",
        "max_timeout_minutes",
        "max_repeat",
        "reply_chunk_len",
    ]),
    ("health", &["enabled", "bind", "port"]),
];

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate the config file at `path`, or the discovered file when `None`.
///
/// Only the file itself is checked here; use [`validate_config`] on the
/// final config (after env overrides) for runtime requirements.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) if is_toml(&actual_path) => validate_toml_str(&content),
        Ok(_) => match crate::loader::load_config(&actual_path) {
            Ok(_) => ValidationResult::default(),
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic::new(
                    Severity::Error,
                    "syntax",
                    "",
                    e.to_string(),
                )],
                config_path: None,
            },
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_none_or(|e| e == "toml")
}

/// Validate a TOML document without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &mut diagnostics);

    if let Err(e) = toml::from_str::<HushwatchConfig>(toml_str) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(value: &toml::Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(table) = value.as_table() else {
        return;
    };
    let section_names: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();

    for (key, child) in table {
        let Some((_, fields)) = SECTIONS.iter().find(|(name, _)| *name == key.as_str()) else {
            let msg = match suggest(key, &section_names, 3) {
                Some(s) => format!("unknown field at top level (did you mean \"{s}\"?)"),
                None => "unknown field at top level".to_string(),
            };
            diagnostics.push(Diagnostic::new(Severity::Error, "unknown-field", key, msg));
            continue;
        };
        let Some(child) = child.as_table() else {
            continue;
        };
        for field in child.keys() {
            if fields.contains(&field.as_str()) {
                continue;
            }
            let msg = match suggest(field, fields, 3) {
                Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                None => "unknown field".to_string(),
            };
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "unknown-field",
                format!("{key}.{field}"),
                msg,
            ));
        }
    }
}

/// Check a fully resolved config for values the bot cannot run with.
#[must_use]
pub fn validate_config(config: &HushwatchConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if config.discord.token().is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "missing",
            "discord.token",
            "a Discord bot token is required (set DISCORD_TOKEN)",
        ));
    }

    let tracker = &config.tracker;
    if tracker.poll_interval_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "tracker.poll_interval_secs",
            "poll interval must be at least 1 second",
        ));
    }
    if tracker.reply_chunk_len == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "tracker.reply_chunk_len",
            "reply chunk length must be positive",
        ));
    } else if tracker.reply_chunk_len > DISCORD_MESSAGE_LIMIT {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "range",
            "tracker.reply_chunk_len",
            format!("Discord rejects messages over {DISCORD_MESSAGE_LIMIT} characters"),
        ));
    }
    if tracker.max_timeout_minutes == Some(0) {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "range",
            "tracker.max_timeout_minutes",
            "cap of 0 is raised to the 1 minute minimum",
        ));
    }
    if tracker.max_repeat == Some(0) {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "range",
            "tracker.max_repeat",
            "cap of 0 is raised to the minimum of 1 send",
        ));
    }

    if config.health.enabled && config.health.port == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "range",
            "health.port",
            "port 0 binds a random free port",
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}
