//! Configuration loading, env substitution, overrides and validation.
//!
//! Config files: `hushwatch.toml`, `hushwatch.yaml`, `hushwatch.yml` or
//! `hushwatch.json`. Searched in `./` then the user config dir
//! (`~/.config/hushwatch/` on Linux).
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, config_dir, data_dir, discover_and_load, find_config_file,
        load_config, resolved_state_path,
    },
    schema::{DiscordConfig, HealthConfig, HushwatchConfig, TrackerConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config},
};
