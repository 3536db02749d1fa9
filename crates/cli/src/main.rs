mod doctor_commands;
mod health;
mod trackers_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result, bail},
    clap::{Parser, Subcommand},
    hushwatch_channels::ChannelOutbound,
    hushwatch_config::{HushwatchConfig, Severity},
    hushwatch_discord::{DiscordHandler, DiscordOutbound},
    hushwatch_tracker::{
        MonitorTiming, TrackerLimits, TrackerRegistry, store::TrackerStore, store_file::FileStore,
    },
    serenity::Client,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "hushwatch",
    version,
    about = "hushwatch: nudges Discord channels that have gone quiet"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "HUSHWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Tracker state file (overrides config value).
    #[arg(long, global = true)]
    state_path: Option<PathBuf>,

    /// Health endpoint port (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and run the trackers (default when no subcommand
    /// is provided).
    Run,
    /// Print the persisted trackers.
    Trackers {
        /// Print the raw JSON snapshot.
        #[arg(long)]
        json: bool,
    },
    /// Validate config and check the environment.
    Doctor,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Config file, then env overrides, then command-line flags.
fn resolve_config(cli: &Cli) -> Result<HushwatchConfig> {
    let mut config = match &cli.config {
        Some(path) => hushwatch_config::load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => hushwatch_config::discover_and_load(),
    };
    hushwatch_config::apply_env_overrides(&mut config);

    if let Some(path) = &cli.state_path {
        config.tracker.state_path = Some(path.clone());
    }
    if let Some(port) = cli.port {
        config.health.port = port;
    }
    Ok(config)
}

fn monitor_timing(config: &HushwatchConfig) -> MonitorTiming {
    MonitorTiming {
        poll_interval: config.tracker.poll_interval(),
        repeat_delay: config.tracker.repeat_delay(),
        stop_grace: config.tracker.stop_grace(),
    }
}

fn tracker_limits(config: &HushwatchConfig) -> TrackerLimits {
    TrackerLimits {
        max_timeout_minutes: config.tracker.max_timeout_minutes,
        max_repeat: config.tracker.max_repeat,
    }
}

async fn run_bot(config: HushwatchConfig) -> Result<()> {
    let validation = hushwatch_config::validate_config(&config);
    for d in &validation.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    let Some(token) = config.discord.token().map(str::to_owned) else {
        bail!("missing Discord bot token: set DISCORD_TOKEN or discord.token");
    };
    if validation.has_errors() {
        bail!("invalid configuration, run `hushwatch doctor` for details");
    }

    let state_path = hushwatch_config::resolved_state_path(&config);
    info!(path = %state_path.display(), "tracker state file");
    let store: Arc<dyn TrackerStore> = Arc::new(FileStore::new(&state_path));
    let outbound = Arc::new(DiscordOutbound::new());
    let registry = TrackerRegistry::with_config(
        store,
        Arc::clone(&outbound) as Arc<dyn ChannelOutbound>,
        monitor_timing(&config),
        tracker_limits(&config),
    );

    if config.health.enabled {
        tokio::spawn(health::serve(
            config.health.address(),
            Arc::clone(&registry),
        ));
    }

    let handler = DiscordHandler::new(
        Arc::clone(&registry),
        outbound,
        &config.discord,
        config.tracker.reply_chunk_len,
    );
    let mut client = Client::builder(&token, DiscordHandler::intents())
        .event_handler(handler)
        .await
        .context("failed to build Discord client")?;
    let shard_manager = Arc::clone(&client.shard_manager);

    let outcome = tokio::select! {
        result = client.start() => result.context("discord client stopped"),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
            shard_manager.shutdown_all().await;
            Ok(())
        },
    };

    registry.shutdown().await;
    outcome
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "hushwatch starting");

    let config = resolve_config(&cli)?;
    match cli.command {
        None | Some(Commands::Run) => run_bot(config).await,
        Some(Commands::Trackers { json }) => {
            trackers_commands::handle_trackers(&config, json).await
        },
        Some(Commands::Doctor) => {
            doctor_commands::handle_doctor(&config, cli.config.as_deref()).await
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration};

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "hushwatch",
            "--state-path",
            "/tmp/hushwatch-state.json",
            "--port",
            "9999",
            "run",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(
            config.tracker.state_path,
            Some(PathBuf::from("/tmp/hushwatch-state.json"))
        );
        assert_eq!(config.health.port, 9999);
        assert!(matches!(cli.command, Some(Commands::Run)));
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let cli = Cli::parse_from(["hushwatch", "--config", missing.to_str().unwrap()]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn timing_and_limits_follow_config() {
        let mut config = HushwatchConfig::default();
        config.tracker.poll_interval_secs = 3;
        config.tracker.repeat_delay_ms = 250;
        config.tracker.max_repeat = Some(4);

        let timing = monitor_timing(&config);
        assert_eq!(timing.poll_interval, Duration::from_secs(3));
        assert_eq!(timing.repeat_delay, Duration::from_millis(250));
        assert_eq!(timing.stop_grace, Duration::from_secs(2));

        let limits = tracker_limits(&config);
        assert_eq!(limits.max_repeat, Some(4));
        assert_eq!(limits.max_timeout_minutes, None);
    }

    #[tokio::test]
    async fn missing_token_is_fatal() {
        let mut config = HushwatchConfig::default();
        config.discord.token = None;
        let err = run_bot(config).await.unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }
}
