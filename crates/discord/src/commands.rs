//! `/start`, `/stop` and `/list` slash commands.
//!
//! Parsing and execution are independent of serenity's interaction types so
//! the command flow can be exercised without a gateway connection.

use {
    hushwatch_channels::{ChannelId, ChannelOutbound},
    hushwatch_tracker::{Error as TrackerError, TrackerRegistry, TrackerSpec},
    serenity::all::{
        CommandOptionType, CreateCommand, CreateCommandOption, ResolvedOption, ResolvedValue,
    },
    tracing::warn,
};

use crate::format;

pub const START: &str = "start";
pub const STOP: &str = "stop";
pub const LIST: &str = "list";

const OPT_MESSAGE: &str = "message";
const OPT_TIMEOUT: &str = "timeout_minutes";
const OPT_REPEAT: &str = "repeat";

/// Global command definitions registered on ready.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(START)
            .description("Post a reminder when this channel goes quiet")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, OPT_MESSAGE, "Text to send")
                    .min_length(1)
                    .max_length(format::MAX_REMINDER_LEN)
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    OPT_TIMEOUT,
                    "Minutes of silence before sending",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    OPT_REPEAT,
                    "How many times to send it",
                )
                .required(true),
            ),
        CreateCommand::new(STOP).description("Stop the tracker in this channel"),
        CreateCommand::new(LIST).description("Show active trackers"),
    ]
}

/// Option value the commands understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    Str(&'a str),
    Int(i64),
}

/// Flatten serenity's resolved options into name/value pairs.
pub fn collect_args<'a>(options: &'a [ResolvedOption<'_>]) -> Vec<(&'a str, Arg<'a>)> {
    options
        .iter()
        .filter_map(|opt| {
            let arg = match &opt.value {
                ResolvedValue::String(s) => Arg::Str(s),
                ResolvedValue::Integer(i) => Arg::Int(*i),
                _ => return None,
            };
            Some((opt.name, arg))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRequest {
    Start(TrackerSpec),
    Stop,
    List,
}

impl CommandRequest {
    /// Build a request from a command name and its options. Returns `None`
    /// for unknown commands or a `start` missing one of its options.
    pub fn parse(name: &str, args: &[(&str, Arg<'_>)]) -> Option<Self> {
        match name {
            START => {
                let message = find_str(args, OPT_MESSAGE)?;
                let timeout_minutes = find_int(args, OPT_TIMEOUT)?;
                let repeat = find_int(args, OPT_REPEAT)?;
                Some(Self::Start(TrackerSpec::new(
                    message,
                    timeout_minutes,
                    repeat,
                )))
            },
            STOP => Some(Self::Stop),
            LIST => Some(Self::List),
            _ => None,
        }
    }
}

fn find_str<'a>(args: &[(&str, Arg<'a>)], name: &str) -> Option<&'a str> {
    args.iter().find_map(|(n, arg)| match arg {
        Arg::Str(s) if *n == name => Some(*s),
        _ => None,
    })
}

fn find_int(args: &[(&str, Arg<'_>)], name: &str) -> Option<i64> {
    args.iter().find_map(|(n, arg)| match arg {
        Arg::Int(i) if *n == name => Some(*i),
        _ => None,
    })
}

/// One message to send back to the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// Execute `request` issued in `channel_id` and produce the replies.
pub async fn run(
    registry: &TrackerRegistry,
    outbound: &dyn ChannelOutbound,
    channel_id: ChannelId,
    request: CommandRequest,
    chunk_len: usize,
) -> Vec<Reply> {
    match request {
        CommandRequest::Start(spec) => vec![start(registry, outbound, channel_id, spec).await],
        CommandRequest::Stop => vec![stop(registry, channel_id).await],
        CommandRequest::List => list(registry, chunk_len).await,
    }
}

async fn start(
    registry: &TrackerRegistry,
    outbound: &dyn ChannelOutbound,
    channel_id: ChannelId,
    spec: TrackerSpec,
) -> Reply {
    let len = spec.message.chars().count();
    if len > usize::from(format::MAX_REMINDER_LEN) {
        return Reply::ephemeral(format::reminder_too_long(len));
    }
    let channel = match outbound.resolve_channel(channel_id).await {
        Ok(channel) => channel,
        Err(e) => {
            warn!(channel_id, error = %e, "could not resolve command channel");
            return Reply::ephemeral(format::CHANNEL_UNAVAILABLE);
        },
    };
    match registry.start(channel, spec).await {
        Ok(tracker) => Reply::public(format::start_confirmation(tracker.settings())),
        Err(e) => rejection(&e),
    }
}

async fn stop(registry: &TrackerRegistry, channel_id: ChannelId) -> Reply {
    match registry.stop(channel_id).await {
        Ok(()) => Reply::public(format::STOPPED),
        Err(e) => rejection(&e),
    }
}

async fn list(registry: &TrackerRegistry, chunk_len: usize) -> Vec<Reply> {
    let summaries = registry.list().await;
    if summaries.is_empty() {
        return vec![Reply::ephemeral(format::NO_TRACKERS)];
    }
    format::chunk_message(&format::tracker_list(&summaries), chunk_len)
        .into_iter()
        .map(Reply::public)
        .collect()
}

fn rejection(error: &TrackerError) -> Reply {
    match error {
        TrackerError::AlreadyTracked { .. } => Reply::ephemeral(format::ALREADY_TRACKED),
        TrackerError::InvalidChannelType { .. } => Reply::ephemeral(format::TEXT_CHANNELS_ONLY),
        TrackerError::NotTracked { .. } => Reply::public(format::NOTHING_TO_STOP),
        other => {
            warn!(error = %other, "command failed");
            Reply::ephemeral(format::INTERNAL_ERROR)
        },
    }
}
