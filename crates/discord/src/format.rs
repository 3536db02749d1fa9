//! User-facing reply text.

use {
    hushwatch_channels::ChannelId,
    hushwatch_tracker::{TrackerSettings, TrackerSummary},
};

/// Discord message size limit, in characters.
pub const DISCORD_MAX_MESSAGE_LEN: usize = 2000;

/// Longest reminder text accepted by `/start`. Leaves room for the
/// confirmation wording around the message.
pub const MAX_REMINDER_LEN: u16 = 1800;

pub const NO_TRACKERS: &str = "No active trackers.";
pub const TEXT_CHANNELS_ONLY: &str = "This command only works in text channels.";
pub const ALREADY_TRACKED: &str = "A tracker is already running in this channel.";
pub const STOPPED: &str = "Tracker stopped.";
pub const NOTHING_TO_STOP: &str = "Nothing to stop.";
pub const CHANNEL_UNAVAILABLE: &str = "Could not look up this channel, try again later.";
pub const INTERNAL_ERROR: &str = "Something went wrong, try again later.";
pub const UNKNOWN_COMMAND: &str = "Unknown command.";

pub fn reminder_too_long(len: usize) -> String {
    format!("The message is {len} characters long, the limit is {MAX_REMINDER_LEN}.")
}

/// Channel mention that Discord renders as a link.
pub fn mention(channel_id: ChannelId) -> String {
    format!("<#{channel_id}>")
}

pub fn start_confirmation(settings: &TrackerSettings) -> String {
    format!(
        "If there are no messages for {} {}, I'll send \"{}\" {} {}.",
        settings.timeout_minutes,
        plural(settings.timeout_minutes, "minute", "minutes"),
        settings.message,
        settings.repeat,
        plural(u64::from(settings.repeat), "time", "times"),
    )
}

pub fn tracker_line(summary: &TrackerSummary) -> String {
    format!(
        "{}: message \"{}\", timeout {} min, repeats {}",
        mention(summary.channel_id),
        summary.message,
        summary.timeout_minutes,
        summary.repeat,
    )
}

/// One line per tracker, or [`NO_TRACKERS`].
pub fn tracker_list(summaries: &[TrackerSummary]) -> String {
    if summaries.is_empty() {
        return NO_TRACKERS.to_string();
    }
    summaries
        .iter()
        .map(tracker_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn plural(n: u64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Whole lines are packed together where possible; a line longer than the
/// limit is cut at character boundaries.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let sep = usize::from(!current.is_empty());

        if current_len + sep + line_len <= max_chars {
            if sep == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += sep + line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        let mut chars = line.chars().peekable();
        while chars.peek().is_some() {
            let piece: String = chars.by_ref().take(max_chars).collect();
            let piece_len = piece.chars().count();
            if piece_len == max_chars && chars.peek().is_some() {
                chunks.push(piece);
            } else {
                current = piece;
                current_len = piece_len;
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
