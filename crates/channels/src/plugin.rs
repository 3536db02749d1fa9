use async_trait::async_trait;

use crate::Result;

/// Stable platform identifier of a channel.
pub type ChannelId = u64;

/// Coarse classification of a channel, enough to decide whether a tracker
/// may live there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// A regular text channel in a guild/workspace.
    Text,
    Voice,
    Thread,
    /// Direct or group message conversation.
    Direct,
    Other,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Thread => "thread",
            Self::Direct => "direct",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// A resolved, live channel the engine can post into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: ChannelId,
    pub kind: ChannelKind,
}

impl ChannelHandle {
    pub fn new(id: ChannelId, kind: ChannelKind) -> Self {
        Self { id, kind }
    }

    /// Shorthand for a text channel handle.
    pub fn text(id: ChannelId) -> Self {
        Self::new(id, ChannelKind::Text)
    }

    pub fn is_text(&self) -> bool {
        self.kind == ChannelKind::Text
    }
}

/// Outbound side of a chat platform: channel lookup and message delivery.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Resolve a channel id to a live handle. Adapters should consult their
    /// local cache before asking the remote API.
    async fn resolve_channel(&self, channel_id: ChannelId) -> Result<ChannelHandle>;

    /// Post a plain-text message into the channel.
    async fn send_text(&self, channel: &ChannelHandle, text: &str) -> Result<()>;
}
