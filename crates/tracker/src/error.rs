use {hushwatch_channels::ChannelId, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("channel {channel_id} is already tracked")]
    AlreadyTracked { channel_id: ChannelId },

    #[error("channel {channel_id} is not tracked")]
    NotTracked { channel_id: ChannelId },

    #[error("channel {channel_id} is a {kind} channel, trackers need a text channel")]
    InvalidChannelType {
        channel_id: ChannelId,
        kind: hushwatch_channels::ChannelKind,
    },

    #[error("failed to resolve channel {channel_id}: {source}")]
    ChannelResolution {
        channel_id: ChannelId,
        #[source]
        source: hushwatch_channels::Error,
    },

    #[error("failed to send to channel {channel_id}: {source}")]
    SendFailed {
        channel_id: ChannelId,
        #[source]
        source: hushwatch_channels::Error,
    },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn already_tracked(channel_id: ChannelId) -> Self {
        Self::AlreadyTracked { channel_id }
    }

    #[must_use]
    pub fn not_tracked(channel_id: ChannelId) -> Self {
        Self::NotTracked { channel_id }
    }

    #[must_use]
    pub fn invalid_channel_type(
        channel_id: ChannelId,
        kind: hushwatch_channels::ChannelKind,
    ) -> Self {
        Self::InvalidChannelType { channel_id, kind }
    }

    #[must_use]
    pub fn channel_resolution(channel_id: ChannelId, source: hushwatch_channels::Error) -> Self {
        Self::ChannelResolution { channel_id, source }
    }

    #[must_use]
    pub fn send_failed(channel_id: ChannelId, source: hushwatch_channels::Error) -> Self {
        Self::SendFailed { channel_id, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_channel() {
        assert_eq!(
            Error::already_tracked(42).to_string(),
            "channel 42 is already tracked"
        );
        assert_eq!(
            Error::invalid_channel_type(9, hushwatch_channels::ChannelKind::Voice).to_string(),
            "channel 9 is a voice channel, trackers need a text channel"
        );
    }
}
