use std::sync::{Arc, RwLock};

use {
    async_trait::async_trait,
    hushwatch_channels::{ChannelHandle, ChannelId, ChannelKind, ChannelOutbound, Error, Result},
    serenity::all::{Cache, Channel, ChannelId as DiscordChannelId, ChannelType, Http},
    tracing::debug,
};

/// Gateway handles captured on `ready`.
#[derive(Clone)]
struct Handles {
    cache: Arc<Cache>,
    http: Arc<Http>,
}

/// Delivers tracker reminders and resolves channels through serenity.
///
/// Unusable until the gateway reports ready; calls before that fail with
/// [`Error::Unavailable`].
#[derive(Default)]
pub struct DiscordOutbound {
    handles: RwLock<Option<Handles>>,
}

impl DiscordOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the client handles. Called again after reconnects.
    pub fn attach(&self, cache: Arc<Cache>, http: Arc<Http>) {
        *self.handles.write().unwrap_or_else(|e| e.into_inner()) = Some(Handles { cache, http });
    }

    pub fn is_attached(&self) -> bool {
        self.handles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn handles(&self) -> Result<Handles> {
        self.handles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| Error::unavailable("discord client is not ready"))
    }
}

/// Map a serenity channel to the kinds the tracker cares about.
pub fn channel_kind(channel: &Channel) -> ChannelKind {
    match channel {
        Channel::Guild(guild) => match guild.kind {
            ChannelType::Text | ChannelType::News => ChannelKind::Text,
            ChannelType::Voice | ChannelType::Stage => ChannelKind::Voice,
            ChannelType::NewsThread | ChannelType::PublicThread | ChannelType::PrivateThread => {
                ChannelKind::Thread
            },
            _ => ChannelKind::Other,
        },
        Channel::Private(_) => ChannelKind::Direct,
        _ => ChannelKind::Other,
    }
}

#[async_trait]
impl ChannelOutbound for DiscordOutbound {
    /// Looks in the cache first and falls back to the HTTP API.
    async fn resolve_channel(&self, channel_id: ChannelId) -> Result<ChannelHandle> {
        if channel_id == 0 {
            return Err(Error::channel_not_found(channel_id));
        }
        let Handles { cache, http } = self.handles()?;
        let channel = DiscordChannelId::new(channel_id)
            .to_channel((&cache, &*http))
            .await
            .map_err(|e| Error::external(format!("resolve channel {channel_id}"), e))?;

        let kind = channel_kind(&channel);
        debug!(channel_id, %kind, "resolved channel");
        Ok(ChannelHandle::new(channel_id, kind))
    }

    async fn send_text(&self, channel: &ChannelHandle, text: &str) -> Result<()> {
        let Handles { http, .. } = self.handles()?;
        DiscordChannelId::new(channel.id)
            .say(&*http, text)
            .await
            .map_err(|e| Error::external("send message", e))?;
        Ok(())
    }
}
