//! Discord event handler for serenity.
//!
//! Feeds gateway events into the tracker registry and dispatches slash
//! commands.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    hushwatch_config::DiscordConfig,
    hushwatch_tracker::TrackerRegistry,
    serenity::{
        all::{
            Command, Context, EventHandler, GatewayIntents, Interaction, Message, Ready,
            ResumedEvent,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use crate::{
    commands::{self, CommandRequest, Reply},
    format,
    outbound::DiscordOutbound,
    respond,
};

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    registry: Arc<TrackerRegistry>,
    outbound: Arc<DiscordOutbound>,
    sync_commands: bool,
    reply_chunk_len: usize,
    /// Set on ready; 0 until then.
    bot_user_id: AtomicU64,
}

impl DiscordHandler {
    pub fn new(
        registry: Arc<TrackerRegistry>,
        outbound: Arc<DiscordOutbound>,
        config: &DiscordConfig,
        reply_chunk_len: usize,
    ) -> Self {
        Self {
            registry,
            outbound,
            sync_commands: config.sync_commands,
            reply_chunk_len,
            bot_user_id: AtomicU64::new(0),
        }
    }

    /// Required gateway intents for the bot. Message content is not needed,
    /// only the fact that someone posted.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES
    }

    fn is_self(&self, user_id: u64) -> bool {
        let bot = self.bot_user_id.load(Ordering::SeqCst);
        bot != 0 && bot == user_id
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
        self.bot_user_id
            .store(ready.user.id.get(), Ordering::SeqCst);
        self.outbound
            .attach(Arc::clone(&ctx.cache), Arc::clone(&ctx.http));

        self.registry.restore().await;

        if !self.sync_commands {
            debug!("slash command sync disabled");
            return;
        }
        match Command::set_global_commands(&ctx.http, commands::definitions()).await {
            Ok(registered) => info!(commands = registered.len(), "slash commands synced"),
            Err(e) => warn!(error = %e, "failed to sync slash commands"),
        }
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        self.registry.resume_all().await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let actor_is_self = self.is_self(msg.author.id.get());
        self.registry
            .notify_activity(msg.channel_id.get(), actor_is_self)
            .await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let request = {
            let options = command.data.options();
            let args = commands::collect_args(&options);
            CommandRequest::parse(&command.data.name, &args)
        };
        let Some(request) = request else {
            warn!(command = %command.data.name, "unknown slash command");
            respond::send_replies(&ctx.http, &command, &[Reply::ephemeral(
                format::UNKNOWN_COMMAND,
            )])
            .await;
            return;
        };

        let channel_id = command.channel_id.get();
        debug!(command = %command.data.name, channel_id, "handling slash command");
        let replies = commands::run(
            &self.registry,
            self.outbound.as_ref(),
            channel_id,
            request,
            self.reply_chunk_len,
        )
        .await;
        respond::send_replies(&ctx.http, &command, &replies).await;
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hushwatch_tracker::store_memory::InMemoryStore};

    fn handler() -> DiscordHandler {
        let outbound = Arc::new(DiscordOutbound::new());
        let registry = TrackerRegistry::new(Arc::new(InMemoryStore::new()), outbound.clone());
        DiscordHandler::new(registry, outbound, &DiscordConfig::default(), 1900)
    }

    #[tokio::test]
    async fn self_detection_requires_ready() {
        let handler = handler();
        assert!(!handler.is_self(0));
        assert!(!handler.is_self(42));

        handler.bot_user_id.store(42, Ordering::SeqCst);
        assert!(handler.is_self(42));
        assert!(!handler.is_self(7));
    }

    #[test]
    fn intents_cover_messages_and_guilds() {
        let intents = DiscordHandler::intents();
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(intents.contains(GatewayIntents::GUILDS));
        assert!(!intents.contains(GatewayIntents::MESSAGE_CONTENT));
    }
}
