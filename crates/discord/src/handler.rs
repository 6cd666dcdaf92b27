//! Discord event handler for serenity.
//!
//! Only lifecycle events matter here: the handler opens the readiness gate
//! once the guild cache is usable.

use std::sync::Arc;

use {
    chanstore_channels::ReadinessGate,
    serenity::{
        all::{Context, EventHandler, GatewayIntents, GuildId, Ready, ResumedEvent},
        async_trait,
    },
    tracing::{debug, info, warn},
};

/// Handler for Discord gateway lifecycle events.
pub struct ReadyHandler {
    pub guild_id: u64,
    pub readiness: Arc<ReadinessGate>,
}

impl ReadyHandler {
    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for ReadyHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        if !ready.guilds.iter().any(|g| g.id.get() == self.guild_id) {
            warn!(
                guild_id = self.guild_id,
                "configured guild is not among the bot's guilds"
            );
        }

        // With no guilds there is nothing to cache and `cache_ready` never fires.
        if ready.guilds.is_empty() {
            self.readiness.mark_ready();
        }
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
        self.readiness.mark_ready();
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        debug!("discord session resumed");
        self.readiness.mark_ready();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_cover_guild_messages() {
        let intents = ReadyHandler::intents();
        assert!(intents.contains(GatewayIntents::GUILDS));
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(!intents.contains(GatewayIntents::DIRECT_MESSAGES));
    }
}
