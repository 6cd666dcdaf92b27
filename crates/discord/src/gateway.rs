use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use {
    async_trait::async_trait,
    chanstore_channels::{
        ChannelHandle, Error, MessageGateway, PAGE_SIZE, Page, RawMessage, ReadinessGate, Result,
    },
    chanstore_config::DiscordConfig,
    secrecy::ExposeSecret,
    serenity::{
        all::{
            ChannelId, ChannelType, Client, CreateChannel, CreateMessage, EditMessage,
            GetMessages, GuildId, MessageId,
        },
        cache::Cache,
        gateway::ShardManager,
        http::Http,
    },
    tokio::{sync::Mutex, task::JoinHandle},
    tracing::{debug, error, info, warn},
};

use crate::{
    directory::ChannelDirectory,
    handler::ReadyHandler,
    naming::{find_text_channel, normalize_channel_name},
};

/// Discord caps a history fetch at 100 messages.
const DISCORD_PAGE_LIMIT: u8 = 100;
const _: () = assert!(PAGE_SIZE == DISCORD_PAGE_LIMIT as usize);

/// How long `shutdown` waits for the shard runner before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Gateway over a serenity bot session scoped to one guild.
///
/// Construction performs no I/O; call [`connect`](Self::connect) to start
/// the session and [`shutdown`](Self::shutdown) to stop it.
pub struct DiscordGateway {
    config: DiscordConfig,
    readiness: Arc<ReadinessGate>,
    directory: ChannelDirectory,
    connect_lock: Mutex<()>,
    /// std::sync::RwLock because the session is only cloned out of the lock,
    /// never held across `.await` points.
    session: RwLock<Option<Session>>,
}

/// Live client handles captured at connect time.
struct Session {
    http: Arc<Http>,
    cache: Arc<Cache>,
    shard_manager: Arc<ShardManager>,
    runner: JoinHandle<()>,
}

impl Session {
    /// The shard runner has exited, e.g. after a rejected token.
    fn is_finished(&self) -> bool {
        self.runner.is_finished()
    }

    async fn close(self) {
        self.shard_manager.shutdown_all().await;
        let mut runner = self.runner;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut runner)
            .await
            .is_err()
        {
            warn!("discord shard runner did not stop in time, aborting");
            runner.abort();
        }
    }
}

impl DiscordGateway {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            readiness: Arc::new(ReadinessGate::new()),
            directory: ChannelDirectory::new(),
            connect_lock: Mutex::new(()),
            session: RwLock::new(None),
        }
    }

    pub fn guild_id(&self) -> u64 {
        self.config.guild_id
    }

    /// Whether a session exists and its shard runner is still going.
    pub fn is_connected(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    /// Build the serenity client and start its shard runner in the
    /// background. Readiness is signalled later by [`ReadyHandler`].
    pub async fn connect(&self) -> Result<()> {
        // Held for the whole call so two connects never race on the slot.
        let _connecting = self.connect_lock.lock().await;
        if self.is_connected() {
            return Err(Error::unavailable("discord gateway already connected"));
        }

        let token = self.config.token.expose_secret();
        if token.trim().is_empty() {
            return Err(Error::invalid_input("discord bot token is required"));
        }

        info!(guild_id = self.config.guild_id, "connecting discord gateway");
        self.readiness.mark_not_ready();

        let handler = ReadyHandler {
            guild_id: self.config.guild_id,
            readiness: Arc::clone(&self.readiness),
        };
        let mut client = Client::builder(token.trim(), ReadyHandler::intents())
            .event_handler(handler)
            .await
            .map_err(|e| Error::external("build discord client", e))?;

        let http = Arc::clone(&client.http);
        let cache = Arc::clone(&client.cache);
        let shard_manager = Arc::clone(&client.shard_manager);

        let readiness = Arc::clone(&self.readiness);
        let runner = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!(error = %e, "discord client stopped");
            } else {
                debug!("discord client stopped");
            }
            readiness.mark_stopped();
        });

        let session = Session {
            http,
            cache,
            shard_manager,
            runner,
        };

        // A session whose runner already exited is replaced.
        let dead = self
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(session);
        if let Some(dead) = dead {
            debug!("replacing stopped discord session");
            dead.close().await;
        }

        Ok(())
    }

    /// Stop all shards and drop the session. No-op when not connected.
    pub async fn shutdown(&self) {
        let session = self
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(session) = session else {
            debug!("discord gateway not connected, nothing to shut down");
            return;
        };

        info!(guild_id = self.config.guild_id, "shutting down discord gateway");
        session.close().await;
        self.directory.clear();
        self.readiness.mark_stopped();
    }

    fn handles(&self) -> Result<(Arc<Http>, Arc<Cache>)> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session
            .as_ref()
            .filter(|s| !s.is_finished())
            .map(|s| (Arc::clone(&s.http), Arc::clone(&s.cache)))
            .ok_or(Error::NotConnected)
    }

    fn http(&self) -> Result<Arc<Http>> {
        self.handles().map(|(http, _)| http)
    }

    fn scope(&self) -> Result<GuildId> {
        match self.config.guild_id {
            0 => Err(Error::scope_not_found(0)),
            id => Ok(GuildId::new(id)),
        }
    }
}

fn parse_snowflake(raw: &str, what: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::invalid_input(format!("malformed {what} id: {raw}"))),
        Ok(id) => Ok(id),
    }
}

fn channel_id(channel: &ChannelHandle) -> Result<ChannelId> {
    parse_snowflake(&channel.id, "channel").map(ChannelId::new)
}

fn message_id(raw: &str) -> Result<MessageId> {
    parse_snowflake(raw, "message").map(MessageId::new)
}

#[async_trait]
impl MessageGateway for DiscordGateway {
    async fn resolve_collection(&self, name: &str) -> Result<ChannelHandle> {
        let name = normalize_channel_name(name)?;
        let (http, cache) = self.handles()?;
        let guild_id = self.scope()?;

        let cached = || -> Result<Option<ChannelId>> {
            // The cache guard must not live across the create call below.
            let guild = cache
                .guild(guild_id)
                .ok_or_else(|| Error::scope_not_found(self.config.guild_id))?;
            Ok(find_text_channel(
                guild
                    .channels
                    .values()
                    .map(|c| (c.id, c.name.as_str(), c.kind)),
                &name,
            ))
        };
        let create = || async {
            info!(collection = %name, guild_id = self.config.guild_id, "creating collection channel");
            guild_id
                .create_channel(&*http, CreateChannel::new(name.as_str()).kind(ChannelType::Text))
                .await
                .map(|channel| channel.id)
                .map_err(|e| Error::external(format!("create channel {name}"), e))
        };

        let id = self.directory.resolve(&name, cached, create).await?;
        Ok(ChannelHandle {
            id: id.to_string(),
            name,
        })
    }

    async fn send(&self, channel: &ChannelHandle, text: &str) -> Result<String> {
        let http = self.http()?;
        let message = channel_id(channel)?
            .send_message(&*http, CreateMessage::new().content(text))
            .await
            .map_err(|e| Error::external("send message", e))?;
        debug!(collection = %channel.name, message_id = %message.id, "message sent");
        Ok(message.id.to_string())
    }

    async fn fetch_page(&self, channel: &ChannelHandle, before: Option<&str>) -> Result<Page> {
        let http = self.http()?;
        let mut request = GetMessages::new().limit(DISCORD_PAGE_LIMIT);
        if let Some(before) = before {
            request = request.before(message_id(before)?);
        }

        let messages = channel_id(channel)?
            .messages(&*http, request)
            .await
            .map_err(|e| Error::external("fetch message page", e))?;
        debug!(
            collection = %channel.name,
            before = ?before,
            count = messages.len(),
            "fetched message page"
        );

        Ok(messages
            .into_iter()
            .map(|m| RawMessage::new(m.id.to_string(), m.content))
            .collect())
    }

    async fn fetch_by_id(&self, channel: &ChannelHandle, id: &str) -> Option<RawMessage> {
        let lookup = async {
            let http = self.http()?;
            let message = channel_id(channel)?
                .message(&*http, message_id(id)?)
                .await
                .map_err(|e| Error::external("fetch message", e))?;
            Ok::<_, Error>(message)
        };

        match lookup.await {
            Ok(message) => Some(RawMessage::new(message.id.to_string(), message.content)),
            Err(e) => {
                debug!(collection = %channel.name, message_id = id, error = %e, "message lookup failed");
                None
            },
        }
    }

    async fn edit(&self, channel: &ChannelHandle, message: &RawMessage, text: &str) -> Result<()> {
        let http = self.http()?;
        channel_id(channel)?
            .edit_message(&*http, message_id(&message.id)?, EditMessage::new().content(text))
            .await
            .map(|_| ())
            .map_err(|e| Error::external("edit message", e))
    }

    async fn delete(&self, channel: &ChannelHandle, message: &RawMessage) -> Result<()> {
        let http = self.http()?;
        channel_id(channel)?
            .delete_message(&*http, message_id(&message.id)?)
            .await
            .map_err(|e| Error::external("delete message", e))
    }

    fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    async fn wait_until_ready(&self) {
        self.readiness.wait().await;
    }
}
