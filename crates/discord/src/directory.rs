//! Collection name to channel id resolution with create-on-miss.
//!
//! serenity only learns about a channel we created once the CHANNEL_CREATE
//! event arrives, so lookups in between would miss the cache and create a
//! duplicate. Channels created through this directory are remembered, and
//! creation is serialised so concurrent misses for one name create one
//! channel.

use std::{collections::HashMap, sync::RwLock};

use {
    chanstore_channels::Result,
    serenity::all::ChannelId,
    tokio::sync::Mutex,
    tracing::debug,
};

#[derive(Default)]
pub struct ChannelDirectory {
    created: RwLock<HashMap<String, ChannelId>>,
    create_lock: Mutex<()>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name`, trying channels created here first, then `cached`,
    /// and finally `create` under the creation lock.
    pub async fn resolve<C, F, Fut>(&self, name: &str, cached: C, create: F) -> Result<ChannelId>
    where
        C: Fn() -> Result<Option<ChannelId>>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ChannelId>>,
    {
        if let Some(id) = self.lookup(name, &cached)? {
            return Ok(id);
        }

        let _guard = self.create_lock.lock().await;
        // Another caller may have created it while we waited for the lock.
        if let Some(id) = self.lookup(name, &cached)? {
            return Ok(id);
        }

        let id = create().await?;
        debug!(collection = name, channel_id = %id, "remembering created channel");
        self.created
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), id);
        Ok(id)
    }

    /// Forget created channels; a fresh session's cache will hold them.
    pub fn clear(&self) {
        self.created
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn lookup<C>(&self, name: &str, cached: &C) -> Result<Option<ChannelId>>
    where
        C: Fn() -> Result<Option<ChannelId>>,
    {
        let created = self
            .created
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied();
        match created {
            Some(id) => Ok(Some(id)),
            None => cached(),
        }
    }
}
