use async_trait::async_trait;

use crate::{
    Result,
    page::{Page, RawMessage},
};

/// A resolved collection: the backing text channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: String,
}

/// Channel/message primitives over a chat platform connection.
///
/// Implementations own the live connection. Every method except
/// [`fetch_by_id`](Self::fetch_by_id) surfaces platform failures to the
/// caller.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Find the text channel called `name` in the configured guild, creating
    /// it when missing.
    ///
    /// Fails with [`Error::ScopeNotFound`](crate::Error::ScopeNotFound) when
    /// the guild itself is unknown to the connection.
    async fn resolve_collection(&self, name: &str) -> Result<ChannelHandle>;

    /// Post `text` as a new message and return its id.
    async fn send(&self, channel: &ChannelHandle, text: &str) -> Result<String>;

    /// Up to [`PAGE_SIZE`](crate::PAGE_SIZE) messages strictly older than
    /// `before`, or the newest ones when `before` is `None`.
    async fn fetch_page(&self, channel: &ChannelHandle, before: Option<&str>) -> Result<Page>;

    /// Fetch one message. Not-found and transport errors both yield `None`.
    async fn fetch_by_id(&self, channel: &ChannelHandle, id: &str) -> Option<RawMessage>;

    /// Replace the body of `message`.
    async fn edit(&self, channel: &ChannelHandle, message: &RawMessage, text: &str) -> Result<()>;

    /// Remove `message` from the channel.
    async fn delete(&self, channel: &ChannelHandle, message: &RawMessage) -> Result<()>;

    /// Non-blocking readiness poll.
    fn is_ready(&self) -> bool;

    /// Suspend until the connection is established or has stopped. Safe to
    /// call repeatedly.
    async fn wait_until_ready(&self);
}
