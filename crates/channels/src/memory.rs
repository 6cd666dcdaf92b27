//! In-memory gateway for tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    gateway::{ChannelHandle, MessageGateway},
    page::{PAGE_SIZE, Page, RawMessage},
    readiness::ReadinessGate,
};

/// Ids start high enough to look like snowflakes in test output.
const FIRST_ID: u64 = 1_000;

/// Gateway backed by `HashMap`s. No persistence — for tests only.
///
/// Ids are allocated from one increasing counter, so message order by id is
/// creation order. Fetch cursors and edit/delete calls are recorded, and
/// edits or deletes can be made to fail on demand.
pub struct InMemoryGateway {
    state: Mutex<State>,
    readiness: ReadinessGate,
    scope_id: Option<u64>,
    fail_edits: AtomicBool,
    fail_deletes: AtomicBool,
    fetch_cursors: Mutex<Vec<Option<String>>>,
    edit_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

struct State {
    next_id: u64,
    channels: HashMap<String, MemoryChannel>,
}

struct MemoryChannel {
    id: String,
    messages: BTreeMap<u64, String>,
}

impl InMemoryGateway {
    /// A connected gateway with an empty guild.
    pub fn new() -> Self {
        let gateway = Self::pending();
        gateway.readiness.mark_ready();
        gateway
    }

    /// A gateway whose connection has not signalled ready yet.
    pub fn pending() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: FIRST_ID,
                channels: HashMap::new(),
            }),
            readiness: ReadinessGate::new(),
            scope_id: None,
            fail_edits: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fetch_cursors: Mutex::new(Vec::new()),
            edit_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// A ready gateway whose guild `scope_id` is missing, so every
    /// collection resolution fails.
    pub fn without_scope(scope_id: u64) -> Self {
        let mut gateway = Self::new();
        gateway.scope_id = Some(scope_id);
        gateway
    }

    pub fn mark_ready(&self) {
        self.readiness.mark_ready();
    }

    /// Simulate the connection ending before or after it became ready.
    pub fn mark_stopped(&self) {
        self.readiness.mark_stopped();
    }

    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Post a raw body directly, bypassing any envelope encoding.
    pub fn seed_raw(&self, collection: &str, body: &str) -> String {
        let mut state = self.lock_state();
        let id = state.allocate_id();
        state
            .channel_mut(collection)
            .messages
            .insert(id, body.to_string());
        id.to_string()
    }

    /// Current body of a stored message.
    pub fn stored_body(&self, collection: &str, id: &str) -> Option<String> {
        let id = id.parse::<u64>().ok()?;
        let state = self.lock_state();
        state.channels.get(collection)?.messages.get(&id).cloned()
    }

    /// Number of messages in a collection.
    pub fn message_count(&self, collection: &str) -> usize {
        self.lock_state()
            .channels
            .get(collection)
            .map_or(0, |c| c.messages.len())
    }

    /// Cursors passed to `fetch_page`, in call order.
    pub fn fetch_cursors(&self) -> Vec<Option<String>> {
        self.fetch_cursors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn edit_calls(&self) -> usize {
        self.edit_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn channel_mut(&mut self, name: &str) -> &mut MemoryChannel {
        let next_id = &mut self.next_id;
        self.channels.entry(name.to_string()).or_insert_with(|| {
            let id = *next_id;
            *next_id += 1;
            MemoryChannel {
                id: id.to_string(),
                messages: BTreeMap::new(),
            }
        })
    }

    fn existing_channel_mut(&mut self, channel: &ChannelHandle) -> Result<&mut MemoryChannel> {
        self.channels
            .get_mut(&channel.name)
            .filter(|c| c.id == channel.id)
            .ok_or_else(|| Error::invalid_input(format!("unknown channel: {}", channel.id)))
    }
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::invalid_input(format!("malformed message id: {raw}")))
}

#[async_trait]
impl MessageGateway for InMemoryGateway {
    async fn resolve_collection(&self, name: &str) -> Result<ChannelHandle> {
        if let Some(scope_id) = self.scope_id {
            return Err(Error::scope_not_found(scope_id));
        }
        let mut state = self.lock_state();
        let channel = state.channel_mut(name);
        Ok(ChannelHandle {
            id: channel.id.clone(),
            name: name.to_string(),
        })
    }

    async fn send(&self, channel: &ChannelHandle, text: &str) -> Result<String> {
        let mut state = self.lock_state();
        let id = state.allocate_id();
        state
            .existing_channel_mut(channel)?
            .messages
            .insert(id, text.to_string());
        Ok(id.to_string())
    }

    async fn fetch_page(&self, channel: &ChannelHandle, before: Option<&str>) -> Result<Page> {
        self.fetch_cursors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(before.map(str::to_string));

        let upper = before.map(parse_id).transpose()?.unwrap_or(u64::MAX);
        let mut state = self.lock_state();
        let channel = state.existing_channel_mut(channel)?;
        Ok(channel
            .messages
            .range(..upper)
            .rev()
            .take(PAGE_SIZE)
            .map(|(id, body)| RawMessage::new(id.to_string(), body.clone()))
            .collect())
    }

    async fn fetch_by_id(&self, channel: &ChannelHandle, id: &str) -> Option<RawMessage> {
        let key = parse_id(id).ok()?;
        let mut state = self.lock_state();
        let body = state.existing_channel_mut(channel).ok()?.messages.get(&key)?;
        Some(RawMessage::new(id, body.clone()))
    }

    async fn edit(&self, channel: &ChannelHandle, message: &RawMessage, text: &str) -> Result<()> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::unavailable("edit rejected"));
        }
        let key = parse_id(&message.id)?;
        let mut state = self.lock_state();
        let body = state
            .existing_channel_mut(channel)?
            .messages
            .get_mut(&key)
            .ok_or_else(|| Error::invalid_input(format!("unknown message: {}", message.id)))?;
        *body = text.to_string();
        Ok(())
    }

    async fn delete(&self, channel: &ChannelHandle, message: &RawMessage) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::unavailable("delete rejected"));
        }
        let key = parse_id(&message.id)?;
        let mut state = self.lock_state();
        state
            .existing_channel_mut(channel)?
            .messages
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| Error::invalid_input(format!("unknown message: {}", message.id)))
    }

    fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    async fn wait_until_ready(&self) {
        self.readiness.wait().await;
    }
}
