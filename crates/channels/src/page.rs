/// Maximum number of messages the platform returns per history fetch.
pub const PAGE_SIZE: usize = 100;

/// A message as the document layer sees it: platform id plus raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: String,
    pub body: String,
}

impl RawMessage {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }
}

/// One batch of a paginated history fetch.
///
/// Messages are kept in the order the platform returned them, newest first.
/// The final element is therefore the oldest message of the batch and its id
/// is the cursor for the next (older) page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    messages: Vec<RawMessage>,
}

impl Page {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self { messages }
    }

    /// Id of the last message in sequence order, used as the next cursor.
    pub fn last_id(&self) -> Option<&str> {
        self.messages.last().map(|m| m.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// A page shorter than [`PAGE_SIZE`] means history is exhausted.
    pub fn is_last(&self) -> bool {
        self.messages.len() < PAGE_SIZE
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawMessage> {
        self.messages.iter()
    }
}

impl IntoIterator for Page {
    type IntoIter = std::vec::IntoIter<RawMessage>;
    type Item = RawMessage;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl FromIterator<RawMessage> for Page {
    fn from_iter<I: IntoIterator<Item = RawMessage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
