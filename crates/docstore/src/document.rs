use serde::{Deserialize, Serialize};

/// A stored payload together with the id of the message holding it.
///
/// Serialises flattened, so a `Document<User>` looks like
/// `{"id": "...", "name": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Document<T> {
    pub fn new(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Outcome of a point lookup.
///
/// Keeps "no such message" apart from "message body is not a valid
/// envelope"; the public find methods fold both into `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(Document<T>),
    NotFound,
    Corrupt,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<Document<T>> {
        match self {
            Self::Found(doc) => Some(doc),
            Self::NotFound | Self::Corrupt => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}
