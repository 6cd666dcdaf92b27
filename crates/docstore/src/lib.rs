//! Document store over chat channels.
//!
//! A collection is a text channel, a document is a message whose body is the
//! JSON envelope of its payload, and the message id is the document id.
//! [`DocumentRepository`] turns CRUD calls into gateway primitives and
//! [`DocumentStore`] is the public entry point wiring it to a connection.

pub mod document;
pub mod envelope;
pub mod error;
pub mod merge;
pub mod repository;
pub mod store;

pub use {
    document::{Document, Lookup},
    error::{Error, Result},
    repository::DocumentRepository,
    store::DocumentStore,
};
