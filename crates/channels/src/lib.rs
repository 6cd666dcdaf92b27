//! Channel/message gateway seam.
//!
//! A collection is backed by one text channel and each document by one
//! message in it. [`MessageGateway`] is the small set of primitives the
//! document layer needs from a chat platform; `chanstore-discord` provides
//! the real implementation and [`memory::InMemoryGateway`] a process-local
//! one.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod page;
pub mod readiness;

pub use {
    error::{Error, Result},
    gateway::{ChannelHandle, MessageGateway},
    page::{PAGE_SIZE, Page, RawMessage},
    readiness::{Readiness, ReadinessGate},
};
