//! Discord implementation of the channel/message gateway.
//!
//! Uses serenity to hold one bot session against a single guild. Text
//! channels of that guild are collections; their messages are documents.

pub mod directory;
pub mod gateway;
pub mod handler;
pub mod naming;

pub use {gateway::DiscordGateway, handler::ReadyHandler, naming::normalize_channel_name};
