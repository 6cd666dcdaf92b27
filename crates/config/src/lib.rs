//! Configuration loading, validation, and env substitution.
//!
//! Config files: `chanstore.toml`, `chanstore.yaml`, or `chanstore.json`
//! Searched in `./` then `~/.config/chanstore/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{ChanstoreConfig, DiscordConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
