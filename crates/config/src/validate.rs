//! Configuration validation.
//!
//! Checks a loaded [`ChanstoreConfig`] for values that would make the
//! Discord connection fail before any network call is attempted.

use secrecy::ExposeSecret;

use crate::{Error, Result, env_subst::has_placeholder, schema::ChanstoreConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "discord.guild_id"
    pub path: &'static str,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Collapse error diagnostics into a single [`Error::Invalid`].
    pub fn into_result(self) -> Result<()> {
        let errors: Vec<String> = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| format!("{}: {}", d.path, d.message))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid(errors.join("; ")))
        }
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Validate the settings needed to open a store connection.
#[must_use]
pub fn validate(config: &ChanstoreConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let token = config.discord.token.expose_secret();

    if token.trim().is_empty() {
        result.push(Severity::Error, "discord.token", "bot token is required");
    } else if has_placeholder(token) {
        result.push(
            Severity::Error,
            "discord.token",
            "unresolved environment placeholder",
        );
    } else if token.trim() != token {
        result.push(
            Severity::Warning,
            "discord.token",
            "token has leading or trailing whitespace",
        );
    }

    if config.discord.guild_id == 0 {
        result.push(Severity::Error, "discord.guild_id", "guild id is required");
    }

    result
}
