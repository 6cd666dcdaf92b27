use std::error::Error as StdError;

/// Crate-wide result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid gateway input: {message}")]
    InvalidInput { message: String },

    /// The configured guild is not in the client cache.
    #[error("guild {scope_id} not found in cache")]
    ScopeNotFound { scope_id: u64 },

    /// No session: `connect()` was never called or the gateway was shut down.
    #[error("gateway is not connected")]
    NotConnected,

    /// Operation is currently unavailable.
    #[error("gateway operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from the chat platform client.
    #[error("gateway operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn scope_not_found(scope_id: u64) -> Self {
        Self::ScopeNotFound { scope_id }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
