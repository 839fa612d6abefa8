//! Error types for planwatch

use thiserror::Error;

/// Result type alias for planwatch operations
pub type WatchResult<T> = Result<T, WatchError>;

/// Error types for the capture and correlation pipeline.
///
/// All of these are contained inside the engine: they are logged and mapped
/// to a fallback (dropped event, unresolved placeholder, empty plan) and
/// never cross the dispatcher boundary.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A bind event arrived with no open statement to attach to
    #[error("Attribution error: {0}")]
    Attribution(String),

    /// A bind payload did not match the expected value/type shape
    #[error("Formatting error: {0}")]
    Formatting(String),

    /// The dialect's explain query failed
    #[error("Plan provider error: {0}")]
    PlanProvider(String),

    /// No explain facility exists for the configured database
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// The explain round trip exceeded the configured timeout
    #[error("Plan query timeout after {0:?}")]
    Timeout(std::time::Duration),
}

impl WatchError {
    /// Create an attribution error
    pub fn attribution(message: impl Into<String>) -> Self {
        Self::Attribution(message.into())
    }

    /// Create a formatting error
    pub fn formatting(message: impl Into<String>) -> Self {
        Self::Formatting(message.into())
    }

    /// Create a plan provider error
    pub fn plan_provider(message: impl Into<String>) -> Self {
        Self::PlanProvider(message.into())
    }

    /// Check if this is an attribution error
    pub fn is_attribution(&self) -> bool {
        matches!(self, Self::Attribution(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
