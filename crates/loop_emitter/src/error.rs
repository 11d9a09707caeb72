//! Error types for the emitter and its async bridge

use crate::types::EventName;

/// Main error type for emitter operations
#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    /// Malformed argument passed to a subscribe/unsubscribe/emit operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A listener failed while an event was being dispatched
    #[error("Listener for '{event}' failed: {reason}")]
    ListenerInvocation { event: EventName, reason: String },

    /// The owning loop has gone away, the submission will never be delivered
    #[error("Async bridge closed, emission of '{0}' dropped")]
    BridgeClosed(EventName),

    /// The owning loop thread or its runtime could not be started
    #[error("Event loop startup failed: {0}")]
    LoopStartup(String),

    /// The owning loop thread panicked before it could be joined
    #[error("Event loop thread panicked")]
    LoopPanicked,

    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors a listener reports back to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListenerError {
    /// Listener returned an error
    #[error("{0}")]
    Failed(String),

    /// Listener panicked, the panic was caught at the invocation boundary
    #[error("panicked: {0}")]
    Panicked(String),
}

impl ListenerError {
    /// Shorthand for a `Failed` error with the given message
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed(message.into())
    }

    pub(crate) fn from_panic(panic_info: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "listener panicked with unknown payload".to_string()
        };

        ListenerError::Panicked(message)
    }
}

impl From<toml::de::Error> for EmitterError {
    fn from(err: toml::de::Error) -> Self {
        EmitterError::Config(err.to_string())
    }
}
