use crate::EventType;

/// Result alias that carries the custom [`CupStackError`] type.
pub type Result<T> = std::result::Result<T, CupStackError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum CupStackError {
    /// Free-form failure, mostly used for poisoned shared state.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors raised by the file backend.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Stored data could not be encoded or decoded.
    #[error("malformed stored data: {0}")]
    Json(#[from] serde_json::Error),
    /// The key does not name one of the fixed event types.
    #[error("unknown event type `{0}`")]
    UnknownEvent(String),
    /// A selected competitor id is not registered.
    #[error("unknown competitor `{0}`")]
    UnknownCompetitor(String),
    /// The number of selected competitors does not fit the event.
    #[error("{event} cannot be timed with {count} competitor(s)")]
    InvalidSelection { event: EventType, count: usize },
}

impl CupStackError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
