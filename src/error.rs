use thiserror::Error;

/// Errors raised while applying an inbound event to the room.
///
/// None of these are fatal: the room task logs them and drops the event.
#[derive(Debug, Error)]
pub enum RoomError {
    /// The addressed connection is not in the registry, usually because a
    /// late message raced its own disconnect.
    #[error("connection {0} not found in room")]
    NotFound(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("invalid payload for {event}: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}")]
    InvalidNumber { name: &'static str, value: String },
}
