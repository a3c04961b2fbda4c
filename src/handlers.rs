//! Routing of named client messages onto room operations.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RoomError;
use crate::room::{RoomEvent, RoomState};
use crate::types::*;

/// A handler receives the room, the id of the sending socket and the raw
/// payload.
pub type Handler = fn(&mut RoomState, &str, Value) -> Result<Vec<RoomEvent>, RoomError>;

/// Event name to handler.
pub const HANDLERS: &[(&str, Handler)] = &[
    (NEW_PLAYER_ENTER, on_player_enter as Handler),
    (START_GAME, on_start_game as Handler),
    (KEYWORD_INPUT, on_keyword_input as Handler),
];

pub fn lookup(event: &str) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(name, _)| *name == event)
        .map(|(_, handler)| *handler)
}

/// Apply a named client message to the room.
pub fn dispatch(
    state: &mut RoomState,
    sender: &str,
    event: &str,
    data: Value,
) -> Result<Vec<RoomEvent>, RoomError> {
    let handler = lookup(event).ok_or_else(|| RoomError::UnknownEvent(event.to_string()))?;
    handler(state, sender, data)
}

fn decode<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, RoomError> {
    serde_json::from_value(data).map_err(|source| RoomError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

fn on_player_enter(state: &mut RoomState, sender: &str, data: Value) -> Result<Vec<RoomEvent>, RoomError> {
    let body: PlayerEnter = decode(NEW_PLAYER_ENTER, data)?;
    let target = body.socket_id.as_deref().unwrap_or(sender);
    state.announce(target, body.player_name)
}

fn on_start_game(state: &mut RoomState, sender: &str, data: Value) -> Result<Vec<RoomEvent>, RoomError> {
    let body: Option<StartGame> = decode(START_GAME, data)?;
    tracing::info!(
        "Start requested by {}: {}",
        sender,
        body.unwrap_or_default().msg
    );
    Ok(state.start_game())
}

fn on_keyword_input(state: &mut RoomState, sender: &str, data: Value) -> Result<Vec<RoomEvent>, RoomError> {
    let body: KeywordInput = decode(KEYWORD_INPUT, data)?;
    let target = body.socket_id.as_deref().unwrap_or(sender);
    state.submit_keyword(target, body.keywords)
}
