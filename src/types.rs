use serde::{Deserialize, Serialize};

/// Name a player carries until they announce themselves.
pub const DEFAULT_PLAYER_NAME: &str = "newplayer";

// Inbound event names.
pub const NEW_PLAYER_ENTER: &str = "new-player-enter";
pub const START_GAME: &str = "start-game";
pub const KEYWORD_INPUT: &str = "keyword-input";

/// The two keywords a player contributes to the story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    #[serde(rename = "mainKey")]
    pub primary: String,
    #[serde(rename = "subKey")]
    pub secondary: String,
}

impl Keywords {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Both halves have been filled in.
    pub fn is_complete(&self) -> bool {
        !self.primary.is_empty() && !self.secondary.is_empty()
    }
}

/// A connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(rename = "playerName")]
    pub display_name: String,
    #[serde(rename = "socketId")]
    pub connection_id: String,
    pub is_host: bool,
    pub is_ready: bool,
    #[serde(rename = "keywords")]
    pub keyword_pair: Keywords,
}

impl Player {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            display_name: DEFAULT_PLAYER_NAME.to_string(),
            connection_id: connection_id.into(),
            is_host: false,
            is_ready: false,
            keyword_pair: Keywords::default(),
        }
    }
}

/// Advisory room phase, derived from the messages the room has emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RoomPhase {
    #[default]
    Empty,
    Populating,
    KeywordInput,
    StoryStart,
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "EMPTY"),
            Self::Populating => write!(f, "POPULATING"),
            Self::KeywordInput => write!(f, "KEYWORD_INPUT"),
            Self::StoryStart => write!(f, "STORY_START"),
        }
    }
}

/// Messages sent from server to clients via WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMsg {
    UpdateRoomInfo {
        msg: String,
        players: Vec<Player>,
    },
    #[serde(rename_all = "camelCase")]
    GameState {
        msg: String,
        is_keyword_input_state: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_story_start: Option<bool>,
    },
    /// Transport handshake telling a socket its own connection id.
    #[serde(rename_all = "camelCase")]
    Connected { socket_id: String },
}

/// Envelope of every message a client sends.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of `new-player-enter`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEnter {
    pub player_name: String,
    #[serde(default)]
    pub socket_id: Option<String>,
}

/// Payload of `start-game`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartGame {
    #[serde(default)]
    pub msg: String,
}

/// Payload of `keyword-input`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordInput {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub socket_id: Option<String>,
    pub keywords: Keywords,
}
