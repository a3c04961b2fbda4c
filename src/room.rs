use rand::Rng;
use tokio::sync::{broadcast, mpsc};

use crate::error::RoomError;
use crate::handlers;
use crate::types::*;

/// Commands the WebSocket handler sends to the room task.
#[derive(Debug, Clone)]
pub enum RoomCommand {
    Connect {
        connection_id: String,
    },
    Disconnect {
        connection_id: String,
    },
    /// A named client message, routed through the handler table.
    Event {
        connection_id: String,
        event: String,
        data: serde_json::Value,
    },
}

/// Notifications the room publishes to WebSocket connections.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Send a message to a specific socket.
    SendTo { connection_id: String, msg: ServerMsg },
    /// Broadcast a message to every socket in the room.
    Broadcast { msg: ServerMsg },
}

/// The room registry and every transition on it.
///
/// Each operation runs to completion against the in-memory player list and
/// returns the notifications it produced. Callers must serialize access; the
/// room task does so by owning the only instance.
#[derive(Debug, Default)]
pub struct RoomState {
    players: Vec<Player>,
    phase: RoomPhase,
}

impl RoomState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every player and return to the initial phase.
    pub fn reset(&mut self) {
        self.players.clear();
        self.set_phase(RoomPhase::Empty);
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, connection_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.connection_id == connection_id)
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    fn index_of(&self, connection_id: &str) -> Result<usize, RoomError> {
        self.players
            .iter()
            .position(|p| p.connection_id == connection_id)
            .ok_or_else(|| RoomError::NotFound(connection_id.to_string()))
    }

    fn set_phase(&mut self, phase: RoomPhase) {
        if self.phase != phase {
            tracing::info!("Room phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Make the earliest remaining player host, unconditionally.
    fn elect_host(&mut self) {
        for (i, player) in self.players.iter_mut().enumerate() {
            player.is_host = i == 0;
        }
        if let Some(host) = self.players.first() {
            tracing::info!("Host is now {} ({})", host.display_name, host.connection_id);
        }
    }

    fn room_info(&self, msg: &str) -> RoomEvent {
        tracing::debug!("Players: {:?}", self.players);
        RoomEvent::Broadcast {
            msg: ServerMsg::UpdateRoomInfo {
                msg: msg.to_string(),
                players: self.players.clone(),
            },
        }
    }

    /// Register a freshly connected client. Emits nothing; the client is
    /// expected to follow up with `new-player-enter`.
    pub fn on_connect(&mut self, connection_id: impl Into<String>) -> Vec<RoomEvent> {
        let player = Player::new(connection_id);
        tracing::info!("Player connected: {}", player.connection_id);
        self.players.push(player);
        if self.phase == RoomPhase::Empty {
            self.set_phase(RoomPhase::Populating);
        }
        Vec::new()
    }

    /// Remove a client. Unknown ids are ignored.
    pub fn on_disconnect(&mut self, connection_id: &str) -> Vec<RoomEvent> {
        let Ok(index) = self.index_of(connection_id) else {
            return Vec::new();
        };

        let removed = self.players.remove(index);
        tracing::info!("Player disconnected: {} ({})", removed.display_name, connection_id);

        if self.players.is_empty() {
            self.set_phase(RoomPhase::Empty);
        } else if removed.is_host {
            self.elect_host();
        }

        vec![self.room_info("player exit the game")]
    }

    /// Record a player's display name and mark them ready.
    pub fn announce(
        &mut self,
        connection_id: &str,
        display_name: impl Into<String>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        let index = self.index_of(connection_id)?;
        let player = &mut self.players[index];
        player.display_name = display_name.into();
        player.is_ready = true;
        tracing::info!("Player {} is {}", connection_id, player.display_name);

        self.elect_host();

        Ok(vec![self.room_info("New player entered the game")])
    }

    /// Tell every client to start typing keywords.
    pub fn start_game(&mut self) -> Vec<RoomEvent> {
        self.set_phase(RoomPhase::KeywordInput);
        vec![RoomEvent::Broadcast {
            msg: ServerMsg::GameState {
                msg: "Player need to type keyword".to_string(),
                is_keyword_input_state: true,
                is_story_start: None,
            },
        }]
    }

    /// Store a player's keywords; once everyone has submitted, shuffle and
    /// start the story.
    pub fn submit_keyword(
        &mut self,
        connection_id: &str,
        keywords: Keywords,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.submit_keyword_with(connection_id, keywords, &mut rand::rng())
    }

    pub fn submit_keyword_with<R: Rng>(
        &mut self,
        connection_id: &str,
        keywords: Keywords,
        rng: &mut R,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        let index = self.index_of(connection_id)?;
        self.players[index].keyword_pair = keywords;

        let mut events = vec![RoomEvent::SendTo {
            connection_id: connection_id.to_string(),
            msg: ServerMsg::GameState {
                msg: "server got keyword".to_string(),
                is_keyword_input_state: false,
                is_story_start: Some(false),
            },
        }];

        if !self.all_keywords_submitted() {
            return Ok(events);
        }

        self.shuffle_keywords_with(rng);
        self.set_phase(RoomPhase::StoryStart);

        events.push(self.room_info("Shuffled the keywords, ready to play!"));
        events.push(RoomEvent::Broadcast {
            msg: ServerMsg::GameState {
                msg: "Begins! let's start the storytelling".to_string(),
                is_keyword_input_state: false,
                is_story_start: Some(true),
            },
        });
        Ok(events)
    }

    /// True when the room is non-empty and every player has both keywords.
    pub fn all_keywords_submitted(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.keyword_pair.is_complete())
    }

    pub fn shuffle_keywords(&mut self) {
        self.shuffle_keywords_with(&mut rand::rng());
    }

    /// Redistribute keywords among players.
    ///
    /// Main and sub keywords are permuted independently: each step draws a
    /// separate swap partner for each half, so a player can end up with two
    /// halves that came from different original owners. Players keep their
    /// identity and position.
    pub fn shuffle_keywords_with<R: Rng>(&mut self, rng: &mut R) {
        for i in (1..self.players.len()).rev() {
            let j = rng.random_range(0..i);
            let k = rng.random_range(0..i);

            let (head, tail) = self.players.split_at_mut(i);
            let current = &mut tail[0].keyword_pair;
            std::mem::swap(&mut current.primary, &mut head[j].keyword_pair.primary);
            std::mem::swap(&mut current.secondary, &mut head[k].keyword_pair.secondary);
        }
        tracing::info!("Shuffled keywords across {} players", self.players.len());
    }
}

#[derive(Clone)]
pub struct RoomHandle {
    pub cmd_tx: mpsc::Sender<RoomCommand>,
    pub event_tx: broadcast::Sender<RoomEvent>,
}

/// Spawn the task that owns the room. Returns its handle.
pub fn spawn_room() -> RoomHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let (event_tx, _) = broadcast::channel(256);

    tokio::spawn(room_task(RoomState::new(), cmd_rx, event_tx.clone()));

    RoomHandle { cmd_tx, event_tx }
}

async fn room_task(
    mut state: RoomState,
    mut cmd_rx: mpsc::Receiver<RoomCommand>,
    event_tx: broadcast::Sender<RoomEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let events = match cmd {
            RoomCommand::Connect { connection_id } => state.on_connect(connection_id),
            RoomCommand::Disconnect { connection_id } => state.on_disconnect(&connection_id),
            RoomCommand::Event { connection_id, event, data } => {
                match handlers::dispatch(&mut state, &connection_id, &event, data) {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!("Dropped {} from {}: {}", event, connection_id, e);
                        continue;
                    }
                }
            }
        };

        for event in events {
            let _ = event_tx.send(event);
        }
    }

    tracing::info!("Room task ended");
}
