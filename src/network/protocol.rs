//! JSON message types exchanged with clients.
//!
//! Client commands are selected by `action`; game commands carry a second
//! `sub_action` tag next to it:
//!
//! ```json
//! {"action":"join","payload":"r1"}
//! {"action":"game","sub_action":"make_move","payload":{"color":"white","move":"64:44:N"}}
//! ```

use serde::{Deserialize, Serialize};

use crate::game::{Color, GameEngine};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    Create { payload: String },
    Join { payload: String },
    Spectate { payload: String },
    GetRooms,
    LeaveRoom,
    DeleteRoom { payload: String },
    Game(GameCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sub_action", rename_all = "snake_case")]
pub enum GameCommand {
    MakeMove { payload: MovePayload },
    UndoMove,
    Start,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePayload {
    pub color: Color,
    #[serde(rename = "move")]
    pub mv: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Seat assignment.
    Id { payload: Color },
    Game(GameEvent),
    Message { payload: MessageBody },
}

impl ServerMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ServerMessage::Message {
            payload: MessageBody::Text(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sub_action", rename_all = "snake_case")]
pub enum GameEvent {
    Start,
    Update { payload: GameUpdate },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Text(String),
    Rooms(Vec<String>),
}

/// Per-recipient state push: `moves` holds only the recipient's colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub board: Vec<Vec<String>>,
    pub moves: Vec<String>,
    pub move_log: Vec<String>,
    pub turn: Color,
    pub check: Option<CheckReport>,
}

impl GameUpdate {
    /// Snapshot of `engine` as seen by the `recipient` seat. Uses the move
    /// sets from the engine's latest generation pass.
    pub fn for_recipient(engine: &GameEngine, recipient: Color) -> Self {
        Self {
            board: engine.board().to_rows(),
            moves: engine.moves_for(recipient).iter().map(|mv| mv.to_string()).collect(),
            move_log: engine.move_log_strings(),
            turn: engine.side_to_move(),
            check: engine.check_status().map(|status| CheckReport {
                king_location: status.king_location.to_string(),
                attacking_moves: status.attacking_moves.iter().map(|mv| mv.to_string()).collect(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub king_location: String,
    pub attacking_moves: Vec<String>,
}

pub fn parse_command(frame: &[u8]) -> serde_json::Result<ClientCommand> {
    serde_json::from_slice(frame)
}
