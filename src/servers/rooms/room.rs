//! One match: two seats, spectators and the engine they play on.
//!
//! A `Room` is always accessed through the registry's `Arc<Mutex<Room>>`, so
//! every method here runs inside the room's critical section. Broadcasts are
//! queued onto the peers' outbound channels while the lock is held, which
//! keeps each push consistent with the mutation that caused it.

use super::RoomError;
use crate::game::{Color, GameEngine, Move};
use crate::network::protocol::{GameCommand, GameEvent, GameUpdate, MovePayload, ServerMessage};
use crate::servers::Peer;

pub const MSG_NOT_YOUR_TURN: &str = "It's not your turn";
pub const MSG_NOT_STARTED: &str = "Game has not started";
pub const MSG_NOTHING_TO_UNDO: &str = "Nothing to undo";
pub const MSG_NOT_SEATED: &str = "You aren't playing in this room";
pub const MSG_GAME_HALTED: &str = "Game cannot continue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    WaitingForPlayers,
    InProgress,
    /// The engine could not produce moves for the position; no further
    /// game commands are accepted.
    Halted,
}

#[derive(Debug)]
pub struct Room {
    name: String,
    white: Option<Peer>,
    black: Option<Peer>,
    spectators: Vec<Peer>,
    game: Option<GameEngine>,
    turn: Color,
    halted: bool,
    closed: bool,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            white: None,
            black: None,
            spectators: Vec::new(),
            game: None,
            turn: Color::White,
            halted: false,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> RoomPhase {
        if self.halted {
            RoomPhase::Halted
        } else if self.game.is_some() {
            RoomPhase::InProgress
        } else {
            RoomPhase::WaitingForPlayers
        }
    }

    pub fn is_full(&self) -> bool {
        self.white.is_some() && self.black.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn game(&self) -> Option<&GameEngine> {
        self.game.as_ref()
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    pub fn seat_of(&self, peer_id: u64) -> Option<Color> {
        if self.white.as_ref().is_some_and(|p| p.id() == peer_id) {
            Some(Color::White)
        } else if self.black.as_ref().is_some_and(|p| p.id() == peer_id) {
            Some(Color::Black)
        } else {
            None
        }
    }

    fn seat(&self, color: Color) -> Option<&Peer> {
        match color {
            Color::White => self.white.as_ref(),
            Color::Black => self.black.as_ref(),
        }
    }

    /// Seats `peer`, white first. Filling the second seat starts the game.
    pub fn join(&mut self, peer: Peer) -> Result<Color, RoomError> {
        if self.closed {
            return Err(RoomError::NotFound(self.name.clone()));
        }
        if self.is_full() {
            return Err(RoomError::Full(self.name.clone()));
        }

        let color = if self.white.is_none() { Color::White } else { Color::Black };
        peer.send(ServerMessage::Id { payload: color });
        tracing::info!("[room] [join] room={} conn={} color={}", self.name, peer.id(), color);

        match color {
            Color::White => self.white = Some(peer),
            Color::Black => self.black = Some(peer),
        }

        if self.is_full() {
            if self.game.is_none() {
                self.game = Some(GameEngine::new());
                self.turn = Color::White;
                tracing::info!("[room] [start] room={}", self.name);
                for color in [Color::White, Color::Black] {
                    if let Some(seat) = self.seat(color) {
                        seat.send(ServerMessage::Game(GameEvent::Start));
                    }
                }
                if self.refresh_moves() {
                    self.broadcast_state();
                }
            } else if let Some(seat) = self.seat(color) {
                if self.halted {
                    seat.send(ServerMessage::text(MSG_GAME_HALTED));
                } else {
                    seat.send(ServerMessage::Game(GameEvent::Start));
                    self.broadcast_state();
                }
            }
        }

        Ok(color)
    }

    pub fn spectate(&mut self, peer: Peer) -> Result<(), RoomError> {
        if self.closed {
            return Err(RoomError::NotFound(self.name.clone()));
        }
        tracing::info!("[room] [spectate] room={} conn={}", self.name, peer.id());
        self.spectators.push(peer);
        Ok(())
    }

    /// Removes the connection from its seat and from the spectators.
    /// Returns whether it was present.
    pub fn leave(&mut self, peer_id: u64) -> bool {
        let mut found = false;
        if self.white.as_ref().is_some_and(|p| p.id() == peer_id) {
            self.white = None;
            found = true;
        }
        if self.black.as_ref().is_some_and(|p| p.id() == peer_id) {
            self.black = None;
            found = true;
        }
        let before = self.spectators.len();
        self.spectators.retain(|p| p.id() != peer_id);
        found |= self.spectators.len() != before;

        if found {
            tracing::info!("[room] [leave] room={} conn={}", self.name, peer_id);
        }
        found
    }

    /// Marks the room deleted and detaches everyone, telling them why.
    pub fn close(&mut self) {
        self.closed = true;
        let notice = format!("Room {} was deleted", self.name);
        let members = self.white.take().into_iter().chain(self.black.take()).chain(self.spectators.drain(..));
        for peer in members {
            peer.send(ServerMessage::text(notice.clone()));
        }
    }

    pub fn handle_game_command(&mut self, sender: &Peer, cmd: GameCommand) {
        if self.game.is_none() {
            sender.send(ServerMessage::text(MSG_NOT_STARTED));
            return;
        }
        if self.halted {
            sender.send(ServerMessage::text(MSG_GAME_HALTED));
            return;
        }

        match cmd {
            GameCommand::MakeMove { payload } => self.make_move(sender, payload),
            GameCommand::UndoMove => self.undo_move(sender),
            GameCommand::Start | GameCommand::Update => self.broadcast_state(),
        }
    }

    fn make_move(&mut self, sender: &Peer, payload: MovePayload) {
        let MovePayload { color, mv: encoded } = payload;

        if self.seat_of(sender.id()) != Some(color) {
            sender.send(ServerMessage::text(format!("You aren't playing {}", color)));
            return;
        }
        if color != self.turn {
            tracing::debug!("[room] [out_of_turn] room={} color={}", self.name, color);
            sender.send(ServerMessage::text(MSG_NOT_YOUR_TURN));
            return;
        }

        let Some(game) = self.game.as_mut() else {
            return;
        };
        let mv = match encoded.parse::<Move>() {
            Ok(mv) if game.moves_for(color).contains(&mv) => mv,
            _ => {
                tracing::warn!("[room] [illegal_move] room={} color={} move={}", self.name, color, encoded);
                sender.send(ServerMessage::text(format!("Illegal move {}", encoded)));
                return;
            }
        };

        if let Err(e) = game.make_move(&mv) {
            tracing::error!("[room] [make_move_failed] room={} move={} err={}", self.name, mv, e);
            sender.send(ServerMessage::text(format!("Illegal move {}", encoded)));
            return;
        }
        tracing::info!("[room] [move] room={} color={} move={}", self.name, color, mv);

        self.turn = self.turn.opposite();
        if self.refresh_moves() {
            self.broadcast_state();
        }
    }

    /// Either seat may undo, regardless of whose turn it is. Spectators
    /// may not.
    fn undo_move(&mut self, sender: &Peer) {
        if self.seat_of(sender.id()).is_none() {
            sender.send(ServerMessage::text(MSG_NOT_SEATED));
            return;
        }
        let Some(game) = self.game.as_mut() else {
            return;
        };
        match game.undo_move() {
            Ok(entry) => {
                tracing::info!("[room] [undo] room={} conn={} entry={}", self.name, sender.id(), entry);
                self.turn = game.side_to_move();
                if self.refresh_moves() {
                    self.broadcast_state();
                }
            }
            Err(_) => sender.send(ServerMessage::text(MSG_NOTHING_TO_UNDO)),
        }
    }

    /// Regenerates the legal moves. On an engine error the room halts and
    /// both seats are told; returns whether play can go on.
    fn refresh_moves(&mut self) -> bool {
        let Some(game) = self.game.as_mut() else {
            return false;
        };
        let Err(e) = game.legal_moves() else {
            return true;
        };

        tracing::error!("[room] [halted] room={} err={}", self.name, e);
        self.halted = true;
        for color in [Color::White, Color::Black] {
            if let Some(seat) = self.seat(color) {
                seat.send(ServerMessage::text(format!("{}: {}", MSG_GAME_HALTED, e)));
            }
        }
        false
    }

    /// Pushes the state to both seats, each with its own colour's moves.
    /// Spectators are not included.
    fn broadcast_state(&self) {
        let Some(game) = self.game.as_ref().filter(|_| !self.halted) else {
            return;
        };
        for color in [Color::White, Color::Black] {
            if let Some(seat) = self.seat(color) {
                let update = GameUpdate::for_recipient(game, color);
                seat.send(ServerMessage::Game(GameEvent::Update { payload: update }));
            }
        }
    }
}
