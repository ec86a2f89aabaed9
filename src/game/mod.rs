//! Chess rules engine
//!
//! - `board`: the 8×8 grid and piece codes
//! - `moves`: move and move-log encodings
//! - `movegen`: pseudo-legal generation
//! - `legality`: legality filter and check detection
//! - `castling`: castling-rights evaluation
//! - `engine`: one match's authoritative state

pub mod board;
pub mod castling;
pub mod engine;
pub mod legality;
pub mod movegen;
pub mod moves;

pub use board::{Board, Color, Piece, PieceKind, Square};
pub use engine::{EngineError, GameEngine};
pub use legality::CheckStatus;
pub use movegen::MoveSets;
pub use moves::{mirror_move_str, LogEntry, Move, MoveParseError, MoveTag};
