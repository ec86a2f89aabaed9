//! Game engine: authoritative state of one match.
//!
//! A generation cycle ([`GameEngine::legal_moves`]) runs, in order:
//! pseudo-legal generation, the legality filter, castling evaluation for both
//! colours and the check-status update.

use super::board::{Board, Color, Square};
use super::legality::CheckStatus;
use super::movegen::{self, MoveSets};
use super::moves::{LogEntry, Move, MoveParseError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("move log is empty")]
    EmptyMoveLog,

    #[error("no piece on square {0}")]
    EmptySquare(Square),

    #[error("no {0} king on the board")]
    MissingKing(Color),

    #[error(transparent)]
    Parse(#[from] MoveParseError),
}

#[derive(Debug, Clone)]
pub struct GameEngine {
    pub(super) board: Board,
    pub(super) side_to_move: Color,
    pub(super) move_log: Vec<LogEntry>,
    pub(super) moves: MoveSets,
    pub(super) check_status: Option<CheckStatus>,
}

impl GameEngine {
    /// Standard starting position, white to move.
    pub fn new() -> Self {
        Self::from_position(Board::standard(), Color::White)
    }

    /// Engine over an arbitrary position with an empty move log.
    pub fn from_position(board: Board, side_to_move: Color) -> Self {
        let mut engine = Self {
            board,
            side_to_move,
            move_log: Vec::new(),
            moves: MoveSets::default(),
            check_status: None,
        };
        movegen::generate_all(&engine.board, &mut engine.moves);
        engine
    }

    /// Applies `mv`, logs it and passes the turn.
    ///
    /// The move is not checked against the legal set; callers submit moves
    /// taken from the latest [`GameEngine::legal_moves`] result.
    pub fn make_move(&mut self, mv: &Move) -> Result<(), EngineError> {
        let entry = match *mv {
            Move::Normal { from, to, capture } => {
                let moved = self.board.take(from).ok_or(EngineError::EmptySquare(from))?;
                let captured = self.board.get(to);
                self.board.set(to, Some(moved));
                LogEntry::Normal { from, to, moved, captured, capture }
            }
            Move::Castle { king_from, king_to, rook_from, rook_to } => {
                if self.board.is_empty(king_from) {
                    return Err(EngineError::EmptySquare(king_from));
                }
                if self.board.is_empty(rook_from) {
                    return Err(EngineError::EmptySquare(rook_from));
                }
                let king = self.board.take(king_from);
                self.board.set(king_to, king);
                let rook = self.board.take(rook_from);
                self.board.set(rook_to, rook);
                LogEntry::Castle { king_from, king_to, rook_from, rook_to }
            }
        };

        self.move_log.push(entry);
        self.side_to_move = self.side_to_move.opposite();
        Ok(())
    }

    /// Parses an encoded move and applies it.
    pub fn make_move_str(&mut self, encoded: &str) -> Result<Move, EngineError> {
        let mv: Move = encoded.parse()?;
        self.make_move(&mv)?;
        Ok(mv)
    }

    /// Reverts the most recent move, restoring the board exactly.
    pub fn undo_move(&mut self) -> Result<LogEntry, EngineError> {
        let entry = self.move_log.pop().ok_or(EngineError::EmptyMoveLog)?;

        match entry {
            LogEntry::Normal { from, to, moved, captured, .. } => {
                self.board.set(from, Some(moved));
                self.board.set(to, captured);
            }
            LogEntry::Castle { king_from, king_to, rook_from, rook_to } => {
                let king = self.board.take(king_to);
                self.board.set(king_from, king);
                let rook = self.board.take(rook_to);
                self.board.set(rook_from, rook);
            }
        }

        self.side_to_move = self.side_to_move.opposite();
        Ok(entry)
    }

    /// Runs a full generation cycle and returns both colours' move sets.
    ///
    /// Only the side to move is filtered for legality; the other set stays
    /// pseudo-legal.
    pub fn legal_moves(&mut self) -> Result<&MoveSets, EngineError> {
        movegen::generate_all(&self.board, &mut self.moves);
        self.filter_illegal_moves()?;
        self.add_castle_moves(Color::White);
        self.add_castle_moves(Color::Black);
        self.update_check_status();
        Ok(&self.moves)
    }

    /// Pseudo-legal regeneration plus check detection, used while simulating.
    pub(super) fn regenerate(&mut self) {
        movegen::generate_all(&self.board, &mut self.moves);
        self.update_check_status();
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn move_log(&self) -> &[LogEntry] {
        &self.move_log
    }

    pub fn move_log_strings(&self) -> Vec<String> {
        self.move_log.iter().map(|entry| entry.to_string()).collect()
    }

    /// Move sets from the last generation pass.
    pub fn move_sets(&self) -> &MoveSets {
        &self.moves
    }

    pub fn moves_for(&self, color: Color) -> &[Move] {
        self.moves.for_color(color)
    }

    pub fn check_status(&self) -> Option<&CheckStatus> {
        self.check_status.as_ref()
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::Piece;

    #[test]
    fn test_initial_legal_moves() {
        let mut engine = GameEngine::new();
        let sets = engine.legal_moves().unwrap();
        assert_eq!(sets.white.len(), 20);
        assert_eq!(engine.check_status(), None);
        assert_eq!(engine.side_to_move(), Color::White);
    }

    #[test]
    fn test_make_move_updates_board_and_log() {
        let mut engine = GameEngine::new();
        engine.make_move_str("46:44:N").unwrap();

        assert!(engine.board().is_empty(Square::new(4, 6)));
        assert_eq!(engine.board().get(Square::new(4, 4)), Piece::from_code("wP"));
        assert_eq!(engine.move_log_strings(), ["46:44:wP:--:N"]);
        assert_eq!(engine.side_to_move(), Color::Black);
    }

    #[test]
    fn test_make_then_undo_restores_every_initial_move() {
        let mut engine = GameEngine::new();
        let before = engine.board().clone();
        let moves = engine.legal_moves().unwrap().white.clone();

        for mv in moves {
            engine.make_move(&mv).unwrap();
            engine.undo_move().unwrap();
            assert_eq!(engine.board(), &before, "undo of {} changed the board", mv);
            assert!(engine.move_log().is_empty());
            assert_eq!(engine.side_to_move(), Color::White);
        }
    }

    #[test]
    fn test_undo_restores_captured_piece() {
        let mut engine = GameEngine::new();
        for mv in ["46:44:N", "31:33:N"] {
            engine.make_move_str(mv).unwrap();
        }
        let before = engine.board().clone();
        let log_len = engine.move_log().len();

        engine.make_move_str("44:33:T").unwrap();
        assert_eq!(engine.move_log_strings().last().unwrap(), "44:33:wP:bP:T");

        engine.undo_move().unwrap();
        assert_eq!(engine.board(), &before);
        assert_eq!(engine.move_log().len(), log_len);
    }

    #[test]
    fn test_undo_on_empty_log_fails() {
        let mut engine = GameEngine::new();
        assert_eq!(engine.undo_move(), Err(EngineError::EmptyMoveLog));
    }

    #[test]
    fn test_make_move_from_empty_square_fails() {
        let mut engine = GameEngine::new();
        let err = engine.make_move_str("44:43:N").unwrap_err();
        assert_eq!(err, EngineError::EmptySquare(Square::new(4, 4)));
        assert!(engine.move_log().is_empty());
    }

    #[test]
    fn test_make_move_rejects_bad_encoding() {
        let mut engine = GameEngine::new();
        assert!(matches!(engine.make_move_str("46:44"), Err(EngineError::Parse(_))));
        assert!(matches!(engine.make_move_str("46:45:E"), Err(EngineError::Parse(_))));
    }

    #[test]
    fn test_castle_round_trip() {
        let mut board = Board::empty();
        board.set(Square::new(4, 7), Piece::from_code("wK"));
        board.set(Square::new(7, 7), Piece::from_code("wR"));
        board.set(Square::new(4, 0), Piece::from_code("bK"));
        let before = board.clone();
        let mut engine = GameEngine::from_position(board, Color::White);

        engine.make_move_str("47:67:77:57:C").unwrap();
        assert_eq!(engine.board().get(Square::new(6, 7)), Piece::from_code("wK"));
        assert_eq!(engine.board().get(Square::new(5, 7)), Piece::from_code("wR"));
        assert_eq!(engine.move_log_strings(), ["47:67:77:57:C"]);

        engine.undo_move().unwrap();
        assert_eq!(engine.board(), &before);
    }
}
