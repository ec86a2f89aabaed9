//! Legality filter and check detection.
//!
//! Legality is decided by brute force: every candidate is played, the
//! opponent's replies are regenerated and inspected, then the move is undone
//! and both sets regenerated again before the next candidate.

use super::board::Square;
use super::engine::{EngineError, GameEngine};
use super::moves::Move;

/// Present when the side to move has its king attacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckStatus {
    pub king_location: Square,
    pub attacking_moves: Vec<Move>,
}

impl GameEngine {
    /// Drops every move of the side to move that leaves its own king attacked.
    /// Surviving moves keep their generation order.
    pub(super) fn filter_illegal_moves(&mut self) -> Result<(), EngineError> {
        let mover = self.side_to_move;
        let candidates = self.moves.for_color(mover).to_vec();
        let mut illegal = Vec::new();

        for mv in &candidates {
            self.make_move(mv)?;
            self.regenerate();
            let exposed = self
                .board
                .king_location(mover)
                .map(|king| self.moves.targets(mover.opposite(), king));
            self.undo_move()?;
            self.regenerate();

            match exposed {
                Some(true) => illegal.push(*mv),
                Some(false) => {}
                None => return Err(EngineError::MissingKing(mover)),
            }
        }

        if !illegal.is_empty() {
            tracing::trace!("[engine] [filter] color={} dropped={}", mover, illegal.len());
            self.moves.for_color_mut(mover).retain(|mv| !illegal.contains(mv));
        }
        Ok(())
    }

    /// Records which opponent moves land on the mover's king, if any.
    pub(super) fn update_check_status(&mut self) {
        let mover = self.side_to_move;
        let status = self.board.king_location(mover).and_then(|king| {
            let attacking_moves: Vec<Move> = self
                .moves
                .for_color(mover.opposite())
                .iter()
                .filter(|mv| mv.target() == king)
                .copied()
                .collect();
            (!attacking_moves.is_empty()).then_some(CheckStatus {
                king_location: king,
                attacking_moves,
            })
        });
        self.check_status = status;
    }
}

#[cfg(test)]
mod tests {
    use crate::game::board::{Board, Color, Piece, Square};
    use crate::game::engine::{EngineError, GameEngine};
    use crate::game::moves::Move;

    fn place(board: &mut Board, col: u8, row: u8, code: &str) {
        board.set(Square::new(col, row), Piece::from_code(code));
    }

    #[test]
    fn test_rook_on_file_gives_check() {
        let mut board = Board::empty();
        place(&mut board, 4, 7, "wK");
        place(&mut board, 4, 2, "bR");
        place(&mut board, 0, 0, "bK");
        let mut engine = GameEngine::from_position(board, Color::White);
        engine.legal_moves().unwrap();

        let status = engine.check_status().expect("white should be in check");
        assert_eq!(status.king_location, Square::new(4, 7));
        assert_eq!(
            status.attacking_moves,
            vec![Move::capture(Square::new(4, 2), Square::new(4, 7))]
        );
    }

    #[test]
    fn test_rook_on_rank_gives_check() {
        let mut board = Board::empty();
        place(&mut board, 1, 3, "bK");
        place(&mut board, 6, 3, "wR");
        place(&mut board, 7, 7, "wK");
        let mut engine = GameEngine::from_position(board, Color::Black);
        engine.legal_moves().unwrap();

        let status = engine.check_status().expect("black should be in check");
        assert_eq!(status.king_location, Square::new(1, 3));
        assert_eq!(status.attacking_moves.len(), 1);
        assert_eq!(status.attacking_moves[0].to_string(), "63:13:T");
    }

    #[test]
    fn test_blocked_rook_gives_no_check() {
        let mut board = Board::empty();
        place(&mut board, 4, 7, "wK");
        place(&mut board, 4, 5, "wN");
        place(&mut board, 4, 2, "bR");
        place(&mut board, 0, 0, "bK");
        let mut engine = GameEngine::from_position(board, Color::White);
        engine.legal_moves().unwrap();
        assert_eq!(engine.check_status(), None);
    }

    #[test]
    fn test_pinned_piece_cannot_leave_the_line() {
        let mut board = Board::empty();
        place(&mut board, 4, 7, "wK");
        place(&mut board, 4, 5, "wN");
        place(&mut board, 4, 1, "bR");
        place(&mut board, 0, 0, "bK");
        let mut engine = GameEngine::from_position(board, Color::White);

        let pseudo = engine.moves_for(Color::White).to_vec();
        assert!(pseudo.iter().any(|mv| mv.source() == Square::new(4, 5)));

        let legal = &engine.legal_moves().unwrap().white;
        assert!(legal.iter().all(|mv| mv.source() != Square::new(4, 5)));
        assert!(legal.iter().any(|mv| mv.source() == Square::new(4, 7)));
    }

    #[test]
    fn test_king_cannot_step_into_attack() {
        let mut board = Board::empty();
        place(&mut board, 4, 7, "wK");
        place(&mut board, 3, 0, "bR");
        place(&mut board, 0, 0, "bK");
        let mut engine = GameEngine::from_position(board, Color::White);

        let legal: Vec<String> = engine
            .legal_moves()
            .unwrap()
            .white
            .iter()
            .map(|mv| mv.to_string())
            .collect();
        assert!(!legal.contains(&"47:36:N".to_string()));
        assert!(!legal.contains(&"47:37:N".to_string()));
        assert!(legal.contains(&"47:57:N".to_string()));
    }

    #[test]
    fn test_filter_leaves_state_untouched() {
        let mut engine = GameEngine::new();
        engine.make_move_str("46:44:N").unwrap();
        let board = engine.board().clone();
        let log = engine.move_log_strings();

        engine.legal_moves().unwrap();
        assert_eq!(engine.board(), &board);
        assert_eq!(engine.move_log_strings(), log);
        assert_eq!(engine.side_to_move(), Color::Black);
        assert_eq!(engine.moves_for(Color::Black).len(), 20);
    }

    #[test]
    fn test_missing_king_is_reported() {
        let mut board = Board::empty();
        place(&mut board, 0, 6, "wP");
        place(&mut board, 0, 0, "bK");
        let mut engine = GameEngine::from_position(board, Color::White);
        assert_eq!(engine.legal_moves().unwrap_err(), EngineError::MissingKing(Color::White));
    }
}
