//! Castling rights, derived every cycle from the move log and current attacks.

use super::board::{Color, Piece, PieceKind, Square};
use super::engine::GameEngine;
use super::moves::Move;

const KING_HOME_COL: u8 = 4;

/// Fixed geometry of one castling side on the back rank.
struct CastleSide {
    king_to: u8,
    rook_from: u8,
    rook_to: u8,
    /// Columns that must be empty.
    between: &'static [u8],
    /// Columns the king crosses or lands on that must not be targeted.
    transit: &'static [u8],
}

const CASTLE_SIDES: [CastleSide; 2] = [
    // toward column 0
    CastleSide {
        king_to: 2,
        rook_from: 0,
        rook_to: 3,
        between: &[1, 2, 3],
        transit: &[3, 2],
    },
    // toward column 7
    CastleSide {
        king_to: 6,
        rook_from: 7,
        rook_to: 5,
        between: &[5, 6],
        transit: &[5, 6],
    },
];

impl GameEngine {
    /// Appends a castle move to `color`'s set for each side that is available.
    pub(super) fn add_castle_moves(&mut self, color: Color) {
        let enemy = color.opposite();
        let rank = color.home_rank();
        let Some(king_at) = self.board.king_location(color) else {
            return;
        };

        if self.moves.targets(enemy, king_at) || self.log_touches(king_at) {
            return;
        }
        if king_at != Square::new(KING_HOME_COL, rank) {
            return;
        }

        let rook = Piece::new(color, PieceKind::Rook);
        for side in &CASTLE_SIDES {
            let rook_from = Square::new(side.rook_from, rank);
            if self.board.get(rook_from) != Some(rook) || self.log_touches(rook_from) {
                continue;
            }
            if side.between.iter().any(|&col| !self.board.is_empty(Square::new(col, rank))) {
                continue;
            }
            if side.transit.iter().any(|&col| self.moves.targets(enemy, Square::new(col, rank))) {
                continue;
            }

            self.moves.for_color_mut(color).push(Move::Castle {
                king_from: king_at,
                king_to: Square::new(side.king_to, rank),
                rook_from,
                rook_to: Square::new(side.rook_to, rank),
            });
        }
    }

    fn log_touches(&self, sq: Square) -> bool {
        self.move_log.iter().any(|entry| entry.touches(sq))
    }
}
