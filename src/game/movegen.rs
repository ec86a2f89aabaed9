//! Pseudo-legal move generation.
//!
//! Squares are visited row-major and directions in table order, so the
//! generated lists are reproducible move for move.

use super::board::{Board, Color, Piece, PieceKind, Square};
use super::moves::Move;

/// Direction vectors as `(row delta, col delta)`.
const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];
const KNIGHT_DIRS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (2, -1),
    (2, 1),
    (-1, -2),
    (1, -2),
    (-1, 2),
    (1, 2),
];
const ROYAL_DIRS: [(i8, i8); 8] = [
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
];
/// Column offsets of pawn captures.
const PAWN_CAPTURE_COLS: [i8; 2] = [1, -1];

/// Per-colour move lists, rebuilt from scratch on every generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveSets {
    pub white: Vec<Move>,
    pub black: Vec<Move>,
}

impl MoveSets {
    pub fn for_color(&self, color: Color) -> &[Move] {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn for_color_mut(&mut self, color: Color) -> &mut Vec<Move> {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    pub fn clear(&mut self) {
        self.white.clear();
        self.black.clear();
    }

    /// True when any move of `color` lands on `sq`.
    pub fn targets(&self, color: Color, sq: Square) -> bool {
        self.for_color(color).iter().any(|mv| mv.target() == sq)
    }
}

/// Clears `sets` and fills it with every pseudo-legal move on `board`.
pub fn generate_all(board: &Board, sets: &mut MoveSets) {
    sets.clear();
    for (sq, piece) in board.pieces() {
        let out = sets.for_color_mut(piece.color);
        match piece.kind {
            PieceKind::Pawn => pawn_moves(board, sq, piece.color, out),
            _ => piece_moves(board, sq, piece, out),
        }
    }
}

fn movement(kind: PieceKind) -> (&'static [(i8, i8)], bool) {
    match kind {
        PieceKind::Rook => (&ROOK_DIRS, true),
        PieceKind::Bishop => (&BISHOP_DIRS, true),
        PieceKind::Queen => (&ROYAL_DIRS, true),
        PieceKind::Knight => (&KNIGHT_DIRS, false),
        PieceKind::King => (&ROYAL_DIRS, false),
        PieceKind::Pawn => (&[], false),
    }
}

fn piece_moves(board: &Board, from: Square, piece: Piece, out: &mut Vec<Move>) {
    let (dirs, sliding) = movement(piece.kind);

    for &(d_row, d_col) in dirs {
        let mut next = from.offset(d_col, d_row);
        while let Some(to) = next {
            match board.get(to) {
                None => {
                    out.push(Move::quiet(from, to));
                    if !sliding {
                        break;
                    }
                    next = to.offset(d_col, d_row);
                }
                Some(other) if other.color == piece.color => break,
                Some(_) => {
                    out.push(Move::capture(from, to));
                    break;
                }
            }
        }
    }
}

fn pawn_moves(board: &Board, from: Square, color: Color, out: &mut Vec<Move>) {
    let dir = color.pawn_direction();
    let Some(ahead) = from.offset(0, dir) else {
        return;
    };

    if board.is_empty(ahead) {
        out.push(Move::quiet(from, ahead));

        if from.row as i8 == color.pawn_rank() {
            if let Some(two_ahead) = from.offset(0, dir * 2) {
                if board.is_empty(two_ahead) {
                    out.push(Move::quiet(from, two_ahead));
                }
            }
        }
    }

    for d_col in PAWN_CAPTURE_COLS {
        if let Some(to) = from.offset(d_col, dir) {
            if matches!(board.get(to), Some(other) if other.color != color) {
                out.push(Move::capture(from, to));
            }
        }
    }
}
