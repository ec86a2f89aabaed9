//! Board model: an 8×8 grid of optional pieces.
//!
//! Cells are addressed by `(col, row)` pairs in `0..8`. Row 0 is black's back
//! rank, row 7 is white's. The board is plain data; move rules live in
//! [`crate::game::movegen`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker used for an empty cell on the wire and in move-log entries.
pub const EMPTY_CELL: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Single-letter prefix used in piece codes.
    pub fn code(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub fn from_code(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    /// Row a pawn of this colour starts on.
    pub fn pawn_rank(self) -> i8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Row delta of a pawn advance: white walks up the board, black down.
    pub fn pawn_direction(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Back rank holding the king and rooks.
    pub fn home_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    pub fn code(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Rook => 'R',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    pub fn from_code(c: char) -> Option<PieceKind> {
        match c {
            'P' => Some(PieceKind::Pawn),
            'R' => Some(PieceKind::Rook),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// Parses a two-character `{color}{kind}` code such as `wK`.
    pub fn from_code(code: &str) -> Option<Piece> {
        let mut chars = code.chars();
        let color = Color::from_code(chars.next()?)?;
        let kind = PieceKind::from_code(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Piece::new(color, kind))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.color.code(), self.kind.code())
    }
}

/// A cell on the board. Formats as the two digits `{col}{row}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    pub col: u8,
    pub row: u8,
}

impl Square {
    pub const fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    /// Builds a square from signed coordinates, `None` when off the board.
    pub fn checked(col: i8, row: i8) -> Option<Square> {
        if (0..8).contains(&col) && (0..8).contains(&row) {
            Some(Square::new(col as u8, row as u8))
        } else {
            None
        }
    }

    /// Offsets this square, `None` when the result leaves the board.
    pub fn offset(self, d_col: i8, d_row: i8) -> Option<Square> {
        Square::checked(self.col as i8 + d_col, self.row as i8 + d_row)
    }

    /// The same cell seen from the opposite side of the board.
    pub fn mirrored(self) -> Square {
        Square::new(7 - self.col, 7 - self.row)
    }

    /// Algebraic name, e.g. column 4 row 7 is `e1`.
    pub fn to_algebraic(self) -> String {
        let file = (b'a' + self.col) as char;
        let rank = 8 - self.row;
        format!("{}{}", file, rank)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Self { cells: [[None; 8]; 8] }
    }

    /// The standard starting array.
    pub fn standard() -> Self {
        const BACK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut board = Board::empty();
        for (col, kind) in BACK.iter().enumerate() {
            board.cells[0][col] = Some(Piece::new(Color::Black, *kind));
            board.cells[1][col] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            board.cells[6][col] = Some(Piece::new(Color::White, PieceKind::Pawn));
            board.cells[7][col] = Some(Piece::new(Color::White, *kind));
        }
        board
    }

    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.cells[sq.row as usize][sq.col as usize]
    }

    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.cells[sq.row as usize][sq.col as usize] = piece;
    }

    pub fn is_empty(&self, sq: Square) -> bool {
        self.get(sq).is_none()
    }

    /// Takes the piece off `sq`, leaving the cell empty.
    pub fn take(&mut self, sq: Square) -> Option<Piece> {
        self.cells[sq.row as usize][sq.col as usize].take()
    }

    /// Occupied cells in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, cell)| {
                cell.map(|piece| (Square::new(col as u8, row as u8), piece))
            })
        })
    }

    /// Linear scan for the king of `color`.
    pub fn king_location(&self, color: Color) -> Option<Square> {
        let king = Piece::new(color, PieceKind::King);
        self.pieces().find(|(_, piece)| *piece == king).map(|(sq, _)| sq)
    }

    /// Row-major grid of piece codes, `--` for empty cells.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(piece) => piece.to_string(),
                        None => EMPTY_CELL.to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::standard()
    }
}
