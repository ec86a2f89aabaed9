//! Move encodings shared by the generator, the move log and the wire.
//!
//! Coordinates are concatenated `{col}{row}` digits, not algebraic names:
//!
//! - normal / capture: `64:44:N`, `34:43:T`
//! - castle: `{king_from}:{king_to}:{rook_from}:{rook_to}:C`
//!
//! The `E` tag is reserved for en passant, which is not implemented; parsing
//! it yields [`MoveParseError::UnsupportedTag`].

use std::fmt;
use std::str::FromStr;

use super::board::{Piece, Square, EMPTY_CELL};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveParseError {
    #[error("malformed move string: {0:?}")]
    Malformed(String),

    #[error("unsupported move tag {0:?}")]
    UnsupportedTag(char),

    #[error("bad square {0:?}")]
    BadSquare(String),
}

/// Trailing tag of an encoded move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTag {
    Quiet,
    Capture,
    Castle,
    EnPassant,
}

impl MoveTag {
    pub fn code(self) -> char {
        match self {
            MoveTag::Quiet => 'N',
            MoveTag::Capture => 'T',
            MoveTag::Castle => 'C',
            MoveTag::EnPassant => 'E',
        }
    }

    pub fn from_code(c: char) -> Option<MoveTag> {
        match c {
            'N' => Some(MoveTag::Quiet),
            'T' => Some(MoveTag::Capture),
            'C' => Some(MoveTag::Castle),
            'E' => Some(MoveTag::EnPassant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Normal {
        from: Square,
        to: Square,
        capture: bool,
    },
    Castle {
        king_from: Square,
        king_to: Square,
        rook_from: Square,
        rook_to: Square,
    },
}

impl Move {
    pub fn quiet(from: Square, to: Square) -> Self {
        Move::Normal { from, to, capture: false }
    }

    pub fn capture(from: Square, to: Square) -> Self {
        Move::Normal { from, to, capture: true }
    }

    pub fn tag(&self) -> MoveTag {
        match self {
            Move::Normal { capture: false, .. } => MoveTag::Quiet,
            Move::Normal { capture: true, .. } => MoveTag::Capture,
            Move::Castle { .. } => MoveTag::Castle,
        }
    }

    pub fn source(&self) -> Square {
        match *self {
            Move::Normal { from, .. } => from,
            Move::Castle { king_from, .. } => king_from,
        }
    }

    /// Square the moving piece (the king, for castles) lands on.
    pub fn target(&self) -> Square {
        match *self {
            Move::Normal { to, .. } => to,
            Move::Castle { king_to, .. } => king_to,
        }
    }

    /// Same move expressed from the other side of the board.
    pub fn mirrored(&self) -> Move {
        match *self {
            Move::Normal { from, to, capture } => Move::Normal {
                from: from.mirrored(),
                to: to.mirrored(),
                capture,
            },
            Move::Castle { king_from, king_to, rook_from, rook_to } => Move::Castle {
                king_from: king_from.mirrored(),
                king_to: king_to.mirrored(),
                rook_from: rook_from.mirrored(),
                rook_to: rook_to.mirrored(),
            },
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Normal { from, to, .. } => write!(f, "{}:{}:{}", from, to, self.tag().code()),
            Move::Castle { king_from, king_to, rook_from, rook_to } => write!(
                f,
                "{}:{}:{}:{}:{}",
                king_from,
                king_to,
                rook_from,
                rook_to,
                MoveTag::Castle.code()
            ),
        }
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let tag = parse_tag(s, parts.last().copied())?;

        match (tag, parts.as_slice()) {
            (MoveTag::Quiet | MoveTag::Capture, [from, to, _]) => Ok(Move::Normal {
                from: parse_square(from)?,
                to: parse_square(to)?,
                capture: tag == MoveTag::Capture,
            }),
            (MoveTag::Castle, [king_from, king_to, rook_from, rook_to, _]) => Ok(Move::Castle {
                king_from: parse_square(king_from)?,
                king_to: parse_square(king_to)?,
                rook_from: parse_square(rook_from)?,
                rook_to: parse_square(rook_to)?,
            }),
            (MoveTag::EnPassant, _) => Err(MoveParseError::UnsupportedTag('E')),
            _ => Err(MoveParseError::Malformed(s.to_string())),
        }
    }
}

/// One applied move in the log. Normal moves carry the moved and captured
/// pieces so undo can restore both cells exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEntry {
    Normal {
        from: Square,
        to: Square,
        moved: Piece,
        captured: Option<Piece>,
        capture: bool,
    },
    Castle {
        king_from: Square,
        king_to: Square,
        rook_from: Square,
        rook_to: Square,
    },
}

impl LogEntry {
    /// True when `sq` is a source or destination of this entry.
    pub fn touches(&self, sq: Square) -> bool {
        match *self {
            LogEntry::Normal { from, to, .. } => from == sq || to == sq,
            LogEntry::Castle { king_from, king_to, rook_from, rook_to } => {
                [king_from, king_to, rook_from, rook_to].contains(&sq)
            }
        }
    }

    /// The move this entry was recorded from.
    pub fn as_move(&self) -> Move {
        match *self {
            LogEntry::Normal { from, to, capture, .. } => Move::Normal { from, to, capture },
            LogEntry::Castle { king_from, king_to, rook_from, rook_to } => Move::Castle {
                king_from,
                king_to,
                rook_from,
                rook_to,
            },
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Normal { from, to, moved, captured, capture } => {
                let tag = if *capture { MoveTag::Capture } else { MoveTag::Quiet };
                match captured {
                    Some(piece) => write!(f, "{}:{}:{}:{}:{}", from, to, moved, piece, tag.code()),
                    None => write!(f, "{}:{}:{}:{}:{}", from, to, moved, EMPTY_CELL, tag.code()),
                }
            }
            LogEntry::Castle { .. } => write!(f, "{}", self.as_move()),
        }
    }
}

/// Mirrors every coordinate of an encoded move (`v` becomes `7 - v`).
///
/// Black-seat clients render the board flipped and use this on the way in
/// and on the way out.
pub fn mirror_move_str(s: &str) -> Result<String, MoveParseError> {
    Ok(s.parse::<Move>()?.mirrored().to_string())
}

fn parse_tag(s: &str, last: Option<&str>) -> Result<MoveTag, MoveParseError> {
    let last = last.ok_or_else(|| MoveParseError::Malformed(s.to_string()))?;
    let mut chars = last.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => MoveTag::from_code(c).ok_or(MoveParseError::UnsupportedTag(c)),
        _ => Err(MoveParseError::Malformed(s.to_string())),
    }
}

fn parse_square(s: &str) -> Result<Square, MoveParseError> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return Err(MoveParseError::BadSquare(s.to_string()));
    }
    match (bytes[0], bytes[1]) {
        (c @ b'0'..=b'7', r @ b'0'..=b'7') => Ok(Square::new(c - b'0', r - b'0')),
        _ => Err(MoveParseError::BadSquare(s.to_string())),
    }
}
