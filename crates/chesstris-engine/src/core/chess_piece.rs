use serde::{Deserialize, Serialize};

use super::{
    coord::{Coord, Direction},
    ids::{PieceId, PlayerId},
};

/// Type of a chess piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [Self; 6] = [
        Self::Pawn,
        Self::Rook,
        Self::Knight,
        Self::Bishop,
        Self::Queen,
        Self::King,
    ];

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use chesstris_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::Knight.as_char(), 'N');
    /// assert_eq!(PieceKind::from_char('q'), Some(PieceKind::Queen));
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Rook => 'R',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    /// Parses a piece kind from a single character, ignoring case.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'P' => Some(Self::Pawn),
            'R' => Some(Self::Rook),
            'N' => Some(Self::Knight),
            'B' => Some(Self::Bishop),
            'Q' => Some(Self::Queen),
            'K' => Some(Self::King),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_slider(self) -> bool {
        matches!(self, Self::Rook | Self::Bishop | Self::Queen)
    }
}

/// A chess piece standing on a board cell.
///
/// A piece's `position` always equals the coordinate of the one cell that
/// references it; the board keeps both sides in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessPiece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub owner: PlayerId,
    pub position: Coord,
    /// Where the piece was created. Pawns use it for the double step and
    /// for promotion distance.
    pub origin: Coord,
    /// Direction a pawn of this piece's owner advances in.
    pub forward: Direction,
    /// Game clock (ms) until which the piece cannot be captured.
    pub shielded_until: Option<u64>,
    pub promoted: bool,
}

impl ChessPiece {
    #[must_use]
    pub fn new(
        id: PieceId,
        kind: PieceKind,
        owner: PlayerId,
        position: Coord,
        forward: Direction,
    ) -> Self {
        Self {
            id,
            kind,
            owner,
            position,
            origin: position,
            forward,
            shielded_until: None,
            promoted: false,
        }
    }

    #[must_use]
    pub fn is_shielded(&self) -> bool {
        self.shielded_until.is_some()
    }

    /// Returns how many rows (or columns, for sideways-facing pawns) the piece
    /// has advanced from its origin in its forward direction.
    #[must_use]
    pub fn advanced_distance(&self) -> i32 {
        let (dx, dy) = self.forward.delta();
        (self.position.x - self.origin.x) * dx + (self.position.y - self.origin.y) * dy
    }

    /// Whether a pawn still stands on the rank it was created on.
    #[must_use]
    pub fn on_starting_rank(&self) -> bool {
        self.advanced_distance() == 0
    }
}
