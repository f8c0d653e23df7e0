use serde::{Deserialize, Serialize};

use crate::core::{
    ChessPiece, Coord, HomeZone, PieceId, PieceKind, PlayerId, Potion, PotionId, TetrominoShape,
};

use super::effects::PotionEffect;

/// One entry of the game's event journal.
///
/// Every accepted mutation appends events stamped with the game clock. The
/// network layer forwards them as incremental state updates; the CLI prints
/// them as JSON lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    PlayerJoined {
        at_ms: u64,
        player: PlayerId,
        name: String,
        zone: HomeZone,
    },
    PlayerLeft {
        at_ms: u64,
        player: PlayerId,
    },
    PlayerEliminated {
        at_ms: u64,
        player: PlayerId,
    },
    TetrominoSpawned {
        at_ms: u64,
        player: PlayerId,
        shape: TetrominoShape,
        position: Coord,
    },
    TetrominoLocked {
        at_ms: u64,
        player: PlayerId,
        shape: TetrominoShape,
        cells: Vec<Coord>,
    },
    /// The placement failed its adjacency check and left the board untouched.
    TetrominoExploded {
        at_ms: u64,
        player: PlayerId,
        shape: TetrominoShape,
        cells: Vec<Coord>,
    },
    LinesCleared {
        at_ms: u64,
        player: PlayerId,
        rows: Vec<i32>,
        columns: Vec<i32>,
        removed_cells: usize,
    },
    PieceMoved {
        at_ms: u64,
        player: PlayerId,
        piece: PieceId,
        from: Coord,
        to: Coord,
    },
    PieceCaptured {
        at_ms: u64,
        player: PlayerId,
        captured: ChessPiece,
    },
    /// A piece went down with its cell (clearing or degradation).
    PieceLost {
        at_ms: u64,
        piece: ChessPiece,
    },
    PiecePurchased {
        at_ms: u64,
        player: PlayerId,
        piece: PieceId,
        kind: PieceKind,
        at: Coord,
    },
    PiecePromoted {
        at_ms: u64,
        player: PlayerId,
        piece: PieceId,
    },
    PotionSpawned {
        at_ms: u64,
        potion: Potion,
    },
    PotionConsumed {
        at_ms: u64,
        player: PlayerId,
        potion: PotionId,
        effect: PotionEffect,
    },
    ZoneCellDegraded {
        at_ms: u64,
        owner: PlayerId,
        at: Coord,
    },
    ZoneShrunk {
        at_ms: u64,
        owner: PlayerId,
        width: i32,
    },
    ZoneRemoved {
        at_ms: u64,
        owner: PlayerId,
    },
}

impl GameEvent {
    /// Game clock (ms) at which the event happened.
    #[must_use]
    pub fn at_ms(&self) -> u64 {
        match self {
            Self::PlayerJoined { at_ms, .. }
            | Self::PlayerLeft { at_ms, .. }
            | Self::PlayerEliminated { at_ms, .. }
            | Self::TetrominoSpawned { at_ms, .. }
            | Self::TetrominoLocked { at_ms, .. }
            | Self::TetrominoExploded { at_ms, .. }
            | Self::LinesCleared { at_ms, .. }
            | Self::PieceMoved { at_ms, .. }
            | Self::PieceCaptured { at_ms, .. }
            | Self::PieceLost { at_ms, .. }
            | Self::PiecePurchased { at_ms, .. }
            | Self::PiecePromoted { at_ms, .. }
            | Self::PotionSpawned { at_ms, .. }
            | Self::PotionConsumed { at_ms, .. }
            | Self::ZoneCellDegraded { at_ms, .. }
            | Self::ZoneShrunk { at_ms, .. }
            | Self::ZoneRemoved { at_ms, .. } => *at_ms,
        }
    }
}
