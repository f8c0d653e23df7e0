use serde::{Deserialize, Serialize};

use crate::core::{Cell, ChessPiece, Coord, HomeZone, PlayerId, Potion};

use super::{falling::FallingTetromino, player::Player};

/// Read-only view of a whole game, for renderers and replay logs.
///
/// Collections are sorted (cells by coordinate, everything else by id) so
/// that two snapshots of equal games compare and serialize equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub version: u64,
    pub clock_ms: u64,
    pub board_width: i32,
    pub board_height: i32,
    pub cells: Vec<CellEntry>,
    pub pieces: Vec<ChessPiece>,
    pub zones: Vec<HomeZone>,
    pub potions: Vec<Potion>,
    pub players: Vec<PlayerStatus>,
    pub falling: Vec<FallingView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    pub at: Coord,
    #[serde(flatten)]
    pub cell: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    #[serde(flatten)]
    pub player: Player,
    pub in_check: bool,
    pub in_checkmate: bool,
}

/// A falling tetromino together with its block coordinates and ghost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallingView {
    #[serde(flatten)]
    pub falling: FallingTetromino,
    pub blocks: [Coord; 4],
    /// Blocks at the position the tetromino would land on if dropped now.
    pub ghost: [Coord; 4],
}

impl GameSnapshot {
    #[must_use]
    pub fn cell(&self, at: Coord) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&at, |entry| entry.at)
            .ok()
            .map(|i| &self.cells[i].cell)
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerStatus> {
        self.players.iter().find(|status| status.player.id == id)
    }
}
