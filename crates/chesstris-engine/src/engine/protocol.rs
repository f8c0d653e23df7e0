//! Wire protocol between players and the serializing authority.
//!
//! Inbound messages are [`Command`]s; each one is answered with an
//! [`ActionResponse`] carrying `success`, an optional human-readable `error`
//! and an action-specific payload flattened into the same object.

use serde::{Deserialize, Serialize};

use crate::{
    GameError,
    core::{Coord, Direction, PieceId, PieceKind, PlayerId, Rotation, TetrominoShape},
};

use super::game::{Game, MoveOutcome, PlacementOutcome};

/// An action submitted by a client.
///
/// Mutating commands may carry `expectedVersion`; when present and stale the
/// command is rejected with a concurrency conflict before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    Join {
        name: String,
    },
    Leave {
        player_id: PlayerId,
    },
    MoveChessPiece {
        player_id: PlayerId,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_version: Option<u64>,
    },
    PurchasePiece {
        player_id: PlayerId,
        piece_type: PieceKind,
        x: i32,
        y: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_version: Option<u64>,
    },
    PlaceTetromino {
        player_id: PlayerId,
        shape: TetrominoShape,
        position: Coord,
        #[serde(default)]
        rotation: Rotation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_version: Option<u64>,
    },
    ShiftTetromino {
        player_id: PlayerId,
        direction: Direction,
    },
    RotateTetromino {
        player_id: PlayerId,
    },
    HardDrop {
        player_id: PlayerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_version: Option<u64>,
    },
    Tick {
        dt_ms: u64,
    },
}

impl Command {
    /// The player issuing the command, if it names one.
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        match *self {
            Self::Join { .. } | Self::Tick { .. } => None,
            Self::Leave { player_id }
            | Self::MoveChessPiece { player_id, .. }
            | Self::PurchasePiece { player_id, .. }
            | Self::PlaceTetromino { player_id, .. }
            | Self::ShiftTetromino { player_id, .. }
            | Self::RotateTetromino { player_id }
            | Self::HardDrop { player_id, .. } => Some(player_id),
        }
    }

    #[must_use]
    pub fn expected_version(&self) -> Option<u64> {
        match *self {
            Self::MoveChessPiece {
                expected_version, ..
            }
            | Self::PurchasePiece {
                expected_version, ..
            }
            | Self::PlaceTetromino {
                expected_version, ..
            }
            | Self::HardDrop {
                expected_version, ..
            } => expected_version,
            _ => None,
        }
    }
}

/// Action-specific part of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionPayload {
    Joined { player_id: PlayerId },
    Moved(MoveOutcome),
    Placed(PlacementOutcome),
    Purchased { piece_id: PieceId },
}

/// Per-command result object sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Option<ActionPayload>,
    /// Game version after the command was handled.
    pub version: u64,
}

impl ActionResponse {
    #[must_use]
    pub fn accepted(payload: Option<ActionPayload>, version: u64) -> Self {
        Self {
            success: true,
            error: None,
            payload,
            version,
        }
    }

    #[must_use]
    pub fn rejected(error: &GameError, version: u64) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            payload: None,
            version,
        }
    }
}

impl Game {
    /// Applies one command and converts the outcome into a response.
    ///
    /// Never panics on bad input: every rejection becomes
    /// `success: false` with the error message.
    pub fn apply(&mut self, command: &Command) -> ActionResponse {
        match self.execute(command) {
            Ok(payload) => ActionResponse::accepted(payload, self.version()),
            Err(err) => ActionResponse::rejected(&err, self.version()),
        }
    }

    /// Applies one command, keeping the typed error.
    pub fn execute(&mut self, command: &Command) -> Result<Option<ActionPayload>, GameError> {
        self.check_version(command.expected_version())?;
        let payload = match *command {
            Command::Join { ref name } => {
                let player_id = self.add_player(name.as_str())?;
                Some(ActionPayload::Joined { player_id })
            }
            Command::Leave { player_id } => {
                self.remove_player(player_id)?;
                None
            }
            Command::MoveChessPiece {
                player_id,
                from_x,
                from_y,
                to_x,
                to_y,
                ..
            } => {
                let from = Coord::new(from_x, from_y);
                let to = Coord::new(to_x, to_y);
                Some(ActionPayload::Moved(self.move_chess_piece(player_id, from, to)?))
            }
            Command::PurchasePiece {
                player_id,
                piece_type,
                x,
                y,
                ..
            } => {
                let piece_id = self.purchase_piece(player_id, piece_type, Coord::new(x, y))?;
                Some(ActionPayload::Purchased { piece_id })
            }
            Command::PlaceTetromino {
                player_id,
                shape,
                position,
                rotation,
                ..
            } => Some(ActionPayload::Placed(self.place_tetromino(
                player_id, shape, position, rotation,
            )?)),
            Command::ShiftTetromino {
                player_id,
                direction,
            } => {
                self.shift_tetromino(player_id, direction)?;
                None
            }
            Command::RotateTetromino { player_id } => {
                self.rotate_tetromino(player_id)?;
                None
            }
            Command::HardDrop { player_id, .. } => {
                Some(ActionPayload::Placed(self.hard_drop(player_id)?))
            }
            Command::Tick { dt_ms } => {
                self.tick(dt_ms);
                None
            }
        };
        Ok(payload)
    }
}
