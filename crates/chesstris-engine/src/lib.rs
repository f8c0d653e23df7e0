//! Rules engine for a simultaneous, turnless game that mixes tetromino
//! placement with chess movement on one shared, sparse board.
//!
//! - [`core`] holds plain data and pure rules: the board store, pieces,
//!   tetromino shapes, home-zone geometry, move generation and check tests.
//! - [`engine`] holds the stateful orchestration around a [`Game`]: falling
//!   tetrominoes, clearing, home-zone lifecycle, potions, phases, events and
//!   the wire protocol.

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// An action was understood but breaks a rule. Nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ValidationError {
    #[display("{player} is in the {actual:?} phase, expected {expected:?}")]
    WrongPhase {
        player: PlayerId,
        expected: Phase,
        actual: Phase,
    },
    #[display("{player} has no legal chess moves; place a tetromino or buy a piece")]
    NoLegalMoves { player: PlayerId },
    #[display("{piece} does not belong to {player}")]
    NotOwner { player: PlayerId, piece: PieceId },
    #[display("{from} -> {to} is not a legal move")]
    IllegalMove { from: Coord, to: Coord },
    #[display("{player} has been eliminated")]
    Eliminated { player: PlayerId },
    #[display("kings cannot be purchased")]
    KingNotPurchasable,
    #[display("{kind:?} costs {price} but {player} has {available}")]
    InsufficientResources {
        player: PlayerId,
        kind: PieceKind,
        price: u32,
        available: u32,
    },
    #[display("{player} cannot place a piece at {at}")]
    InvalidPurchaseSquare { player: PlayerId, at: Coord },
    #[display("tetromino position {at} is out of range")]
    PositionOutOfRange { at: Coord },
    #[display("{player} has no falling tetromino")]
    NoFallingTetromino { player: PlayerId },
    #[display("{player}'s falling tetromino is blocked")]
    TetrominoBlocked { player: PlayerId },
}

/// An action names something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NotFoundError {
    #[display("unknown player {player}")]
    Player { player: PlayerId },
    #[display("no piece at {at}")]
    Piece { at: Coord },
}

/// The action was validated against an older state than the current one.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("stale state: action expected version {expected}, game is at {actual}")]
pub struct ConcurrencyConflict {
    pub expected: u64,
    pub actual: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ZonePlacementError {
    #[display("zone placement failed after {attempts} attempts: board too crowded")]
    BoardTooCrowded { attempts: u32 },
}

/// Every way an engine operation can be rejected.
///
/// A tetromino that fails its adjacency check is not an error: it explodes,
/// see [`PlacementOutcome::Exploded`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum GameError {
    #[display("{_0}")]
    Validation(ValidationError),
    #[display("{_0}")]
    NotFound(NotFoundError),
    #[display("{_0}")]
    Conflict(ConcurrencyConflict),
    #[display("{_0}")]
    ZonePlacement(ZonePlacementError),
}
