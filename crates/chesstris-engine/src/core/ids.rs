use serde::{Deserialize, Serialize};

/// Identifier of a joined player.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("player#{_0}")]
#[serde(transparent)]
pub struct PlayerId(pub u32);

/// Identifier of a chess piece, unique for the lifetime of a game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("piece#{_0}")]
#[serde(transparent)]
pub struct PieceId(pub u32);

/// Identifier of a potion lying on the board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("potion#{_0}")]
#[serde(transparent)]
pub struct PotionId(pub u32);

/// Monotonic id allocator shared by all id kinds of one game.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdAllocator {
    next_player: u32,
    next_piece: u32,
    next_potion: u32,
}

impl IdAllocator {
    pub(crate) fn player(&mut self) -> PlayerId {
        self.next_player += 1;
        PlayerId(self.next_player)
    }

    pub(crate) fn piece(&mut self) -> PieceId {
        self.next_piece += 1;
        PieceId(self.next_piece)
    }

    pub(crate) fn potion(&mut self) -> PotionId {
        self.next_potion += 1;
        PotionId(self.next_potion)
    }
}
