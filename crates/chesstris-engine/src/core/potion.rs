use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use serde::{Deserialize, Serialize};

use super::{coord::Coord, ids::PotionId};

/// Effect a potion grants when a piece steps onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PotionKind {
    /// Doubles the owner's tetromino fall rate for a while.
    Speed,
    /// All of the owner's pieces may pass over other pieces for a while.
    Jump,
    /// One random piece of the owner cannot be captured for a while.
    Shield,
    /// The owner's home zone grows by one column.
    Grow,
}

impl PotionKind {
    pub const ALL: [Self; 4] = [Self::Speed, Self::Jump, Self::Shield, Self::Grow];
}

impl Distribution<PotionKind> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PotionKind {
        match rng.random_range(0..4) {
            0 => PotionKind::Speed,
            1 => PotionKind::Jump,
            2 => PotionKind::Shield,
            _ => PotionKind::Grow,
        }
    }
}

/// A potion lying on a board cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Potion {
    pub id: PotionId,
    pub kind: PotionKind,
    pub position: Coord,
}
