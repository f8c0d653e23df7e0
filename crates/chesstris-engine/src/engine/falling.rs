//! Tetromino Placement Engine.
//!
//! Each player has at most one falling tetromino. It spawns at a random
//! in-bounds position with a visual height, descends one unit per fall tick,
//! then grid-steps toward its owner's home edge until the next step would
//! collide, at which point it lands. Landing does not decide validity:
//! [`placement_is_valid`] does, and an invalid placement explodes without
//! touching the board.

use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::core::{
    Board, Cell, CellKind, Coord, Direction, IdAllocator, PlayerId, Potion, PotionKind, Rotation,
    Tetromino, TetrominoShape,
};

use super::config::GameConfig;

/// Lifecycle of a falling tetromino.
///
/// A tetromino still in play is `Spawned` or `Falling`; the terminal state is
/// reported by [`crate::PlacementOutcome::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "camelCase")]
pub enum TetrominoState {
    #[default]
    Spawned,
    Falling,
    Locked,
    Exploded,
}

/// A potion riding on one block of a falling tetromino.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotionBlock {
    /// Index into [`Tetromino::blocks`].
    pub block: usize,
    pub kind: PotionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallingTetromino {
    pub owner: PlayerId,
    pub tetromino: Tetromino,
    pub fall_height: u32,
    pub sponsor: Option<String>,
    pub potion: Option<PotionBlock>,
    pub state: TetrominoState,
}

/// Result of one fall tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum FallStep {
    Falling,
    Landed,
}

impl FallingTetromino {
    /// Spawns a uniformly chosen shape whose bounding box fits the board.
    pub fn spawn<R>(owner: PlayerId, config: &GameConfig, board: &Board, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let shape: TetrominoShape = rng.random();
        let rotation = Rotation::default();
        let (min, max) = Tetromino::extent(shape, rotation);
        let x = rng.random_range(-min.x..=(board.width() - 1 - max.x).max(-min.x));
        let y = rng.random_range(-min.y..=(board.height() - 1 - max.y).max(-min.y));
        let tetromino = Tetromino::new(shape, rotation, Coord::new(x, y));

        let sponsor = if rng.random_bool(config.sponsor_chance) {
            config.sponsors.choose(rng).cloned()
        } else {
            None
        };
        let potion = rng.random_bool(config.potion_chance).then(|| PotionBlock {
            block: rng.random_range(0..4),
            kind: rng.random(),
        });

        Self {
            owner,
            tetromino,
            fall_height: config.spawn_height,
            sponsor,
            potion,
            state: TetrominoState::Spawned,
        }
    }

    #[must_use]
    pub fn blocks(&self) -> [Coord; 4] {
        self.tetromino.blocks()
    }

    /// Advances the tetromino by `steps` units: height first, then grid
    /// cells in `direction`.
    pub fn fall(&mut self, board: &Board, direction: Direction, steps: u32) -> FallStep {
        self.state = TetrominoState::Falling;
        for _ in 0..steps {
            if self.fall_height > 0 {
                self.fall_height -= 1;
                continue;
            }
            let next = self.tetromino.stepped(direction);
            if collides(board, &next) {
                return FallStep::Landed;
            }
            self.tetromino = next;
        }
        FallStep::Falling
    }

    /// Where the tetromino would land if it dropped straight from here.
    #[must_use]
    pub fn ghost(&self, board: &Board, direction: Direction) -> Tetromino {
        drop_position(board, self.tetromino, direction)
    }
}

/// Whether a block would leave the board or land on an existing cell.
#[must_use]
pub fn collides(board: &Board, tetromino: &Tetromino) -> bool {
    tetromino
        .blocks()
        .iter()
        .any(|&at| !board.is_in_bounds(at) || board.has_cell(at))
}

/// Grid-steps `tetromino` in `direction` until the next step collides.
#[must_use]
pub fn drop_position(board: &Board, mut tetromino: Tetromino, direction: Direction) -> Tetromino {
    loop {
        let next = tetromino.stepped(direction);
        if collides(board, &next) {
            return tetromino;
        }
        tetromino = next;
    }
}

/// A lock is accepted if every block is on the board and either the player
/// owns no cell yet or some block touches an existing cell.
#[must_use]
pub fn placement_is_valid(board: &Board, player: PlayerId, blocks: &[Coord]) -> bool {
    if !blocks.iter().all(|&at| board.is_in_bounds(at)) {
        return false;
    }
    if board.cells_owned_by(player).next().is_none() {
        return true;
    }
    blocks
        .iter()
        .flat_map(|b| b.neighbors4())
        .any(|n| board.has_cell(n))
}

/// Writes one owned cell per block and returns the potion created, if any.
///
/// Existing cells are overwritten. Their occupant, home-zone kind and any
/// potion already lying there are kept.
pub(crate) fn lock(
    board: &mut Board,
    falling: &FallingTetromino,
    ids: &mut IdAllocator,
    now_ms: u64,
) -> Option<Potion> {
    let mut created = None;
    for (i, at) in falling.blocks().into_iter().enumerate() {
        let previous = board.get_cell(at);
        let kind = previous.map_or(CellKind::Normal, |c| c.kind);
        let kept_potion = previous.and_then(|c| c.potion);

        let mut cell = Cell::new(kind, Some(falling.owner), now_ms);
        cell.sponsor.clone_from(&falling.sponsor);
        cell.potion = kept_potion;
        let carried = falling.potion.filter(|pb| pb.block == i);
        if let Some(pb) = carried
            && kept_potion.is_none()
        {
            let potion = Potion {
                id: ids.potion(),
                kind: pb.kind,
                position: at,
            };
            cell.potion = Some(potion.id);
            created = Some(potion);
        }
        board.set_cell(at, cell);
    }
    created
}
