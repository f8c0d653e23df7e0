//! Stateful game orchestration.
//!
//! - Tetromino Placement Engine: [`FallingTetromino`], [`placement_is_valid`]
//! - Clearing Engine: [`clear_full_lines`]
//! - Home Zone Lifecycle Manager: [`place_zone`], [`degrade_zones`]
//! - Potion/Effect System: [`PotionEffect`]
//! - Turn/Phase Controller: [`Game`]

pub use self::{
    clearing::*, config::*, effects::*, events::*, falling::*, game::*, history::*, player::*,
    prediction::*, protocol::*, seed::*, snapshot::*, zones::*,
};

pub(crate) mod clearing;
pub(crate) mod config;
pub(crate) mod effects;
pub(crate) mod events;
pub(crate) mod falling;
pub(crate) mod game;
pub(crate) mod history;
pub(crate) mod player;
pub(crate) mod prediction;
pub(crate) mod protocol;
pub(crate) mod seed;
pub(crate) mod snapshot;
pub(crate) mod zones;
