use serde::{Deserialize, Serialize};

use crate::core::PieceKind;

/// Purchase cost of each non-king piece kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PiecePrices {
    pub pawn: u32,
    pub knight: u32,
    pub bishop: u32,
    pub rook: u32,
    pub queen: u32,
}

impl Default for PiecePrices {
    fn default() -> Self {
        Self {
            pawn: 1,
            knight: 3,
            bishop: 3,
            rook: 5,
            queen: 9,
        }
    }
}

impl PiecePrices {
    /// Returns the price of `kind`, or `None` for kings, which cannot be bought.
    #[must_use]
    pub fn price(&self, kind: PieceKind) -> Option<u32> {
        match kind {
            PieceKind::Pawn => Some(self.pawn),
            PieceKind::Knight => Some(self.knight),
            PieceKind::Bishop => Some(self.bishop),
            PieceKind::Rook => Some(self.rook),
            PieceKind::Queen => Some(self.queen),
            PieceKind::King => None,
        }
    }
}

/// Read-only rules configuration of a game.
///
/// Every field has a default, so a partial JSON document is a valid config:
///
/// ```
/// use chesstris_engine::GameConfig;
///
/// let config: GameConfig = serde_json::from_str(r#"{ "clearThreshold": 6 }"#).unwrap();
/// assert_eq!(config.clear_threshold, 6);
/// assert_eq!(config.board_width, GameConfig::default().board_width);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub board_width: u32,
    pub board_height: u32,
    pub home_zone_width: u32,
    pub home_zone_height: u32,
    pub min_zone_distance: u32,
    pub max_zone_distance: u32,
    pub zone_placement_attempts: u32,
    /// Cells in one row or column that make it full.
    pub clear_threshold: u32,
    pub degradation_interval_ms: u64,
    pub fall_interval_ms: u64,
    /// Most fall or degradation ticks one clock advance may run. Intervals
    /// past this bound are dropped.
    pub max_catch_up_ticks: u32,
    /// Visual height a tetromino spawns at; it falls one unit per fall tick.
    pub spawn_height: u32,
    pub sponsor_chance: f64,
    pub potion_chance: f64,
    pub sponsors: Vec<String>,
    pub jump_duration_ms: u64,
    pub speed_duration_ms: u64,
    pub shield_duration_ms: u64,
    /// Extra columns a home zone may gain from grow potions.
    pub grow_limit: u32,
    pub piece_prices: PiecePrices,
    pub starting_resources: u32,
    /// Resources credited per cleared row or column.
    pub clear_reward: u32,
    /// Rows a pawn must advance before it promotes to a queen.
    pub promotion_distance: u32,
    pub history_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: 32,
            board_height: 32,
            home_zone_width: 8,
            home_zone_height: 2,
            min_zone_distance: 2,
            max_zone_distance: 6,
            zone_placement_attempts: 10,
            clear_threshold: 8,
            degradation_interval_ms: 120_000,
            fall_interval_ms: 200,
            max_catch_up_ticks: 64,
            spawn_height: 10,
            sponsor_chance: 0.2,
            potion_chance: 0.1,
            sponsors: Vec::new(),
            jump_duration_ms: 60_000,
            speed_duration_ms: 60_000,
            shield_duration_ms: 60_000,
            grow_limit: 2,
            piece_prices: PiecePrices::default(),
            starting_resources: 10,
            clear_reward: 1,
            promotion_distance: 8,
            history_size: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("board must be at least 4x4, got {width}x{height}")]
    BoardTooSmall { width: u32, height: u32 },
    #[display("home zone {width}x{height} does not fit the board")]
    ZoneDoesNotFit { width: u32, height: u32 },
    #[display("home zone must be at least 1x2, got {width}x{height}")]
    ZoneTooSmall { width: u32, height: u32 },
    #[display("min zone distance {min} exceeds max zone distance {max}")]
    InvertedZoneDistance { min: u32, max: u32 },
    #[display("{field} must be positive")]
    NotPositive { field: &'static str },
    #[display("{field} must be within [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f64 },
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = (self.board_width, self.board_height);
        if width < 4 || height < 4 {
            return Err(ConfigError::BoardTooSmall { width, height });
        }
        let (zw, zh) = (self.home_zone_width, self.home_zone_height);
        if zw < 1 || zh < 2 {
            return Err(ConfigError::ZoneTooSmall {
                width: zw,
                height: zh,
            });
        }
        if zw > width || zh > height {
            return Err(ConfigError::ZoneDoesNotFit {
                width: zw,
                height: zh,
            });
        }
        if self.min_zone_distance > self.max_zone_distance {
            return Err(ConfigError::InvertedZoneDistance {
                min: self.min_zone_distance,
                max: self.max_zone_distance,
            });
        }
        for (field, value) in [
            ("clearThreshold", u64::from(self.clear_threshold)),
            ("zonePlacementAttempts", u64::from(self.zone_placement_attempts)),
            ("degradationIntervalMs", self.degradation_interval_ms),
            ("fallIntervalMs", self.fall_interval_ms),
            ("maxCatchUpTicks", u64::from(self.max_catch_up_ticks)),
            ("historySize", u64::try_from(self.history_size).unwrap_or(u64::MAX)),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field });
            }
        }
        for (field, value) in [
            ("sponsorChance", self.sponsor_chance),
            ("potionChance", self.potion_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { field, value });
            }
        }
        Ok(())
    }
}
