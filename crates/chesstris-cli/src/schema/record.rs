use chesstris_engine::{Command, GameConfig, GameSeed, GameSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recorded headless session, replayable from its seed and command log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSession {
    /// Timestamp when recording was created (ISO 8601 format)
    pub recorded_at: DateTime<Utc>,
    /// Seed of the game's random generator
    pub seed: GameSeed,
    /// Rules the game was played with
    pub config: GameConfig,
    /// Every command in the order the game applied it, rejected ones included
    pub commands: Vec<Command>,
    /// State after the last command
    pub final_snapshot: GameSnapshot,
    /// Most recent snapshots kept by the game's history ring
    pub history: Vec<GameSnapshot>,
}
