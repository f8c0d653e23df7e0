use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::{Direction, PieceId, PlayerId};

/// Where a player is in their own tetris → chess cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Tetris,
    Chess,
}

/// A joined player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// 0xRRGGBB
    pub color: u32,
    /// Direction this player's pawns advance in.
    pub facing: Direction,
    pub phase: Phase,
    pub pieces: BTreeSet<PieceId>,
    pub resources: u32,
    pub score: u64,
    pub jump_until: Option<u64>,
    pub speed_until: Option<u64>,
    pub eliminated: bool,
}

const PALETTE: [u32; 8] = [
    0x00_E5_FF, 0xFF_3D_00, 0x76_FF_03, 0xFF_EA_00, 0xD5_00_F9, 0xFF_91_00, 0x29_79_FF, 0xF5_00_57,
];

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: String, facing: Direction, resources: u32) -> Self {
        let color = PALETTE[id.0 as usize % PALETTE.len()];
        Self {
            id,
            name,
            color,
            facing,
            phase: Phase::Tetris,
            pieces: BTreeSet::new(),
            resources,
            score: 0,
            jump_until: None,
            speed_until: None,
            eliminated: false,
        }
    }

    #[must_use]
    pub fn can_jump(&self, now_ms: u64) -> bool {
        self.jump_until.is_some_and(|until| now_ms < until)
    }

    #[must_use]
    pub fn is_speeding(&self, now_ms: u64) -> bool {
        self.speed_until.is_some_and(|until| now_ms < until)
    }

    /// Drops ability timers that have run out.
    pub fn expire_abilities(&mut self, now_ms: u64) {
        if self.jump_until.is_some_and(|until| now_ms >= until) {
            self.jump_until = None;
        }
        if self.speed_until.is_some_and(|until| now_ms >= until) {
            self.speed_until = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_starts_in_tetris_phase() {
        let player = Player::new(PlayerId(1), "alice".into(), Direction::Down, 10);
        assert!(player.phase.is_tetris());
        assert_eq!(player.resources, 10);
        assert!(!player.can_jump(0));
    }

    #[test]
    fn test_ability_expiry() {
        let mut player = Player::new(PlayerId(1), "bob".into(), Direction::Up, 0);
        player.jump_until = Some(100);
        player.speed_until = Some(50);
        assert!(player.can_jump(99));
        assert!(player.is_speeding(49));

        player.expire_abilities(60);
        assert!(player.jump_until.is_some());
        assert!(player.speed_until.is_none());

        player.expire_abilities(100);
        assert!(!player.can_jump(100));
        assert!(player.jump_until.is_none());
    }
}
