//! Potion/Effect System.

use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::core::{Board, HomeZone, PieceId, PotionKind};

use super::{config::GameConfig, player::Player, zones};

/// What a consumed potion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PotionEffect {
    /// The player's tetromino falls twice as fast until `until_ms`.
    Speed { until_ms: u64 },
    /// Every piece of the player may pass over other pieces until `until_ms`.
    Jump { until_ms: u64 },
    /// `piece` cannot be captured until `until_ms`. `None` if the player had
    /// no piece to shield.
    Shield {
        piece: Option<PieceId>,
        until_ms: u64,
    },
    /// The home zone's new width, or `None` if it was already at its cap or
    /// the player has no zone.
    Grow { width: Option<i32> },
}

/// Everything a potion may touch when it is consumed.
pub(crate) struct EffectTarget<'a> {
    pub(crate) player: &'a mut Player,
    pub(crate) board: &'a mut Board,
    pub(crate) zone: Option<&'a mut HomeZone>,
}

pub(crate) fn apply_potion<R>(
    kind: PotionKind,
    target: EffectTarget<'_>,
    config: &GameConfig,
    now_ms: u64,
    rng: &mut R,
) -> PotionEffect
where
    R: Rng + ?Sized,
{
    let EffectTarget {
        player,
        board,
        zone,
    } = target;
    match kind {
        PotionKind::Speed => {
            let until_ms = now_ms.saturating_add(config.speed_duration_ms);
            player.speed_until = Some(until_ms);
            PotionEffect::Speed { until_ms }
        }
        PotionKind::Jump => {
            let until_ms = now_ms.saturating_add(config.jump_duration_ms);
            player.jump_until = Some(until_ms);
            PotionEffect::Jump { until_ms }
        }
        PotionKind::Shield => {
            let until_ms = now_ms.saturating_add(config.shield_duration_ms);
            let mut candidates: Vec<PieceId> = board.pieces_of(player.id).map(|p| p.id).collect();
            candidates.sort_unstable();
            let piece = candidates.choose(rng).copied();
            if let Some(piece) = piece.and_then(|id| board.piece_mut(id)) {
                piece.shielded_until = Some(until_ms);
            }
            PotionEffect::Shield { piece, until_ms }
        }
        PotionKind::Grow => {
            let width = zone.and_then(|zone| zones::grow_zone(zone, board.width(), config.grow_limit));
            PotionEffect::Grow { width }
        }
    }
}
