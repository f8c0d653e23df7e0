//! Home Zone Lifecycle Manager.
//!
//! Zones are allocated when a player joins, seeded with home-zone cells and a
//! starting army, and degrade on a fixed interval while no piece stands in
//! them: one pieceless cell per tick, outermost first, then one column of
//! width per tick once the cells are gone.

use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::{
    ZonePlacementError,
    core::{
        Board, Cell, CellKind, ChessPiece, Coord, Direction, HomeZone, IdAllocator, PieceKind,
        PlayerId,
    },
};

use super::config::GameConfig;

/// Picks a rectangle for a new zone.
///
/// The first zone goes to a random board corner. Later zones are offset from
/// a random existing zone by a random cardinal direction and a gap sampled
/// from `[minZoneDistance, maxZoneDistance]`. A candidate that runs off the
/// board, overlaps another zone or covers a piece is rejected; after
/// `zonePlacementAttempts` rejections the board is considered too crowded.
pub fn place_zone<'a, R>(
    board: &Board,
    zones: impl IntoIterator<Item = &'a HomeZone>,
    owner: PlayerId,
    config: &GameConfig,
    rng: &mut R,
) -> Result<HomeZone, ZonePlacementError>
where
    R: Rng + ?Sized,
{
    let zones: Vec<&HomeZone> = zones.into_iter().collect();
    let width = i32::try_from(config.home_zone_width).unwrap_or(i32::MAX);
    let height = i32::try_from(config.home_zone_height).unwrap_or(i32::MAX);
    let min = i32::try_from(config.min_zone_distance).unwrap_or(i32::MAX);
    let max = i32::try_from(config.max_zone_distance).unwrap_or(i32::MAX);

    for _ in 0..config.zone_placement_attempts {
        let (x, y) = match zones.choose(rng) {
            None => {
                let corners = [
                    (0, 0),
                    (board.width() - width, 0),
                    (0, board.height() - height),
                    (board.width() - width, board.height() - height),
                ];
                corners[rng.random_range(0..corners.len())]
            }
            Some(base) => {
                let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
                let (dx, dy) = direction.delta();
                let gap = rng.random_range(min..=max);
                (
                    base.x + dx * (width + gap),
                    base.y + dy * (height + gap),
                )
            }
        };
        let candidate = HomeZone::new(owner, x, y, width, height);
        if candidate.fits_within(board.width(), board.height())
            && !zones.iter().any(|z| z.overlaps(&candidate))
            && !candidate.coords().any(|at| board.is_occupied(at))
        {
            return Ok(candidate);
        }
    }
    Err(ZonePlacementError::BoardTooCrowded {
        attempts: config.zone_placement_attempts,
    })
}

/// Direction a zone's pawns advance in: toward the board's vertical centre.
#[must_use]
pub fn zone_facing(zone: &HomeZone, board_height: i32) -> Direction {
    if zone.y + zone.height / 2 < board_height / 2 {
        Direction::Down
    } else {
        Direction::Up
    }
}

/// Back rank for a zone of the given width: `RNBQKBNR` at width 8, with the
/// king in the middle and rook, knight, bishop, queen by distance from the
/// edge otherwise.
#[must_use]
pub fn back_rank(width: i32) -> Vec<PieceKind> {
    (0..width)
        .map(|i| {
            if i == width / 2 {
                return PieceKind::King;
            }
            match i.min(width - 1 - i) {
                0 => PieceKind::Rook,
                1 => PieceKind::Knight,
                2 => PieceKind::Bishop,
                _ => PieceKind::Queen,
            }
        })
        .collect()
}

/// Creates the zone's cells and its starting pieces.
///
/// The back rank goes on the outer row and pawns on the row in front of it.
/// Returns the pieces placed.
pub(crate) fn seed_zone(
    board: &mut Board,
    zone: &HomeZone,
    facing: Direction,
    ids: &mut IdAllocator,
    now_ms: u64,
) -> Vec<ChessPiece> {
    for at in zone.coords() {
        board.set_cell(at, Cell::new(CellKind::HomeZone, Some(zone.owner), now_ms));
    }

    let (back_y, pawn_y) = match facing {
        Direction::Down => (zone.y, zone.y + 1),
        _ => (zone.y + zone.height - 1, zone.y + zone.height - 2),
    };
    let ranks = back_rank(zone.width)
        .into_iter()
        .zip(zone.x..)
        .map(|(kind, x)| (kind, Coord::new(x, back_y)))
        .chain((zone.x..zone.x + zone.width).map(|x| (PieceKind::Pawn, Coord::new(x, pawn_y))));

    let mut placed = Vec::new();
    for (kind, at) in ranks {
        let piece = ChessPiece::new(ids.piece(), kind, zone.owner, at, facing);
        if board.insert_piece(piece.clone()).is_ok() {
            placed.push(piece);
        }
    }
    placed
}

/// One degradation step applied to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ZoneChange {
    CellRemoved { owner: PlayerId, at: Coord },
    Shrunk { owner: PlayerId, width: i32 },
    Removed { owner: PlayerId },
}

/// Runs one degradation tick over every zone.
///
/// A zone with a piece inside is left alone. Otherwise exactly one pieceless
/// cell is removed, scanning from the outer edge inward; only when none is
/// left does the width shrink by one, and a zone at width zero is deleted.
pub fn degrade_zones(board: &mut Board, zones: &mut Vec<HomeZone>) -> Vec<ZoneChange> {
    let mut changes = Vec::new();
    for zone in zones.iter_mut() {
        if board.pieces().any(|p| zone.contains(p.position)) {
            continue;
        }
        let outermost = zone
            .coords()
            .filter(|&at| board.has_cell(at))
            .min_by_key(|&at| (zone.edge_depth(at), at.y, at.x));
        if let Some(at) = outermost {
            board.remove_cell(at);
            changes.push(ZoneChange::CellRemoved {
                owner: zone.owner,
                at,
            });
            continue;
        }
        zone.width -= 1;
        changes.push(ZoneChange::Shrunk {
            owner: zone.owner,
            width: zone.width,
        });
        if zone.width <= 0 {
            changes.push(ZoneChange::Removed { owner: zone.owner });
        }
    }
    zones.retain(|zone| zone.width > 0);
    changes
}

/// Widens a zone by one column, up to `grow_limit` columns beyond its
/// original width. Grows leftward when the right edge is on the board edge.
///
/// Returns the new width, or `None` if the zone could not grow.
pub fn grow_zone(zone: &mut HomeZone, board_width: i32, grow_limit: u32) -> Option<i32> {
    let limit = zone.original_width + i32::try_from(grow_limit).unwrap_or(i32::MAX);
    if zone.width >= limit {
        return None;
    }
    if zone.x + zone.width < board_width {
        zone.width += 1;
    } else if zone.x > 0 {
        zone.x -= 1;
        zone.width += 1;
    } else {
        return None;
    }
    Some(zone.width)
}
