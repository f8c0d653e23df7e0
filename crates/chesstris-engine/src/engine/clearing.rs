//! Clearing Engine.
//!
//! Rows and columns are counted independently on the board as it stands after
//! a lock. Every full line is then removed cell by cell, except cells inside
//! a home zone that holds at least one piece.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::{Board, ChessPiece, Coord, HomeZone, PotionId};

/// What a clearing pass removed.
///
/// `rows` and `columns` list the full lines that lost at least one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearReport {
    pub rows: Vec<i32>,
    pub columns: Vec<i32>,
    pub removed_cells: Vec<Coord>,
    /// Pieces that stood on removed cells.
    pub removed_pieces: Vec<ChessPiece>,
    pub removed_potions: Vec<PotionId>,
}

impl ClearReport {
    /// Number of full rows plus full columns.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rows.len() + self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }
}

/// Returns the full rows and columns, in ascending order.
#[must_use]
pub fn full_lines(board: &Board, threshold: u32) -> (Vec<i32>, Vec<i32>) {
    let mut rows = BTreeMap::<i32, u32>::new();
    let mut columns = BTreeMap::<i32, u32>::new();
    for (at, _) in board.cells() {
        *rows.entry(at.y).or_default() += 1;
        *columns.entry(at.x).or_default() += 1;
    }
    let full = |counts: BTreeMap<i32, u32>| {
        counts
            .into_iter()
            .filter(|&(_, n)| n >= threshold)
            .map(|(line, _)| line)
            .collect()
    };
    (full(rows), full(columns))
}

/// A zone protects its cells only while some piece stands inside it.
#[must_use]
pub fn is_safe_zone(board: &Board, zone: &HomeZone) -> bool {
    board.pieces().any(|p| zone.contains(p.position))
}

/// Removes every full row and column, sparing cells of safe zones.
pub fn clear_full_lines<'a>(
    board: &mut Board,
    zones: impl IntoIterator<Item = &'a HomeZone>,
    threshold: u32,
) -> ClearReport {
    let (rows, columns) = full_lines(board, threshold);
    if rows.is_empty() && columns.is_empty() {
        return ClearReport::default();
    }

    let safe: Vec<&HomeZone> = zones
        .into_iter()
        .filter(|zone| is_safe_zone(board, zone))
        .collect();
    let doomed: BTreeSet<Coord> = board
        .cells()
        .map(|(at, _)| at)
        .filter(|at| rows.contains(&at.y) || columns.contains(&at.x))
        .filter(|at| !safe.iter().any(|zone| zone.contains(*at)))
        .collect();

    let mut report = ClearReport::default();
    for at in doomed {
        let Some((cell, piece)) = board.remove_cell(at) else {
            continue;
        };
        report.removed_cells.push(at);
        report.removed_pieces.extend(piece);
        report.removed_potions.extend(cell.potion);
    }
    // A full line whose cells were all protected does not count as cleared.
    report.rows = rows
        .into_iter()
        .filter(|&y| report.removed_cells.iter().any(|at| at.y == y))
        .collect();
    report.columns = columns
        .into_iter()
        .filter(|&x| report.removed_cells.iter().any(|at| at.x == x))
        .collect();
    report
}
