use serde::{Deserialize, Serialize};

use super::{coord::Coord, ids::PlayerId};

/// Rectangular board region owned by a player.
///
/// Width and height never go below zero; a zone whose width reaches zero is
/// deleted by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeZone {
    pub owner: PlayerId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Width at creation; `grow` is capped relative to it.
    pub original_width: i32,
}

impl HomeZone {
    #[must_use]
    pub fn new(owner: PlayerId, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            owner,
            x,
            y,
            width: width.max(0),
            height: height.max(0),
            original_width: width.max(0),
        }
    }

    #[must_use]
    pub fn contains(&self, at: Coord) -> bool {
        (self.x..self.x + self.width).contains(&at.x)
            && (self.y..self.y + self.height).contains(&at.y)
    }

    /// Bounding-box overlap test.
    #[must_use]
    pub fn overlaps(&self, other: &HomeZone) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Whether the whole rectangle lies within a board of the given size.
    #[must_use]
    pub fn fits_within(&self, board_width: i32, board_height: i32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x + self.width <= board_width
            && self.y + self.height <= board_height
    }

    /// Iterates over every coordinate of the rectangle, row by row.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let (x0, y0, w, h) = (self.x, self.y, self.width, self.height);
        (y0..y0 + h).flat_map(move |y| (x0..x0 + w).map(move |x| Coord::new(x, y)))
    }

    /// Distance of `at` from the nearest edge of the rectangle (0 on the edge).
    #[must_use]
    pub fn edge_depth(&self, at: Coord) -> i32 {
        let left = at.x - self.x;
        let right = self.x + self.width - 1 - at.x;
        let top = at.y - self.y;
        let bottom = self.y + self.height - 1 - at.y;
        left.min(right).min(top).min(bottom)
    }

    #[must_use]
    pub fn center(&self) -> Coord {
        Coord::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}
