use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer board coordinate, used as the key of the sparse cell map.
///
/// # Coordinate System
///
/// - (0, 0) is the top-left corner of the board
/// - X increases rightward (columns)
/// - Y increases downward (rows)
///
/// Coordinates may be negative while probing around the board edge; the
/// board decides what is in bounds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Like [`Coord::offset`], but `None` when a component overflows.
    #[must_use]
    pub const fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(x), Some(y)) => Some(Self { x, y }),
            _ => None,
        }
    }

    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// Returns the four orthogonal neighbours (up, right, down, left).
    #[must_use]
    pub fn neighbors4(self) -> [Self; 4] {
        Direction::ALL.map(|d| self.step(d))
    }

    /// Iterates over the coordinates strictly between `self` and `other`.
    ///
    /// Returns `None` when the two coordinates are not on a shared rank, file
    /// or diagonal.
    #[must_use]
    pub fn between(self, other: Self) -> Option<impl Iterator<Item = Self>> {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if !(dx == 0 || dy == 0 || dx.abs() == dy.abs()) {
            return None;
        }
        let steps = dx.abs().max(dy.abs());
        let (sx, sy) = (dx.signum(), dy.signum());
        Some((1..steps).map(move |i| self.offset(sx * i, sy * i)))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Cardinal direction on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }
}
