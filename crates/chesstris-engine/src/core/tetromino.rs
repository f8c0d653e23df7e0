use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use serde::{Deserialize, Serialize};

use super::coord::{Coord, Direction};

/// The seven canonical tetromino shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TetrominoShape {
    I = 0,
    O = 1,
    T = 2,
    S = 3,
    Z = 4,
    J = 5,
    L = 6,
}

impl Distribution<TetrominoShape> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TetrominoShape {
        match rng.random_range(0..=6) {
            0 => TetrominoShape::I,
            1 => TetrominoShape::O,
            2 => TetrominoShape::T,
            3 => TetrominoShape::S,
            4 => TetrominoShape::Z,
            5 => TetrominoShape::J,
            _ => TetrominoShape::L,
        }
    }
}

impl TetrominoShape {
    /// Number of shapes (7).
    pub const LEN: usize = 7;

    pub const ALL: [Self; Self::LEN] = [
        Self::I,
        Self::O,
        Self::T,
        Self::S,
        Self::Z,
        Self::J,
        Self::L,
    ];

    /// Returns the block offsets of this shape in the given rotation,
    /// relative to the top-left of its bounding box.
    #[must_use]
    pub fn offsets(self, rotation: Rotation) -> [Coord; 4] {
        SHAPE_OFFSETS[self as usize][rotation.as_usize()].map(|(x, y)| Coord::new(x, y))
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::I => 'I',
            Self::O => 'O',
            Self::T => 'T',
            Self::S => 'S',
            Self::Z => 'Z',
            Self::J => 'J',
            Self::L => 'L',
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(Self::I),
            'O' => Some(Self::O),
            'T' => Some(Self::T),
            'S' => Some(Self::S),
            'Z' => Some(Self::Z),
            'J' => Some(Self::J),
            'L' => Some(Self::L),
            _ => None,
        }
    }
}

/// Rotation state of a tetromino, in quarter turns clockwise (0-3).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rotation(u8);

impl Rotation {
    #[must_use]
    pub fn rotated_right(self) -> Self {
        Rotation((self.0 + 1) % 4)
    }

    #[must_use]
    pub fn rotated_left(self) -> Self {
        Rotation((self.0 + 3) % 4)
    }

    const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Rotation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 3 {
            return Err(format!("rotation must be 0-3, got {value}"));
        }
        Ok(Self(value))
    }
}

impl From<Rotation> for u8 {
    fn from(rotation: Rotation) -> Self {
        rotation.0
    }
}

/// A tetromino shape at a position and rotation.
///
/// `position` is the top-left corner of the 4×4 bounding grid; blocks are
/// `position + offset`. Values are immutable; movement returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tetromino {
    pub shape: TetrominoShape,
    pub rotation: Rotation,
    pub position: Coord,
}

impl Tetromino {
    #[must_use]
    pub fn new(shape: TetrominoShape, rotation: Rotation, position: Coord) -> Self {
        Self {
            shape,
            rotation,
            position,
        }
    }

    /// Board coordinates covered by the four blocks, in offset order.
    #[must_use]
    pub fn blocks(&self) -> [Coord; 4] {
        self.shape
            .offsets(self.rotation)
            .map(|o| self.position.offset(o.x, o.y))
    }

    /// Board coordinates of the blocks, or `None` if `position` is so far out
    /// that a block coordinate does not fit in `i32`.
    #[must_use]
    pub fn checked_blocks(&self) -> Option<[Coord; 4]> {
        let [a, b, c, d] = self.shape.offsets(self.rotation);
        Some([
            self.position.checked_offset(a.x, a.y)?,
            self.position.checked_offset(b.x, b.y)?,
            self.position.checked_offset(c.x, c.y)?,
            self.position.checked_offset(d.x, d.y)?,
        ])
    }

    #[must_use]
    pub fn stepped(&self, direction: Direction) -> Self {
        Self {
            position: self.position.step(direction),
            ..*self
        }
    }

    #[must_use]
    pub fn rotated_right(&self) -> Self {
        Self {
            rotation: self.rotation.rotated_right(),
            ..*self
        }
    }

    /// Inclusive bounding box of the blocks as `(min, max)` offsets from
    /// `position`.
    #[must_use]
    pub fn extent(shape: TetrominoShape, rotation: Rotation) -> (Coord, Coord) {
        let offsets = shape.offsets(rotation);
        let min = Coord::new(
            offsets.iter().map(|c| c.x).min().unwrap_or(0),
            offsets.iter().map(|c| c.y).min().unwrap_or(0),
        );
        let max = Coord::new(
            offsets.iter().map(|c| c.x).max().unwrap_or(0),
            offsets.iter().map(|c| c.y).max().unwrap_or(0),
        );
        (min, max)
    }
}

type ShapeGrid = [[bool; 4]; 4];
type ShapeOffsets = [(i32, i32); 4];

/// Generates the block offsets of all 4 rotation states by rotating the
/// shape grid 90° clockwise.
///
/// # Arguments
///
/// * `size` - Effective size of the shape (3 for most shapes, 4 for I, 2 for O)
/// * `grid` - Shape at 0° rotation; must contain exactly 4 blocks
#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn shape_rotations(size: usize, grid: ShapeGrid) -> [ShapeOffsets; 4] {
    let mut grids = [grid; 4];
    let mut i = 1;
    while i < 4 {
        let mut rotated = [[false; 4]; 4];
        let mut y = 0;
        while y < size {
            let mut x = 0;
            while x < size {
                rotated[y][x] = grids[i - 1][size - 1 - x][y];
                x += 1;
            }
            y += 1;
        }
        grids[i] = rotated;
        i += 1;
    }

    let mut offsets = [[(0, 0); 4]; 4];
    let mut r = 0;
    while r < 4 {
        let mut n = 0;
        let mut y = 0;
        while y < 4 {
            let mut x = 0;
            while x < 4 {
                if grids[r][y][x] {
                    offsets[r][n] = (x as i32, y as i32);
                    n += 1;
                }
                x += 1;
            }
            y += 1;
        }
        assert!(n == 4);
        r += 1;
    }
    offsets
}

const SHAPE_OFFSETS: [[ShapeOffsets; 4]; TetrominoShape::LEN] = {
    const C: bool = true;
    const E: bool = false;
    const EEEE: [bool; 4] = [E; 4];
    [
        // I
        shape_rotations(4, [EEEE, [C, C, C, C], EEEE, EEEE]),
        // O
        shape_rotations(2, [[C, C, E, E], [C, C, E, E], EEEE, EEEE]),
        // T
        shape_rotations(3, [[E, C, E, E], [C, C, C, E], EEEE, EEEE]),
        // S
        shape_rotations(3, [[E, C, C, E], [C, C, E, E], EEEE, EEEE]),
        // Z
        shape_rotations(3, [[C, C, E, E], [E, C, C, E], EEEE, EEEE]),
        // J
        shape_rotations(3, [[C, E, E, E], [C, C, C, E], EEEE, EEEE]),
        // L
        shape_rotations(3, [[E, E, C, E], [C, C, C, E], EEEE, EEEE]),
    ]
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn rot(n: u8) -> Rotation {
        Rotation::try_from(n).unwrap()
    }

    #[test]
    fn test_every_rotation_has_four_distinct_blocks() {
        for shape in TetrominoShape::ALL {
            for r in 0..4 {
                let blocks: HashSet<_> = shape.offsets(rot(r)).into_iter().collect();
                assert_eq!(blocks.len(), 4, "{shape:?} rotation {r}");
            }
        }
    }

    #[test]
    fn test_checked_blocks_detects_overflow() {
        let near = Tetromino::new(TetrominoShape::I, rot(0), Coord::new(5, 5));
        assert_eq!(near.checked_blocks(), Some(near.blocks()));

        let far = Tetromino::new(TetrominoShape::I, rot(0), Coord::new(i32::MAX, 0));
        assert_eq!(far.checked_blocks(), None);
        let far = Tetromino::new(TetrominoShape::I, rot(1), Coord::new(0, i32::MAX));
        assert_eq!(far.checked_blocks(), None);
    }

    #[test]
    fn test_blocks_are_connected() {
        for shape in TetrominoShape::ALL {
            for r in 0..4 {
                let blocks = shape.offsets(rot(r));
                for b in blocks {
                    assert!(
                        b.neighbors4().iter().any(|n| blocks.contains(n)),
                        "{shape:?} rotation {r} has a detached block at {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_o_is_rotation_invariant() {
        let base: HashSet<_> = TetrominoShape::O.offsets(rot(0)).into_iter().collect();
        for r in 1..4 {
            let other: HashSet<_> = TetrominoShape::O.offsets(rot(r)).into_iter().collect();
            assert_eq!(base, other);
        }
    }

    #[test]
    fn test_i_horizontal_then_vertical() {
        let (min, max) = Tetromino::extent(TetrominoShape::I, rot(0));
        assert_eq!(max.x - min.x, 3);
        assert_eq!(max.y - min.y, 0);
        let (min, max) = Tetromino::extent(TetrominoShape::I, rot(1));
        assert_eq!(max.x - min.x, 0);
        assert_eq!(max.y - min.y, 3);
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(rot(3).rotated_right(), rot(0));
        assert_eq!(rot(0).rotated_left(), rot(3));
        assert!(Rotation::try_from(4).is_err());
    }

    #[test]
    fn test_rotation_serializes_as_number() {
        assert_eq!(serde_json::to_string(&rot(2)).unwrap(), "2");
        assert!(serde_json::from_str::<Rotation>("7").is_err());
    }

    #[test]
    fn test_blocks_follow_position() {
        let t = Tetromino::new(TetrominoShape::O, Rotation::default(), Coord::new(5, 7));
        let blocks: HashSet<_> = t.blocks().into_iter().collect();
        let expected: HashSet<_> = [(5, 7), (6, 7), (5, 8), (6, 8)]
            .into_iter()
            .map(Coord::from)
            .collect();
        assert_eq!(blocks, expected);
    }
}
