//! Voxel positions and the six cube faces.

use serde::{Deserialize, Serialize};

/// A cell in the voxel world. `y` grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighboring cell across `face`.
    pub fn offset(self, face: Face) -> Self {
        let (dx, dy, dz) = face.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn up(self) -> Self {
        self.offset(Face::Up)
    }

    pub fn down(self) -> Self {
        self.offset(Face::Down)
    }

    /// The cell `n` blocks below this one.
    pub fn below(self, n: i32) -> Self {
        Self::new(self.x, self.y - n, self.z)
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &BlockPos) -> u32 {
        (self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs()
    }

    /// All six face-adjacent cells, in [`Face::ALL`] order.
    pub fn neighbors(self) -> impl Iterator<Item = BlockPos> {
        Face::ALL.into_iter().map(move |f| self.offset(f))
    }
}

/// The six faces of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Face {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Face {
    /// All six faces in a fixed order.
    pub const ALL: [Face; 6] = [
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
        Face::West,
        Face::East,
    ];

    /// Unit offset for this face.
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Face::Down => (0, -1, 0),
            Face::Up => (0, 1, 0),
            Face::North => (0, 0, -1),
            Face::South => (0, 0, 1),
            Face::West => (-1, 0, 0),
            Face::East => (1, 0, 0),
        }
    }

    /// The face pointing the other way.
    pub fn opposite(self) -> Face {
        match self {
            Face::Down => Face::Up,
            Face::Up => Face::Down,
            Face::North => Face::South,
            Face::South => Face::North,
            Face::West => Face::East,
            Face::East => Face::West,
        }
    }

    /// Index into [`Face::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The face at `index`, wrapping modulo six.
    pub fn from_index(index: usize) -> Face {
        Face::ALL[index % Face::ALL.len()]
    }
}
