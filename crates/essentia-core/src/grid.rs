//! 3D grid placement: positions, faces and per-face connectivity masks.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GridPos
// ---------------------------------------------------------------------------

/// A cell on the 3D grid. Ordered by `(x, y, z)`, which is also the order
/// in which the world visits tiles each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPos {
    pub const ORIGIN: GridPos = GridPos { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The adjacent cell across `face`.
    pub fn offset(self, face: Face) -> Self {
        let (dx, dy, dz) = face.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Translate by an arbitrary delta.
    pub fn translate(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared Euclidean distance. Used to order scan candidates.
    pub fn distance_sq(self, other: GridPos) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        let dz = i64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// The face of `self` that touches `other`, if the two are adjacent.
    pub fn face_toward(self, other: GridPos) -> Option<Face> {
        Face::ALL.into_iter().find(|&f| self.offset(f) == other)
    }
}

// ---------------------------------------------------------------------------
// Face
// ---------------------------------------------------------------------------

/// One of the six faces of a grid cell.
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
    /// All faces in canonical order. Neighbor scans iterate in this order.
    pub const ALL: [Face; 6] = [
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
        Face::West,
        Face::East,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Face::Down => Face::Up,
            Face::Up => Face::Down,
            Face::North => Face::South,
            Face::South => Face::North,
            Face::West => Face::East,
            Face::East => Face::West,
        }
    }

    /// Unit offset `(dx, dy, dz)`. North is -z, West is -x.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Face::Down => (0, -1, 0),
            Face::Up => (0, 1, 0),
            Face::North => (0, 0, -1),
            Face::South => (0, 0, 1),
            Face::West => (-1, 0, 0),
            Face::East => (1, 0, 0),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Face::ALL.get(index).copied()
    }
}

// ---------------------------------------------------------------------------
// SideMask
// ---------------------------------------------------------------------------

/// Which of the six faces are open for connection. One bit per face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideMask(u8);

impl SideMask {
    pub const NONE: SideMask = SideMask(0);
    pub const ALL: SideMask = SideMask(0b11_1111);

    pub fn only(face: Face) -> Self {
        SideMask(1 << face.index())
    }

    pub fn all_except(face: Face) -> Self {
        SideMask(Self::ALL.0 & !(1 << face.index()))
    }

    pub fn from_faces(faces: impl IntoIterator<Item = Face>) -> Self {
        let mut mask = SideMask::NONE;
        for face in faces {
            mask.set(face, true);
        }
        mask
    }

    pub fn is_open(self, face: Face) -> bool {
        self.0 & (1 << face.index()) != 0
    }

    pub fn set(&mut self, face: Face, open: bool) {
        if open {
            self.0 |= 1 << face.index();
        } else {
            self.0 &= !(1 << face.index());
        }
    }

    /// Flip a face. Returns the new state.
    pub fn toggle(&mut self, face: Face) -> bool {
        self.0 ^= 1 << face.index();
        self.is_open(face)
    }

    pub fn open_faces(self) -> impl Iterator<Item = Face> {
        Face::ALL.into_iter().filter(move |&f| self.is_open(f))
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl Default for SideMask {
    fn default() -> Self {
        SideMask::ALL
    }
}

// ---------------------------------------------------------------------------
// GridBox
// ---------------------------------------------------------------------------

/// An inclusive axis-aligned box of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridBox {
    pub min: GridPos,
    pub max: GridPos,
}

impl GridBox {
    /// Build a box from two corners in any order.
    pub fn new(a: GridPos, b: GridPos) -> Self {
        Self {
            min: GridPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: GridPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Every cell in the box, in `(x, y, z)` order.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> {
        let GridBox { min, max } = *self;
        (min.x..=max.x).flat_map(move |x| {
            (min.y..=max.y).flat_map(move |y| (min.z..=max.z).map(move |z| GridPos::new(x, y, z)))
        })
    }
}
