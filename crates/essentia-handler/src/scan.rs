//! Bounded volume scans for containers around an origin.

use essentia_core::container::ContainerLookup;
use essentia_core::grid::{Face, GridBox, GridPos};
use essentia_core::id::TileId;

/// Where to look: a cube of `range` around `origin`, or with a direction,
/// the half of that cube on the `direction` side (origin layer included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    pub origin: GridPos,
    pub direction: Option<Face>,
    pub range: i32,
}

/// A container found by a scan. `tile` detects removal or replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub pos: GridPos,
    pub tile: TileId,
}

impl Scan {
    pub fn around(origin: GridPos, range: i32) -> Self {
        Self {
            origin,
            direction: None,
            range: range.max(0),
        }
    }

    pub fn toward(origin: GridPos, direction: Face, range: i32) -> Self {
        Self {
            origin,
            direction: Some(direction),
            range: range.max(0),
        }
    }

    pub fn volume(&self) -> GridBox {
        let r = self.range;
        let o = self.origin;
        let cube = GridBox::new(o.translate(-r, -r, -r), o.translate(r, r, r));
        let Some(face) = self.direction else {
            return cube;
        };
        let (dx, dy, dz) = face.offset();
        let axial = |lo: i32, hi: i32, at: i32, d: i32| match d {
            0 => (lo, hi),
            _ => {
                let end = at + d * r;
                (at.min(end), at.max(end))
            }
        };
        let (x0, x1) = axial(cube.min.x, cube.max.x, o.x, dx);
        let (y0, y1) = axial(cube.min.y, cube.max.y, o.y, dy);
        let (z0, z1) = axial(cube.min.z, cube.max.z, o.z, dz);
        GridBox::new(GridPos::new(x0, y0, z0), GridPos::new(x1, y1, z1))
    }

    /// Every container in the volume except at the origin, nearest first.
    /// Equal distances keep scan order.
    pub fn collect<W: ContainerLookup + ?Sized>(&self, world: &W) -> Vec<Candidate> {
        let mut found: Vec<(i64, Candidate)> = Vec::new();
        for pos in self.volume().cells() {
            if pos == self.origin {
                continue;
            }
            let Some((tile, _)) = world.container_at(pos) else {
                continue;
            };
            let dist = pos.distance_sq(self.origin);
            let at = found.partition_point(|(d, _)| *d <= dist);
            found.insert(at, (dist, Candidate { pos, tile }));
        }
        found.into_iter().map(|(_, c)| c).collect()
    }
}
