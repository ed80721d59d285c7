//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::collections::BTreeMap;

use slotmap::SlotMap;

use crate::container::{Container, ContainerKind, ContainerLookup};
use crate::grid::GridPos;
use crate::id::{AspectId, TileId};
use crate::tick::Ticks;

// ===========================================================================
// Aspect constructors (ids match `standard_aspects()`)
// ===========================================================================

pub fn aer() -> AspectId {
    AspectId(0)
}
pub fn terra() -> AspectId {
    AspectId(1)
}
pub fn ignis() -> AspectId {
    AspectId(2)
}
pub fn aqua() -> AspectId {
    AspectId(3)
}
pub fn ordo() -> AspectId {
    AspectId(4)
}
pub fn perditio() -> AspectId {
    AspectId(5)
}
pub fn vacuos() -> AspectId {
    AspectId(6)
}

pub fn pos(x: i32, y: i32, z: i32) -> GridPos {
    GridPos::new(x, y, z)
}

// ===========================================================================
// Container constructors
// ===========================================================================

pub fn jar() -> Container {
    Container::new(ContainerKind::Jar)
}

pub fn jar_with(aspect: AspectId, amount: u32) -> Container {
    Container::new(ContainerKind::Jar)
        .with_contents(aspect, amount)
        .expect("jar contents within capacity")
}

pub fn reservoir_with(aspect: AspectId, amount: u32) -> Container {
    Container::new(ContainerKind::Reservoir)
        .with_contents(aspect, amount)
        .expect("reservoir contents within capacity")
}

// ===========================================================================
// ContainerGrid: a minimal ContainerLookup
// ===========================================================================

/// Containers by position with a manually advanced clock.
#[derive(Debug, Default)]
pub struct ContainerGrid {
    tiles: SlotMap<TileId, Container>,
    by_pos: BTreeMap<GridPos, TileId>,
    tick: Ticks,
}

impl ContainerGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a container, replacing (and invalidating the id of) whatever
    /// was there.
    pub fn place(&mut self, pos: GridPos, container: Container) -> TileId {
        self.remove(pos);
        let id = self.tiles.insert(container);
        self.by_pos.insert(pos, id);
        id
    }

    pub fn remove(&mut self, pos: GridPos) -> Option<Container> {
        let id = self.by_pos.remove(&pos)?;
        self.tiles.remove(id)
    }

    pub fn get(&self, pos: GridPos) -> Option<&Container> {
        self.by_pos.get(&pos).and_then(|&id| self.tiles.get(id))
    }

    pub fn get_mut(&mut self, pos: GridPos) -> Option<&mut Container> {
        let id = *self.by_pos.get(&pos)?;
        self.tiles.get_mut(id)
    }

    pub fn advance(&mut self, ticks: Ticks) {
        self.tick += ticks;
    }

    pub fn total(&self) -> u64 {
        self.tiles.values().map(|c| u64::from(c.amount())).sum()
    }
}

impl ContainerLookup for ContainerGrid {
    fn now(&self) -> Ticks {
        self.tick
    }

    fn container_at(&self, pos: GridPos) -> Option<(TileId, &Container)> {
        let id = *self.by_pos.get(&pos)?;
        self.tiles.get(id).map(|c| (id, c))
    }

    fn container_at_mut(&mut self, pos: GridPos) -> Option<(TileId, &mut Container)> {
        let id = *self.by_pos.get(&pos)?;
        self.tiles.get_mut(id).map(|c| (id, c))
    }
}
