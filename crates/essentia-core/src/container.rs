//! Bulk containers at the edges of the network: jars, void jars, reservoirs
//! and alembics.
//!
//! A container stores a single aspect at a time. With an accept filter set,
//! only the filter aspect may ever be stored. Only a void jar destroys
//! essentia, and it counts what it destroys.

use serde::{Deserialize, Serialize};

use crate::grid::{Face, GridPos, SideMask};
use crate::id::{AspectId, TileId};
use crate::tick::Ticks;
use crate::transport::{Cargo, Deposit, EssentiaTransport, Suction};

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Jar,
    VoidJar,
    Reservoir,
    Alembic,
}

/// Static behavior of a container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSpec {
    pub capacity: u32,
    pub default_sides: SideMask,
    pub suction: u32,
    pub filtered_suction: u32,
    pub minimum_suction: u32,
    pub filtered_minimum_suction: u32,
    pub accepts_input: bool,
    pub yields_output: bool,
    /// Whether the container pulls from neighboring tubes each tick.
    pub pulls: bool,
    /// Whether input beyond capacity is destroyed instead of refused.
    pub voids_excess: bool,
    /// Whether suction stays up once the container is full.
    pub suction_when_full: bool,
}

impl ContainerKind {
    pub fn spec(self) -> ContainerSpec {
        match self {
            ContainerKind::Jar => ContainerSpec {
                capacity: 250,
                default_sides: SideMask::only(Face::Up),
                suction: 32,
                filtered_suction: 64,
                minimum_suction: 32,
                filtered_minimum_suction: 64,
                accepts_input: true,
                yields_output: true,
                pulls: true,
                voids_excess: false,
                suction_when_full: false,
            },
            ContainerKind::VoidJar => ContainerSpec {
                capacity: 250,
                default_sides: SideMask::only(Face::Up),
                suction: 32,
                filtered_suction: 48,
                minimum_suction: 32,
                filtered_minimum_suction: 64,
                accepts_input: true,
                yields_output: true,
                pulls: true,
                voids_excess: true,
                suction_when_full: true,
            },
            ContainerKind::Reservoir => ContainerSpec {
                capacity: 500,
                default_sides: SideMask::ALL,
                suction: 24,
                filtered_suction: 24,
                minimum_suction: 0,
                filtered_minimum_suction: 0,
                accepts_input: true,
                yields_output: true,
                pulls: true,
                voids_excess: false,
                suction_when_full: false,
            },
            ContainerKind::Alembic => ContainerSpec {
                capacity: 32,
                default_sides: SideMask::all_except(Face::Down),
                suction: 0,
                filtered_suction: 0,
                minimum_suction: 0,
                filtered_minimum_suction: 0,
                accepts_input: false,
                yields_output: true,
                pulls: false,
                voids_excess: false,
                suction_when_full: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    #[error("container filtered to {filter:?} cannot hold {aspect:?}")]
    FilterMismatch { filter: AspectId, aspect: AspectId },
    #[error("{amount} units exceed capacity {capacity}")]
    OverCapacity { amount: u32, capacity: u32 },
    #[error("stored cargo of {0:?} has zero units")]
    EmptyCargo(AspectId),
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    kind: ContainerKind,
    stored: Option<Cargo>,
    filter: Option<AspectId>,
    sides: SideMask,
    /// Blocked containers are skipped by direct (handler) transfers.
    pub blocked: bool,
    voided: u64,
}

impl Container {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            stored: None,
            filter: None,
            sides: kind.spec().default_sides,
            blocked: false,
            voided: 0,
        }
    }

    pub fn with_filter(mut self, aspect: AspectId) -> Result<Self, ContainerError> {
        self.set_filter(Some(aspect))?;
        Ok(self)
    }

    pub fn with_contents(mut self, aspect: AspectId, amount: u32) -> Result<Self, ContainerError> {
        let capacity = self.capacity();
        if amount > capacity {
            return Err(ContainerError::OverCapacity { amount, capacity });
        }
        if let Some(filter) = self.filter
            && filter != aspect
        {
            return Err(ContainerError::FilterMismatch { filter, aspect });
        }
        self.stored = (amount > 0).then_some(Cargo::new(aspect, amount));
        Ok(self)
    }

    pub fn with_sides(mut self, sides: SideMask) -> Self {
        self.sides = sides;
        self
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn spec(&self) -> ContainerSpec {
        self.kind.spec()
    }

    pub fn capacity(&self) -> u32 {
        self.spec().capacity
    }

    pub fn stored(&self) -> Option<Cargo> {
        self.stored
    }

    pub fn amount(&self) -> u32 {
        self.stored.map_or(0, |c| c.amount)
    }

    pub fn amount_of(&self, aspect: AspectId) -> u32 {
        match self.stored {
            Some(c) if c.aspect == aspect => c.amount,
            _ => 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.amount() >= self.capacity()
    }

    pub fn filter(&self) -> Option<AspectId> {
        self.filter
    }

    /// Set or clear the accept filter. Fails if current contents conflict.
    pub fn set_filter(&mut self, filter: Option<AspectId>) -> Result<(), ContainerError> {
        if let (Some(filter), Some(stored)) = (filter, self.stored)
            && stored.aspect != filter
        {
            return Err(ContainerError::FilterMismatch {
                filter,
                aspect: stored.aspect,
            });
        }
        self.filter = filter;
        Ok(())
    }

    pub fn sides(&self) -> SideMask {
        self.sides
    }

    pub fn set_side(&mut self, face: Face, open: bool) {
        self.sides.set(face, open);
    }

    /// Units destroyed over the container's lifetime.
    pub fn voided(&self) -> u64 {
        self.voided
    }

    /// Whether at least `amount` units of `aspect` are stored.
    pub fn contains_amount(&self, aspect: AspectId, amount: u32) -> bool {
        self.amount_of(aspect) >= amount
    }

    /// Whether a direct transfer could withdraw `amount` of `aspect` now.
    pub fn can_yield(&self, aspect: AspectId, amount: u32) -> bool {
        !self.blocked && self.spec().yields_output && self.contains_amount(aspect, amount)
    }

    /// Whether a direct transfer could deposit one unit of `aspect` now.
    pub fn can_accept(&self, aspect: AspectId) -> bool {
        let spec = self.spec();
        if self.blocked || !spec.accepts_input {
            return false;
        }
        if self.filter.is_some_and(|f| f != aspect) {
            return false;
        }
        match self.stored {
            Some(c) if c.aspect != aspect => false,
            _ => spec.voids_excess || !self.is_full(),
        }
    }

    /// Insert ignoring faces. Partial deposits are allowed; the remainder
    /// is refused, or destroyed by a void jar.
    pub fn insert(&mut self, aspect: AspectId, amount: u32) -> Deposit {
        if amount == 0 || !self.spec().accepts_input {
            return Deposit::REFUSED;
        }
        if self.filter.is_some_and(|f| f != aspect) {
            return Deposit::REFUSED;
        }
        if self.stored.is_some_and(|c| c.aspect != aspect) {
            return Deposit::REFUSED;
        }
        let space = self.capacity().saturating_sub(self.amount());
        let stored = amount.min(space);
        if stored > 0 {
            let current = self.amount();
            self.stored = Some(Cargo::new(aspect, current + stored));
        }
        let voided = if self.spec().voids_excess {
            amount - stored
        } else {
            0
        };
        self.voided += u64::from(voided);
        Deposit { stored, voided }
    }

    /// Withdraw ignoring faces. All or nothing: returns `amount` or 0.
    pub fn remove(&mut self, aspect: AspectId, amount: u32) -> u32 {
        if amount == 0 || !self.contains_amount(aspect, amount) {
            return 0;
        }
        let left = self.amount() - amount;
        self.stored = (left > 0).then_some(Cargo::new(aspect, left));
        amount
    }

    /// Check stored contents against capacity and filter. Used on state that
    /// did not come through the constructors, such as decoded snapshots.
    pub fn validate(&self) -> Result<(), ContainerError> {
        let Some(cargo) = self.stored else {
            return Ok(());
        };
        if cargo.amount == 0 {
            return Err(ContainerError::EmptyCargo(cargo.aspect));
        }
        let capacity = self.capacity();
        if cargo.amount > capacity {
            return Err(ContainerError::OverCapacity {
                amount: cargo.amount,
                capacity,
            });
        }
        if let Some(filter) = self.filter
            && filter != cargo.aspect
        {
            return Err(ContainerError::FilterMismatch {
                filter,
                aspect: cargo.aspect,
            });
        }
        Ok(())
    }

    fn suction_type(&self) -> Option<AspectId> {
        self.filter.or(self.stored.map(|c| c.aspect))
    }
}

impl EssentiaTransport for Container {
    fn is_connectable(&self, face: Face) -> bool {
        self.sides.is_open(face)
    }

    fn can_input_from(&self, face: Face) -> bool {
        self.sides.is_open(face) && self.spec().accepts_input
    }

    fn can_output_to(&self, face: Face) -> bool {
        self.sides.is_open(face) && self.spec().yields_output
    }

    fn suction(&self, face: Face) -> Suction {
        let spec = self.spec();
        if !self.can_input_from(face) || (self.is_full() && !spec.suction_when_full) {
            return Suction::NONE;
        }
        let amount = if self.filter.is_some() {
            spec.filtered_suction
        } else {
            spec.suction
        };
        Suction {
            aspect: self.suction_type(),
            amount,
        }
    }

    fn minimum_suction(&self) -> u32 {
        let spec = self.spec();
        if self.filter.is_some() {
            spec.filtered_minimum_suction
        } else {
            spec.minimum_suction
        }
    }

    fn offered(&self, face: Face) -> Option<Cargo> {
        if self.can_output_to(face) {
            self.stored
        } else {
            None
        }
    }

    fn accepts(&self, aspect: AspectId, face: Face) -> bool {
        self.can_input_from(face) && {
            let spec = self.spec();
            self.filter.is_none_or(|f| f == aspect)
                && self.stored.is_none_or(|c| c.aspect == aspect)
                && (spec.voids_excess || !self.is_full())
        }
    }

    fn take(&mut self, aspect: AspectId, amount: u32, face: Face) -> u32 {
        if !self.can_output_to(face) {
            return 0;
        }
        self.remove(aspect, amount)
    }

    fn deposit(&mut self, aspect: AspectId, amount: u32, face: Face) -> Deposit {
        if !self.can_input_from(face) {
            return Deposit::REFUSED;
        }
        self.insert(aspect, amount)
    }
}

// ---------------------------------------------------------------------------
// Lookup seam
// ---------------------------------------------------------------------------

/// Read/write access to containers by position. Implemented by the tube
/// world and by test grids; consumed by the direct-transfer handler.
pub trait ContainerLookup {
    /// Current simulation tick.
    fn now(&self) -> Ticks;

    fn container_at(&self, pos: GridPos) -> Option<(TileId, &Container)>;

    fn container_at_mut(&mut self, pos: GridPos) -> Option<(TileId, &mut Container)>;
}
