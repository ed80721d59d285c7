//! The transport capability shared by every tile that holds or moves essentia.

use serde::{Deserialize, Serialize};

use crate::grid::Face;
use crate::id::AspectId;

/// Units a plain tube can hold.
pub const TUBE_CAPACITY: u32 = 1;
/// Units a buffer tube can hold, across all aspects.
pub const BUFFER_CAPACITY: u32 = 10;

// ---------------------------------------------------------------------------
// Suction
// ---------------------------------------------------------------------------

/// Advertised demand: which aspect (or any, when `None`) and how strongly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Suction {
    pub aspect: Option<AspectId>,
    pub amount: u32,
}

impl Suction {
    pub const NONE: Suction = Suction {
        aspect: None,
        amount: 0,
    };

    pub fn any(amount: u32) -> Self {
        Self {
            aspect: None,
            amount,
        }
    }

    pub fn of(aspect: AspectId, amount: u32) -> Self {
        Self {
            aspect: Some(aspect),
            amount,
        }
    }

    pub fn is_none(&self) -> bool {
        self.amount == 0
    }

    /// Whether this demand admits `aspect`.
    pub fn admits(&self, aspect: AspectId) -> bool {
        self.aspect.is_none_or(|a| a == aspect)
    }
}

/// Two optional aspect types conflict only when both are set and differ.
pub fn types_compatible(a: Option<AspectId>, b: Option<AspectId>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Cargo
// ---------------------------------------------------------------------------

/// A non-empty quantity of a single aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cargo {
    pub aspect: AspectId,
    pub amount: u32,
}

impl Cargo {
    pub fn new(aspect: AspectId, amount: u32) -> Self {
        Self { aspect, amount }
    }

    pub fn unit(aspect: AspectId) -> Self {
        Self { aspect, amount: 1 }
    }
}

/// Outcome of a deposit. `stored` units were kept, `voided` were destroyed
/// by a void container. Anything else was refused and stays with the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deposit {
    pub stored: u32,
    pub voided: u32,
}

impl Deposit {
    pub const REFUSED: Deposit = Deposit {
        stored: 0,
        voided: 0,
    };

    pub fn accepted(&self) -> u32 {
        self.stored + self.voided
    }
}

// ---------------------------------------------------------------------------
// EssentiaTransport
// ---------------------------------------------------------------------------

/// What a tile exposes to its neighbors. Faces are always from the
/// implementor's point of view.
pub trait EssentiaTransport {
    /// Whether `face` is open for a connection at all.
    fn is_connectable(&self, face: Face) -> bool;

    fn can_input_from(&self, face: Face) -> bool;

    fn can_output_to(&self, face: Face) -> bool;

    /// Suction advertised through `face`.
    fn suction(&self, face: Face) -> Suction;

    /// A puller must advertise at least this much to take from this tile.
    fn minimum_suction(&self) -> u32 {
        0
    }

    /// What a puller on `face` would receive.
    fn offered(&self, face: Face) -> Option<Cargo>;

    /// What a puller on `face` advertising `wanted` would receive. Tiles
    /// holding several aspects offer one the puller admits.
    fn offered_to(&self, face: Face, wanted: Suction) -> Option<Cargo> {
        self.offered(face).filter(|c| wanted.admits(c.aspect))
    }

    /// Whether one unit of `aspect` arriving through `face` would be accepted.
    fn accepts(&self, aspect: AspectId, face: Face) -> bool;

    /// Remove up to `amount` units of `aspect`. Returns the units removed.
    fn take(&mut self, aspect: AspectId, amount: u32, face: Face) -> u32;

    /// Insert up to `amount` units of `aspect`.
    fn deposit(&mut self, aspect: AspectId, amount: u32, face: Face) -> Deposit;
}
