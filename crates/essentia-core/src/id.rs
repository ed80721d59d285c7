use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placed tile (tube, container or bellows). Generational:
    /// a tile removed and replaced at the same position gets a fresh id.
    pub struct TileId;
}

/// Identifies an aspect in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AspectId(pub u32);

/// Identifies a pending two-phase drain issued by the essentia handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(pub u64);
