//! The essentia tube network.
//!
//! [`world::EssentiaWorld`] owns every placed tile (tubes, containers and
//! bellows) keyed by grid position. Each call to [`world::EssentiaWorld::tick`]
//! visits the tiles in position order. A tube first rebuilds its suction from
//! its neighbors ([`suction`]), checks for a routing conflict, then pulls at
//! most one unit from a weaker neighbor ([`flow`]). Pulling containers run
//! the same flow rule against their open faces.
//!
//! Tube variants (filter, buffer, valve, restricted, one-way) are a sum type,
//! [`node::TubeVariant`], with their hooks dispatched by `match`.

pub mod flow;
pub mod node;
pub mod snapshot;
pub mod suction;
pub mod tile;
pub mod world;

pub use flow::PullPlan;
pub use node::{BufferStore, Choke, TubeNode, TubeStateError, TubeVariant, ValveState};
pub use tile::{Bellows, Tile};
pub use world::{EssentiaWorld, WorldError};
