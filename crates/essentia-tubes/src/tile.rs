use essentia_core::container::Container;
use essentia_core::grid::Face;
use essentia_core::id::AspectId;
use essentia_core::transport::{Cargo, Deposit, EssentiaTransport, Suction};
use serde::{Deserialize, Serialize};

use crate::node::TubeNode;
use crate::world::WorldError;

/// A booster that raises the suction of a buffer it faces. Never connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bellows {
    pub facing: Face,
}

/// Anything placed in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Tube(TubeNode),
    Container(Container),
    Bellows(Bellows),
}

impl Tile {
    pub fn as_tube(&self) -> Option<&TubeNode> {
        match self {
            Tile::Tube(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tube_mut(&mut self) -> Option<&mut TubeNode> {
        match self {
            Tile::Tube(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Tile::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut Container> {
        match self {
            Tile::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Units of essentia held.
    pub fn amount(&self) -> u32 {
        match self {
            Tile::Tube(t) => t.amount(),
            Tile::Container(c) => c.amount(),
            Tile::Bellows(_) => 0,
        }
    }

    pub fn amount_of(&self, aspect: AspectId) -> u32 {
        match self {
            Tile::Tube(t) => t.amount_of(aspect),
            Tile::Container(c) => c.amount_of(aspect),
            Tile::Bellows(_) => 0,
        }
    }

    /// Check held essentia against capacity and filters.
    pub fn validate(&self) -> Result<(), WorldError> {
        match self {
            Tile::Tube(t) => t.validate()?,
            Tile::Container(c) => c.validate()?,
            Tile::Bellows(_) => {}
        }
        Ok(())
    }

    fn transport(&self) -> Option<&dyn EssentiaTransport> {
        match self {
            Tile::Tube(t) => Some(t as &dyn EssentiaTransport),
            Tile::Container(c) => Some(c as &dyn EssentiaTransport),
            Tile::Bellows(_) => None,
        }
    }

    fn transport_mut(&mut self) -> Option<&mut dyn EssentiaTransport> {
        match self {
            Tile::Tube(t) => Some(t as &mut dyn EssentiaTransport),
            Tile::Container(c) => Some(c as &mut dyn EssentiaTransport),
            Tile::Bellows(_) => None,
        }
    }
}

impl From<TubeNode> for Tile {
    fn from(tube: TubeNode) -> Self {
        Tile::Tube(tube)
    }
}

impl From<Container> for Tile {
    fn from(container: Container) -> Self {
        Tile::Container(container)
    }
}

impl From<Bellows> for Tile {
    fn from(bellows: Bellows) -> Self {
        Tile::Bellows(bellows)
    }
}

impl EssentiaTransport for Tile {
    fn is_connectable(&self, face: Face) -> bool {
        self.transport().is_some_and(|t| t.is_connectable(face))
    }

    fn can_input_from(&self, face: Face) -> bool {
        self.transport().is_some_and(|t| t.can_input_from(face))
    }

    fn can_output_to(&self, face: Face) -> bool {
        self.transport().is_some_and(|t| t.can_output_to(face))
    }

    fn suction(&self, face: Face) -> Suction {
        self.transport().map_or(Suction::NONE, |t| t.suction(face))
    }

    fn minimum_suction(&self) -> u32 {
        self.transport().map_or(0, |t| t.minimum_suction())
    }

    fn offered(&self, face: Face) -> Option<Cargo> {
        self.transport().and_then(|t| t.offered(face))
    }

    fn offered_to(&self, face: Face, wanted: Suction) -> Option<Cargo> {
        self.transport().and_then(|t| t.offered_to(face, wanted))
    }

    fn accepts(&self, aspect: AspectId, face: Face) -> bool {
        self.transport().is_some_and(|t| t.accepts(aspect, face))
    }

    fn take(&mut self, aspect: AspectId, amount: u32, face: Face) -> u32 {
        self.transport_mut()
            .map_or(0, |t| t.take(aspect, amount, face))
    }

    fn deposit(&mut self, aspect: AspectId, amount: u32, face: Face) -> Deposit {
        self.transport_mut()
            .map_or(Deposit::REFUSED, |t| t.deposit(aspect, amount, face))
    }
}
