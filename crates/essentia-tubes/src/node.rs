//! Tube nodes and their variants.
//!
//! A [`TubeNode`] carries at most one unit (ten for a buffer), an advertised
//! suction recomputed every propagation phase, a side mask and a facing hint.
//! Variant behavior lives in [`TubeVariant`] and is dispatched by `match`.

use std::collections::BTreeMap;

use essentia_core::grid::{Face, SideMask};
use essentia_core::id::AspectId;
use essentia_core::tick::Ticks;
use essentia_core::transport::{
    BUFFER_CAPACITY, Cargo, Deposit, EssentiaTransport, Suction, TUBE_CAPACITY,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Tube contents that the public constructors can never produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TubeStateError {
    #[error("tube holds {amount} units, capacity {capacity}")]
    OverCapacity { amount: u32, capacity: u32 },
    #[error("tube holds zero units of {0:?}")]
    EmptyCargo(AspectId),
    #[error("filter tube for {filter:?} holds {aspect:?}")]
    FilterMismatch { filter: AspectId, aspect: AspectId },
    #[error("buffer tube carries a single-unit slot")]
    StrayCargo,
}

// ---------------------------------------------------------------------------
// Variant state
// ---------------------------------------------------------------------------

/// Per-face suppression on a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Choke {
    #[default]
    Open,
    /// Advertise suction 1 on this face.
    Weak,
    /// No suction, no input, no output on this face.
    Blocked,
}

impl Choke {
    pub fn next(self) -> Self {
        match self {
            Choke::Open => Choke::Weak,
            Choke::Weak => Choke::Blocked,
            Choke::Blocked => Choke::Open,
        }
    }
}

/// Mixed-aspect storage of a buffer tube.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferStore {
    contents: BTreeMap<AspectId, u32>,
    chokes: [Choke; 6],
    /// Round-robin position over `contents` for what to offer next.
    cursor: usize,
    #[serde(skip)]
    bellows: u32,
}

impl BufferStore {
    pub fn total(&self) -> u32 {
        self.contents.values().sum()
    }

    pub fn amount_of(&self, aspect: AspectId) -> u32 {
        self.contents.get(&aspect).copied().unwrap_or(0)
    }

    pub fn contents(&self) -> impl Iterator<Item = (AspectId, u32)> + '_ {
        self.contents.iter().map(|(&a, &n)| (a, n))
    }

    pub fn choke(&self, face: Face) -> Choke {
        self.chokes[face.index()]
    }

    pub fn set_choke(&mut self, face: Face, choke: Choke) {
        self.chokes[face.index()] = choke;
    }

    /// Bellows counted on the last buffer tick.
    pub fn bellows(&self) -> u32 {
        self.bellows
    }

    pub(crate) fn set_bellows(&mut self, count: u32) {
        self.bellows = count;
    }

    /// Round-robin from the cursor, skipping aspects `wanted` does not admit.
    fn next_offer(&self, wanted: Suction) -> Option<Cargo> {
        let len = self.contents.len();
        if len == 0 {
            return None;
        }
        let start = self.cursor % len;
        self.contents
            .iter()
            .cycle()
            .skip(start)
            .take(len)
            .find(|&(&aspect, _)| wanted.admits(aspect))
            .map(|(&aspect, &amount)| Cargo::new(aspect, amount))
    }

    fn insert(&mut self, aspect: AspectId, amount: u32) -> u32 {
        let added = amount.min(BUFFER_CAPACITY.saturating_sub(self.total()));
        if added > 0 {
            *self.contents.entry(aspect).or_insert(0) += added;
        }
        added
    }

    fn remove(&mut self, aspect: AspectId, amount: u32) -> u32 {
        let Some(have) = self.contents.get_mut(&aspect) else {
            return 0;
        };
        let taken = amount.min(*have);
        *have -= taken;
        if *have == 0 {
            self.contents.remove(&aspect);
        }
        if taken > 0 {
            self.cursor = self.cursor.wrapping_add(1);
        }
        taken
    }
}

/// Valve open/closed state plus the last sampled signal for edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveState {
    pub open: bool,
    pub was_powered: bool,
}

impl Default for ValveState {
    fn default() -> Self {
        Self {
            open: true,
            was_powered: false,
        }
    }
}

impl ValveState {
    /// Feed a sampled signal. A rising edge closes, a falling edge opens.
    /// Returns `true` if the open state changed.
    pub fn sample(&mut self, powered: bool) -> bool {
        let before = self.open;
        if powered && !self.was_powered {
            self.open = false;
        } else if !powered && self.was_powered {
            self.open = true;
        }
        self.was_powered = powered;
        before != self.open
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TubeVariant {
    #[default]
    Standard,
    /// Accepts, yields and relays only `aspect`. Unset behaves as standard.
    Filter { aspect: Option<AspectId> },
    Buffer(BufferStore),
    Valve(ValveState),
    /// Halves relayed suction.
    Restricted,
    /// Relays from, and outputs toward, only the face opposite `facing`.
    OneWay,
}

// ---------------------------------------------------------------------------
// TubeNode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeNode {
    cargo: Option<Cargo>,
    pub sides: SideMask,
    pub facing: Face,
    pub variant: TubeVariant,
    #[serde(skip)]
    suction: Suction,
    /// Remaining vent cooldown.
    #[serde(skip)]
    venting: Ticks,
}

impl TubeNode {
    pub fn new(variant: TubeVariant) -> Self {
        Self {
            cargo: None,
            sides: SideMask::ALL,
            facing: Face::Up,
            variant,
            suction: Suction::NONE,
            venting: 0,
        }
    }

    pub fn standard() -> Self {
        Self::new(TubeVariant::Standard)
    }

    pub fn filter(aspect: AspectId) -> Self {
        Self::new(TubeVariant::Filter {
            aspect: Some(aspect),
        })
    }

    pub fn new_buffer() -> Self {
        Self::new(TubeVariant::Buffer(BufferStore::default()))
    }

    pub fn new_valve() -> Self {
        Self::new(TubeVariant::Valve(ValveState::default()))
    }

    pub fn restricted() -> Self {
        Self::new(TubeVariant::Restricted)
    }

    /// A one-way tube. Essentia travels against `facing`: it leaves through
    /// `facing.opposite()`.
    pub fn one_way(facing: Face) -> Self {
        Self {
            facing,
            ..Self::new(TubeVariant::OneWay)
        }
    }

    pub fn with_cargo(mut self, aspect: AspectId) -> Self {
        match &mut self.variant {
            TubeVariant::Buffer(store) => {
                store.insert(aspect, 1);
            }
            _ => self.cargo = Some(Cargo::unit(aspect)),
        }
        self
    }

    pub fn with_sides(mut self, sides: SideMask) -> Self {
        self.sides = sides;
        self
    }

    // -- accessors ---------------------------------------------------------

    /// The unit held by a non-buffer tube.
    pub fn cargo(&self) -> Option<Cargo> {
        self.cargo
    }

    /// Units held, buffers included.
    pub fn amount(&self) -> u32 {
        match &self.variant {
            TubeVariant::Buffer(store) => store.total(),
            _ => self.cargo.map_or(0, |c| c.amount),
        }
    }

    pub fn amount_of(&self, aspect: AspectId) -> u32 {
        match &self.variant {
            TubeVariant::Buffer(store) => store.amount_of(aspect),
            _ => match self.cargo {
                Some(c) if c.aspect == aspect => c.amount,
                _ => 0,
            },
        }
    }

    pub fn capacity(&self) -> u32 {
        match self.variant {
            TubeVariant::Buffer(_) => BUFFER_CAPACITY,
            _ => TUBE_CAPACITY,
        }
    }

    /// Last computed suction, before per-face adjustments.
    pub fn current_suction(&self) -> Suction {
        self.suction
    }

    pub(crate) fn set_suction(&mut self, suction: Suction) {
        self.suction = suction;
    }

    pub fn is_venting(&self) -> bool {
        self.venting > 0
    }

    pub fn vent_remaining(&self) -> Ticks {
        self.venting
    }

    pub(crate) fn start_venting(&mut self, cooldown: Ticks) {
        self.venting = cooldown;
    }

    /// Count down one tick of cooldown. Returns `true` while still venting.
    pub(crate) fn tick_venting(&mut self) -> bool {
        if self.venting == 0 {
            return false;
        }
        self.venting -= 1;
        true
    }

    // -- variant hooks ----------------------------------------------------

    pub fn filter_override(&self) -> Option<AspectId> {
        match self.variant {
            TubeVariant::Filter { aspect } => aspect,
            _ => None,
        }
    }

    pub fn is_filter(&self) -> bool {
        matches!(self.variant, TubeVariant::Filter { aspect: Some(_) })
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self.variant, TubeVariant::Restricted)
    }

    pub fn is_directional(&self) -> bool {
        matches!(self.variant, TubeVariant::OneWay)
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self.variant, TubeVariant::Buffer(_))
    }

    /// `false` only for a closed valve.
    pub fn is_open(&self) -> bool {
        match self.variant {
            TubeVariant::Valve(state) => state.open,
            _ => true,
        }
    }

    pub fn buffer(&self) -> Option<&BufferStore> {
        match &self.variant {
            TubeVariant::Buffer(store) => Some(store),
            _ => None,
        }
    }

    pub fn buffer_mut(&mut self) -> Option<&mut BufferStore> {
        match &mut self.variant {
            TubeVariant::Buffer(store) => Some(store),
            _ => None,
        }
    }

    pub fn valve(&self) -> Option<&ValveState> {
        match &self.variant {
            TubeVariant::Valve(state) => Some(state),
            _ => None,
        }
    }

    pub fn valve_mut(&mut self) -> Option<&mut ValveState> {
        match &mut self.variant {
            TubeVariant::Valve(state) => Some(state),
            _ => None,
        }
    }

    /// The only face a one-way tube relays from and outputs through.
    pub fn downstream(&self) -> Face {
        self.facing.opposite()
    }

    /// Check held essentia against capacity and filter.
    pub fn validate(&self) -> Result<(), TubeStateError> {
        if let TubeVariant::Buffer(store) = &self.variant {
            if self.cargo.is_some() {
                return Err(TubeStateError::StrayCargo);
            }
            if let Some((aspect, _)) = store.contents().find(|&(_, n)| n == 0) {
                return Err(TubeStateError::EmptyCargo(aspect));
            }
            let amount = store.total();
            if amount > BUFFER_CAPACITY {
                return Err(TubeStateError::OverCapacity {
                    amount,
                    capacity: BUFFER_CAPACITY,
                });
            }
            return Ok(());
        }
        let Some(cargo) = self.cargo else {
            return Ok(());
        };
        if cargo.amount == 0 {
            return Err(TubeStateError::EmptyCargo(cargo.aspect));
        }
        if cargo.amount > TUBE_CAPACITY {
            return Err(TubeStateError::OverCapacity {
                amount: cargo.amount,
                capacity: TUBE_CAPACITY,
            });
        }
        match self.filter_override() {
            Some(filter) if filter != cargo.aspect => Err(TubeStateError::FilterMismatch {
                filter,
                aspect: cargo.aspect,
            }),
            _ => Ok(()),
        }
    }

    fn face_choke(&self, face: Face) -> Choke {
        self.buffer().map_or(Choke::Open, |s| s.choke(face))
    }
}

impl Default for TubeNode {
    fn default() -> Self {
        Self::standard()
    }
}

impl EssentiaTransport for TubeNode {
    fn is_connectable(&self, face: Face) -> bool {
        self.sides.is_open(face)
    }

    fn can_input_from(&self, face: Face) -> bool {
        if !self.sides.is_open(face) || !self.is_open() {
            return false;
        }
        match self.variant {
            TubeVariant::OneWay => face != self.downstream(),
            TubeVariant::Buffer(_) => self.face_choke(face) != Choke::Blocked,
            _ => true,
        }
    }

    fn can_output_to(&self, face: Face) -> bool {
        if !self.sides.is_open(face) || !self.is_open() {
            return false;
        }
        match self.variant {
            TubeVariant::OneWay => face == self.downstream(),
            TubeVariant::Buffer(_) => self.face_choke(face) != Choke::Blocked,
            _ => true,
        }
    }

    fn suction(&self, face: Face) -> Suction {
        if !self.sides.is_open(face) || !self.is_open() {
            return Suction::NONE;
        }
        match self.face_choke(face) {
            Choke::Open => self.suction,
            Choke::Weak => Suction::any(1),
            Choke::Blocked => Suction::NONE,
        }
    }

    fn offered(&self, face: Face) -> Option<Cargo> {
        self.offered_to(face, Suction::any(1))
    }

    fn offered_to(&self, face: Face, wanted: Suction) -> Option<Cargo> {
        if !self.can_output_to(face) {
            return None;
        }
        match &self.variant {
            TubeVariant::Buffer(store) => store.next_offer(wanted),
            _ => self.cargo.filter(|c| wanted.admits(c.aspect)),
        }
    }

    fn accepts(&self, aspect: AspectId, face: Face) -> bool {
        if !self.can_input_from(face) {
            return false;
        }
        match &self.variant {
            TubeVariant::Buffer(store) => store.total() < BUFFER_CAPACITY,
            TubeVariant::Filter {
                aspect: Some(filter),
            } => *filter == aspect && self.cargo.is_none(),
            _ => self.cargo.is_none(),
        }
    }

    fn take(&mut self, aspect: AspectId, amount: u32, face: Face) -> u32 {
        if amount == 0 || !self.can_output_to(face) {
            return 0;
        }
        match &mut self.variant {
            TubeVariant::Buffer(store) => store.remove(aspect, amount),
            _ => match self.cargo {
                Some(c) if c.aspect == aspect => {
                    self.cargo = None;
                    c.amount
                }
                _ => 0,
            },
        }
    }

    fn deposit(&mut self, aspect: AspectId, amount: u32, face: Face) -> Deposit {
        if amount == 0 || !self.accepts(aspect, face) {
            return Deposit::REFUSED;
        }
        let stored = match &mut self.variant {
            TubeVariant::Buffer(store) => store.insert(aspect, amount),
            _ => {
                self.cargo = Some(Cargo::unit(aspect));
                TUBE_CAPACITY
            }
        };
        Deposit { stored, voided: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essentia_core::test_utils::*;

    #[test]
    fn standard_tube_holds_one_unit() {
        let mut tube = TubeNode::standard();
        assert!(tube.accepts(aer(), Face::Down));
        let d = tube.deposit(aer(), 3, Face::Down);
        assert_eq!(d.stored, 1);
        assert_eq!(tube.cargo(), Some(Cargo::unit(aer())));
        assert!(!tube.accepts(aer(), Face::Down));
        assert_eq!(tube.take(aqua(), 1, Face::Up), 0);
        assert_eq!(tube.take(aer(), 1, Face::Up), 1);
        assert_eq!(tube.cargo(), None);
    }

    #[test]
    fn filter_tube_refuses_other_aspects() {
        let tube = TubeNode::filter(ignis());
        assert!(tube.accepts(ignis(), Face::North));
        assert!(!tube.accepts(aqua(), Face::North));
        assert_eq!(tube.filter_override(), Some(ignis()));
        assert!(tube.is_filter());
        assert!(!TubeNode::new(TubeVariant::Filter { aspect: None }).is_filter());
    }

    #[test]
    fn closed_valve_is_inert() {
        let mut tube = TubeNode::new_valve().with_cargo(aer());
        tube.set_suction(Suction::any(20));
        tube.valve_mut().unwrap().open = false;
        assert_eq!(tube.suction(Face::Up), Suction::NONE);
        assert_eq!(tube.offered(Face::Up), None);
        assert!(!tube.can_input_from(Face::Down));
        assert_eq!(tube.take(aer(), 1, Face::Up), 0);
    }

    #[test]
    fn valve_edge_detection() {
        let mut v = ValveState::default();
        assert!(!v.sample(false));
        assert!(v.sample(true), "rising edge closes");
        assert!(!v.open);
        assert!(!v.sample(true), "steady high is not an edge");
        assert!(v.sample(false), "falling edge opens");
        assert!(v.open);
    }

    #[test]
    fn one_way_faces() {
        let tube = TubeNode::one_way(Face::North);
        assert_eq!(tube.downstream(), Face::South);
        assert!(tube.can_output_to(Face::South));
        assert!(!tube.can_output_to(Face::North));
        assert!(!tube.can_input_from(Face::South));
        assert!(tube.can_input_from(Face::North));
        assert!(tube.can_input_from(Face::Up));
    }

    #[test]
    fn buffer_mixes_aspects_up_to_capacity() {
        let mut buf = TubeNode::new_buffer();
        for _ in 0..6 {
            buf.deposit(aer(), 1, Face::Down);
        }
        let d = buf.deposit(aqua(), 10, Face::Down);
        assert_eq!(d.stored, 4);
        assert_eq!(buf.amount(), 10);
        assert_eq!(buf.amount_of(aer()), 6);
        assert!(!buf.accepts(aer(), Face::Down));
    }

    #[test]
    fn buffer_offers_round_robin() {
        let mut buf = TubeNode::new_buffer().with_cargo(aer()).with_cargo(aqua());
        buf.deposit(aer(), 1, Face::Up);
        let first = buf.offered(Face::Up).unwrap().aspect;
        assert_eq!(buf.take(first, 1, Face::Up), 1);
        let second = buf.offered(Face::Up).unwrap().aspect;
        assert_ne!(first, second);
    }

    #[test]
    fn validate_rejects_impossible_contents() {
        assert_eq!(TubeNode::standard().with_cargo(aer()).validate(), Ok(()));
        assert_eq!(TubeNode::new_buffer().with_cargo(aer()).validate(), Ok(()));

        let mut tube = TubeNode::standard();
        tube.cargo = Some(Cargo::new(aer(), 2));
        assert!(matches!(
            tube.validate(),
            Err(TubeStateError::OverCapacity { amount: 2, .. })
        ));
        tube.cargo = Some(Cargo::new(aer(), 0));
        assert_eq!(tube.validate(), Err(TubeStateError::EmptyCargo(aer())));

        let mut filter = TubeNode::filter(ignis());
        filter.cargo = Some(Cargo::unit(aqua()));
        assert!(matches!(
            filter.validate(),
            Err(TubeStateError::FilterMismatch { .. })
        ));

        let mut buf = TubeNode::new_buffer();
        buf.cargo = Some(Cargo::unit(aer()));
        assert_eq!(buf.validate(), Err(TubeStateError::StrayCargo));

        let mut buf = TubeNode::new_buffer();
        buf.buffer_mut().unwrap().contents.insert(aer(), 11);
        assert!(matches!(
            buf.validate(),
            Err(TubeStateError::OverCapacity { amount: 11, .. })
        ));
    }

    #[test]
    fn buffer_offers_what_the_puller_admits() {
        let buf = TubeNode::new_buffer().with_cargo(aer()).with_cargo(aqua());
        for wanted in [aer(), aqua()] {
            let offer = buf.offered_to(Face::Up, Suction::of(wanted, 10)).unwrap();
            assert_eq!(offer.aspect, wanted);
        }
        assert_eq!(buf.offered_to(Face::Up, Suction::of(ignis(), 10)), None);
        assert!(buf.offered_to(Face::Up, Suction::any(10)).is_some());
    }

    #[test]
    fn buffer_chokes() {
        let mut buf = TubeNode::new_buffer();
        buf.set_suction(Suction::any(64));
        let store = buf.buffer_mut().unwrap();
        store.set_choke(Face::East, Choke::Weak);
        store.set_choke(Face::West, Choke::Blocked);
        assert_eq!(buf.suction(Face::Up), Suction::any(64));
        assert_eq!(buf.suction(Face::East), Suction::any(1));
        assert_eq!(buf.suction(Face::West), Suction::NONE);
        assert!(!buf.accepts(aer(), Face::West));
        assert_eq!(Choke::Blocked.next(), Choke::Open);
    }

    #[test]
    fn closed_side_advertises_nothing() {
        let mut tube = TubeNode::standard();
        tube.set_suction(Suction::any(9));
        tube.sides.set(Face::East, false);
        assert_eq!(tube.suction(Face::East), Suction::NONE);
        assert_eq!(tube.suction(Face::West), Suction::any(9));
    }
}
