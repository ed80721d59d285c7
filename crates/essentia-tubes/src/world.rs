//! The placed world: tiles by position, topology edits, external signals
//! and the per-tick loop.

use std::collections::{BTreeMap, BTreeSet};

use essentia_core::aspect::{AspectRegistry, Color};
use essentia_core::config::NetworkConfig;
use essentia_core::container::{Container, ContainerError, ContainerLookup};
use essentia_core::event::{EssentiaEvent, EventSink};
use essentia_core::grid::{Face, GridPos};
use essentia_core::id::{AspectId, TileId};
use essentia_core::tick::{Ticks, fires_on};
use essentia_core::transport::{EssentiaTransport, Suction};
use log::debug;
use slotmap::{SecondaryMap, SlotMap};

use crate::node::{Choke, TubeNode, TubeStateError, TubeVariant};
use crate::tile::{Bellows, Tile};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("position {0:?} is already occupied")]
    Occupied(GridPos),
    #[error("no tile at {0:?}")]
    NoTile(GridPos),
    #[error("tile at {0:?} is not a tube")]
    NotATube(GridPos),
    #[error("tile at {pos:?} is not a {expected}")]
    WrongVariant { pos: GridPos, expected: &'static str },
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Tube(#[from] TubeStateError),
}

/// Unordered pair of adjacent positions.
pub(crate) type Edge = (GridPos, GridPos);

pub(crate) fn edge(a: GridPos, b: GridPos) -> Edge {
    if a <= b { (a, b) } else { (b, a) }
}

// ---------------------------------------------------------------------------
// EssentiaWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct EssentiaWorld {
    pub(crate) tiles: SlotMap<TileId, Tile>,
    pub(crate) positions: SecondaryMap<TileId, GridPos>,
    pub(crate) by_pos: BTreeMap<GridPos, TileId>,
    pub(crate) powered: BTreeSet<GridPos>,
    pub(crate) tick: Ticks,
    pub(crate) config: NetworkConfig,
    aspects: Option<AspectRegistry>,
}

impl EssentiaWorld {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Attach an aspect registry. Only used for vent color hints.
    pub fn with_aspects(mut self, aspects: AspectRegistry) -> Self {
        self.aspects = Some(aspects);
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn aspects(&self) -> Option<&AspectRegistry> {
        self.aspects.as_ref()
    }

    pub fn tick_count(&self) -> Ticks {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    // -- placement ---------------------------------------------------------

    pub fn place(&mut self, pos: GridPos, tile: impl Into<Tile>) -> Result<TileId, WorldError> {
        if self.by_pos.contains_key(&pos) {
            return Err(WorldError::Occupied(pos));
        }
        let id = self.tiles.insert(tile.into());
        self.positions.insert(id, pos);
        self.by_pos.insert(pos, id);
        Ok(id)
    }

    pub fn place_tube(&mut self, pos: GridPos, tube: TubeNode) -> Result<TileId, WorldError> {
        self.place(pos, tube)
    }

    pub fn place_container(
        &mut self,
        pos: GridPos,
        container: Container,
    ) -> Result<TileId, WorldError> {
        self.place(pos, container)
    }

    pub fn place_bellows(&mut self, pos: GridPos, facing: Face) -> Result<TileId, WorldError> {
        self.place(pos, Bellows { facing })
    }

    /// Remove whatever is at `pos`. Its id is never reused.
    pub fn remove(&mut self, pos: GridPos) -> Option<Tile> {
        let id = self.by_pos.remove(&pos)?;
        self.positions.remove(id);
        self.tiles.remove(id)
    }

    // -- lookup -----------------------------------------------------------

    pub fn id_at(&self, pos: GridPos) -> Option<TileId> {
        self.by_pos.get(&pos).copied()
    }

    pub fn pos_of(&self, id: TileId) -> Option<GridPos> {
        self.positions.get(id).copied()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    pub fn tile_at(&self, pos: GridPos) -> Option<&Tile> {
        self.id_at(pos).and_then(|id| self.tiles.get(id))
    }

    pub fn tile_at_mut(&mut self, pos: GridPos) -> Option<&mut Tile> {
        let id = self.id_at(pos)?;
        self.tiles.get_mut(id)
    }

    pub fn tube_at(&self, pos: GridPos) -> Option<&TubeNode> {
        self.tile_at(pos).and_then(Tile::as_tube)
    }

    pub fn tube_at_mut(&mut self, pos: GridPos) -> Option<&mut TubeNode> {
        self.tile_at_mut(pos).and_then(Tile::as_tube_mut)
    }

    /// Tiles in position order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPos, TileId, &Tile)> {
        self.by_pos
            .iter()
            .filter_map(|(&pos, &id)| self.tiles.get(id).map(|t| (pos, id, t)))
    }

    /// Whether `a` and `b` are adjacent and both have the shared face open.
    pub fn connected(&self, a: GridPos, b: GridPos) -> bool {
        let Some(face) = a.face_toward(b) else {
            return false;
        };
        match (self.tile_at(a), self.tile_at(b)) {
            (Some(ta), Some(tb)) => ta.is_connectable(face) && tb.is_connectable(face.opposite()),
            _ => false,
        }
    }

    /// The tile across `face` of `pos`, if the two are connected.
    pub(crate) fn connected_neighbor(&self, pos: GridPos, face: Face) -> Option<(GridPos, &Tile)> {
        let here = self.tile_at(pos)?;
        if !here.is_connectable(face) {
            return None;
        }
        let there_pos = pos.offset(face);
        let there = self.tile_at(there_pos)?;
        there
            .is_connectable(face.opposite())
            .then_some((there_pos, there))
    }

    // -- topology edits ----------------------------------------------------

    /// Flip one side of the tile at `pos`. When both sides of the shared
    /// face are tubes, the neighbor's opposing side follows. Returns the new
    /// state of the side.
    pub fn toggle_side(&mut self, pos: GridPos, face: Face) -> Result<bool, WorldError> {
        let open = match self.tile_at_mut(pos).ok_or(WorldError::NoTile(pos))? {
            Tile::Tube(t) => t.sides.toggle(face),
            Tile::Container(c) => {
                let open = !c.sides().is_open(face);
                c.set_side(face, open);
                open
            }
            Tile::Bellows(_) => return Err(WorldError::NotATube(pos)),
        };
        let is_tube = self.tube_at(pos).is_some();
        if is_tube && let Some(neighbor) = self.tube_at_mut(pos.offset(face)) {
            neighbor.sides.set(face.opposite(), open);
        }
        debug!("side {face:?} at {pos:?} now {}", if open { "open" } else { "closed" });
        Ok(open)
    }

    pub fn set_facing(&mut self, pos: GridPos, facing: Face) -> Result<(), WorldError> {
        match self.tile_at_mut(pos).ok_or(WorldError::NoTile(pos))? {
            Tile::Tube(t) => t.facing = facing,
            Tile::Bellows(b) => b.facing = facing,
            Tile::Container(_) => return Err(WorldError::NotATube(pos)),
        }
        Ok(())
    }

    /// Set the aspect of a filter tube, or the accept filter of a container.
    pub fn set_filter(&mut self, pos: GridPos, aspect: Option<AspectId>) -> Result<(), WorldError> {
        match self.tile_at_mut(pos).ok_or(WorldError::NoTile(pos))? {
            Tile::Tube(t) => match &mut t.variant {
                TubeVariant::Filter { aspect: filter } => *filter = aspect,
                _ => {
                    return Err(WorldError::WrongVariant {
                        pos,
                        expected: "filter tube",
                    });
                }
            },
            Tile::Container(c) => c.set_filter(aspect)?,
            Tile::Bellows(_) => return Err(WorldError::NotATube(pos)),
        }
        Ok(())
    }

    /// Advance the choke on one face of a buffer: open, weak, blocked, open.
    pub fn cycle_choke(&mut self, pos: GridPos, face: Face) -> Result<Choke, WorldError> {
        let tube = self.tube_at_mut(pos).ok_or(WorldError::NotATube(pos))?;
        let store = tube.buffer_mut().ok_or(WorldError::WrongVariant {
            pos,
            expected: "buffer tube",
        })?;
        let next = store.choke(face).next();
        store.set_choke(face, next);
        Ok(next)
    }

    /// Manually flip a valve. Returns the new open state.
    pub fn toggle_valve(
        &mut self,
        pos: GridPos,
        sink: &mut dyn EventSink,
    ) -> Result<bool, WorldError> {
        let id = self.id_at(pos).ok_or(WorldError::NoTile(pos))?;
        let tick = self.tick;
        let tube = self.tube_at_mut(pos).ok_or(WorldError::NotATube(pos))?;
        let valve = tube.valve_mut().ok_or(WorldError::WrongVariant {
            pos,
            expected: "valve tube",
        })?;
        valve.open = !valve.open;
        let open = valve.open;
        if !open {
            tube.set_suction(Suction::NONE);
        }
        debug!("valve at {pos:?} toggled {}", if open { "open" } else { "closed" });
        sink.notify(EssentiaEvent::ValveToggled {
            tile: id,
            pos,
            open,
            tick,
        });
        Ok(open)
    }

    /// Set the external signal at `pos`. Valves sample it on their poll tick.
    pub fn set_powered(&mut self, pos: GridPos, powered: bool) {
        if powered {
            self.powered.insert(pos);
        } else {
            self.powered.remove(&pos);
        }
    }

    pub fn is_powered(&self, pos: GridPos) -> bool {
        self.powered.contains(&pos)
    }

    // -- accounting --------------------------------------------------------

    /// Units held by every tube and container.
    pub fn total_essentia(&self) -> u64 {
        self.tiles.values().map(|t| u64::from(t.amount())).sum()
    }

    pub fn total_of(&self, aspect: AspectId) -> u64 {
        self.tiles
            .values()
            .map(|t| u64::from(t.amount_of(aspect)))
            .sum()
    }

    /// Units destroyed by void containers.
    pub fn total_voided(&self) -> u64 {
        self.tiles
            .values()
            .filter_map(Tile::as_container)
            .map(Container::voided)
            .sum()
    }

    // -- tick --------------------------------------------------------------

    /// Advance one tick: every tile runs its server tick in position order.
    pub fn tick(&mut self, sink: &mut dyn EventSink) {
        let order: Vec<TileId> = self.by_pos.values().copied().collect();
        let mut moved = BTreeSet::new();
        for id in order {
            self.on_server_tick(id, &mut moved, sink);
        }
        self.tick += 1;
    }

    pub fn run(&mut self, ticks: Ticks, sink: &mut dyn EventSink) {
        for _ in 0..ticks {
            self.tick(sink);
        }
    }

    fn on_server_tick(
        &mut self,
        id: TileId,
        moved: &mut BTreeSet<Edge>,
        sink: &mut dyn EventSink,
    ) {
        let Some(&pos) = self.positions.get(id) else {
            return;
        };
        match self.tiles.get(id) {
            Some(Tile::Tube(_)) => self.tube_tick(id, pos, moved, sink),
            Some(Tile::Container(c)) => {
                if c.spec().pulls && fires_on(self.tick, self.config.equalize_interval) {
                    self.try_pull(pos, moved, sink);
                }
            }
            Some(Tile::Bellows(_)) | None => {}
        }
    }

    fn tube_tick(
        &mut self,
        id: TileId,
        pos: GridPos,
        moved: &mut BTreeSet<Edge>,
        sink: &mut dyn EventSink,
    ) {
        let tick = self.tick;
        let config = self.config.clone();
        let powered = self.powered.contains(&pos);
        let Some(tube) = self.tiles.get_mut(id).and_then(Tile::as_tube_mut) else {
            return;
        };

        if fires_on(tick, config.valve_poll_interval)
            && let Some(valve) = tube.valve_mut()
            && valve.sample(powered)
        {
            let open = valve.open;
            debug!("valve at {pos:?} {}", if open { "opened" } else { "closed" });
            sink.notify(EssentiaEvent::ValveToggled {
                tile: id,
                pos,
                open,
                tick,
            });
        }
        if !tube.is_open() {
            tube.set_suction(Suction::NONE);
            return;
        }
        if tube.tick_venting() {
            return;
        }
        if tube.is_buffer() {
            self.buffer_tick(pos);
            if fires_on(tick, config.equalize_interval) {
                self.try_pull(pos, moved, sink);
            }
            return;
        }

        if fires_on(tick, config.propagate_interval) {
            let suction = self.compute_suction(pos);
            if let Some(tube) = self.tube_at_mut(pos) {
                tube.set_suction(suction);
            }
            if self.check_venting(id, pos, sink) {
                return;
            }
        }
        let ready = self
            .tube_at(pos)
            .is_some_and(|t| t.current_suction().amount > 0 && t.amount() == 0);
        if ready && fires_on(tick, config.equalize_interval) {
            self.try_pull(pos, moved, sink);
        }
    }

    /// Recount bellows and refresh the buffer's base suction.
    fn buffer_tick(&mut self, pos: GridPos) {
        let count = Face::ALL
            .into_iter()
            .filter(|&face| {
                matches!(
                    self.tile_at(pos.offset(face)),
                    Some(Tile::Bellows(b)) if b.facing == face.opposite()
                )
            })
            .count() as u32;
        let per_bellows = self.config.bellows_suction;
        if let Some(tube) = self.tube_at_mut(pos) {
            let amount = if count == 0 { 1 } else { count * per_bellows };
            tube.set_suction(Suction::any(amount));
            if let Some(store) = tube.buffer_mut() {
                store.set_bellows(count);
            }
        }
    }

    /// Color hint for a vent involving `aspect`.
    pub(crate) fn color_of(&self, aspect: Option<AspectId>) -> Option<Color> {
        let aspects = self.aspects.as_ref()?;
        aspects.color(aspect?)
    }
}

impl ContainerLookup for EssentiaWorld {
    fn now(&self) -> Ticks {
        self.tick
    }

    fn container_at(&self, pos: GridPos) -> Option<(TileId, &Container)> {
        let id = self.id_at(pos)?;
        self.tiles.get(id)?.as_container().map(|c| (id, c))
    }

    fn container_at_mut(&mut self, pos: GridPos) -> Option<(TileId, &mut Container)> {
        let id = self.id_at(pos)?;
        self.tiles.get_mut(id)?.as_container_mut().map(|c| (id, c))
    }
}
