//! Flow: moving single units toward higher suction.
//!
//! A receiver pulls one unit per tick from the first connected neighbor
//! that offers something it can take, advertises strictly less suction than
//! the receiver, and whose minimum suction the receiver meets. The same rule
//! drives tubes, buffers and pulling containers.

use std::collections::BTreeSet;

use essentia_core::event::{EssentiaEvent, EventSink};
use essentia_core::grid::{Face, GridPos};
use essentia_core::id::AspectId;
use essentia_core::transport::{EssentiaTransport, types_compatible};
use log::{trace, warn};

use crate::tile::Tile;
use crate::world::{Edge, EssentiaWorld, edge};

/// A transfer chosen by [`EssentiaWorld::find_pull`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullPlan {
    pub from: GridPos,
    /// Receiver's face toward the sender.
    pub face: Face,
    pub aspect: AspectId,
}

impl EssentiaWorld {
    /// The first neighbor the tile at `pos` may pull from right now.
    /// Read-only: nothing moves.
    pub fn find_pull(&self, pos: GridPos) -> Option<PullPlan> {
        self.find_pull_excluding(pos, &BTreeSet::new())
    }

    fn find_pull_excluding(&self, pos: GridPos, moved: &BTreeSet<Edge>) -> Option<PullPlan> {
        let receiver = self.tile_at(pos)?;
        for face in Face::ALL {
            if !receiver.can_input_from(face) {
                continue;
            }
            let own = receiver.suction(face);
            if own.amount == 0 {
                continue;
            }
            let Some((from, sender)) = self.connected_neighbor(pos, face) else {
                continue;
            };
            if moved.contains(&edge(pos, from)) {
                continue;
            }
            let back = face.opposite();
            if !sender.can_output_to(back) {
                continue;
            }
            let Some(offer) = sender.offered_to(back, own) else {
                continue;
            };
            if !types_compatible(own.aspect, Some(offer.aspect)) {
                continue;
            }
            if !receiver.accepts(offer.aspect, face) {
                continue;
            }
            let theirs = sender.suction(back);
            if own.amount <= theirs.amount || own.amount < sender.minimum_suction() {
                continue;
            }
            if matches!(sender, Tile::Tube(t) if t.is_buffer())
                && !self.buffer_yields_to(from, back, offer.aspect, own.amount)
            {
                continue;
            }
            return Some(PullPlan {
                from,
                face,
                aspect: offer.aspect,
            });
        }
        None
    }

    /// A buffer releases to the requester on `toward` only if no other
    /// connected side that could take `aspect` advertises more suction.
    pub fn buffer_yields_to(
        &self,
        buffer: GridPos,
        toward: Face,
        aspect: AspectId,
        requested_with: u32,
    ) -> bool {
        Face::ALL
            .into_iter()
            .filter(|&f| f != toward)
            .filter_map(|f| {
                self.connected_neighbor(buffer, f)
                    .map(|(_, neighbor)| (f.opposite(), neighbor))
            })
            .all(|(their_face, neighbor)| {
                let theirs = neighbor.suction(their_face);
                !(neighbor.can_input_from(their_face)
                    && theirs.admits(aspect)
                    && theirs.amount > requested_with)
            })
    }

    /// Run one pull for the tile at `pos`. Returns `true` if a unit moved.
    pub(crate) fn try_pull(
        &mut self,
        pos: GridPos,
        moved: &mut BTreeSet<Edge>,
        sink: &mut dyn EventSink,
    ) -> bool {
        let Some(plan) = self.find_pull_excluding(pos, moved) else {
            return false;
        };
        let back = plan.face.opposite();
        let taken = self
            .tile_at_mut(plan.from)
            .map_or(0, |sender| sender.take(plan.aspect, 1, back));
        if taken == 0 {
            return false;
        }
        let deposit = self
            .tile_at_mut(pos)
            .map(|receiver| receiver.deposit(plan.aspect, taken, plan.face))
            .unwrap_or_default();
        let rejected = taken - deposit.accepted();
        if rejected > 0 {
            warn!(
                "{rejected} unit(s) of {:?} refused by {pos:?}; returning to {:?}",
                plan.aspect, plan.from
            );
            if let Some(sender) = self.tile_at_mut(plan.from) {
                sender.deposit(plan.aspect, rejected, back);
            }
            if deposit.accepted() == 0 {
                return false;
            }
        }

        moved.insert(edge(pos, plan.from));
        let tick = self.tick;
        trace!("{:?} moved {:?} -> {pos:?}", plan.aspect, plan.from);
        sink.notify(EssentiaEvent::Flowed {
            from: plan.from,
            to: pos,
            aspect: plan.aspect,
            tick,
        });
        if deposit.voided > 0
            && let Some(id) = self.id_at(pos)
        {
            sink.notify(EssentiaEvent::Voided {
                tile: id,
                pos,
                aspect: plan.aspect,
                amount: deposit.voided,
                tick,
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essentia_core::container::{Container, ContainerKind, ContainerLookup};
    use essentia_core::event::NullSink;
    use essentia_core::grid::SideMask;
    use essentia_core::test_utils::*;
    use essentia_core::transport::Suction;

    use crate::node::TubeNode;

    #[test]
    fn tube_pulls_from_lower_suction_source() {
        let mut world = EssentiaWorld::default();
        world.place_container(pos(0, 0, 0), jar()).unwrap();
        world.place_tube(pos(0, 1, 0), TubeNode::standard()).unwrap();
        world
            .place_container(pos(0, 2, 0), reservoir_with(aer(), 3))
            .unwrap();

        world.tick(&mut NullSink);
        // Tube reached 31 and pulled from the reservoir (24) on the same tick.
        let tube = world.tube_at(pos(0, 1, 0)).unwrap();
        assert_eq!(tube.current_suction(), Suction::any(31));
        assert_eq!(tube.amount(), 1);
        assert_eq!(world.total_essentia(), 3);
    }

    #[test]
    fn pull_requires_strictly_greater_suction() {
        let mut world = EssentiaWorld::default();
        world
            .place_container(pos(0, 0, 0), reservoir_with(aer(), 2))
            .unwrap();
        let mut tube = TubeNode::standard();
        tube.set_suction(Suction::any(24));
        world.place_tube(pos(0, 1, 0), tube).unwrap();
        assert_eq!(world.find_pull(pos(0, 1, 0)), None);

        world.tube_at_mut(pos(0, 1, 0)).unwrap().set_suction(Suction::any(25));
        assert_eq!(
            world.find_pull(pos(0, 1, 0)),
            Some(PullPlan {
                from: pos(0, 0, 0),
                face: Face::Down,
                aspect: aer(),
            })
        );
    }

    #[test]
    fn pull_respects_minimum_suction() {
        let mut world = EssentiaWorld::default();
        world.place_container(pos(0, 0, 0), jar_with(aer(), 5)).unwrap();
        let mut tube = TubeNode::standard();
        tube.set_suction(Suction::any(31));
        world.place_tube(pos(0, 1, 0), tube).unwrap();
        // The jar advertises 32 anyway, but the minimum alone would stop it too.
        assert_eq!(world.find_pull(pos(0, 1, 0)), None);

        world.remove(pos(0, 0, 0));
        world
            .place_container(pos(0, 0, 0), jar_with(aer(), 250))
            .unwrap();
        // Full jar advertises 0, but 31 < minimum 32.
        assert_eq!(world.find_pull(pos(0, 1, 0)), None);
        world.tube_at_mut(pos(0, 1, 0)).unwrap().set_suction(Suction::any(32));
        assert!(world.find_pull(pos(0, 1, 0)).is_some());
    }

    #[test]
    fn pull_skips_incompatible_type() {
        let mut world = EssentiaWorld::default();
        world
            .place_container(pos(0, 0, 0), reservoir_with(aqua(), 2))
            .unwrap();
        let mut tube = TubeNode::standard();
        tube.set_suction(Suction::of(aer(), 30));
        world.place_tube(pos(0, 1, 0), tube).unwrap();
        assert_eq!(world.find_pull(pos(0, 1, 0)), None);
    }

    #[test]
    fn filter_tube_only_takes_its_aspect() {
        let mut world = EssentiaWorld::default();
        world
            .place_container(pos(0, 0, 0), reservoir_with(aqua(), 2))
            .unwrap();
        let mut tube = TubeNode::filter(aer());
        tube.set_suction(Suction::any(30));
        world.place_tube(pos(0, 1, 0), tube).unwrap();
        assert_eq!(world.find_pull(pos(0, 1, 0)), None);
    }

    #[test]
    fn one_way_never_pulls_from_downstream() {
        let mut world = EssentiaWorld::default();
        world
            .place_container(pos(0, 0, 0), reservoir_with(aer(), 2))
            .unwrap();
        // Facing Down: downstream is Up, so the reservoir below is upstream.
        let mut tube = TubeNode::one_way(Face::Down);
        tube.set_suction(Suction::any(30));
        world.place_tube(pos(0, 1, 0), tube).unwrap();
        assert!(world.find_pull(pos(0, 1, 0)).is_some());

        world.set_facing(pos(0, 1, 0), Face::Up).unwrap();
        assert_eq!(world.find_pull(pos(0, 1, 0)), None);
    }

    #[test]
    fn edge_moves_at_most_once_per_tick() {
        let mut world = EssentiaWorld::default();
        world
            .place_container(pos(0, 0, 0), reservoir_with(aer(), 2))
            .unwrap();
        let mut tube = TubeNode::standard();
        tube.set_suction(Suction::any(30));
        world.place_tube(pos(0, 1, 0), tube).unwrap();

        let mut moved = BTreeSet::new();
        let mut events = Vec::new();
        assert!(world.try_pull(pos(0, 1, 0), &mut moved, &mut events));
        world.tube_at_mut(pos(0, 1, 0)).unwrap().take(aer(), 1, Face::Up);
        assert!(!world.try_pull(pos(0, 1, 0), &mut moved, &mut events));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn void_jar_pulls_and_counts_voided() {
        let mut world = EssentiaWorld::default();
        let void = Container::new(ContainerKind::VoidJar)
            .with_contents(aer(), 250)
            .unwrap();
        world.place_container(pos(0, 0, 0), void).unwrap();
        world
            .place_tube(pos(0, 1, 0), TubeNode::standard().with_cargo(aer()))
            .unwrap();
        world.toggle_side(pos(0, 1, 0), Face::Up).unwrap();

        let mut events = Vec::new();
        world.tick(&mut events);
        assert_eq!(world.total_voided(), 1);
        assert_eq!(world.total_essentia(), 250);
        assert!(events.iter().any(|e| matches!(e, EssentiaEvent::Voided { amount: 1, .. })));
    }

    #[test]
    fn buffer_holds_back_for_stronger_sibling() {
        let mut world = EssentiaWorld::default();
        world
            .place_tube(pos(0, 0, 0), TubeNode::new_buffer().with_cargo(aer()))
            .unwrap();
        // A filtered jar on the west side wants 64; a tube on top asks with 40.
        let west = Container::new(ContainerKind::Jar)
            .with_filter(aer())
            .unwrap()
            .with_sides(SideMask::only(Face::East));
        world.place_container(pos(-1, 0, 0), west).unwrap();
        world.place_tube(pos(0, 1, 0), TubeNode::standard()).unwrap();

        assert!(!world.buffer_yields_to(pos(0, 0, 0), Face::Up, aer(), 40));
        assert!(world.buffer_yields_to(pos(0, 0, 0), Face::West, aer(), 64));
        assert!(world.buffer_yields_to(pos(0, 0, 0), Face::Up, aqua(), 40));
    }

    #[test]
    fn mixed_buffer_feeds_filtered_jar() {
        let mut world = EssentiaWorld::default();
        world
            .place_tube(
                pos(0, 0, 0),
                TubeNode::new_buffer().with_cargo(aer()).with_cargo(aqua()),
            )
            .unwrap();
        world.place_tube(pos(0, 1, 0), TubeNode::standard()).unwrap();
        let aqua_jar = Container::new(ContainerKind::Jar)
            .with_filter(aqua())
            .unwrap()
            .with_sides(SideMask::only(Face::Down));
        world.place_container(pos(0, 2, 0), aqua_jar).unwrap();

        world.run(10, &mut NullSink);
        let (_, jar) = world.container_at(pos(0, 2, 0)).unwrap();
        assert_eq!(jar.amount_of(aqua()), 1);
        let buffer = world.tube_at(pos(0, 0, 0)).unwrap();
        assert_eq!(buffer.amount_of(aqua()), 0);
        assert_eq!(buffer.amount_of(aer()), 1);
        assert_eq!(world.total_essentia(), 2);
    }

    #[test]
    fn buffer_pulls_with_bellows() {
        let mut world = EssentiaWorld::default();
        world.place_tube(pos(0, 0, 0), TubeNode::new_buffer()).unwrap();
        world.place_bellows(pos(-1, 0, 0), Face::East).unwrap();
        world
            .place_tube(pos(0, 1, 0), TubeNode::standard().with_cargo(aer()))
            .unwrap();

        world.tick(&mut NullSink);
        let buffer = world.tube_at(pos(0, 0, 0)).unwrap();
        assert_eq!(buffer.buffer().unwrap().bellows(), 1);
        assert_eq!(buffer.current_suction(), Suction::any(32));
        assert_eq!(buffer.amount(), 1);
    }
}
