//! Suction propagation and vent detection.
//!
//! Each tube rebuilds its suction from scratch every propagation phase by
//! sampling what its connected neighbors advertise toward it. It adopts the
//! strongest sample, weakened by one hop (halved for a restricted tube).

use essentia_core::event::EventSink;
use essentia_core::grid::{Face, GridPos};
use essentia_core::id::{AspectId, TileId};
use essentia_core::transport::{EssentiaTransport, Suction};
use log::debug;

use crate::tile::Tile;
use crate::world::EssentiaWorld;

/// Inputs that shape one tube's propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationRule {
    /// Fixed demand type; samples that want a different aspect are ignored.
    pub filter_override: Option<AspectId>,
    /// Halve the adopted magnitude instead of applying hop decay.
    pub restrict: bool,
    /// Sample only this face.
    pub only_face: Option<Face>,
}

impl EssentiaWorld {
    /// The suction the tube at `pos` should advertise, given its neighbors.
    /// Returns [`Suction::NONE`] for anything that is not a tube.
    pub fn compute_suction(&self, pos: GridPos) -> Suction {
        let Some(tube) = self.tube_at(pos) else {
            return Suction::NONE;
        };
        let rule = PropagationRule {
            filter_override: tube.filter_override(),
            restrict: tube.is_restricted(),
            only_face: tube.is_directional().then(|| tube.downstream()),
        };
        let held = tube.cargo().map(|c| c.aspect);

        let mut best = Suction::NONE;
        for face in Face::ALL {
            if rule.only_face.is_some_and(|only| only != face) {
                continue;
            }
            let Some((_, neighbor)) = self.connected_neighbor(pos, face) else {
                continue;
            };
            let sample = neighbor.suction(face.opposite());
            if sample.amount == 0 {
                continue;
            }
            match (rule.filter_override, sample.aspect) {
                (Some(filter), Some(wanted)) if filter != wanted => continue,
                (None, Some(wanted)) if held.is_some_and(|h| h != wanted) => continue,
                _ => {}
            }
            if sample.amount > best.amount {
                best = sample;
            }
        }
        if best.amount == 0 {
            return Suction::NONE;
        }

        let amount = if rule.restrict {
            best.amount / 2
        } else {
            best.amount.saturating_sub(self.config.hop_decay)
        };
        if amount == 0 {
            return Suction::NONE;
        }
        Suction {
            aspect: best.aspect.or(rule.filter_override),
            amount,
        }
    }

    /// Look for a routing conflict around the tube at `pos`. On a conflict
    /// the tube starts its cooldown and a vent event is raised.
    pub(crate) fn check_venting(
        &mut self,
        id: TileId,
        pos: GridPos,
        sink: &mut dyn EventSink,
    ) -> bool {
        let Some(tube) = self.tube_at(pos) else {
            return false;
        };
        let own = tube.current_suction();
        let (Some(own_aspect), true) = (own.aspect, own.amount > 0) else {
            return false;
        };
        if tube.is_filter() {
            return false;
        }

        let tolerance = self.config.vent_tolerance;
        let conflict = Face::ALL.into_iter().find_map(|face| {
            let (_, neighbor) = self.connected_neighbor(pos, face)?;
            if matches!(neighbor, Tile::Tube(t) if t.is_filter()) {
                return None;
            }
            let theirs = neighbor.suction(face.opposite());
            let their_aspect = theirs.aspect?;
            (theirs.amount > 0
                && their_aspect != own_aspect
                && tolerance.in_band(own.amount, theirs.amount))
            .then_some(their_aspect)
        });
        let Some(their_aspect) = conflict else {
            return false;
        };

        let cooldown = self.config.vent_cooldown;
        let color = self.color_of(Some(their_aspect));
        let tick = self.tick;
        if let Some(tube) = self.tube_at_mut(pos) {
            tube.start_venting(cooldown);
        }
        debug!(
            "tube at {pos:?} vents: wants {own_aspect:?}@{} against {their_aspect:?}",
            own.amount
        );
        sink.notify_vent(id, pos, color, tick);
        true
    }
}
