//! Fire-and-forget effects raised by the simulation.
//!
//! The simulation never reads anything back from a sink, so a sink that
//! drops events (or [`NullSink`]) cannot change simulation state.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::aspect::Color;
use crate::grid::GridPos;
use crate::id::{AspectId, TileId};
use crate::tick::Ticks;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EssentiaEvent {
    /// A tube detected a routing conflict and entered its vent cooldown.
    Vented {
        tile: TileId,
        pos: GridPos,
        color: Option<Color>,
        tick: Ticks,
    },
    /// A direct (non-networked) transfer between a container and a device.
    Transferred {
        from: GridPos,
        to: GridPos,
        aspect: AspectId,
        amount: u32,
        ext: u32,
        tick: Ticks,
    },
    /// One unit moved across a network edge.
    Flowed {
        from: GridPos,
        to: GridPos,
        aspect: AspectId,
        tick: Ticks,
    },
    /// A void container destroyed essentia.
    Voided {
        tile: TileId,
        pos: GridPos,
        aspect: AspectId,
        amount: u32,
        tick: Ticks,
    },
    ValveToggled {
        tile: TileId,
        pos: GridPos,
        open: bool,
        tick: Ticks,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Vented,
    Transferred,
    Flowed,
    Voided,
    ValveToggled,
}

const EVENT_KIND_COUNT: usize = 5;

impl EssentiaEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EssentiaEvent::Vented { .. } => EventKind::Vented,
            EssentiaEvent::Transferred { .. } => EventKind::Transferred,
            EssentiaEvent::Flowed { .. } => EventKind::Flowed,
            EssentiaEvent::Voided { .. } => EventKind::Voided,
            EssentiaEvent::ValveToggled { .. } => EventKind::ValveToggled,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            EssentiaEvent::Vented { tick, .. }
            | EssentiaEvent::Transferred { tick, .. }
            | EssentiaEvent::Flowed { tick, .. }
            | EssentiaEvent::Voided { tick, .. }
            | EssentiaEvent::ValveToggled { tick, .. } => *tick,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver for simulation effects.
pub trait EventSink {
    fn notify(&mut self, event: EssentiaEvent);

    fn notify_vent(&mut self, tile: TileId, pos: GridPos, color: Option<Color>, tick: Ticks) {
        self.notify(EssentiaEvent::Vented {
            tile,
            pos,
            color,
            tick,
        });
    }

    fn notify_transfer(
        &mut self,
        from: GridPos,
        to: GridPos,
        aspect: AspectId,
        amount: u32,
        ext: u32,
        tick: Ticks,
    ) {
        self.notify(EssentiaEvent::Transferred {
            from,
            to,
            aspect,
            amount,
            ext,
            tick,
        });
    }
}

impl EventSink for Vec<EssentiaEvent> {
    fn notify(&mut self, event: EssentiaEvent) {
        self.push(event);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&mut self, _event: EssentiaEvent) {}
}

// ---------------------------------------------------------------------------
// EventLog: bounded ring buffer
// ---------------------------------------------------------------------------

/// A bounded event log. When full the oldest event is evicted. Individual
/// kinds can be suppressed so they are never recorded.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<EssentiaEvent>,
    capacity: usize,
    suppressed: [bool; EVENT_KIND_COUNT],
    /// Per-kind count of events offered to the log, suppressed ones excluded.
    recorded: [u64; EVENT_KIND_COUNT],
    dropped: u64,
}

impl EventLog {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            suppressed: [false; EVENT_KIND_COUNT],
            recorded: [0; EVENT_KIND_COUNT],
            dropped: 0,
        }
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.events.retain(|e| e.kind() != kind);
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events evicted because the log was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Events of `kind` ever recorded, including evicted ones.
    pub fn total_recorded(&self, kind: EventKind) -> u64 {
        self.recorded[kind.index()]
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &EssentiaEvent> {
        self.events.iter()
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &EssentiaEvent> {
        self.events.iter().filter(move |e| e.kind() == kind)
    }

    /// Remove and return all buffered events, oldest first.
    pub fn drain(&mut self) -> Vec<EssentiaEvent> {
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventSink for EventLog {
    fn notify(&mut self, event: EssentiaEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.recorded[idx] += 1;
        self.events.push_back(event);
    }
}
