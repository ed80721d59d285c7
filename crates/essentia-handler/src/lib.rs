//! Direct container-to-device transfers without a tube network.
//!
//! [`EssentiaHandler`] serves devices that draw essentia from, or push it
//! into, nearby containers. It scans a bounded volume around the device,
//! caches the containers it found (nearest first) per origin, and backs off
//! from origins whose scan came up empty. Cached entries stay valid until a
//! candidate turns out to be stale, every candidate fails, or a topology
//! change inside the scanned volume is reported.
//!
//! The handler is an owned value, one per session. It works against any
//! [`ContainerLookup`], so it runs over the tube world or a bare test grid.

pub mod cache;
pub mod confirm;
pub mod scan;

use essentia_core::config::HandlerConfig;
use essentia_core::container::ContainerLookup;
use essentia_core::event::{EssentiaEvent, EventSink};
use essentia_core::grid::GridPos;
use essentia_core::id::AspectId;
use log::debug;

use crate::cache::{CacheEntry, SourceCache};
pub use crate::confirm::DrainTicket;
use crate::confirm::PendingDrains;
pub use crate::scan::{Candidate, Scan};

#[derive(Debug, Default)]
pub struct EssentiaHandler {
    config: HandlerConfig,
    cache: SourceCache,
    pending: PendingDrains,
    scans: u64,
}

/// Outcome of looking up candidates for one origin.
enum Lookup {
    Found(Vec<Candidate>),
    BackingOff,
    Empty,
}

impl EssentiaHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Drain / add / find
    // -----------------------------------------------------------------------

    /// Withdraw one unit of `aspect` from the nearest container that can
    /// give it, on behalf of the device at `scan.origin`.
    pub fn drain<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &mut W,
        scan: &Scan,
        aspect: AspectId,
        ext: u32,
        sink: &mut dyn EventSink,
    ) -> bool {
        self.drain_inner(world, scan, aspect, ext, sink, true)
    }

    fn drain_inner<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &mut W,
        scan: &Scan,
        aspect: AspectId,
        ext: u32,
        sink: &mut dyn EventSink,
        may_rescan: bool,
    ) -> bool {
        let Lookup::Found(candidates) = self.lookup(&*world, scan) else {
            return false;
        };
        let now = world.now();
        for cand in candidates {
            match world.container_at_mut(cand.pos) {
                Some((id, container)) if id == cand.tile => {
                    if container.can_yield(aspect, 1) && container.remove(aspect, 1) == 1 {
                        sink.notify_transfer(cand.pos, scan.origin, aspect, 1, ext, now);
                        return true;
                    }
                }
                _ => {
                    debug!("stale candidate {:?} for {:?}", cand.pos, scan.origin);
                    self.cache.invalidate(scan.origin);
                    return may_rescan && self.drain_inner(world, scan, aspect, ext, sink, false);
                }
            }
        }
        self.exhausted(scan, now);
        false
    }

    /// Deposit one unit of `aspect` into a nearby container. Containers that
    /// already hold `aspect` are preferred over empty ones.
    pub fn add<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &mut W,
        scan: &Scan,
        aspect: AspectId,
        ext: u32,
        sink: &mut dyn EventSink,
    ) -> bool {
        self.add_inner(world, scan, aspect, ext, sink, true)
    }

    fn add_inner<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &mut W,
        scan: &Scan,
        aspect: AspectId,
        ext: u32,
        sink: &mut dyn EventSink,
        may_rescan: bool,
    ) -> bool {
        let Lookup::Found(candidates) = self.lookup(&*world, scan) else {
            return false;
        };
        let now = world.now();
        for merge_only in [true, false] {
            for cand in &candidates {
                let Some((id, container)) = world.container_at_mut(cand.pos) else {
                    return self.stale_add(world, scan, aspect, ext, sink, may_rescan);
                };
                if id != cand.tile {
                    return self.stale_add(world, scan, aspect, ext, sink, may_rescan);
                }
                if merge_only && container.amount_of(aspect) == 0 {
                    continue;
                }
                if !container.can_accept(aspect) {
                    continue;
                }
                let deposit = container.insert(aspect, 1);
                if deposit.accepted() == 0 {
                    continue;
                }
                sink.notify_transfer(scan.origin, cand.pos, aspect, 1, ext, now);
                if deposit.voided > 0 {
                    sink.notify(EssentiaEvent::Voided {
                        tile: id,
                        pos: cand.pos,
                        aspect,
                        amount: deposit.voided,
                        tick: now,
                    });
                }
                return true;
            }
        }
        self.exhausted(scan, now);
        false
    }

    fn stale_add<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &mut W,
        scan: &Scan,
        aspect: AspectId,
        ext: u32,
        sink: &mut dyn EventSink,
        may_rescan: bool,
    ) -> bool {
        debug!("stale candidate list for {:?}", scan.origin);
        self.cache.invalidate(scan.origin);
        may_rescan && self.add_inner(world, scan, aspect, ext, sink, false)
    }

    /// Whether any nearby container could give one unit of `aspect` now.
    /// Scans on a miss but never moves essentia.
    pub fn find<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &W,
        scan: &Scan,
        aspect: AspectId,
    ) -> bool {
        self.first_source(world, scan, aspect).is_some()
    }

    // -----------------------------------------------------------------------
    // Check / confirm
    // -----------------------------------------------------------------------

    /// Check that one unit of `aspect` is available without withdrawing it.
    /// The returned ticket supersedes any earlier unconfirmed ticket for the
    /// same destination.
    pub fn drain_with_confirmation<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &W,
        scan: &Scan,
        aspect: AspectId,
        ext: u32,
    ) -> Option<DrainTicket> {
        let cand = self.first_source(world, scan, aspect)?;
        Some(
            self.pending
                .issue(cand.pos, cand.tile, scan.origin, aspect, ext),
        )
    }

    /// Commit a ticket. Returns `false`, without side effects, when the
    /// ticket was superseded or the unit is no longer there.
    pub fn confirm_drain<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &mut W,
        ticket: DrainTicket,
        sink: &mut dyn EventSink,
    ) -> bool {
        if !self.pending.redeem(&ticket) {
            debug!("ignoring superseded drain ticket {:?}", ticket.id());
            return false;
        }
        let now = world.now();
        match world.container_at_mut(ticket.source()) {
            Some((id, container))
                if id == ticket.source_tile()
                    && container.can_yield(ticket.aspect(), ticket.amount()) =>
            {
                container.remove(ticket.aspect(), ticket.amount());
                sink.notify_transfer(
                    ticket.source(),
                    ticket.destination(),
                    ticket.aspect(),
                    ticket.amount(),
                    ticket.ext(),
                    now,
                );
                true
            }
            _ => {
                debug!("drain ticket {:?} no longer satisfiable", ticket.id());
                false
            }
        }
    }

    /// Drop a ticket without withdrawing. Returns `true` if it was live.
    pub fn cancel(&mut self, ticket: DrainTicket) -> bool {
        self.pending.redeem(&ticket)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // -----------------------------------------------------------------------
    // Cache management
    // -----------------------------------------------------------------------

    pub fn invalidate(&mut self, origin: GridPos) -> bool {
        self.cache.invalidate(origin)
    }

    /// A tile at `pos` was placed, removed or replaced. Forgets every cached
    /// list and backoff whose scan volume covers `pos`.
    pub fn notify_topology_change(&mut self, pos: GridPos) {
        let dropped = self.cache.forget_containing(pos);
        if dropped > 0 {
            debug!("topology change at {pos:?} dropped {dropped} cached scan(s)");
        }
    }

    /// Forget everything, including outstanding tickets.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.pending.clear();
    }

    pub fn is_cached(&self, origin: GridPos) -> bool {
        self.cache.get(origin).is_some()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_backing_off(&self, origin: GridPos, now: essentia_core::tick::Ticks) -> bool {
        self.cache.backing_off(origin, now)
    }

    /// Volume scans performed so far.
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lookup<W: ContainerLookup + ?Sized>(&mut self, world: &W, scan: &Scan) -> Lookup {
        if let Some(entry) = self.cache.get(scan.origin) {
            return Lookup::Found(entry.candidates.clone());
        }
        let now = world.now();
        if self.cache.backing_off(scan.origin, now) {
            return Lookup::BackingOff;
        }
        let found = scan.collect(world);
        self.scans += 1;
        if found.is_empty() {
            debug!(
                "scan around {:?} found nothing; backing off until {}",
                scan.origin,
                now + self.config.rescan_delay
            );
            self.cache
                .back_off(scan.origin, now + self.config.rescan_delay, scan.volume());
            return Lookup::Empty;
        }
        debug!("scan around {:?} found {} container(s)", scan.origin, found.len());
        self.cache.insert(
            scan.origin,
            CacheEntry {
                candidates: found.clone(),
                volume: scan.volume(),
            },
        );
        Lookup::Found(found)
    }

    /// Nearest valid candidate holding a unit of `aspect`, rescanning once
    /// if the cached list turned out stale.
    fn first_source<W: ContainerLookup + ?Sized>(
        &mut self,
        world: &W,
        scan: &Scan,
        aspect: AspectId,
    ) -> Option<Candidate> {
        for attempt in 0..2 {
            let Lookup::Found(candidates) = self.lookup(world, scan) else {
                return None;
            };
            let mut stale = false;
            for cand in candidates {
                match world.container_at(cand.pos) {
                    Some((id, container)) if id == cand.tile => {
                        if container.can_yield(aspect, 1) {
                            return Some(cand);
                        }
                    }
                    _ => {
                        stale = true;
                        break;
                    }
                }
            }
            if !stale {
                return None;
            }
            debug!("stale candidate list for {:?} (attempt {attempt})", scan.origin);
            self.cache.invalidate(scan.origin);
        }
        None
    }

    fn exhausted(&mut self, scan: &Scan, now: essentia_core::tick::Ticks) {
        self.cache.invalidate(scan.origin);
        self.cache
            .back_off(scan.origin, now + self.config.rescan_delay, scan.volume());
        debug!("no container around {:?} could serve; backing off", scan.origin);
    }
}
