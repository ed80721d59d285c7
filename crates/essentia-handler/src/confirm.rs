//! Two-phase drains: check availability now, commit later.
//!
//! A check hands out a [`DrainTicket`]. Only the most recent ticket per
//! destination is honored; confirming or cancelling consumes it.

use std::collections::BTreeMap;

use essentia_core::grid::GridPos;
use essentia_core::id::{AspectId, TicketId, TileId};

/// Proof of a successful availability check. Not `Clone`: a ticket can be
/// confirmed or cancelled at most once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a drain ticket does nothing until confirmed"]
pub struct DrainTicket {
    id: TicketId,
    source: GridPos,
    source_tile: TileId,
    destination: GridPos,
    aspect: AspectId,
    amount: u32,
    ext: u32,
}

impl DrainTicket {
    pub fn id(&self) -> TicketId {
        self.id
    }

    /// Container the unit will be withdrawn from.
    pub fn source(&self) -> GridPos {
        self.source
    }

    pub fn destination(&self) -> GridPos {
        self.destination
    }

    pub fn aspect(&self) -> AspectId {
        self.aspect
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn ext(&self) -> u32 {
        self.ext
    }

    pub(crate) fn source_tile(&self) -> TileId {
        self.source_tile
    }
}

/// Outstanding tickets, one per destination.
#[derive(Debug, Default)]
pub(crate) struct PendingDrains {
    by_destination: BTreeMap<GridPos, TicketId>,
    next: u64,
}

impl PendingDrains {
    /// Issue a ticket, superseding any outstanding one for the same
    /// destination.
    pub fn issue(
        &mut self,
        source: GridPos,
        source_tile: TileId,
        destination: GridPos,
        aspect: AspectId,
        ext: u32,
    ) -> DrainTicket {
        let id = TicketId(self.next);
        self.next += 1;
        self.by_destination.insert(destination, id);
        DrainTicket {
            id,
            source,
            source_tile,
            destination,
            aspect,
            amount: 1,
            ext,
        }
    }

    /// Remove the ticket if it is still the live one for its destination.
    pub fn redeem(&mut self, ticket: &DrainTicket) -> bool {
        match self.by_destination.get(&ticket.destination) {
            Some(&live) if live == ticket.id => {
                self.by_destination.remove(&ticket.destination);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.by_destination.len()
    }

    pub fn clear(&mut self) {
        self.by_destination.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essentia_core::test_utils::*;

    #[test]
    fn second_issue_supersedes_first() {
        let mut pending = PendingDrains::default();
        let tile = TileId::default();
        let first = pending.issue(pos(1, 0, 0), tile, pos(0, 0, 0), aer(), 0);
        let second = pending.issue(pos(2, 0, 0), tile, pos(0, 0, 0), aer(), 0);
        assert_eq!(pending.len(), 1);
        assert!(!pending.redeem(&first));
        assert!(pending.redeem(&second));
        assert!(!pending.redeem(&second), "redeemed once only");
    }

    #[test]
    fn destinations_do_not_clobber_each_other() {
        let mut pending = PendingDrains::default();
        let tile = TileId::default();
        let a = pending.issue(pos(1, 0, 0), tile, pos(0, 0, 0), aer(), 0);
        let b = pending.issue(pos(1, 0, 0), tile, pos(9, 0, 0), aqua(), 3);
        assert_eq!(pending.len(), 2);
        assert_ne!(a.id(), b.id());
        assert_eq!(b.ext(), 3);
        assert_eq!(b.amount(), 1);
        assert!(pending.redeem(&a));
        assert!(pending.redeem(&b));
    }
}
