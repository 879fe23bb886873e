//! Swipe-to-text: the user drags over a region, an OCR engine reads it, and the result
//! replaces the active attribute's value.
//!
//! Recognition happens outside the session. A swipe is only tracked by its
//! [`SwipeTicket`]; it cannot be cancelled, but it can be flagged for discard so its
//! result is dropped on arrival.

use crate::error::Result;
use crate::geometry::RasterZone;
use crate::model::AttributeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwipeTicket(u64);

/// Reads the text under a swiped region.
pub trait OcrEngine {
    fn recognize(&mut self, zones: &[RasterZone]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSwipe {
    pub ticket: SwipeTicket,
    pub zones: Vec<RasterZone>,
    /// Attribute the result goes to.
    pub target: AttributeId,
    pub discarded: bool,
}

#[derive(Debug, Default)]
pub struct SwipeQueue {
    next: u64,
    pending: Vec<PendingSwipe>,
}

impl SwipeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, zones: Vec<RasterZone>, target: AttributeId) -> SwipeTicket {
        self.next += 1;
        let ticket = SwipeTicket(self.next);
        self.pending.push(PendingSwipe {
            ticket,
            zones,
            target,
            discarded: false,
        });
        ticket
    }

    /// Flags every outstanding swipe so its result is ignored.
    pub fn discard_all(&mut self) -> usize {
        let mut flagged = 0;
        for swipe in self.pending.iter_mut().filter(|s| !s.discarded) {
            swipe.discarded = true;
            flagged += 1;
        }
        flagged
    }

    /// Discards swipes aimed at `target`, e.g. because it was deleted.
    pub fn discard_for(&mut self, target: &AttributeId) {
        for swipe in self.pending.iter_mut().filter(|s| s.target == *target) {
            swipe.discarded = true;
        }
    }

    pub fn take(&mut self, ticket: SwipeTicket) -> Option<PendingSwipe> {
        let index = self.pending.iter().position(|s| s.ticket == ticket)?;
        Some(self.pending.remove(index))
    }

    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|s| !s.discarded).count()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
