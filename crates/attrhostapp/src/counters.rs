//! # Unviewed and Invalid Counters
//!
//! Both counts are kept incrementally from point events and reconciled against a full
//! tree walk whenever a decrease would take a count to zero or below. A reconciliation
//! that disagrees with the tracked value is a drift fault: it is logged, reported as
//! [`CounterSignal::Drift`], and the recount wins.
//!
//! Callers update the tree first and the counters second, so a recount always sees the
//! new state.

use crate::model::{AttributeNode, Validity};
use crate::tree::AttributeTree;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Unviewed,
    Invalid,
}

impl CounterKind {
    /// Whether `node` counts towards this counter.
    pub fn counts(&self, node: &AttributeNode) -> bool {
        match self {
            CounterKind::Unviewed => !node.viewed,
            CounterKind::Invalid => node.validity == Validity::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "signal")]
pub enum CounterSignal {
    /// The count left zero.
    ItemsExist { kind: CounterKind },
    /// The count reached zero, confirmed by a recount.
    NoneLeft { kind: CounterKind },
    Drift {
        kind: CounterKind,
        tracked: i64,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    unviewed: usize,
    invalid: usize,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts from a full walk of `tree`.
    pub fn recount(tree: &AttributeTree) -> Self {
        Self {
            unviewed: tree.count_where(|n| CounterKind::Unviewed.counts(n)),
            invalid: tree.count_where(|n| CounterKind::Invalid.counts(n)),
        }
    }

    pub fn unviewed(&self) -> usize {
        self.unviewed
    }

    pub fn invalid(&self) -> usize {
        self.invalid
    }

    pub fn get(&self, kind: CounterKind) -> usize {
        match kind {
            CounterKind::Unviewed => self.unviewed,
            CounterKind::Invalid => self.invalid,
        }
    }

    fn slot(&mut self, kind: CounterKind) -> &mut usize {
        match kind {
            CounterKind::Unviewed => &mut self.unviewed,
            CounterKind::Invalid => &mut self.invalid,
        }
    }

    pub fn increment(&mut self, kind: CounterKind) -> Option<CounterSignal> {
        let slot = self.slot(kind);
        *slot += 1;
        (*slot == 1).then_some(CounterSignal::ItemsExist { kind })
    }

    pub fn decrement(&mut self, kind: CounterKind, tree: &AttributeTree) -> Vec<CounterSignal> {
        self.decrease(kind, 1, tree)
    }

    /// Lowers `kind` by `by`, reconciling with `tree` when the result would be zero or less.
    pub fn decrease(&mut self, kind: CounterKind, by: usize, tree: &AttributeTree) -> Vec<CounterSignal> {
        let previous = self.get(kind);
        let tracked = previous as i64 - by as i64;
        if tracked > 0 {
            *self.slot(kind) = tracked as usize;
            return Vec::new();
        }

        let actual = tree.count_where(|n| kind.counts(n));
        let mut signals = Vec::new();
        if actual as i64 != tracked {
            error!(?kind, tracked, actual, "counter drift detected, adopting recount");
            signals.push(CounterSignal::Drift {
                kind,
                tracked,
                actual,
            });
        }
        *self.slot(kind) = actual;
        signals.extend(transition(kind, previous, actual));
        signals
    }

    /// Accounts for nodes detached from the tree in one pass.
    pub fn remove_nodes(&mut self, removed: &[AttributeNode], tree: &AttributeTree) -> Vec<CounterSignal> {
        let mut signals = Vec::new();
        for kind in [CounterKind::Unviewed, CounterKind::Invalid] {
            let by = removed.iter().filter(|n| kind.counts(n)).count();
            if by > 0 {
                signals.extend(self.decrease(kind, by, tree));
            }
        }
        signals
    }

    /// Replaces both counts with a recount, reporting zero crossings but not drift.
    pub fn reconcile(&mut self, tree: &AttributeTree) -> Vec<CounterSignal> {
        let fresh = Self::recount(tree);
        let mut signals = Vec::new();
        for kind in [CounterKind::Unviewed, CounterKind::Invalid] {
            signals.extend(transition(kind, self.get(kind), fresh.get(kind)));
        }
        *self = fresh;
        signals
    }
}

fn transition(kind: CounterKind, before: usize, after: usize) -> Option<CounterSignal> {
    match (before, after) {
        (0, a) if a > 0 => Some(CounterSignal::ItemsExist { kind }),
        (b, 0) if b > 0 => Some(CounterSignal::NoneLeft { kind }),
        _ => None,
    }
}
