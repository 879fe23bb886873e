//! Session notifications and the observer registry that delivers them.
//!
//! Handlers are called synchronously, in subscription order, on the thread that changed
//! the session. [`EventRegistry::clear`] drops every handler at once.

use crate::controls::ControlId;
use crate::counters::CounterKind;
use crate::model::{AttributeId, Validity};
use crate::snapshot::SelectionSnapshot;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum HostEvent {
    DocumentLoaded {
        attributes: usize,
    },
    DocumentCleared,
    AttributeInitialized {
        attribute: AttributeId,
    },
    ViewedStateChanged {
        attribute: AttributeId,
        viewed: bool,
    },
    ValidationStateChanged {
        attribute: AttributeId,
        validity: Validity,
    },
    AttributeDeleted {
        attribute: AttributeId,
    },
    ItemsExist {
        kind: CounterKind,
    },
    NoneLeft {
        kind: CounterKind,
    },
    /// Only delivered when drift surfacing is enabled.
    CounterDrift {
        kind: CounterKind,
        tracked: i64,
        actual: usize,
    },
    SelectionChanged {
        snapshot: SelectionSnapshot,
    },
    ActiveControlChanged {
        control: Option<ControlId>,
    },
    SwipeDropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&HostEvent)>;

#[derive(Default)]
pub struct EventRegistry {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&HostEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: &HostEvent) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
