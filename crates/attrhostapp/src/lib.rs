//! # Attrhost Architecture
//!
//! Attrhost keeps a **document data-entry surface** in sync: the extracted attribute
//! tree, the image view it was extracted from, and the form controls the user types
//! into. It is a UI-agnostic library. The image view and the controls are traits the
//! embedding application implements; nothing here draws pixels or owns a window.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Embedding UI (image view, form controls, status bar)       │
//! │  - Implements DocumentSurface and DataEntryControl          │
//! │  - Forwards focus, selection, hover and edit events         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session (session.rs)                                       │
//! │  - One DocumentSession per open document                    │
//! │  - Routes events, batches refreshes, notifies observers     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core (tree, overlay, counters, propagation, snapshot)      │
//! │  - Pure logic over Rust types                               │
//! │  - No knowledge of the concrete UI                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/)                                           │
//! │  - AttributeStore trait                                     │
//! │  - JsonFileStore (production), MemoryStore (testing)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Ids, Not Pointers
//!
//! Attributes live in one arena keyed by [`model::AttributeId`]; controls are keyed by
//! [`controls::ControlId`]. Parent links, owning controls, overlay bookkeeping and
//! pending swipes all hold ids, so deleting a node is a matter of dropping its ids
//! everywhere, and a stale id is a lookup miss rather than a dangling reference.
//!
//! ## Testing Strategy
//!
//! 1. **Core modules**: unit tests next to the code, over hand-built trees.
//! 2. **Session**: scenario tests in `tests/` against [`overlay::surface::MemSurface`]
//!    and the recording control from `test_utils` (enable the `test_utils` feature).
//! 3. **CLI**: the `attrhost` binary is tested end to end over JSON documents.
//!
//! ## Module Overview
//!
//! - [`session`]: The document session facade, entry point for all operations
//! - [`tree`]: Attribute arena, display order and traversal
//! - [`geometry`]: Zones, rectangles and anchor placement
//! - [`overlay`]: Highlights, tooltips and error icons on the document surface
//! - [`counters`]: Unviewed / invalid bookkeeping and its transitions
//! - [`propagation`]: Control routing, genealogy propagation and focus tracking
//! - [`snapshot`]: Selection summary for the status bar
//! - [`controls`]: Control descriptions and the control registry
//! - [`validation`]: Validators and save gating
//! - [`swipe`]: Swipe-to-text bookkeeping
//! - [`store`]: Storage abstraction and implementations
//! - [`events`]: Observer notifications
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod config;
pub mod controls;
pub mod counters;
pub mod error;
pub mod events;
pub mod geometry;
pub mod model;
pub mod overlay;
pub mod propagation;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod swipe;
pub mod tree;
pub mod validation;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use config::HostConfig;
pub use controls::{ControlId, ControlSpec, DataEntryControl};
pub use error::{HostError, Result};
pub use events::HostEvent;
pub use model::{AttributeId, AttributeNode, HintType, Validity};
pub use session::{DocumentSession, UpdateScope};
pub use tree::{AttributeTree, Direction, Genealogy};
