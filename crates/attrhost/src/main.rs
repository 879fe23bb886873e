//! # Attrhost CLI Architecture
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this file only
//! invokes `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/attrhostapp/`: the UI-agnostic session library
//! - `crates/attrhost/`: this CLI, a headless client of the library
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/attrhost/src/cli/)                       │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Document loading + dispatch (commands.rs)                │
//! │  - Headless controls derived from the document (headless.rs)│
//! │  - Terminal rendering (render.rs, styles.rs)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session (crates/attrhostapp/src/session.rs)                │
//! │  - Routing, propagation, counters, save gating              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (crates/attrhostapp/src/store/)                    │
//! │  - JsonFileStore                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no image view and no form here. The session draws on an in-memory surface
//! and every attribute name gets a headless control, so routing, tab order and
//! navigation behave as they would behind a real form.
//!
//! ## Testing Approach
//!
//! - **Library**: unit and scenario tests in `crates/attrhostapp`.
//! - **Rendering**: unit tests in `render.rs` over canned values.
//! - **End to end**: `tests/` runs the binary over JSON documents in temp dirs.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
