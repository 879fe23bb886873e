//! # CLI Behavior
//!
//! This is **one possible client** for attrhost documents, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes and output
//! formatting.
//!
//! ## Indexes
//!
//! Attributes are addressed by their 1-based position in tab order, the order a user
//! would reach them pressing Tab from the top of the form. `summary` prints the index
//! next to every attribute, and `next` / `view` take and print the same indexes.
//!
//! ## Commands
//!
//! - `summary FILE`: counts, then every attribute with its status
//! - `next FILE [--after N] [--unviewed | --invalid] [--backward]`: where Tab goes
//! - `view FILE (N... | --all)`: marks attributes viewed and saves
//! - `save-check FILE`: what the save gate says about the document
//! - `config`: the effective configuration
//!
//! Logging goes to stderr and is controlled by `ATTRHOST_LOG` (an `EnvFilter`
//! directive, default `warn`).
//!
//! ## Module Structure
//!
//! - `commands`: Per-command handlers that drive a session and print
//! - `headless`: Controls derived from the document's attribute names
//! - `render`: Output formatting
//! - `setup`: Argument parsing via clap
//! - `styles`: The output theme
//! - `templates`: Output templates

mod commands;
mod headless;
mod render;
pub mod setup;
mod styles;
mod templates;

pub use commands::run;
