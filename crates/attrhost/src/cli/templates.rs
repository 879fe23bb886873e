//! # CLI Templates
//!
//! Output goes through `outstanding`, which renders minijinja templates with a
//! `style("name")` filter bound to [`super::styles::ATTRHOST_THEME`].
//!
//! Templates live in `templates/*.tmp` so they can be edited and diffed apart from the
//! code. Each branch ends with an explicit line break and trims the whitespace around
//! its block tags, so the newlines in the output are the ones visible in the file.
//!
//! Layout (padding, index alignment) and the choice of style are computed in Rust and
//! handed to the template as plain strings.
//!
//! `row.tmp` holds the `row_line` macro shared by every template that prints an
//! attribute line; it is prepended to those templates here.

use once_cell::sync::Lazy;

const ROW_MACRO: &str = include_str!("templates/row.tmp");

pub static SUMMARY_TEMPLATE: Lazy<String> =
    Lazy::new(|| [ROW_MACRO, include_str!("templates/summary.tmp")].concat());

pub static NEXT_TEMPLATE: Lazy<String> =
    Lazy::new(|| [ROW_MACRO, include_str!("templates/next.tmp")].concat());

pub const VERDICT_TEMPLATE: &str = include_str!("templates/verdict.tmp");

pub const VIEW_TEMPLATE: &str = include_str!("templates/view.tmp");
