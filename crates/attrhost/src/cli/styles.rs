//! Terminal styles.
//!
//! Templates ask for a style by what the text *is* (an index, a muted value, a
//! problem), never by colour, so the palette can change in one place.

use console::Style;
use once_cell::sync::Lazy;
use outstanding::Theme;

pub static ATTRHOST_THEME: Lazy<Theme> = Lazy::new(|| {
    Theme::new()
        .add("index", Style::new().yellow())
        .add("heading", Style::new().bold())
        .add("muted", Style::new().dim())
        .add("problem", Style::new().red().bold())
        .add("warning", Style::new().yellow())
        .add("ok", Style::new().green())
});
