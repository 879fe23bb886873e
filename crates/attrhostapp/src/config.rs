//! # Configuration
//!
//! Host configuration is a [`confique`] struct, loaded in layers:
//! 1. **Environment variables**: `ATTRHOST_SHOW_ALL_HIGHLIGHTS`, `ATTRHOST_INVALID_POLICY`, etc.
//! 2. **Config file**: an optional `attrhost.toml` passed by the embedding application.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `show_all_highlights` | `false` | Show every highlight, not only the active ones |
//! | `hints_enabled` | `true` | Draw hints at all |
//! | `confidence_tiers` | 50 / 80 / 100 | Colour ladder by OCR confidence |
//! | `hint_fill` | `#E0E0E0` | Neutral fill behind hint outlines |
//! | `active_control_color` | `#C0E0FF` | Colour the active control is marked with |
//! | `unviewed_policy` | `prompt_once` | Save gating for unviewed data |
//! | `invalid_policy` | `disallow` | Save gating for invalid data |
//! | `tooltip_char_width` | `7.0` | Estimated pixels per tooltip character |
//! | `tooltip_line_height` | `16.0` | Tooltip box height |
//! | `error_icon_size` | `16.0` | Error icon edge length |
//! | `surface_counter_drift` | debug builds | Report counter drift to observers |
//! | `tooltips_for_multi_select` | `true` | Draw tooltips when several nodes are active |

use crate::error::{HostError, Result};
use crate::overlay::tiers::{Color, ConfidenceTier, TierLadder};
use crate::validation::SavePolicy;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    #[config(env = "ATTRHOST_SHOW_ALL_HIGHLIGHTS", default = false)]
    pub show_all_highlights: bool,

    #[config(env = "ATTRHOST_HINTS_ENABLED", default = true)]
    pub hints_enabled: bool,

    /// Ascending confidence ladder. When absent, the built-in three-tier ladder is used.
    pub confidence_tiers: Option<Vec<ConfidenceTier>>,

    #[config(env = "ATTRHOST_HINT_FILL", default = "#E0E0E0")]
    pub hint_fill: Color,

    #[config(env = "ATTRHOST_ACTIVE_CONTROL_COLOR", default = "#C0E0FF")]
    pub active_control_color: Color,

    #[config(env = "ATTRHOST_UNVIEWED_POLICY", default = "prompt_once")]
    pub unviewed_policy: SavePolicy,

    #[config(env = "ATTRHOST_INVALID_POLICY", default = "disallow")]
    pub invalid_policy: SavePolicy,

    #[config(env = "ATTRHOST_TOOLTIP_CHAR_WIDTH", default = 7.0)]
    pub tooltip_char_width: f64,

    #[config(env = "ATTRHOST_TOOLTIP_LINE_HEIGHT", default = 16.0)]
    pub tooltip_line_height: f64,

    #[config(env = "ATTRHOST_ERROR_ICON_SIZE", default = 16.0)]
    pub error_icon_size: f64,

    /// When absent, drift is surfaced in debug builds only.
    #[config(env = "ATTRHOST_SURFACE_COUNTER_DRIFT")]
    pub surface_counter_drift: Option<bool>,

    #[config(env = "ATTRHOST_TOOLTIPS_FOR_MULTI_SELECT", default = true)]
    pub tooltips_for_multi_select: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            show_all_highlights: false,
            hints_enabled: true,
            confidence_tiers: None,
            hint_fill: Color::rgb(0xE0, 0xE0, 0xE0),
            active_control_color: Color::rgb(0xC0, 0xE0, 0xFF),
            unviewed_policy: SavePolicy::PromptOnce,
            invalid_policy: SavePolicy::Disallow,
            tooltip_char_width: 7.0,
            tooltip_line_height: 16.0,
            error_icon_size: 16.0,
            surface_counter_drift: None,
            tooltips_for_multi_select: true,
        }
    }
}

impl HostConfig {
    /// Loads environment overrides on top of an optional TOML file and the defaults.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = HostConfig::builder().env();
        if let Some(path) = file {
            builder = builder.file(path);
        }
        builder
            .load()
            .map_err(|e| HostError::Config(e.to_string()))
    }

    pub fn tier_ladder(&self) -> TierLadder {
        self.confidence_tiers
            .clone()
            .map(TierLadder::new)
            .unwrap_or_default()
    }

    pub fn surface_counter_drift(&self) -> bool {
        self.surface_counter_drift
            .unwrap_or(cfg!(debug_assertions))
    }
}
