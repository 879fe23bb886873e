//! Confidence tiers: the colour ladder highlights are drawn with.
//!
//! Tiers are ascending by the highest OCR confidence they cover. A zone falls into
//! the first tier whose `max_confidence` is at least the zone's confidence. The last
//! tier always covers up to 100, whatever was configured.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("Invalid color: {}", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("Invalid color: {}", s))
        };
        Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceTier {
    /// Highest confidence (inclusive, 0-100) this tier covers.
    pub max_confidence: u8,
    pub color: Color,
}

impl ConfidenceTier {
    pub const fn new(max_confidence: u8, color: Color) -> Self {
        Self {
            max_confidence,
            color,
        }
    }
}

pub static DEFAULT_TIERS: Lazy<Vec<ConfidenceTier>> = Lazy::new(|| {
    vec![
        ConfidenceTier::new(50, Color::rgb(0xFF, 0x99, 0x99)),
        ConfidenceTier::new(80, Color::rgb(0xFF, 0xFF, 0x99)),
        ConfidenceTier::new(100, Color::rgb(0x99, 0xFF, 0x99)),
    ]
});

/// Index into a [`TierLadder`].
pub type TierIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLadder {
    tiers: Vec<ConfidenceTier>,
}

impl Default for TierLadder {
    fn default() -> Self {
        Self::new(DEFAULT_TIERS.clone())
    }
}

impl TierLadder {
    pub fn new(mut tiers: Vec<ConfidenceTier>) -> Self {
        if tiers.is_empty() {
            tiers = DEFAULT_TIERS.clone();
        }
        tiers.sort_by_key(|t| t.max_confidence);
        if let Some(last) = tiers.last_mut() {
            last.max_confidence = 100;
        }
        Self { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn top(&self) -> TierIndex {
        self.tiers.len().saturating_sub(1)
    }

    pub fn tier_for(&self, confidence: u8) -> TierIndex {
        self.tiers
            .iter()
            .position(|t| confidence <= t.max_confidence)
            .unwrap_or_else(|| self.top())
    }

    pub fn color(&self, tier: TierIndex) -> Color {
        self.tiers
            .get(tier)
            .or_else(|| self.tiers.last())
            .map(|t| t.color)
            .unwrap_or(Color::rgb(0xFF, 0xFF, 0xFF))
    }

    pub fn tiers(&self) -> &[ConfidenceTier] {
        &self.tiers
    }
}
