//! # Overlay Lifecycle
//!
//! [`OverlayManager`] owns every overlay drawn for an attribute: highlight groups, one
//! tooltip per page and one error icon per page. Overlays are created lazily, hidden
//! rather than destroyed when a node stops being active, and only destroyed on
//! structural change ([`OverlayManager::remove`]) or when the document is cleared.
//!
//! ## Slots
//!
//! | Kind | Keyed by | Created by |
//! |------|----------|------------|
//! | Highlight | `(page, confidence tier)` | [`OverlayManager::set_highlight`] |
//! | Tooltip | page | [`OverlayManager::set_tooltip`] |
//! | Error icon | page | [`OverlayManager::set_error_icon`] |
//!
//! Creating a tooltip or error icon always removes the previous one for the node first.
//!
//! ## Paint Order
//!
//! The surface paints new overlays on top. After every batch of changes the session calls
//! [`OverlayManager::raise_decorations`], which lifts visible error icons above
//! highlights and tooltips above everything.

pub mod surface;
pub mod tiers;

use crate::config::HostConfig;
use crate::geometry::{anchor_point, AnchorAlignment, OffsetDirection, Point, Rect, Size};
use crate::model::{AttributeId, AttributeNode};
use crate::tree::AttributeTree;
use std::collections::{BTreeMap, HashMap, HashSet};
use surface::{DocumentSurface, OverlayHandle, OverlayKind, OverlayPrimitive, OverlayShape};
use tiers::{Color, TierIndex, TierLadder};
use tracing::trace;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Default)]
struct NodeOverlays {
    highlights: BTreeMap<(u32, TierIndex), OverlayHandle>,
    tooltips: BTreeMap<u32, OverlayHandle>,
    error_icons: BTreeMap<u32, OverlayHandle>,
    icons_visible: bool,
}

#[derive(Debug)]
pub struct OverlayManager {
    ladder: TierLadder,
    hint_fill: Color,
    hints_enabled: bool,
    show_all_highlights: bool,
    tooltip_char_width: f64,
    tooltip_line_height: f64,
    error_icon_size: f64,
    nodes: HashMap<AttributeId, NodeOverlays>,
    /// Nodes whose highlights are currently visible.
    displayed: HashSet<AttributeId>,
}

impl OverlayManager {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            ladder: config.tier_ladder(),
            hint_fill: config.hint_fill,
            hints_enabled: config.hints_enabled,
            show_all_highlights: config.show_all_highlights,
            tooltip_char_width: config.tooltip_char_width,
            tooltip_line_height: config.tooltip_line_height,
            error_icon_size: config.error_icon_size,
            nodes: HashMap::new(),
            displayed: HashSet::new(),
        }
    }

    pub fn ladder(&self) -> &TierLadder {
        &self.ladder
    }

    /// Whether `node` gets a highlight at all.
    pub fn is_viewable(&self, node: &AttributeNode) -> bool {
        node.has_spatial_info() && (!node.is_hint() || self.hints_enabled)
    }

    /// Visibility a node's highlight has when it is neither active nor hovered.
    pub fn default_visibility(&self, node: &AttributeNode) -> bool {
        self.show_all_highlights && !node.is_indirect_hint()
    }

    pub fn has_highlight(&self, id: &AttributeId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|n| !n.highlights.is_empty())
    }

    pub fn highlight_groups(&self, id: &AttributeId) -> Vec<(u32, TierIndex)> {
        self.nodes
            .get(id)
            .map(|n| n.highlights.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn tooltip_pages(&self, id: &AttributeId) -> Vec<u32> {
        self.nodes
            .get(id)
            .map(|n| n.tooltips.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn error_icon_pages(&self, id: &AttributeId) -> Vec<u32> {
        self.nodes
            .get(id)
            .map(|n| n.error_icons.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_displayed(&self, id: &AttributeId) -> bool {
        self.displayed.contains(id)
    }

    pub fn displayed(&self) -> impl Iterator<Item = &AttributeId> {
        self.displayed.iter()
    }

    /// Shows or hides `node`'s highlight, creating it on first use.
    ///
    /// Returns whether the node has a highlight afterwards.
    pub fn set_highlight(
        &mut self,
        surface: &mut dyn DocumentSurface,
        node: &AttributeNode,
        visible: bool,
    ) -> bool {
        if let Some(existing) = self.nodes.get_mut(&node.id) {
            if !existing.highlights.is_empty() {
                for handle in existing.highlights.values() {
                    surface.set_overlay_visible(*handle, visible);
                }
                self.track_displayed(node.id, visible);
                return true;
            }
        }

        if !self.is_viewable(node) {
            return false;
        }

        let mut groups: BTreeMap<(u32, TierIndex), Vec<_>> = BTreeMap::new();
        for zone in &node.spatial_zones {
            let tier = if node.is_confirmed() {
                self.ladder.top()
            } else {
                self.ladder.tier_for(zone.confidence)
            };
            groups.entry((zone.page, tier)).or_default().push(*zone);
        }

        let entry = self.nodes.entry(node.id).or_default();
        for ((page, tier), zones) in groups {
            let tier_color = self.ladder.color(tier);
            let (fill, outline) = if node.is_hint() {
                (self.hint_fill, Some(tier_color))
            } else {
                (tier_color, None)
            };
            let handle = surface.add_overlay(OverlayPrimitive {
                kind: OverlayKind::Highlight,
                page,
                shape: OverlayShape::Zones {
                    zones,
                    fill,
                    outline,
                },
                visible,
            });
            entry.highlights.insert((page, tier), handle);
        }
        trace!(attribute = %node.id, groups = entry.highlights.len(), "created highlight");
        self.track_displayed(node.id, visible);
        true
    }

    fn track_displayed(&mut self, id: AttributeId, visible: bool) {
        if visible {
            self.displayed.insert(id);
        } else {
            self.displayed.remove(&id);
        }
    }

    /// Replaces `node`'s tooltips with one per page it has zones on.
    ///
    /// Returns the number of tooltips created.
    pub fn set_tooltip(&mut self, surface: &mut dyn DocumentSurface, node: &AttributeNode) -> usize {
        self.remove_tooltip(surface, &node.id);
        if node.text.is_empty() {
            return 0;
        }

        let size = Size::new(
            UnicodeWidthStr::width(node.text.as_str()) as f64 * self.tooltip_char_width,
            self.tooltip_line_height,
        );
        let mut created = BTreeMap::new();
        for page in node.pages() {
            let zones = node.zones_on_page(page);
            let Some((origin, rotation)) = place_tooltip(surface, page, &zones, size) else {
                continue;
            };
            let handle = surface.add_overlay(OverlayPrimitive {
                kind: OverlayKind::Tooltip,
                page,
                shape: OverlayShape::Anchored {
                    anchor: origin,
                    rotation,
                    size,
                    text: node.text.clone(),
                },
                visible: true,
            });
            created.insert(page, handle);
        }

        let count = created.len();
        if count > 0 {
            self.nodes.entry(node.id).or_default().tooltips = created;
            trace!(attribute = %node.id, count, "created tooltips");
        }
        count
    }

    pub fn remove_tooltip(&mut self, surface: &mut dyn DocumentSurface, id: &AttributeId) {
        if let Some(entry) = self.nodes.get_mut(id) {
            for (_, handle) in std::mem::take(&mut entry.tooltips) {
                surface.remove_overlay(handle);
            }
        }
    }

    /// Replaces `node`'s error icons. Valid nodes and indirect hints get none.
    ///
    /// Returns the number of icons created.
    pub fn set_error_icon(
        &mut self,
        surface: &mut dyn DocumentSurface,
        node: &AttributeNode,
        visible: bool,
    ) -> usize {
        if let Some(entry) = self.nodes.get_mut(&node.id) {
            for (_, handle) in std::mem::take(&mut entry.error_icons) {
                surface.remove_overlay(handle);
            }
        }
        if node.is_valid() || node.is_indirect_hint() {
            return 0;
        }

        let size = Size::new(self.error_icon_size, self.error_icon_size);
        let message = node.validation_message.clone().unwrap_or_default();
        let mut created = BTreeMap::new();
        for page in node.pages() {
            let zones = node.zones_on_page(page);
            let Some(anchor) = anchor_point(&zones, AnchorAlignment::Right, OffsetDirection::Right)
            else {
                continue;
            };
            // Vertically centred on the anchor.
            let origin = anchor
                .point
                .offset_rotated(0.0, -size.height / 2.0, anchor.rotation);
            let handle = surface.add_overlay(OverlayPrimitive {
                kind: OverlayKind::ErrorIcon,
                page,
                shape: OverlayShape::Anchored {
                    anchor: origin,
                    rotation: anchor.rotation,
                    size,
                    text: message.clone(),
                },
                visible,
            });
            created.insert(page, handle);
        }

        let count = created.len();
        if count > 0 {
            let entry = self.nodes.entry(node.id).or_default();
            entry.error_icons = created;
            entry.icons_visible = visible;
        }
        count
    }

    pub fn set_error_icons_visible(
        &mut self,
        surface: &mut dyn DocumentSurface,
        id: &AttributeId,
        visible: bool,
    ) {
        if let Some(entry) = self.nodes.get_mut(id) {
            for handle in entry.error_icons.values() {
                surface.set_overlay_visible(*handle, visible);
            }
            entry.icons_visible = visible;
        }
    }

    /// Hides everything drawn for `id` without destroying it. Tooltips are transient
    /// and are removed.
    pub fn hide(&mut self, surface: &mut dyn DocumentSurface, id: &AttributeId) {
        self.remove_tooltip(surface, id);
        if let Some(entry) = self.nodes.get_mut(id) {
            for handle in entry.highlights.values().chain(entry.error_icons.values()) {
                surface.set_overlay_visible(*handle, false);
            }
            entry.icons_visible = false;
        }
        self.displayed.remove(id);
    }

    /// Destroys every overlay of `id` on every page.
    pub fn remove(&mut self, surface: &mut dyn DocumentSurface, id: &AttributeId) {
        if let Some(entry) = self.nodes.remove(id) {
            let handles = entry
                .highlights
                .into_values()
                .chain(entry.tooltips.into_values())
                .chain(entry.error_icons.into_values());
            for handle in handles {
                surface.remove_overlay(handle);
            }
            trace!(attribute = %id, "removed overlays");
        }
        self.displayed.remove(id);
    }

    /// Creates highlights and error icons for the whole tree at their default visibility.
    pub fn refresh_all(&mut self, surface: &mut dyn DocumentSurface, tree: &AttributeTree) {
        for id in tree.walk() {
            let Some(node) = tree.get(&id) else {
                continue;
            };
            if !self.is_viewable(node) {
                continue;
            }
            let visible = self.default_visibility(node);
            self.set_highlight(surface, node, visible);
            self.set_error_icon(surface, node, visible);
        }
        self.raise_decorations(surface);
    }

    /// Re-applies the paint order: error icons above highlights, tooltips above all.
    pub fn raise_decorations(&self, surface: &mut dyn DocumentSurface) {
        let mut ids: Vec<&AttributeId> = self.nodes.keys().collect();
        ids.sort();
        for id in &ids {
            let entry = &self.nodes[*id];
            if entry.icons_visible {
                for handle in entry.error_icons.values() {
                    surface.raise_overlay(*handle);
                }
            }
        }
        for id in &ids {
            for handle in self.nodes[*id].tooltips.values() {
                surface.raise_overlay(*handle);
            }
        }
    }

    /// Drops every overlay, e.g. when the document is closed.
    pub fn clear(&mut self, surface: &mut dyn DocumentSurface) {
        let ids: Vec<AttributeId> = self.nodes.keys().copied().collect();
        for id in ids {
            self.remove(surface, &id);
        }
        self.displayed.clear();
    }
}

/// Top-left corner and rotation of a tooltip box of `size` for `zones` on `page`.
///
/// The box goes above the zones, or below them when it would leave the top of the
/// page, and is then pushed left until it fits the page width.
fn place_tooltip(
    surface: &dyn DocumentSurface,
    page: u32,
    zones: &[crate::geometry::RasterZone],
    size: Size,
) -> Option<(Point, f64)> {
    let above = anchor_point(zones, AnchorAlignment::LeftTop, OffsetDirection::Up)?;
    let mut rotation = above.rotation;
    let mut origin = above.point.offset_rotated(0.0, -size.height, rotation);
    let page_size = surface.page_size(page);

    let box_at = |origin: Point, rotation: f64| {
        Rect::new(0.0, 0.0, size.width, size.height).rotated_about(origin, rotation)
    };

    if box_at(origin, rotation).top < 0.0 {
        let below = anchor_point(zones, AnchorAlignment::LeftBottom, OffsetDirection::Down)?;
        rotation = below.rotation;
        origin = below.point;
    }

    if let Some(page_size) = page_size {
        let bounds = box_at(origin, rotation);
        if bounds.width() > page_size.width {
            origin = origin.offset(-bounds.left, 0.0);
        } else if bounds.right > page_size.width {
            origin = origin.offset(page_size.width - bounds.right, 0.0);
        }
    }

    Some((origin, rotation))
}
