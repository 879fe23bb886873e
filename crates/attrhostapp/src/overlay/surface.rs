use super::tiers::Color;
use crate::geometry::{Point, RasterZone, Rect, Size};

/// Opaque id the surface hands out for an overlay it is drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Highlight,
    Tooltip,
    ErrorIcon,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    /// Filled (and optionally outlined) zones.
    Zones {
        zones: Vec<RasterZone>,
        fill: Color,
        outline: Option<Color>,
    },
    /// A box attached at `anchor`, rotated about it.
    Anchored {
        anchor: Point,
        rotation: f64,
        size: Size,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPrimitive {
    pub kind: OverlayKind,
    pub page: u32,
    pub shape: OverlayShape,
    pub visible: bool,
}

/// The document image view overlays are drawn on.
///
/// New overlays go on top of the paint order; `raise_overlay` moves an existing one
/// back to the top.
pub trait DocumentSurface {
    fn add_overlay(&mut self, overlay: OverlayPrimitive) -> OverlayHandle;

    fn remove_overlay(&mut self, handle: OverlayHandle);

    fn set_overlay_visible(&mut self, handle: OverlayHandle, visible: bool);

    fn raise_overlay(&mut self, handle: OverlayHandle);

    fn page_count(&self) -> u32;

    /// Size of `page` (1-based) in image pixels.
    fn page_size(&self, page: u32) -> Option<Size>;

    fn dpi(&self) -> f64;

    /// Currently visible page and region.
    fn viewport(&self) -> (u32, Rect);

    /// Scroll so `region` on `page` is in view.
    fn make_visible(&mut self, page: u32, region: Rect);

    /// Repaint after a batch of overlay changes.
    fn redraw(&mut self) {}
}

/// In-memory surface for tests and headless sessions.
///
/// Records every overlay in paint order and every scroll request.
#[derive(Debug, Clone)]
pub struct MemSurface {
    pages: Vec<Size>,
    dpi: f64,
    next_handle: u64,
    overlays: Vec<(OverlayHandle, OverlayPrimitive)>,
    scroll_requests: Vec<(u32, Rect)>,
    redraws: usize,
}

impl Default for MemSurface {
    fn default() -> Self {
        // One US-letter page at 300 dpi.
        Self::new(vec![Size::new(2550.0, 3300.0)], 300.0)
    }
}

impl MemSurface {
    pub fn new(pages: Vec<Size>, dpi: f64) -> Self {
        Self {
            pages,
            dpi,
            next_handle: 1,
            overlays: Vec::new(),
            scroll_requests: Vec::new(),
            redraws: 0,
        }
    }

    pub fn with_pages(count: u32, size: Size) -> Self {
        Self::new(vec![size; count as usize], 300.0)
    }

    pub fn overlays(&self) -> impl Iterator<Item = (OverlayHandle, &OverlayPrimitive)> {
        self.overlays.iter().map(|(h, o)| (*h, o))
    }

    pub fn overlays_of(&self, kind: OverlayKind) -> Vec<(OverlayHandle, &OverlayPrimitive)> {
        self.overlays().filter(|(_, o)| o.kind == kind).collect()
    }

    pub fn get(&self, handle: OverlayHandle) -> Option<&OverlayPrimitive> {
        self.overlays
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, o)| o)
    }

    /// Handles bottom-to-top.
    pub fn paint_order(&self) -> Vec<OverlayHandle> {
        self.overlays.iter().map(|(h, _)| *h).collect()
    }

    pub fn scroll_requests(&self) -> &[(u32, Rect)] {
        &self.scroll_requests
    }

    pub fn redraw_count(&self) -> usize {
        self.redraws
    }
}

impl DocumentSurface for MemSurface {
    fn add_overlay(&mut self, overlay: OverlayPrimitive) -> OverlayHandle {
        let handle = OverlayHandle(self.next_handle);
        self.next_handle += 1;
        self.overlays.push((handle, overlay));
        handle
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        self.overlays.retain(|(h, _)| *h != handle);
    }

    fn set_overlay_visible(&mut self, handle: OverlayHandle, visible: bool) {
        if let Some((_, o)) = self.overlays.iter_mut().find(|(h, _)| *h == handle) {
            o.visible = visible;
        }
    }

    fn raise_overlay(&mut self, handle: OverlayHandle) {
        if let Some(pos) = self.overlays.iter().position(|(h, _)| *h == handle) {
            let entry = self.overlays.remove(pos);
            self.overlays.push(entry);
        }
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Option<Size> {
        let index = page.checked_sub(1)? as usize;
        self.pages.get(index).copied()
    }

    fn dpi(&self) -> f64 {
        self.dpi
    }

    fn viewport(&self) -> (u32, Rect) {
        let size = self.page_size(1).unwrap_or_default();
        (1, Rect::new(0.0, 0.0, size.width, size.height))
    }

    fn make_visible(&mut self, page: u32, region: Rect) {
        self.scroll_requests.push((page, region));
    }

    fn redraw(&mut self) {
        self.redraws += 1;
    }
}
