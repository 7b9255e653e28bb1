//! Auto-layout and bounding-box math
//!
//! The per-frame layout pass: position and scale enabled slots to fit a
//! target canvas, then compute the union rectangle the composite surface
//! must cover.

use crate::settings::AutoLayoutSettings;
use crate::slot::CameraSlot;

/// An axis-aligned rectangle in composite pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle with no area contributes nothing to a union
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Grow this rectangle to include the corners of `other`. Degenerate
    /// rectangles contribute their corner points, so a zero-size rect at the
    /// origin keeps the origin inside the union.
    pub fn grow_to_include(&mut self, other: Rect) {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        self.x = x0;
        self.y = y0;
        self.width = x1 - x0;
        self.height = y1 - y0;
    }
}

/// Position and scale enabled slots to fit the target canvas.
///
/// When tiling horizontally the target width is split evenly between the
/// enabled slots and a cursor advances past each placed slot. When tiling is
/// off the cursor stays put and every enabled slot lands at the same
/// position, overlapping. That overlap is intentional legacy behavior, kept
/// as-is rather than guessed at.
pub fn auto_layout(settings: &AutoLayoutSettings, slots: &mut [CameraSlot]) {
    if !settings.enabled {
        return;
    }

    let active = slots.iter().filter(|s| s.ctrl.enabled).count();
    if active == 0 {
        return;
    }

    let mut cell_w = settings.width as f32;
    let cell_h = settings.height as f32;
    if settings.tile_horizontal {
        cell_w /= active as f32;
    }

    let mut cursor_x = 0.0f32;
    for slot in slots.iter_mut().filter(|s| s.ctrl.enabled) {
        let native_w = slot.width() as f32;
        let native_h = slot.height() as f32;
        slot.ctrl.scale = (cell_w / native_w, cell_h / native_h);
        slot.ctrl.pos = (cursor_x, 0.0);
        if settings.tile_horizontal {
            cursor_x += slot.ctrl.scale.0 * native_w;
        }
    }
}

/// Union rectangle over the placed, scaled extents of every slot that is
/// enabled and holds a live device handle.
///
/// The union is seeded with a zero-size rectangle at the origin, so the
/// result always spans from (0,0) to the farthest placed corner. The
/// composite surface is sized from this box and slots blit at absolute
/// positions, so a slot placed away from the origin still lands inside it.
pub fn bounding_box(slots: &[CameraSlot]) -> Rect {
    let mut bb = Rect::default();
    for slot in slots {
        if slot.ctrl.enabled && slot.is_open() {
            bb.grow_to_include(Rect::new(
                slot.ctrl.pos.0,
                slot.ctrl.pos.1,
                slot.width() as f32 * slot.ctrl.scale.0,
                slot.height() as f32 * slot.ctrl.scale.1,
            ));
        }
    }
    bb
}
