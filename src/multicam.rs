//! The aggregator: owns the slots, runs the per-frame pass, and holds the
//! composite surface
//!
//! Each `update()` updates every slot, runs auto-layout, recomputes the
//! bounding box over the enabled open slots, reallocates the composite
//! surface only when that box changed, and renders every enabled slot into
//! it in slot order.

use std::time::Instant;

use crate::layout::{self, Rect};
use crate::settings::{MultiCamSettings, SlotSettings};
use crate::slot::CameraSlot;
use crate::surface::PixelSurface;

/// Multi-camera aggregator
pub struct MultiCam {
    /// Aggregator configuration; host-bindable and serde-persistable
    pub settings: MultiCamSettings,
    /// The managed slots, in composite draw order
    pub slots: Vec<CameraSlot>,
    width: u32,
    height: u32,
    surface: PixelSurface,
    /// CPU readback copy, refreshed when `read_to_pixels` is set
    pixels: Vec<u8>,
    realloc_count: u64,
}

impl Default for MultiCam {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiCam {
    pub fn new() -> Self {
        Self {
            settings: MultiCamSettings::default(),
            slots: Vec::new(),
            width: 0,
            height: 0,
            surface: PixelSurface::new(),
            pixels: Vec::new(),
            realloc_count: 0,
        }
    }

    /// Build an aggregator with one slot per entry in `settings.slots`
    pub fn from_settings(settings: MultiCamSettings) -> Self {
        let slots = settings
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| CameraSlot::from_settings(i as u32, s))
            .collect();
        Self {
            settings,
            slots,
            ..Self::new()
        }
    }

    /// Resize the slot list to `count` slots with sequential ids. Does not
    /// open any device.
    pub fn configure(&mut self, count: usize) {
        log::info!("configuring {} slots", count);
        self.settings.slots.resize_with(count, SlotSettings::default);
        if self.slots.len() > count {
            self.slots.truncate(count);
        } else {
            for i in self.slots.len()..count {
                self.slots
                    .push(CameraSlot::from_settings(i as u32, &self.settings.slots[i]));
            }
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.id = i as u32;
        }
    }

    /// Close and (re)open every slot
    pub fn open_all(&mut self) {
        log::info!("opening all cameras");
        self.close_all();
        for slot in &mut self.slots {
            // Failures are logged by the slot and retried on update
            let _ = slot.open();
        }
    }

    /// Close every slot
    pub fn close_all(&mut self) {
        log::info!("closing all cameras");
        for slot in &mut self.slots {
            slot.close();
        }
    }

    /// Toggle horizontal flip on slot 0 and match every other slot to it
    pub fn flip_all_h(&mut self) {
        if let Some(first) = self.slots.first() {
            let flipped = !first.ctrl.hflip;
            for slot in &mut self.slots {
                slot.ctrl.hflip = flipped;
            }
        }
    }

    /// Toggle vertical flip on slot 0 and match every other slot to it
    pub fn flip_all_v(&mut self) {
        if let Some(first) = self.slots.first() {
            let flipped = !first.ctrl.vflip;
            for slot in &mut self.slots {
                slot.ctrl.vflip = flipped;
            }
        }
    }

    /// Run the auto-layout policy over the slots
    pub fn auto_layout(&mut self) {
        layout::auto_layout(&self.settings.auto_layout, &mut self.slots);
    }

    /// Recompute the composite dimensions from the slot bounding box
    pub fn update_bounding_box(&mut self) {
        let bb = layout::bounding_box(&self.slots);
        self.width = bb.width.round() as u32;
        self.height = bb.height.round() as u32;
    }

    /// Per-frame pass. No-op while disabled.
    pub fn update(&mut self, now: Instant) {
        if !self.settings.enabled {
            return;
        }

        for slot in &mut self.slots {
            slot.update(now);
        }

        self.auto_layout();
        self.update_bounding_box();

        // Nothing enabled and open: go dark instead of presenting the last
        // composite forever (the stretched draw path would otherwise keep
        // showing it)
        if self.width == 0 || self.height == 0 {
            self.surface.clear();
            if self.settings.read_to_pixels {
                self.surface.read_to_pixels(&mut self.pixels);
            }
            return;
        }

        if !self.surface.is_allocated()
            || self.surface.width() != self.width
            || self.surface.height() != self.height
        {
            log::warn!(
                "composite surface is {}x{}, allocating {}x{}",
                self.surface.width(),
                self.surface.height(),
                self.width,
                self.height
            );
            if let Err(e) = self.surface.allocate(self.width, self.height) {
                log::error!("could not allocate composite surface: {}", e);
                return;
            }
            self.realloc_count += 1;
        }

        self.surface.clear();
        for slot in &self.slots {
            slot.composite_into(&mut self.surface);
        }

        if self.settings.read_to_pixels {
            self.surface.read_to_pixels(&mut self.pixels);
        }
    }

    /// Blend the composite into `dest` at the given rectangle with
    /// `draw_alpha` opacity. Unless stretched drawing is on (and w/h are
    /// given), the composite's natural size is used.
    pub fn draw_into(&self, dest: &mut PixelSurface, x: f32, y: f32, w: f32, h: f32) {
        if !self.settings.enabled {
            return;
        }
        if !(self.settings.do_draw || self.settings.do_draw_stretched) {
            return;
        }
        if !self.surface.is_allocated() {
            return;
        }

        let mut w = w;
        let mut h = h;
        if w < 1.0 || !self.settings.do_draw_stretched {
            w = self.width as f32;
        }
        if h < 1.0 || !self.settings.do_draw_stretched {
            h = self.height as f32;
        }
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        dest.blit_surface(&self.surface, Rect::new(x, y, w, h), self.settings.draw_alpha);
    }

    /// Composite width (most recent bounding box)
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Composite height (most recent bounding box)
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The composite surface
    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    /// The CPU readback buffer; empty unless `read_to_pixels` is set
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub(crate) fn realloc_count(&self) -> u64 {
        self.realloc_count
    }
}
