//! CPU pixel surface used as the composite target
//!
//! An RGBA8 buffer the aggregator renders slots into each update. Blits are
//! nearest-neighbor; the composite pass overwrites (no blending) while the
//! presentation blit blends with a caller-supplied opacity.

use crate::error::MultiCamError;
use crate::frame::VideoFrame;
use crate::layout::Rect;

/// An owned RGBA8 pixel buffer
#[derive(Debug, Clone, Default)]
pub struct PixelSurface {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelSurface {
    /// Create an unallocated surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface already allocated at the given size
    pub fn allocated(width: u32, height: u32) -> Result<Self, MultiCamError> {
        let mut surface = Self::new();
        surface.allocate(width, height)?;
        Ok(surface)
    }

    /// (Re)allocate the buffer. Contents are zeroed.
    pub fn allocate(&mut self, width: u32, height: u32) -> Result<(), MultiCamError> {
        let size = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(4))
            .filter(|&s| s > 0)
            .ok_or(MultiCamError::AllocationFailed { width, height })?;
        self.data.clear();
        self.data.resize(size, 0);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Whether the buffer holds pixels
    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero all pixels
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Raw RGBA pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Copy the buffer into `out`, resizing it as needed
    pub fn read_to_pixels(&self, out: &mut Vec<u8>) {
        out.resize(self.data.len(), 0);
        out.copy_from_slice(&self.data);
    }

    /// Pixel at (x, y), for inspection
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Draw a frame into the destination rectangle, nearest-neighbor scaled,
    /// optionally mirrored. Source pixels overwrite the destination.
    pub fn blit_scaled(&mut self, frame: &VideoFrame, dest: Rect, hflip: bool, vflip: bool) {
        if !self.is_allocated() || !frame.is_valid() || frame.width == 0 || frame.height == 0 {
            return;
        }

        let dx = dest.x.round() as i64;
        let dy = dest.y.round() as i64;
        let dw = dest.width.round() as i64;
        let dh = dest.height.round() as i64;
        if dw < 1 || dh < 1 {
            return;
        }

        // Clip to the surface
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + dw).min(self.width as i64);
        let y1 = (dy + dh).min(self.height as i64);

        let x_ratio = frame.width as f32 / dw as f32;
        let y_ratio = frame.height as f32 / dh as f32;

        for out_y in y0..y1 {
            let mut src_y = (((out_y - dy) as f32) * y_ratio) as u32;
            src_y = src_y.min(frame.height - 1);
            if vflip {
                src_y = frame.height - 1 - src_y;
            }
            for out_x in x0..x1 {
                let mut src_x = (((out_x - dx) as f32) * x_ratio) as u32;
                src_x = src_x.min(frame.width - 1);
                if hflip {
                    src_x = frame.width - 1 - src_x;
                }

                // Index in usize: u32 math overflows on surfaces past ~32k a side
                let src_idx = (src_y as usize * frame.width as usize + src_x as usize) * 4;
                let dst_idx = (out_y as usize * self.width as usize + out_x as usize) * 4;
                self.data[dst_idx..dst_idx + 4].copy_from_slice(&frame.data[src_idx..src_idx + 4]);
            }
        }
    }

    /// Blend another surface into the destination rectangle with the given
    /// opacity (0.0-1.0), nearest-neighbor scaled.
    pub fn blit_surface(&mut self, src: &PixelSurface, dest: Rect, alpha: f32) {
        if !self.is_allocated() || !src.is_allocated() {
            return;
        }

        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }

        let dx = dest.x.round() as i64;
        let dy = dest.y.round() as i64;
        let dw = dest.width.round() as i64;
        let dh = dest.height.round() as i64;
        if dw < 1 || dh < 1 {
            return;
        }

        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + dw).min(self.width as i64);
        let y1 = (dy + dh).min(self.height as i64);

        let x_ratio = src.width as f32 / dw as f32;
        let y_ratio = src.height as f32 / dh as f32;

        for out_y in y0..y1 {
            let src_y = ((((out_y - dy) as f32) * y_ratio) as u32).min(src.height - 1);
            for out_x in x0..x1 {
                let src_x = ((((out_x - dx) as f32) * x_ratio) as u32).min(src.width - 1);

                let si = (src_y as usize * src.width as usize + src_x as usize) * 4;
                let di = (out_y as usize * self.width as usize + out_x as usize) * 4;
                for c in 0..4 {
                    let s = src.data[si + c] as f32;
                    let d = self.data[di + c] as f32;
                    self.data[di + c] = (d + (s - d) * alpha).round() as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> VideoFrame {
        let mut data = Vec::with_capacity(VideoFrame::expected_size(width, height));
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgba);
        }
        VideoFrame::new(data, width, height, 0)
    }

    #[test]
    fn test_allocate_zero_fails() {
        let mut surface = PixelSurface::new();
        assert!(surface.allocate(0, 100).is_err());
        assert!(surface.allocate(100, 0).is_err());
        assert!(!surface.is_allocated());
    }

    #[test]
    fn test_allocate_and_clear() {
        let mut surface = PixelSurface::allocated(8, 8).unwrap();
        assert!(surface.is_allocated());
        assert_eq!(surface.pixels().len(), 8 * 8 * 4);
        surface.clear();
        assert!(surface.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_blit_fills_dest_rect() {
        let mut surface = PixelSurface::allocated(10, 10).unwrap();
        let frame = solid_frame(2, 2, [200, 100, 50, 255]);
        surface.blit_scaled(&frame, Rect::new(2.0, 2.0, 4.0, 4.0), false, false);

        assert_eq!(surface.pixel(2, 2), Some([200, 100, 50, 255]));
        assert_eq!(surface.pixel(5, 5), Some([200, 100, 50, 255]));
        // Outside the dest rect stays untouched
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(6, 6), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_blit_clips_to_surface() {
        let mut surface = PixelSurface::allocated(4, 4).unwrap();
        let frame = solid_frame(2, 2, [255, 255, 255, 255]);
        // Partially off every edge; must not panic
        surface.blit_scaled(&frame, Rect::new(-2.0, -2.0, 10.0, 10.0), false, false);
        assert_eq!(surface.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(surface.pixel(3, 3), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_wide_surface_indexing() {
        // Large coordinates must index in usize, not wrap in u32
        let mut surface = PixelSurface::allocated(70_000, 2).unwrap();
        let frame = solid_frame(2, 2, [9, 9, 9, 255]);
        surface.blit_scaled(&frame, Rect::new(69_998.0, 0.0, 2.0, 2.0), false, false);
        assert_eq!(surface.pixel(69_999, 1), Some([9, 9, 9, 255]));
        assert_eq!(surface.pixel(69_997, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_blit_hflip_mirrors() {
        let mut surface = PixelSurface::allocated(2, 1).unwrap();
        // Left pixel red, right pixel blue
        let mut data = Vec::new();
        data.extend_from_slice(&[255, 0, 0, 255]);
        data.extend_from_slice(&[0, 0, 255, 255]);
        let frame = VideoFrame::new(data, 2, 1, 0);

        surface.blit_scaled(&frame, Rect::new(0.0, 0.0, 2.0, 1.0), true, false);
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(1, 0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_blit_vflip_mirrors() {
        let mut surface = PixelSurface::allocated(1, 2).unwrap();
        let mut data = Vec::new();
        data.extend_from_slice(&[255, 0, 0, 255]); // top
        data.extend_from_slice(&[0, 255, 0, 255]); // bottom
        let frame = VideoFrame::new(data, 1, 2, 0);

        surface.blit_scaled(&frame, Rect::new(0.0, 0.0, 1.0, 2.0), false, true);
        assert_eq!(surface.pixel(0, 0), Some([0, 255, 0, 255]));
        assert_eq!(surface.pixel(0, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_blit_surface_alpha() {
        let mut dest = PixelSurface::allocated(2, 2).unwrap();
        let mut src = PixelSurface::allocated(2, 2).unwrap();
        let frame = solid_frame(2, 2, [200, 200, 200, 200]);
        src.blit_scaled(&frame, Rect::new(0.0, 0.0, 2.0, 2.0), false, false);

        dest.blit_surface(&src, Rect::new(0.0, 0.0, 2.0, 2.0), 0.5);
        assert_eq!(dest.pixel(0, 0), Some([100, 100, 100, 100]));

        // Zero alpha leaves the destination alone
        let mut untouched = PixelSurface::allocated(2, 2).unwrap();
        untouched.blit_surface(&src, Rect::new(0.0, 0.0, 2.0, 2.0), 0.0);
        assert_eq!(untouched.pixel(0, 0), Some([0, 0, 0, 0]));
    }
}
