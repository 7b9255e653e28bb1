//! Synthetic test-pattern grabber
//!
//! Generates a moving RGB gradient at the requested geometry and frame rate.
//! Useful for running the aggregator without camera hardware and for tests.
//! A requested fps of 0 emits a fresh frame on every `poll()`.

use std::time::{Duration, Instant};

use crate::error::MultiCamError;
use crate::frame::VideoFrame;

use super::{DeviceInfo, Grabber};

/// The test-pattern backend exposes one synthetic device
pub fn list_devices() -> Vec<DeviceInfo> {
    vec![DeviceInfo {
        index: 0,
        name: "Test Pattern".to_string(),
    }]
}

/// Synthetic moving-gradient source behind the [`Grabber`] interface
pub struct TestPatternGrabber {
    open: bool,
    width: u32,
    height: u32,
    fps: u32,
    frame_number: u64,
    last_emit: Option<Instant>,
    current: Option<VideoFrame>,
    frame_new: bool,
}

impl TestPatternGrabber {
    /// Create a closed grabber; call `open()` to start generating
    pub fn new() -> Self {
        Self {
            open: false,
            width: 0,
            height: 0,
            fps: 0,
            frame_number: 0,
            last_emit: None,
            current: None,
            frame_new: false,
        }
    }

    fn render(&self) -> Vec<u8> {
        let mut data = vec![0u8; VideoFrame::expected_size(self.width, self.height)];
        let t = self.frame_number;
        for y in 0..self.height {
            for x in 0..self.width {
                let i = (y as usize * self.width as usize + x as usize) * 4;
                data[i] = (x as u64).wrapping_add(t) as u8;
                data[i + 1] = (y as u64).wrapping_add(t / 2) as u8;
                data[i + 2] = t as u8;
                data[i + 3] = 255;
            }
        }
        data
    }
}

impl Default for TestPatternGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl Grabber for TestPatternGrabber {
    fn open(
        &mut self,
        _device_id: u32,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<(), MultiCamError> {
        self.close();
        self.width = width.max(1);
        self.height = height.max(1);
        self.fps = fps;
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.frame_number = 0;
        self.last_emit = None;
        self.current = None;
        self.frame_new = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn poll(&mut self) {
        self.frame_new = false;
        if !self.open {
            return;
        }

        let now = Instant::now();
        if self.fps > 0 {
            let interval = Duration::from_secs_f64(1.0 / self.fps as f64);
            if let Some(last) = self.last_emit {
                if now.duration_since(last) < interval {
                    return;
                }
            }
        }

        let data = self.render();
        self.current = Some(VideoFrame::new(
            data,
            self.width,
            self.height,
            self.frame_number,
        ));
        self.frame_number += 1;
        self.last_emit = Some(now);
        self.frame_new = true;
    }

    fn is_frame_new(&self) -> bool {
        self.frame_new
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn latest_frame(&self) -> Option<&VideoFrame> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_poll() {
        let mut g = TestPatternGrabber::new();
        g.open(0, 64, 48, 0).unwrap();
        assert!(g.is_open());
        assert_eq!(g.width(), 64);
        assert_eq!(g.height(), 48);

        g.poll();
        assert!(g.is_frame_new());
        let frame = g.latest_frame().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.frame_number, 0);

        // fps 0 emits on every poll
        g.poll();
        assert!(g.is_frame_new());
        assert_eq!(g.latest_frame().unwrap().frame_number, 1);
    }

    #[test]
    fn test_close_resets() {
        let mut g = TestPatternGrabber::new();
        g.open(0, 32, 32, 0).unwrap();
        g.poll();
        g.close();
        assert!(!g.is_open());
        assert!(g.latest_frame().is_none());

        // closing twice is fine
        g.close();
    }

    #[test]
    fn test_pattern_is_opaque() {
        let mut g = TestPatternGrabber::new();
        g.open(0, 16, 16, 0).unwrap();
        g.poll();
        let frame = g.latest_frame().unwrap();
        assert!(frame.data.chunks(4).all(|px| px[3] == 255));
    }
}
