//! Captured video frame representation
//!
//! Contains the raw RGBA pixel data and metadata for one captured frame.

use std::time::Instant;

/// A captured camera frame with RGBA pixel data
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGBA pixel data (4 bytes/pixel)
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame number (monotonically increasing per device)
    pub frame_number: u64,
    /// Capture timestamp
    pub timestamp: Instant,
}

impl VideoFrame {
    /// Create a new RGBA frame
    pub fn new(data: Vec<u8>, width: u32, height: u32, frame_number: u64) -> Self {
        Self {
            data,
            width,
            height,
            frame_number,
            timestamp: Instant::now(),
        }
    }

    /// Get the expected data size for the given dimensions (width * height * 4)
    pub fn expected_size(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 4
    }

    /// Get the stride (bytes per row)
    pub fn stride(&self) -> usize {
        (self.width as usize) * 4
    }

    /// Check if the frame data has the correct size
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::expected_size(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let width = 1280;
        let height = 720;
        let data = vec![0u8; VideoFrame::expected_size(width, height)];
        let frame = VideoFrame::new(data, width, height, 0);

        assert_eq!(frame.width, 1280);
        assert_eq!(frame.height, 720);
        assert!(frame.is_valid());
        assert_eq!(frame.stride(), 1280 * 4);
    }

    #[test]
    fn test_expected_size() {
        assert_eq!(VideoFrame::expected_size(1920, 1080), 1920 * 1080 * 4);
        assert_eq!(VideoFrame::expected_size(640, 480), 640 * 480 * 4);
    }

    #[test]
    fn test_invalid_size() {
        let frame = VideoFrame::new(vec![0u8; 16], 100, 100, 0);
        assert!(!frame.is_valid());
    }
}
