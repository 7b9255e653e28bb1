//! Camera grabber backends
//!
//! A [`Grabber`] wraps one camera device behind a poll-per-frame interface.
//! The concrete backend is chosen at construction time via [`DeviceKind`];
//! machine-vision drivers plug in as further implementations of the same
//! trait.

use serde::{Deserialize, Serialize};

use crate::error::MultiCamError;
use crate::frame::VideoFrame;

pub mod test_pattern;
pub mod webcam;

pub use test_pattern::TestPatternGrabber;
pub use webcam::WebcamGrabber;

/// Information about an available camera device
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    /// Device index (backend enumeration order)
    pub index: u32,
    /// Human-readable device name
    pub name: String,
}

/// Backend used to acquire frames for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceKind {
    /// System webcam via nokhwa
    #[default]
    Webcam,
    /// Synthetic moving-gradient generator (no hardware required)
    TestPattern,
}

impl DeviceKind {
    /// Construct a closed grabber of this kind
    pub fn create(self) -> Box<dyn Grabber> {
        match self {
            DeviceKind::Webcam => Box::new(WebcamGrabber::new()),
            DeviceKind::TestPattern => Box::new(TestPatternGrabber::new()),
        }
    }

    /// List devices available to this backend
    pub fn list_devices(self) -> Vec<DeviceInfo> {
        match self {
            DeviceKind::Webcam => webcam::list_devices(),
            DeviceKind::TestPattern => test_pattern::list_devices(),
        }
    }
}

/// Capability interface over one camera device.
///
/// The host drives a grabber one `poll()` per frame; `is_frame_new()` reports
/// whether that poll promoted a frame not seen before.
pub trait Grabber: Send {
    /// Acquire the device with the requested geometry and frame rate.
    /// Closes any previously held device first.
    fn open(
        &mut self,
        device_id: u32,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<(), MultiCamError>;

    /// Release the device. Idempotent.
    fn close(&mut self);

    /// Whether a device is currently held
    fn is_open(&self) -> bool;

    /// Pull the next frame if one is ready
    fn poll(&mut self);

    /// Whether the last `poll()` produced a frame not seen before
    fn is_frame_new(&self) -> bool;

    /// Live frame width, or the size reported at open if no frame yet
    fn width(&self) -> u32;

    /// Live frame height, or the size reported at open if no frame yet
    fn height(&self) -> u32;

    /// The most recent frame, if any has arrived since open
    fn latest_frame(&self) -> Option<&VideoFrame>;
}
