//! Multicam - multi-camera aggregation and compositing
//!
//! Opens N camera devices, lets the host position, scale, and flip each feed,
//! composites the enabled feeds into one offscreen RGBA surface, and exposes
//! that composite for drawing and CPU readback. The host drives the library
//! one `update()` call per frame; GUI binding and settings persistence stay
//! host-side.

pub mod error;
pub mod frame;
pub mod grabber;
pub mod layout;
pub mod multicam;
pub mod settings;
pub mod slot;
pub mod surface;

pub use error::MultiCamError;
pub use frame::VideoFrame;
pub use grabber::{DeviceInfo, DeviceKind, Grabber};
pub use layout::Rect;
pub use multicam::MultiCam;
pub use settings::{AutoLayoutSettings, MultiCamSettings, SlotControl, SlotInit, SlotSettings};
pub use slot::{CameraSlot, RetryPolicy, SlotInfo};
pub use surface::PixelSurface;
