//! Error types for camera and compositing failures
//!
//! All failures inside the per-frame update path are non-fatal: they are
//! logged and the affected slot simply contributes nothing to the composite.
//! This enum is the surface for callers who open devices or allocate
//! surfaces directly.

use thiserror::Error;

/// Errors surfaced by slot and aggregator operations
#[derive(Debug, Error)]
pub enum MultiCamError {
    /// The requested device could not be opened
    #[error("device {device_id} unavailable: {reason}")]
    DeviceUnavailable { device_id: u32, reason: String },

    /// The composite surface could not be allocated at the requested size
    #[error("could not allocate {width}x{height} surface")]
    AllocationFailed { width: u32, height: u32 },

    /// The operation targeted a disabled slot or aggregator
    #[error("slot or aggregator is disabled")]
    Disabled,
}
