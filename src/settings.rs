//! Settings for the aggregator and its slots
//!
//! Plain serde-derivable structs so a host application can bind them to a GUI
//! and persist them in whatever settings format it uses (XML, JSON, ...).
//! The crate itself performs no settings file I/O.

use serde::{Deserialize, Serialize};

use crate::grabber::DeviceKind;

fn default_init_width() -> u32 {
    1280
}

fn default_init_height() -> u32 {
    720
}

fn default_init_fps() -> u32 {
    30
}

fn default_layout_width() -> u32 {
    1920
}

fn default_layout_height() -> u32 {
    1080
}

fn default_draw_alpha() -> f32 {
    1.0
}

fn default_unit_scale() -> (f32, f32) {
    (1.0, 1.0)
}

/// Device acquisition parameters for one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotInit {
    /// Device id to open (backend enumeration order)
    #[serde(rename = "deviceId")]
    pub device_id: u32,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Requested capture frame rate. 0 = uncapped (backend default)
    pub fps: u32,
    /// Backend used to acquire frames
    pub kind: DeviceKind,
}

impl Default for SlotInit {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: default_init_width(),
            height: default_init_height(),
            fps: default_init_fps(),
            kind: DeviceKind::default(),
        }
    }
}

/// Per-slot placement and display controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotControl {
    /// Whether the slot captures and contributes to the composite
    pub enabled: bool,
    /// Mirror the feed horizontally
    pub hflip: bool,
    /// Mirror the feed vertically
    pub vflip: bool,
    /// Position in composite pixels (top-left origin)
    pub pos: (f32, f32),
    /// Scale factors applied to the native frame size
    pub scale: (f32, f32),
}

impl Default for SlotControl {
    fn default() -> Self {
        Self {
            enabled: true,
            hflip: false,
            vflip: false,
            pos: (0.0, 0.0),
            scale: default_unit_scale(),
        }
    }
}

/// Combined configuration for one slot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotSettings {
    pub init: SlotInit,
    pub ctrl: SlotControl,
}

/// Auto-layout policy: position and scale enabled slots to fit a target canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoLayoutSettings {
    /// Whether auto-layout runs each update (overwrites slot pos/scale)
    pub enabled: bool,
    /// Target canvas width
    pub width: u32,
    /// Target canvas height
    pub height: u32,
    /// Tile slots left-to-right; when false all slots land at the same
    /// position and overlap
    #[serde(rename = "tileHorizontal")]
    pub tile_horizontal: bool,
}

impl Default for AutoLayoutSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            width: default_layout_width(),
            height: default_layout_height(),
            tile_horizontal: true,
        }
    }
}

/// Top-level aggregator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiCamSettings {
    /// Master enable; when false `update()` and `draw_into()` do nothing
    pub enabled: bool,
    /// Copy the composite to a CPU-readable pixel buffer every update
    #[serde(rename = "readToPixels")]
    pub read_to_pixels: bool,
    /// Draw the composite at its natural size
    #[serde(rename = "doDraw")]
    pub do_draw: bool,
    /// Draw the composite stretched to the destination rectangle
    #[serde(rename = "doDrawStretched")]
    pub do_draw_stretched: bool,
    /// Opacity used when drawing the composite (0.0-1.0)
    #[serde(rename = "drawAlpha")]
    pub draw_alpha: f32,
    /// Auto-layout policy
    #[serde(rename = "autoLayout")]
    pub auto_layout: AutoLayoutSettings,
    /// Per-slot configuration; the list length is the slot count
    pub slots: Vec<SlotSettings>,
}

impl Default for MultiCamSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            read_to_pixels: false,
            do_draw: true,
            do_draw_stretched: false,
            draw_alpha: default_draw_alpha(),
            auto_layout: AutoLayoutSettings::default(),
            slots: Vec::new(),
        }
    }
}
