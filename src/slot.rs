//! One managed camera device: lifecycle, stats, and compositing
//!
//! A slot owns at most one grabber handle. While enabled and closed it
//! attempts to reopen subject to an exponential-backoff retry policy; while
//! disabled it stays closed and reports a placeholder size.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::MultiCamError;
use crate::grabber::Grabber;
use crate::layout::Rect;
use crate::settings::{SlotControl, SlotInit, SlotSettings};
use crate::surface::PixelSurface;

/// Reported width when no device is open
pub const PLACEHOLDER_WIDTH: u32 = 320;
/// Reported height when no device is open
pub const PLACEHOLDER_HEIGHT: u32 = 180;

/// Exponential smoothing factor for the averaged fps
const FPS_SMOOTHING: f32 = 0.1;

/// Capture statistics for one slot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlotInfo {
    /// Whether the last update pulled a fresh frame
    pub has_new_frame: bool,
    /// Width of the last captured frame
    pub width: u32,
    /// Height of the last captured frame
    pub height: u32,
    /// Instantaneous capture rate
    pub fps: f32,
    /// Exponentially smoothed capture rate
    pub fps_avg: f32,
}

/// Instantaneous and smoothed fps from frame arrival times
#[derive(Debug, Clone, Copy, Default)]
pub struct FpsCounter {
    pub fps: f32,
    pub fps_avg: f32,
    last: Option<Instant>,
}

impl FpsCounter {
    /// Record a frame arrival. Skips the rate update when no time has
    /// elapsed since the previous arrival.
    pub fn tick(&mut self, now: Instant) {
        if let Some(last) = self.last {
            let elapsed = now.saturating_duration_since(last).as_secs_f32();
            if elapsed > 0.0 {
                self.fps = 1.0 / elapsed;
                self.fps_avg += (self.fps - self.fps_avg) * FPS_SMOOTHING;
            }
        }
        self.last = Some(now);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Reopen backoff: doubles the delay after each consecutive failure, up to a
/// cap, with an optional attempt limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay after the first failure, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on the delay, in milliseconds
    pub max_delay_ms: u64,
    /// Give up after this many consecutive failures; None retries forever
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 250,
            max_delay_ms: 4000,
            max_attempts: None,
        }
    }
}

/// Tracks consecutive open failures and the next time a retry is allowed
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RetryState {
    failures: u32,
    next_attempt: Option<Instant>,
}

impl RetryState {
    /// Whether an open attempt is allowed at `now`
    pub fn ready(&self, now: Instant, policy: &RetryPolicy) -> bool {
        if let Some(max) = policy.max_attempts {
            if self.failures >= max {
                return false;
            }
        }
        match self.next_attempt {
            Some(at) => now >= at,
            None => true,
        }
    }

    pub fn record_failure(&mut self, now: Instant, policy: &RetryPolicy) {
        self.failures = self.failures.saturating_add(1);
        let exp = self.failures.saturating_sub(1).min(16);
        let delay_ms = policy
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(policy.max_delay_ms);
        self.next_attempt = Some(now + Duration::from_millis(delay_ms));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One managed camera device plus its controls and stats
pub struct CameraSlot {
    /// Slot index within the aggregator
    pub id: u32,
    /// Device acquisition parameters
    pub init: SlotInit,
    /// Placement and display controls
    pub ctrl: SlotControl,
    /// Capture statistics
    pub info: SlotInfo,
    /// Reopen backoff policy
    pub retry_policy: RetryPolicy,
    grabber: Option<Box<dyn Grabber>>,
    fps_counter: FpsCounter,
    retry: RetryState,
}

impl CameraSlot {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            init: SlotInit::default(),
            ctrl: SlotControl::default(),
            info: SlotInfo::default(),
            retry_policy: RetryPolicy::default(),
            grabber: None,
            fps_counter: FpsCounter::default(),
            retry: RetryState::default(),
        }
    }

    pub fn from_settings(id: u32, settings: &SlotSettings) -> Self {
        let mut slot = Self::new(id);
        slot.init = settings.init.clone();
        slot.ctrl = settings.ctrl.clone();
        slot
    }

    /// Acquire the device with the requested geometry/fps, closing any prior
    /// handle first. On failure the slot holds no handle and the error is
    /// logged; `update()` retries per the backoff policy.
    pub fn open(&mut self) -> Result<(), MultiCamError> {
        log::info!("slot {}: opening device {}", self.id, self.init.device_id);
        self.close();
        if !self.ctrl.enabled {
            return Err(MultiCamError::Disabled);
        }

        let mut grabber = self.init.kind.create();
        match grabber.open(
            self.init.device_id,
            self.init.width,
            self.init.height,
            self.init.fps,
        ) {
            Ok(()) => {
                self.grabber = Some(grabber);
                self.retry.reset();
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "slot {}: couldn't open device {}: {}",
                    self.id,
                    self.init.device_id,
                    e
                );
                self.retry.record_failure(Instant::now(), &self.retry_policy);
                Err(e)
            }
        }
    }

    /// Release the device if held. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut grabber) = self.grabber.take() {
            log::info!("slot {}: closing device {}", self.id, self.init.device_id);
            grabber.close();
        }
        self.fps_counter.reset();
    }

    /// Whether the slot holds a live device handle
    pub fn is_open(&self) -> bool {
        self.grabber.as_ref().map_or(false, |g| g.is_open())
    }

    /// Clear the backoff state so the next update retries immediately
    pub fn reset_retries(&mut self) {
        self.retry.reset();
    }

    /// Per-frame pass: maintain the handle for the enabled state, pull the
    /// next frame, and refresh the capture stats when one arrived.
    pub fn update(&mut self, now: Instant) {
        self.info.has_new_frame = false;

        if !self.ctrl.enabled {
            self.close();
            return;
        }

        if self.grabber.is_none() && self.retry.ready(now, &self.retry_policy) {
            // open() records the failure, pushing the next attempt out
            let _ = self.open();
        }

        if let Some(grabber) = self.grabber.as_mut() {
            grabber.poll();
            if grabber.is_frame_new() {
                self.info.has_new_frame = true;
                self.info.width = grabber.width();
                self.info.height = grabber.height();
                self.fps_counter.tick(now);
                self.info.fps = self.fps_counter.fps;
                self.info.fps_avg = self.fps_counter.fps_avg;
            }
        }
    }

    /// Draw the latest frame into the surface at this slot's position and
    /// scale, honoring the flip controls. No-op when disabled or closed.
    pub fn composite_into(&self, surface: &mut PixelSurface) {
        if !self.ctrl.enabled {
            return;
        }
        let Some(grabber) = self.grabber.as_ref() else {
            return;
        };
        let Some(frame) = grabber.latest_frame() else {
            return;
        };

        let dest = Rect::new(
            self.ctrl.pos.0,
            self.ctrl.pos.1,
            grabber.width() as f32 * self.ctrl.scale.0,
            grabber.height() as f32 * self.ctrl.scale.1,
        );
        surface.blit_scaled(frame, dest, self.ctrl.hflip, self.ctrl.vflip);
    }

    /// Live device frame width, or the placeholder when closed
    pub fn width(&self) -> u32 {
        match self.grabber.as_ref() {
            Some(g) if g.is_open() => g.width(),
            _ => PLACEHOLDER_WIDTH,
        }
    }

    /// Live device frame height, or the placeholder when closed
    pub fn height(&self) -> u32 {
        match self.grabber.as_ref() {
            Some(g) if g.is_open() => g.height(),
            _ => PLACEHOLDER_HEIGHT,
        }
    }

    #[cfg(test)]
    pub(crate) fn install_grabber(&mut self, grabber: Box<dyn Grabber>) {
        self.grabber = Some(grabber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grabber::mock::MockGrabber;
    use crate::grabber::DeviceKind;

    #[test]
    fn test_fps_counter() {
        let mut fps = FpsCounter::default();
        let t0 = Instant::now();
        fps.tick(t0);
        assert_eq!(fps.fps, 0.0);

        fps.tick(t0 + Duration::from_millis(100));
        assert!((fps.fps - 10.0).abs() < 0.01);
        assert!((fps.fps_avg - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_fps_counter_zero_elapsed() {
        let mut fps = FpsCounter::default();
        let t0 = Instant::now();
        fps.tick(t0);
        fps.tick(t0);
        assert_eq!(fps.fps, 0.0);
        assert_eq!(fps.fps_avg, 0.0);
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let policy = RetryPolicy::default();
        let mut retry = RetryState::default();
        let t0 = Instant::now();

        assert!(retry.ready(t0, &policy));
        retry.record_failure(t0, &policy);
        assert!(!retry.ready(t0 + Duration::from_millis(249), &policy));
        assert!(retry.ready(t0 + Duration::from_millis(250), &policy));

        let t1 = t0 + Duration::from_millis(250);
        retry.record_failure(t1, &policy);
        assert!(!retry.ready(t1 + Duration::from_millis(499), &policy));
        assert!(retry.ready(t1 + Duration::from_millis(500), &policy));
    }

    #[test]
    fn test_retry_delay_caps() {
        let policy = RetryPolicy::default();
        let mut retry = RetryState::default();
        let t0 = Instant::now();
        for _ in 0..10 {
            retry.record_failure(t0, &policy);
        }
        assert!(!retry.ready(t0 + Duration::from_millis(3999), &policy));
        assert!(retry.ready(t0 + Duration::from_millis(4000), &policy));
    }

    #[test]
    fn test_retry_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: Some(2),
            ..RetryPolicy::default()
        };
        let mut retry = RetryState::default();
        let t0 = Instant::now();
        retry.record_failure(t0, &policy);
        assert!(retry.ready(t0 + Duration::from_secs(10), &policy));
        retry.record_failure(t0, &policy);
        assert!(!retry.ready(t0 + Duration::from_secs(3600), &policy));
        retry.reset();
        assert!(retry.ready(t0, &policy));
    }

    #[test]
    fn test_disable_closes_within_one_update() {
        let mut slot = CameraSlot::new(0);
        slot.install_grabber(Box::new(MockGrabber::opened(640, 480)));
        assert!(slot.is_open());
        assert_eq!(slot.width(), 640);

        slot.ctrl.enabled = false;
        slot.update(Instant::now());
        assert!(!slot.is_open());
        assert_eq!(slot.width(), PLACEHOLDER_WIDTH);
        assert_eq!(slot.height(), PLACEHOLDER_HEIGHT);
    }

    #[test]
    fn test_placeholder_size_when_closed() {
        let slot = CameraSlot::new(0);
        assert_eq!(slot.width(), 320);
        assert_eq!(slot.height(), 180);
    }

    #[test]
    fn test_update_opens_and_pulls_frame() {
        let mut slot = CameraSlot::new(0);
        slot.init.kind = DeviceKind::TestPattern;
        slot.init.width = 64;
        slot.init.height = 48;
        slot.init.fps = 0;

        slot.update(Instant::now());
        assert!(slot.is_open());
        assert!(slot.info.has_new_frame);
        assert_eq!(slot.info.width, 64);
        assert_eq!(slot.info.height, 48);
    }

    #[test]
    fn test_open_when_disabled_is_rejected() {
        let mut slot = CameraSlot::new(0);
        slot.ctrl.enabled = false;
        assert!(matches!(slot.open(), Err(MultiCamError::Disabled)));
        assert!(!slot.is_open());
    }

    #[test]
    fn test_freshness_resets_next_cycle() {
        let mut slot = CameraSlot::new(0);
        let mut grabber = MockGrabber::opened(32, 32);
        grabber.emit_on_poll = false;
        slot.install_grabber(Box::new(grabber));

        slot.info.has_new_frame = true;
        slot.update(Instant::now());
        assert!(!slot.info.has_new_frame);
    }
}
