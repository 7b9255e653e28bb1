//! Webcam grabber backed by nokhwa
//!
//! Capture runs on a background thread owned by this backend; the thread
//! decodes frames to RGBA and writes them into a triple-buffered slot set.
//! `poll()` promotes the newest complete frame to the caller's side, so the
//! outward surface stays single-threaded poll-per-frame.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use parking_lot::Mutex;

use crate::error::MultiCamError;
use crate::frame::VideoFrame;

use super::{DeviceInfo, Grabber};

/// List cameras available through nokhwa
pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(camera_list) => {
            for (idx, info) in camera_list.iter().enumerate() {
                devices.push(DeviceInfo {
                    index: idx as u32,
                    name: info.human_name().to_string(),
                });
            }
        }
        Err(e) => {
            log::warn!("Failed to enumerate cameras: {:?}", e);
        }
    }

    devices
}

/// Shared state between the capture thread and the polling side
struct Capture {
    /// Latest captured frames - triple buffered
    frames: [Arc<Mutex<Option<VideoFrame>>>; 3],
    /// Index of the latest complete frame
    latest_frame_idx: Arc<AtomicU64>,
    /// Total frames captured; 0 means nothing has arrived yet
    frame_count: Arc<AtomicU64>,
    /// Whether capture is running
    running: Arc<AtomicBool>,
    /// Capture thread handle
    thread_handle: Option<std::thread::JoinHandle<()>>,
    /// Resolution the camera reported at open
    width: u32,
    height: u32,
}

impl Capture {
    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Webcam device behind the [`Grabber`] interface
pub struct WebcamGrabber {
    capture: Option<Capture>,
    /// Frame promoted by the last `poll()`
    current: Option<VideoFrame>,
    /// Frame number of the last promoted frame
    last_seen: Option<u64>,
    frame_new: bool,
}

impl WebcamGrabber {
    /// Create a closed grabber; call `open()` to acquire a device
    pub fn new() -> Self {
        Self {
            capture: None,
            current: None,
            last_seen: None,
            frame_new: false,
        }
    }
}

impl Default for WebcamGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl Grabber for WebcamGrabber {
    fn open(
        &mut self,
        device_id: u32,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<(), MultiCamError> {
        self.close();

        let frames: [Arc<Mutex<Option<VideoFrame>>>; 3] = [
            Arc::new(Mutex::new(None)),
            Arc::new(Mutex::new(None)),
            Arc::new(Mutex::new(None)),
        ];
        let latest_frame_idx = Arc::new(AtomicU64::new(0));
        let frame_count = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        // The thread reports the open outcome back before entering its loop
        let (open_tx, open_rx) = mpsc::channel::<Result<(u32, u32), String>>();

        let frames_clone = frames.clone();
        let latest_frame_idx_clone = latest_frame_idx.clone();
        let frame_count_clone = frame_count.clone();
        let running_clone = running.clone();

        let thread_handle = std::thread::Builder::new()
            .name(format!("camera-capture-{}", device_id))
            .spawn(move || {
                capture_thread(
                    device_id,
                    width,
                    height,
                    fps,
                    open_tx,
                    frames_clone,
                    latest_frame_idx_clone,
                    frame_count_clone,
                    running_clone,
                );
            })
            .map_err(|e| MultiCamError::DeviceUnavailable {
                device_id,
                reason: format!("failed to spawn capture thread: {}", e),
            })?;

        let (open_width, open_height) = match open_rx.recv() {
            Ok(Ok(res)) => res,
            Ok(Err(reason)) => {
                let _ = thread_handle.join();
                return Err(MultiCamError::DeviceUnavailable { device_id, reason });
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(MultiCamError::DeviceUnavailable {
                    device_id,
                    reason: "capture thread exited before reporting".into(),
                });
            }
        };

        self.capture = Some(Capture {
            frames,
            latest_frame_idx,
            frame_count,
            running,
            thread_handle: Some(thread_handle),
            width: open_width,
            height: open_height,
        });
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        self.current = None;
        self.last_seen = None;
        self.frame_new = false;
    }

    fn is_open(&self) -> bool {
        self.capture.is_some()
    }

    fn poll(&mut self) {
        self.frame_new = false;
        let Some(capture) = &self.capture else {
            return;
        };
        if capture.frame_count.load(Ordering::Acquire) == 0 {
            return;
        }
        let idx = capture.latest_frame_idx.load(Ordering::Acquire);
        let slot = (idx % 3) as usize;
        let frame = capture.frames[slot].lock().clone();
        if let Some(frame) = frame {
            if self.last_seen != Some(frame.frame_number) {
                self.last_seen = Some(frame.frame_number);
                self.current = Some(frame);
                self.frame_new = true;
            }
        }
    }

    fn is_frame_new(&self) -> bool {
        self.frame_new
    }

    fn width(&self) -> u32 {
        match (&self.current, &self.capture) {
            (Some(frame), _) => frame.width,
            (None, Some(capture)) => capture.width,
            (None, None) => 0,
        }
    }

    fn height(&self) -> u32 {
        match (&self.current, &self.capture) {
            (Some(frame), _) => frame.height,
            (None, Some(capture)) => capture.height,
            (None, None) => 0,
        }
    }

    fn latest_frame(&self) -> Option<&VideoFrame> {
        self.current.as_ref()
    }
}

impl Drop for WebcamGrabber {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open the camera with a format fallback chain, then loop capturing frames
/// into the triple buffer until `running` clears.
#[allow(clippy::too_many_arguments)]
fn capture_thread(
    device_id: u32,
    width: u32,
    height: u32,
    fps: u32,
    open_tx: mpsc::Sender<Result<(u32, u32), String>>,
    frames: [Arc<Mutex<Option<VideoFrame>>>; 3],
    latest_frame_idx: Arc<AtomicU64>,
    frame_count: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
) {
    log::info!("Starting camera capture thread (camera {})", device_id);

    let index = CameraIndex::Index(device_id);

    // First try the requested geometry/fps exactly
    let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(
        CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, fps.max(1)),
    ));

    let mut camera = match Camera::new(index.clone(), requested) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Failed to open camera with requested format: {:?}", e);

            // Fall back to whatever the device offers
            let requested2 =
                RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

            match Camera::new(index.clone(), requested2) {
                Ok(c) => c,
                Err(e2) => {
                    log::warn!("Failed with AbsoluteHighestResolution: {:?}", e2);

                    let requested3 = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);
                    match Camera::new(index, requested3) {
                        Ok(c) => c,
                        Err(e3) => {
                            log::error!("Failed to open camera with all format attempts: {:?}", e3);
                            let _ = open_tx.send(Err(format!("{:?}", e3)));
                            return;
                        }
                    }
                }
            }
        }
    };

    if let Err(e) = camera.open_stream() {
        log::error!("Failed to open camera stream: {:?}", e);
        let _ = open_tx.send(Err(format!("{:?}", e)));
        return;
    }

    log::info!(
        "Camera opened: {} ({}x{})",
        camera.info().human_name(),
        camera.resolution().width(),
        camera.resolution().height()
    );
    let _ = open_tx.send(Ok((
        camera.resolution().width(),
        camera.resolution().height(),
    )));

    let mut write_idx: u64 = 0;

    while running.load(Ordering::Acquire) {
        match camera.frame() {
            Ok(frame) => match frame.decode_image::<RgbAFormat>() {
                Ok(image) => {
                    let frame_num = frame_count.fetch_add(1, Ordering::AcqRel);
                    let video_frame = VideoFrame::new(
                        image.into_raw(),
                        frame.resolution().width(),
                        frame.resolution().height(),
                        frame_num,
                    );

                    let slot = (write_idx % 3) as usize;
                    *frames[slot].lock() = Some(video_frame);

                    latest_frame_idx.store(write_idx, Ordering::Release);
                    write_idx = write_idx.wrapping_add(1);
                }
                Err(e) => {
                    log::warn!("Failed to decode frame: {:?}", e);
                }
            },
            Err(e) => {
                log::warn!("Failed to capture frame: {:?}", e);
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }
    }

    log::info!("Camera capture thread stopped (camera {})", device_id);
}
