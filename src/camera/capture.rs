//! Background-thread camera capture using nokhwa
//!
//! Frames are decoded to RGBA on the capture thread and published through a
//! triple buffer; the keying loop only ever sees the newest complete frame.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use parking_lot::Mutex;

use super::CaptureResolution;
use crate::error::{KeyError, Result};
use crate::frame::Frame;
use crate::source::FrameSource;

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    pub index: u32,
    /// Human readable device name
    pub name: String,
}

/// Enumerate capture devices
pub fn list_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(devices) => devices
            .iter()
            .enumerate()
            .map(|(idx, info)| CameraInfo {
                index: idx as u32,
                name: info.human_name().to_string(),
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {}", e);
            Vec::new()
        }
    }
}

/// A captured frame with its sequence number
struct CapturedFrame {
    number: u64,
    frame: Frame,
}

type FrameSlot = Arc<Mutex<Option<CapturedFrame>>>;

/// Live camera feeding the keyer
pub struct CameraCapture {
    slots: [FrameSlot; 3],
    /// Write index of the newest complete slot, `u64::MAX` before the first frame
    latest: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    /// Resolution the device actually delivers
    width: u32,
    height: u32,
    last_delivered: Option<u64>,
}

impl CameraCapture {
    /// Open camera `camera_index` and start capturing
    ///
    /// Blocks until the device is open so failures surface here instead of on
    /// the capture thread.
    pub fn new(camera_index: u32, resolution: CaptureResolution) -> Result<Self> {
        let slots: [FrameSlot; 3] = std::array::from_fn(|_| Arc::new(Mutex::new(None)));
        let latest = Arc::new(AtomicU64::new(u64::MAX));
        let running = Arc::new(AtomicBool::new(true));
        let (opened_tx, opened_rx) = crossbeam_channel::bounded(1);

        let thread_handle = {
            let slots = slots.clone();
            let latest = latest.clone();
            let running = running.clone();
            std::thread::Builder::new()
                .name("camera-capture".to_string())
                .spawn(move || {
                    let mut camera = match open_camera(camera_index, resolution) {
                        Ok(camera) => camera,
                        Err(e) => {
                            let _ = opened_tx.send(Err(e));
                            return;
                        }
                    };
                    let size = camera.resolution();
                    let _ = opened_tx.send(Ok((size.width(), size.height())));
                    capture_loop(&mut camera, &slots, &latest, &running);
                })?
        };

        let (width, height) = match opened_rx.recv() {
            Ok(Ok(size)) => size,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(KeyError::Camera("capture thread exited before opening".into()));
            }
        };

        Ok(Self {
            slots,
            latest,
            running,
            thread_handle: Some(thread_handle),
            width,
            height,
            last_delivered: None,
        })
    }

    /// Resolution delivered by the device
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl FrameSource for CameraCapture {
    /// Newest frame if it was not delivered yet
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.is_running() {
            return Err(KeyError::Camera("capture stopped".into()));
        }
        let idx = self.latest.load(Ordering::Acquire);
        if idx == u64::MAX {
            return Ok(None);
        }

        let slot = self.slots[(idx % 3) as usize].lock();
        match slot.as_ref() {
            Some(captured) if Some(captured.number) != self.last_delivered => {
                self.last_delivered = Some(captured.number);
                Ok(Some(captured.frame.clone()))
            }
            _ => Ok(None),
        }
    }

    fn name(&self) -> String {
        format!("camera {}x{}", self.width, self.height)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the device, trying the requested size first and then whatever the
/// camera offers
fn open_camera(camera_index: u32, resolution: CaptureResolution) -> Result<Camera> {
    let index = CameraIndex::Index(camera_index);
    let (width, height) = resolution.size();

    let attempts = [
        RequestedFormatType::Closest(CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::MJPEG,
            30,
        )),
        RequestedFormatType::AbsoluteHighestResolution,
        RequestedFormatType::None,
    ];

    let mut last_error = None;
    for request in attempts {
        let requested = RequestedFormat::new::<RgbAFormat>(request);
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => {
                camera
                    .open_stream()
                    .map_err(|e| KeyError::Camera(format!("failed to open stream: {}", e)))?;
                tracing::info!(
                    camera = camera_index,
                    name = %camera.info().human_name(),
                    width = camera.resolution().width(),
                    height = camera.resolution().height(),
                    requested = %resolution.display_name(),
                    "Camera opened"
                );
                return Ok(camera);
            }
            Err(e) => {
                tracing::warn!(camera = camera_index, "Camera format request failed: {}", e);
                last_error = Some(e);
            }
        }
    }

    Err(KeyError::Camera(match last_error {
        Some(e) => format!("failed to open camera {}: {}", camera_index, e),
        None => format!("failed to open camera {}", camera_index),
    }))
}

fn capture_loop(
    camera: &mut Camera,
    slots: &[FrameSlot; 3],
    latest: &AtomicU64,
    running: &AtomicBool,
) {
    let mut write_idx: u64 = 0;

    while running.load(Ordering::Acquire) {
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!("Failed to capture frame: {}", e);
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        let image = match buffer.decode_image::<RgbAFormat>() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Failed to decode frame: {}", e);
                continue;
            }
        };

        let (width, height) = (image.width(), image.height());
        let frame = match Frame::from_rgba(width, height, image.into_raw()) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Dropping malformed camera frame: {}", e);
                continue;
            }
        };

        *slots[(write_idx % 3) as usize].lock() = Some(CapturedFrame {
            number: write_idx,
            frame,
        });
        latest.store(write_idx, Ordering::Release);
        write_idx = write_idx.wrapping_add(1);
        if write_idx == u64::MAX {
            write_idx = 0;
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!("Failed to stop camera stream: {}", e);
    }
    tracing::info!("Camera capture thread stopped");
}
