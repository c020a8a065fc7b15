use super::interface::{CameraBackend, FacingMode, RawFrame, VideoTrack};
use crate::error::CameraError;
use crate::encoded::EncodedImage;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Opens camera streams and turns their frames into JPEG stills.
///
/// At most one stream is live per capturer; opening a second one while the
/// first is still held fails instead of leaking a device.
pub struct FrameCapturer {
    backend: Arc<dyn CameraBackend>,
    live: Arc<AtomicBool>,
    frames_captured: Arc<AtomicU64>,
    jpeg_quality: u8,
    warmup_frames: u32,
}

impl FrameCapturer {
    /// Create a capturer on top of a camera backend
    pub fn new(backend: Arc<dyn CameraBackend>, jpeg_quality: u8, warmup_frames: u32) -> Self {
        Self {
            backend,
            live: Arc::new(AtomicBool::new(false)),
            frames_captured: Arc::new(AtomicU64::new(0)),
            jpeg_quality: jpeg_quality.clamp(1, 100),
            warmup_frames,
        }
    }

    /// Open a stream for the given facing.
    ///
    /// The stream is released when the returned handle is closed or dropped,
    /// including when warm-up fails after the device was acquired.
    pub fn open(&self, facing: FacingMode) -> Result<CameraStream, CameraError> {
        if self
            .live
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Refusing to open a second camera stream while one is live");
            return Err(CameraError::Busy {
                details: "a camera stream is already open".to_string(),
            });
        }
        let lease = StreamLease {
            live: Arc::clone(&self.live),
        };

        info!(
            "Opening {} camera via {} backend",
            facing,
            self.backend.name()
        );
        let track = self.backend.start(facing)?;

        let mut stream = CameraStream {
            track: Some(track),
            raster: RgbImage::new(0, 0),
            facing,
            jpeg_quality: self.jpeg_quality,
            frames_captured: Arc::clone(&self.frames_captured),
            _lease: lease,
        };

        for n in 0..self.warmup_frames {
            if let Err(e) = stream.grab() {
                warn!("Camera produced no frame during warm-up ({}): {}", n, e);
                // dropping the stream stops the partially acquired track
                return Err(CameraError::Busy {
                    details: format!("camera started but delivered no frames: {}", e),
                });
            }
        }

        info!("Camera stream open on {}", stream.label());
        Ok(stream)
    }

    /// Whether a stream from this capturer is currently held
    pub fn is_streaming(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Total stills captured across all streams
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured.load(Ordering::Relaxed)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

/// Clears the capturer's live flag once the stream is gone
struct StreamLease {
    live: Arc<AtomicBool>,
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
    }
}

/// A live camera stream. Every track it holds is stopped on `close` or drop.
pub struct CameraStream {
    track: Option<Box<dyn VideoTrack>>,
    raster: RgbImage,
    facing: FacingMode,
    jpeg_quality: u8,
    frames_captured: Arc<AtomicU64>,
    // declared last so the live flag clears only after the track is stopped
    _lease: StreamLease,
}

impl CameraStream {
    /// Snapshot the current frame as a JPEG still.
    ///
    /// The offscreen raster follows the frame's own dimensions, so the still
    /// always matches the stream's resolution at the moment of capture.
    pub fn capture_frame(&mut self) -> Result<EncodedImage, CameraError> {
        let frame = self.grab()?;
        frame.validate()?;

        if self.raster.dimensions() != (frame.width, frame.height) {
            debug!(
                "Resizing capture raster from {:?} to {}x{}",
                self.raster.dimensions(),
                frame.width,
                frame.height
            );
            self.raster = RgbImage::new(frame.width, frame.height);
        }

        let row_bytes = frame.width as usize * 3;
        for (dst, src) in self.raster.chunks_exact_mut(row_bytes).zip(frame.rows()) {
            dst.copy_from_slice(src);
        }

        let mut jpeg = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality);
            encoder
                .encode_image(&self.raster)
                .map_err(|e| CameraError::Encode {
                    details: e.to_string(),
                })?;
        }

        let count = self.frames_captured.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "Captured still {} ({}x{}, {} bytes)",
            count,
            frame.width,
            frame.height,
            jpeg.len()
        );

        Ok(EncodedImage::jpeg(jpeg, frame.width, frame.height))
    }

    /// Stop every track and release the device
    pub fn close(mut self) {
        self.release();
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn label(&self) -> &str {
        self.track
            .as_ref()
            .map(|track| track.label())
            .unwrap_or("closed")
    }

    pub fn is_live(&self) -> bool {
        self.track.as_ref().map_or(false, |track| track.is_live())
    }

    fn grab(&mut self) -> Result<RawFrame, CameraError> {
        let track = self.track.as_mut().ok_or(CameraError::StreamClosed)?;
        let frame = track.grab()?;
        trace!("Grabbed {}x{} frame", frame.width, frame.height);
        Ok(frame)
    }

    fn release(&mut self) {
        if let Some(mut track) = self.track.take() {
            info!("Stopping camera track {}", track.label());
            track.stop();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.release();
    }
}
