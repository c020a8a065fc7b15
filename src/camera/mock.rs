use super::interface::{CameraBackend, FacingMode, RawFrame, VideoTrack};
use crate::error::CameraError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Software camera producing a moving test pattern, for machines without
/// camera support and for tests.
///
/// Clones share state, so a test can keep one handle to inspect live tracks
/// or inject failures while the capturer owns another.
#[derive(Clone)]
pub struct SyntheticCamera {
    state: Arc<SyntheticState>,
}

struct SyntheticState {
    resolution: Mutex<(u32, u32)>,
    deny_access: AtomicBool,
    fail_grabs: AtomicBool,
    live_tracks: AtomicUsize,
    tracks_started: AtomicUsize,
    frame_counter: AtomicU64,
}

impl SyntheticCamera {
    /// Create a synthetic camera with the given resolution
    pub fn new(resolution: (u32, u32)) -> Self {
        Self {
            state: Arc::new(SyntheticState {
                resolution: Mutex::new(resolution),
                deny_access: AtomicBool::new(false),
                fail_grabs: AtomicBool::new(false),
                live_tracks: AtomicUsize::new(0),
                tracks_started: AtomicUsize::new(0),
                frame_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Make subsequent `start` calls fail as if permission had been refused
    pub fn deny_access(&self, deny: bool) {
        self.state.deny_access.store(deny, Ordering::Relaxed);
    }

    /// Make subsequent grabs fail
    pub fn fail_grabs(&self, fail: bool) {
        self.state.fail_grabs.store(fail, Ordering::Relaxed);
    }

    /// Change the resolution of frames produced from now on, including on live tracks
    pub fn set_resolution(&self, width: u32, height: u32) {
        *self.state.resolution.lock() = (width, height);
    }

    /// Tracks started and not yet stopped
    pub fn live_tracks(&self) -> usize {
        self.state.live_tracks.load(Ordering::Acquire)
    }

    /// Tracks ever started
    pub fn tracks_started(&self) -> usize {
        self.state.tracks_started.load(Ordering::Acquire)
    }
}

impl CameraBackend for SyntheticCamera {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(&self, facing: FacingMode) -> Result<Box<dyn VideoTrack>, CameraError> {
        if self.state.deny_access.load(Ordering::Relaxed) {
            return Err(CameraError::PermissionDenied {
                device: format!("synthetic-{}", facing),
                details: "access denied".to_string(),
            });
        }

        self.state.tracks_started.fetch_add(1, Ordering::AcqRel);
        self.state.live_tracks.fetch_add(1, Ordering::AcqRel);
        debug!("Synthetic {} track started", facing);

        Ok(Box::new(SyntheticTrack {
            state: Arc::clone(&self.state),
            label: format!("synthetic {} camera", facing),
            live: true,
        }))
    }
}

struct SyntheticTrack {
    state: Arc<SyntheticState>,
    label: String,
    live: bool,
}

impl VideoTrack for SyntheticTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn grab(&mut self) -> Result<RawFrame, CameraError> {
        if !self.live {
            return Err(CameraError::StreamClosed);
        }
        if self.state.fail_grabs.load(Ordering::Relaxed) {
            return Err(CameraError::FrameGrab {
                details: "synthetic grab failure".to_string(),
            });
        }

        let (width, height) = *self.state.resolution.lock();
        let frame_id = self.state.frame_counter.fetch_add(1, Ordering::Relaxed);
        let shift = (frame_id % 256) as u32;

        // green diagonal bands drifting one pixel per frame
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                let band = ((x + y + shift) / 16) % 2;
                data.push((x * 255 / width.max(1)) as u8);
                data.push(if band == 0 { 160 } else { 96 });
                data.push((y * 255 / height.max(1)) as u8);
            }
        }

        Ok(RawFrame::packed(width, height, data))
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.state.live_tracks.fetch_sub(1, Ordering::AcqRel);
            debug!("{} stopped", self.label);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
