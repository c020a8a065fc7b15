use super::interface::{CameraBackend, FacingMode, RawFrame, VideoTrack};
use crate::config::CameraConfig;
use crate::error::CameraError;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// v4l2 camera access through a GStreamer pipeline converting to RGB
pub struct GStreamerCamera {
    config: CameraConfig,
}

impl GStreamerCamera {
    /// Initialize GStreamer and create the backend
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        info!(
            "GStreamer camera backend ready (default /dev/video{})",
            config.index
        );
        Ok(Self { config })
    }

    /// Device path for a facing, falling back to the default device
    fn device_for(&self, facing: FacingMode) -> String {
        let preferred = match facing {
            FacingMode::Environment => self.config.environment_device,
            FacingMode::User => self.config.user_device,
        };

        let index = preferred.unwrap_or_else(|| {
            debug!(
                "No {} camera configured; using default device {}",
                facing, self.config.index
            );
            self.config.index
        });

        format!("/dev/video{}", index)
    }

    /// Build GStreamer pipeline string delivering RGB frames to an appsink
    fn build_pipeline_string(device: &str) -> String {
        format!(
            "v4l2src device={} io-mode=mmap ! \
             videoconvert ! video/x-raw,format=RGB ! \
             appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false",
            device
        )
    }

    /// Distinguish missing and forbidden devices before GStreamer hides the cause
    fn check_device(device: &str) -> Result<(), CameraError> {
        if !Path::new(device).exists() {
            return Err(CameraError::DeviceNotFound {
                details: format!("{} does not exist", device),
            });
        }

        match std::fs::OpenOptions::new().read(true).open(device) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(CameraError::PermissionDenied {
                device: device.to_string(),
                details: e.to_string(),
            }),
            Err(e) => Err(CameraError::Busy {
                details: format!("{}: {}", device, e),
            }),
        }
    }
}

impl CameraBackend for GStreamerCamera {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn start(&self, facing: FacingMode) -> Result<Box<dyn VideoTrack>, CameraError> {
        let device = self.device_for(facing);
        Self::check_device(&device)?;

        let pipeline_desc = Self::build_pipeline_string(&device);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no appsink".to_string(),
            })?;

        // from here on the track owns the pipeline and stops it on failure
        let mut track = GStreamerTrack {
            pipeline,
            appsink,
            label: device.clone(),
            timeout_ms: self.config.frame_timeout_ms,
            live: true,
        };

        if let Err(e) = track.pipeline.set_state(gstreamer::State::Playing) {
            track.stop();
            return Err(CameraError::Busy {
                details: format!("Failed to start pipeline on {}: {}", device, e),
            });
        }

        let (result, _, _) = track
            .pipeline
            .state(gstreamer::ClockTime::from_mseconds(self.config.frame_timeout_ms));
        if let Err(e) = result {
            track.stop();
            return Err(CameraError::Busy {
                details: format!("Pipeline on {} did not reach PLAYING: {}", device, e),
            });
        }

        info!("GStreamer pipeline started on {}", device);
        Ok(Box::new(track))
    }
}

struct GStreamerTrack {
    pipeline: Pipeline,
    appsink: AppSink,
    label: String,
    timeout_ms: u64,
    live: bool,
}

impl VideoTrack for GStreamerTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn grab(&mut self) -> Result<RawFrame, CameraError> {
        if !self.live {
            return Err(CameraError::StreamClosed);
        }

        let sample = self
            .appsink
            .try_pull_sample(gstreamer::ClockTime::from_mseconds(self.timeout_ms))
            .ok_or_else(|| CameraError::FrameGrab {
                details: format!("no frame within {} ms", self.timeout_ms),
            })?;

        let buffer = sample.buffer().ok_or_else(|| CameraError::FrameGrab {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::FrameGrab {
            details: "No caps in sample".to_string(),
        })?;

        let video_info = VideoInfo::from_caps(caps).map_err(|e| CameraError::FrameGrab {
            details: format!("Failed to get video info: {}", e),
        })?;

        let map = buffer.map_readable().map_err(|e| CameraError::FrameGrab {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let stride = video_info.stride().first().copied().unwrap_or(0).max(0) as usize;

        Ok(RawFrame {
            width: video_info.width(),
            height: video_info.height(),
            stride,
            data: map.as_slice().to_vec(),
        })
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;

        match self.pipeline.set_state(gstreamer::State::Null) {
            Ok(_) => info!("GStreamer pipeline on {} stopped", self.label),
            Err(e) => error!("Failed to stop GStreamer pipeline on {}: {}", self.label, e),
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for GStreamerTrack {
    fn drop(&mut self) {
        if self.live {
            warn!("GStreamer track on {} dropped without stop", self.label);
            self.stop();
        }
    }
}
