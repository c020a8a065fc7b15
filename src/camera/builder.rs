use super::capturer::FrameCapturer;
use super::interface::CameraBackend;
use super::mock::SyntheticCamera;
use crate::config::{CameraBackendKind, CameraConfig};
use crate::error::{CameraError, PaddyError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Builder for a frame capturer from configuration or an explicit backend
pub struct FrameCapturerBuilder {
    config: Option<CameraConfig>,
    backend: Option<Arc<dyn CameraBackend>>,
}

impl FrameCapturerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            backend: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this backend instead of the one the configuration selects
    pub fn backend(mut self, backend: Arc<dyn CameraBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<FrameCapturer> {
        let config = self
            .config
            .ok_or_else(|| PaddyError::system("Camera configuration must be specified"))?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => backend_from_config(&config)?,
        };

        Ok(FrameCapturer::new(
            backend,
            config.jpeg_quality,
            config.warmup_frames,
        ))
    }
}

impl Default for FrameCapturerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Select the camera backend named by the configuration
pub fn backend_from_config(
    config: &CameraConfig,
) -> std::result::Result<Arc<dyn CameraBackend>, CameraError> {
    match config.backend {
        CameraBackendKind::Synthetic => Ok(synthetic(config)),
        CameraBackendKind::Gstreamer => gstreamer_backend(config),
        // the synthetic camera is never picked implicitly
        CameraBackendKind::Auto => gstreamer_backend(config).map_err(|e| {
            warn!("No platform camera available: {}", e);
            e
        }),
    }
}

fn synthetic(config: &CameraConfig) -> Arc<dyn CameraBackend> {
    info!(
        "Using synthetic camera at {}x{}",
        config.synthetic_resolution.0, config.synthetic_resolution.1
    );
    Arc::new(SyntheticCamera::new(config.synthetic_resolution))
}

#[cfg(all(target_os = "linux", feature = "camera"))]
fn gstreamer_backend(
    config: &CameraConfig,
) -> std::result::Result<Arc<dyn CameraBackend>, CameraError> {
    let backend = super::gstreamer::GStreamerCamera::new(config.clone())?;
    Ok(Arc::new(backend))
}

#[cfg(not(all(target_os = "linux", feature = "camera")))]
fn gstreamer_backend(
    _config: &CameraConfig,
) -> std::result::Result<Arc<dyn CameraBackend>, CameraError> {
    Err(CameraError::Configuration {
        details: "GStreamer camera support is not compiled in".to_string(),
    })
}
