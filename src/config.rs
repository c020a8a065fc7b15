use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::camera::FacingMode;

/// Environment variables consulted, in order, when no key is configured
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PaddyConfig {
    pub camera: CameraConfig,
    pub inference: InferenceConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Which camera backend to use
    #[serde(default)]
    pub backend: CameraBackendKind,

    /// Default camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Device index of the rear-facing camera, if the machine has one
    #[serde(default)]
    pub environment_device: Option<u32>,

    /// Device index of the user-facing camera, if the machine has one
    #[serde(default)]
    pub user_device: Option<u32>,

    /// Facing requested when none is given on the command line
    #[serde(default)]
    pub facing: FacingMode,

    /// How long to wait for a frame before a grab fails
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Frames pulled and discarded when a stream opens
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,

    /// JPEG quality for captured stills (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Resolution of the synthetic camera (width, height)
    #[serde(default = "default_synthetic_resolution")]
    pub synthetic_resolution: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendKind {
    /// Platform camera; fails when none is compiled in
    #[default]
    Auto,
    Gstreamer,
    Synthetic,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InferenceConfig {
    /// Base URL of the generative language API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// API key; falls back to the API_KEY / GEMINI_API_KEY environment variables
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    /// Width of the confidence meter in characters
    #[serde(default = "default_meter_width")]
    pub meter_width: usize,

    /// Print the time the report was generated
    #[serde(default = "default_show_timestamp")]
    pub show_timestamp: bool,
}

impl PaddyConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("paddycheck.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.backend", "auto")?
            .set_default("camera.index", default_camera_index())?
            .set_default("camera.facing", "environment")?
            .set_default("camera.frame_timeout_ms", default_frame_timeout_ms())?
            .set_default("camera.warmup_frames", default_warmup_frames())?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as u64)?
            .set_default(
                "camera.synthetic_resolution",
                vec![
                    default_synthetic_resolution().0,
                    default_synthetic_resolution().1,
                ],
            )?
            .set_default("inference.endpoint", default_endpoint())?
            .set_default("inference.model", default_model())?
            .set_default("inference.temperature", default_temperature() as f64)?
            .set_default("inference.timeout_seconds", default_timeout_seconds())?
            .set_default("report.meter_width", default_meter_width() as u64)?
            .set_default("report.show_timestamp", default_show_timestamp())?
            .add_source(File::with_name(&path_str).required(false))
            // PADDYCHECK_INFERENCE__MODEL=... overrides inference.model
            .add_source(
                Environment::with_prefix("PADDYCHECK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: PaddyConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.jpeg_quality == 0 || self.camera.jpeg_quality > 100 {
            return Err(ConfigError::Message(
                "Camera jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.camera.frame_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Camera frame_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.camera.synthetic_resolution.0 == 0 || self.camera.synthetic_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera synthetic_resolution must be greater than 0".to_string(),
            ));
        }

        if self.inference.endpoint.trim().is_empty() {
            return Err(ConfigError::Message(
                "Inference endpoint must not be empty".to_string(),
            ));
        }

        if self.inference.model.trim().is_empty() {
            return Err(ConfigError::Message(
                "Inference model must not be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(ConfigError::Message(
                "Inference temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.inference.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Inference timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.report.meter_width == 0 {
            return Err(ConfigError::Message(
                "Report meter_width must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }
}

impl InferenceConfig {
    /// Resolve the inference credential from configuration or the process environment
    pub fn resolve_credential(&self) -> Option<String> {
        self.resolve_credential_with(|name| std::env::var(name).ok())
    }

    /// Resolve the credential using the given environment lookup
    pub fn resolve_credential_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .into_iter()
            .chain(CREDENTIAL_ENV_VARS.iter().filter_map(|name| lookup(name)))
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }
}

impl Default for PaddyConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            inference: InferenceConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackendKind::default(),
            index: default_camera_index(),
            environment_device: None,
            user_device: None,
            facing: FacingMode::default(),
            frame_timeout_ms: default_frame_timeout_ms(),
            warmup_frames: default_warmup_frames(),
            jpeg_quality: default_jpeg_quality(),
            synthetic_resolution: default_synthetic_resolution(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            api_key: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            meter_width: default_meter_width(),
            show_timestamp: default_show_timestamp(),
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_frame_timeout_ms() -> u64 {
    2000
}
fn default_warmup_frames() -> u32 {
    3
}
fn default_jpeg_quality() -> u8 {
    92
}
fn default_synthetic_resolution() -> (u32, u32) {
    (640, 480)
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_timeout_seconds() -> u64 {
    60
}

fn default_meter_width() -> usize {
    20
}
fn default_show_timestamp() -> bool {
    true
}
