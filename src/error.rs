use std::path::PathBuf;
use thiserror::Error;

/// Shown for every camera acquisition failure, whatever the underlying cause
pub const CAMERA_UNAVAILABLE_MESSAGE: &str =
    "Could not access camera. Please check permissions and try again.";

/// Shown when an image file or a camera frame cannot be turned into an image
pub const DECODE_FAILURE_MESSAGE: &str =
    "Could not read the image. Please try again with a different image.";

/// Shown when the inference service declines the image on content-safety grounds
pub const SAFETY_REJECTION_MESSAGE: &str =
    "The image could not be processed due to safety settings. Please try a different image.";

/// Shown for every other service, network or reply-parsing failure
pub const TRANSIENT_FAILURE_MESSAGE: &str = "Failed to get analysis from AI. Please try again.";

/// Shown when no inference credential is configured
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "API_KEY environment variable is not set";

/// Shown when analysis is requested before any image was acquired
pub const NO_IMAGE_MESSAGE: &str = "Please select an image first.";

#[derive(Error, Debug)]
pub enum PaddyError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Image source error: {0}")]
    Source(#[from] SourceError),

    #[error("Diagnosis error: {0}")]
    Diagnosis(#[from] DiagnosisError),

    #[error("System error: {message}")]
    System { message: String },
}

impl PaddyError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    /// Category this error falls into for the user
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaddyError::Camera(e) => e.kind(),
            PaddyError::Source(_) => ErrorKind::Decode,
            PaddyError::Diagnosis(e) => e.kind(),
            _ => ErrorKind::Internal,
        }
    }

    /// The single message string shown to the user for this error
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => self.to_string(),
            kind => kind.user_message().to_string(),
        }
    }
}

/// User-facing error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CameraAccess,
    Decode,
    SafetyRejection,
    TransientServiceFailure,
    MissingCredential,
    Internal,
}

impl ErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::CameraAccess => CAMERA_UNAVAILABLE_MESSAGE,
            ErrorKind::Decode => DECODE_FAILURE_MESSAGE,
            ErrorKind::SafetyRejection => SAFETY_REJECTION_MESSAGE,
            ErrorKind::TransientServiceFailure => TRANSIENT_FAILURE_MESSAGE,
            ErrorKind::MissingCredential => MISSING_CREDENTIAL_MESSAGE,
            ErrorKind::Internal => "An unknown error occurred.",
        }
    }
}

/// Camera acquisition and frame capture errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera access denied for {device}: {details}")]
    PermissionDenied { device: String, details: String },

    #[error("No camera device available: {details}")]
    DeviceNotFound { details: String },

    #[error("Camera device busy: {details}")]
    Busy { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Failed to grab frame: {details}")]
    FrameGrab { details: String },

    #[error("Failed to encode frame as JPEG: {details}")]
    Encode { details: String },

    #[error("Camera stream is closed")]
    StreamClosed,
}

impl CameraError {
    /// Acquisition failures collapse into one category; a failed grab is a decode failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::PermissionDenied { .. }
            | CameraError::DeviceNotFound { .. }
            | CameraError::Busy { .. }
            | CameraError::Configuration { .. } => ErrorKind::CameraAccess,
            CameraError::FrameGrab { .. }
            | CameraError::Encode { .. }
            | CameraError::StreamClosed => ErrorKind::Decode,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

/// File-based image acquisition errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read image file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image file {} is empty", path.display())]
    Empty { path: PathBuf },
}

impl SourceError {
    pub fn user_message(&self) -> &'static str {
        ErrorKind::Decode.user_message()
    }
}

/// Inference service errors, as surfaced to callers of the diagnosis client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagnosisError {
    #[error("Inference credential is missing")]
    MissingCredential,

    #[error("Image rejected by content-safety policy: {details}")]
    SafetyRejection { details: String },

    #[error("Inference service failure: {details}")]
    TransientServiceFailure { details: String },
}

impl DiagnosisError {
    pub fn safety<S: Into<String>>(details: S) -> Self {
        Self::SafetyRejection {
            details: details.into(),
        }
    }

    pub fn transient<S: Into<String>>(details: S) -> Self {
        Self::TransientServiceFailure {
            details: details.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DiagnosisError::MissingCredential => ErrorKind::MissingCredential,
            DiagnosisError::SafetyRejection { .. } => ErrorKind::SafetyRejection,
            DiagnosisError::TransientServiceFailure { .. } => ErrorKind::TransientServiceFailure,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

/// Low-level failures of the HTTP transport to the inference service
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

pub type Result<T> = std::result::Result<T, PaddyError>;
