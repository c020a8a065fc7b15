pub mod camera;
pub mod config;
pub mod diagnosis;
pub mod encoded;
pub mod error;
pub mod keyboard_input;
pub mod report;
pub mod session;
pub mod source;

pub use camera::{
    CameraBackend, CameraPanel, CameraStream, FacingMode, FrameCapturer, FrameCapturerBuilder,
    SyntheticCamera,
};
pub use config::PaddyConfig;
pub use diagnosis::{Analysis, DiagnosisClient, DiagnosisService, Pesticide};
pub use encoded::EncodedImage;
pub use error::{DiagnosisError, ErrorKind, PaddyError, Result};
pub use keyboard_input::{CaptureOutcome, CapturePrompt};
pub use report::Report;
pub use session::{AnalyzeOutcome, Session, SessionSnapshot};
pub use source::ImageSource;
