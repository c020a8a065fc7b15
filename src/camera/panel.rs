use super::capturer::{CameraStream, FrameCapturer};
use super::interface::FacingMode;
use crate::encoded::EncodedImage;
use tracing::{error, info, warn};

/// State of the camera capture dialog: an open stream, or the error that
/// prevented opening it.
///
/// Capture is only possible while the stream is open. The stream is released
/// when the panel is closed, after a successful capture, or when the panel is
/// dropped.
pub struct CameraPanel {
    stream: Option<CameraStream>,
    error: Option<String>,
}

impl CameraPanel {
    /// Open the camera. Failure never escapes; it is recorded on the panel.
    pub fn open(capturer: &FrameCapturer, facing: FacingMode) -> Self {
        match capturer.open(facing) {
            Ok(stream) => Self {
                stream: Some(stream),
                error: None,
            },
            Err(e) => {
                error!("Error accessing camera: {}", e);
                Self {
                    stream: None,
                    error: Some(e.user_message().to_string()),
                }
            }
        }
    }

    /// Message to show instead of the live view, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the capture control is enabled
    pub fn can_capture(&self) -> bool {
        self.stream.is_some()
    }

    /// Label of the open device
    pub fn device_label(&self) -> Option<&str> {
        self.stream.as_ref().map(|stream| stream.label())
    }

    /// Take a still. A successful capture closes the stream; a failed grab
    /// leaves it open so the user can try again. Disabled capture is a no-op.
    pub fn capture(&mut self) -> Option<EncodedImage> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                warn!("Capture requested while the camera is unavailable");
                return None;
            }
        };

        match stream.capture_frame() {
            Ok(image) => {
                self.error = None;
                self.close_stream();
                Some(image)
            }
            Err(e) => {
                error!("Frame capture failed: {}", e);
                self.error = Some(e.user_message().to_string());
                None
            }
        }
    }

    /// Cancel the dialog, releasing the camera
    pub fn close(mut self) {
        self.close_stream();
    }

    fn close_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            info!("Closing camera panel");
            stream.close();
        }
    }
}
