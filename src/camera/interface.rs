use crate::error::CameraError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user (at the crop)
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

impl FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            other => Err(format!(
                "unknown facing mode '{}' (expected 'environment' or 'user')",
                other
            )),
        }
    }
}

/// One uncompressed RGB24 frame pulled from a live track
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes per row, at least `width * 3`
    pub stride: usize,
    /// Pixel rows, `stride` bytes apart
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Create a tightly packed RGB24 frame
    pub fn packed(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width as usize * 3,
            data,
        }
    }

    /// Check that the buffer holds every row the dimensions promise
    pub fn validate(&self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::FrameGrab {
                details: format!("empty frame ({}x{})", self.width, self.height),
            });
        }

        let row_bytes = self.width as usize * 3;
        if self.stride < row_bytes {
            return Err(CameraError::FrameGrab {
                details: format!("stride {} shorter than row of {} bytes", self.stride, row_bytes),
            });
        }

        let required = self.stride * (self.height as usize - 1) + row_bytes;
        if self.data.len() < required {
            return Err(CameraError::FrameGrab {
                details: format!(
                    "truncated frame: {} bytes for {}x{} (need {})",
                    self.data.len(),
                    self.width,
                    self.height,
                    required
                ),
            });
        }

        Ok(())
    }

    /// Iterate over the pixel rows without stride padding
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.width as usize * 3;
        self.data
            .chunks(self.stride)
            .take(self.height as usize)
            .map(move |row| &row[..row_bytes])
    }
}

/// A source of camera streams (a platform camera stack or a software stand-in)
pub trait CameraBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Acquire a device for the given facing and start hardware capture
    fn start(&self, facing: FacingMode) -> Result<Box<dyn VideoTrack>, CameraError>;
}

/// A running video track. Hardware stays busy until `stop` is called.
pub trait VideoTrack: Send {
    /// Human readable device label
    fn label(&self) -> &str;

    /// Pull the most recent frame, waiting for one if necessary
    fn grab(&mut self) -> Result<RawFrame, CameraError>;

    /// Stop capture and release the device
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}
