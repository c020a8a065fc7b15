mod builder;
mod capturer;
#[cfg(all(target_os = "linux", feature = "camera"))]
mod gstreamer;
mod interface;
mod mock;
mod panel;
#[cfg(test)]
mod tests;

pub use builder::{backend_from_config, FrameCapturerBuilder};
pub use capturer::{CameraStream, FrameCapturer};
#[cfg(all(target_os = "linux", feature = "camera"))]
pub use gstreamer::GStreamerCamera;
pub use interface::{CameraBackend, FacingMode, RawFrame, VideoTrack};
pub use mock::SyntheticCamera;
pub use panel::CameraPanel;
