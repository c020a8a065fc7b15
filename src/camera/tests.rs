use super::*;
use crate::config::{CameraBackendKind, CameraConfig};
use crate::error::{CameraError, ErrorKind, PaddyError, CAMERA_UNAVAILABLE_MESSAGE, DECODE_FAILURE_MESSAGE};
use std::sync::Arc;

fn create_test_capturer(resolution: (u32, u32)) -> (SyntheticCamera, FrameCapturer) {
    let camera = SyntheticCamera::new(resolution);
    let capturer = FrameCapturer::new(Arc::new(camera.clone()), 90, 1);
    (camera, capturer)
}

fn decoded_dimensions(image: &crate::encoded::EncodedImage) -> (u32, u32) {
    use ::image::GenericImageView;
    let decoded = ::image::load_from_memory(image.bytes()).expect("capture is a valid JPEG");
    (decoded.width(), decoded.height())
}

#[test]
fn test_open_capture_close_releases_tracks() {
    let (camera, capturer) = create_test_capturer((64, 48));

    let mut stream = capturer.open(FacingMode::Environment).unwrap();
    assert_eq!(camera.live_tracks(), 1);
    assert!(capturer.is_streaming());
    assert!(stream.is_live());

    let still = stream.capture_frame().unwrap();
    assert_eq!(still.mime_type(), "image/jpeg");
    assert_eq!(still.dimensions(), Some((64, 48)));
    assert_eq!(decoded_dimensions(&still), (64, 48));

    stream.close();
    assert_eq!(camera.live_tracks(), 0);
    assert!(!capturer.is_streaming());
    assert_eq!(capturer.frames_captured(), 1);
}

#[test]
fn test_user_cancel_releases_tracks() {
    let (camera, capturer) = create_test_capturer((32, 32));

    let panel = CameraPanel::open(&capturer, FacingMode::Environment);
    assert!(panel.can_capture());
    assert_eq!(camera.live_tracks(), 1);

    panel.close();
    assert_eq!(camera.live_tracks(), 0);
    assert!(!capturer.is_streaming());
}

#[test]
fn test_forced_teardown_releases_tracks() {
    let (camera, capturer) = create_test_capturer((32, 32));

    {
        let panel = CameraPanel::open(&capturer, FacingMode::User);
        assert_eq!(camera.live_tracks(), 1);
        assert_eq!(panel.device_label(), Some("synthetic user camera"));
        // dropped mid-session without capture or close
    }
    assert_eq!(camera.live_tracks(), 0);

    let stream = capturer.open(FacingMode::Environment).unwrap();
    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let _held = stream;
        panic!("teardown during capture");
    }));
    assert!(unwound.is_err());
    assert_eq!(camera.live_tracks(), 0);
    assert!(!capturer.is_streaming());
}

#[test]
fn test_successful_panel_capture_closes_stream() {
    let (camera, capturer) = create_test_capturer((40, 30));

    let mut panel = CameraPanel::open(&capturer, FacingMode::Environment);
    let still = panel.capture().expect("capture succeeds");
    assert_eq!(still.dimensions(), Some((40, 30)));
    assert_eq!(camera.live_tracks(), 0);
    assert!(!panel.can_capture());
    assert!(panel.capture().is_none());
}

#[test]
fn test_second_open_is_refused_while_live() {
    let (camera, capturer) = create_test_capturer((16, 16));

    let first = capturer.open(FacingMode::Environment).unwrap();
    match capturer.open(FacingMode::User) {
        Err(CameraError::Busy { .. }) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("second stream must not open"),
    }
    assert_eq!(camera.tracks_started(), 1);
    assert_eq!(camera.live_tracks(), 1);

    drop(first);
    let second = capturer.open(FacingMode::User).unwrap();
    assert_eq!(camera.tracks_started(), 2);
    second.close();
    assert_eq!(camera.live_tracks(), 0);
}

#[test]
fn test_permission_denied_disables_capture() {
    let (camera, capturer) = create_test_capturer((16, 16));
    camera.deny_access(true);

    match capturer.open(FacingMode::Environment) {
        Err(e) => {
            assert_eq!(e.kind(), ErrorKind::CameraAccess);
            assert_eq!(e.user_message(), CAMERA_UNAVAILABLE_MESSAGE);
        }
        Ok(_) => panic!("open must fail when access is denied"),
    }
    assert!(!capturer.is_streaming());

    let mut panel = CameraPanel::open(&capturer, FacingMode::Environment);
    assert!(panel
        .error()
        .unwrap()
        .starts_with("Could not access camera"));
    assert!(!panel.can_capture());
    assert!(panel.capture().is_none());
    assert_eq!(camera.live_tracks(), 0);
}

#[test]
fn test_warmup_failure_releases_partial_acquisition() {
    let (camera, capturer) = create_test_capturer((16, 16));
    camera.fail_grabs(true);

    let result = capturer.open(FacingMode::Environment);
    assert!(matches!(result, Err(CameraError::Busy { .. })));
    assert_eq!(camera.tracks_started(), 1);
    assert_eq!(camera.live_tracks(), 0);
    assert!(!capturer.is_streaming());
}

#[test]
fn test_grab_failure_keeps_panel_open() {
    let (camera, capturer) = create_test_capturer((16, 16));

    let mut panel = CameraPanel::open(&capturer, FacingMode::Environment);
    camera.fail_grabs(true);
    assert!(panel.capture().is_none());
    assert_eq!(panel.error(), Some(DECODE_FAILURE_MESSAGE));
    assert!(panel.can_capture());

    camera.fail_grabs(false);
    assert!(panel.capture().is_some());
    assert_eq!(panel.error(), None);
    assert_eq!(camera.live_tracks(), 0);
}

#[test]
fn test_capture_follows_resolution_change() {
    let (camera, capturer) = create_test_capturer((64, 48));
    let mut stream = capturer.open(FacingMode::Environment).unwrap();

    let first = stream.capture_frame().unwrap();
    assert_eq!(first.dimensions(), Some((64, 48)));

    camera.set_resolution(32, 72);
    let second = stream.capture_frame().unwrap();
    assert_eq!(second.dimensions(), Some((32, 72)));
    assert_eq!(decoded_dimensions(&second), (32, 72));
}

#[test]
fn test_closed_track_reports_decode_error() {
    let camera = SyntheticCamera::new((8, 8));
    let mut track = camera.start(FacingMode::Environment).unwrap();
    track.stop();
    track.stop();
    assert_eq!(camera.live_tracks(), 0);

    let error = track.grab().unwrap_err();
    assert_eq!(error, CameraError::StreamClosed);
    assert_eq!(error.kind(), ErrorKind::Decode);
}

#[test]
fn test_raw_frame_with_stride_padding() {
    // 2x2 RGB frame with rows padded to 8 bytes
    let frame = RawFrame {
        width: 2,
        height: 2,
        stride: 8,
        data: vec![1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12],
    };
    assert!(frame.validate().is_ok());

    let rows: Vec<&[u8]> = frame.rows().collect();
    assert_eq!(rows, vec![&[1u8, 2, 3, 4, 5, 6][..], &[7u8, 8, 9, 10, 11, 12][..]]);

    let truncated = RawFrame {
        data: vec![0; 10],
        ..frame
    };
    assert!(matches!(
        truncated.validate(),
        Err(CameraError::FrameGrab { .. })
    ));
}

#[test]
fn test_facing_mode_parsing() {
    assert_eq!("environment".parse::<FacingMode>(), Ok(FacingMode::Environment));
    assert_eq!("REAR".parse::<FacingMode>(), Ok(FacingMode::Environment));
    assert_eq!("front".parse::<FacingMode>(), Ok(FacingMode::User));
    assert!("sideways".parse::<FacingMode>().is_err());
    assert_eq!(FacingMode::User.to_string(), "user");
}

#[test]
fn test_builder_requires_config() {
    match FrameCapturerBuilder::new().build() {
        Err(PaddyError::System { message }) => {
            assert!(message.contains("Camera configuration must be specified"));
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("builder must fail without configuration"),
    }
}

#[test]
fn test_builder_selects_synthetic_backend() {
    let config = CameraConfig {
        backend: CameraBackendKind::Synthetic,
        synthetic_resolution: (20, 10),
        ..CameraConfig::default()
    };

    let capturer = FrameCapturerBuilder::new().config(config).build().unwrap();
    assert_eq!(capturer.backend_name(), "synthetic");

    let mut stream = capturer.open(FacingMode::Environment).unwrap();
    assert_eq!(stream.capture_frame().unwrap().dimensions(), Some((20, 10)));
}

#[test]
fn test_auto_backend_never_substitutes_synthetic_camera() {
    match backend_from_config(&CameraConfig::default()) {
        Ok(backend) => assert_eq!(backend.name(), "gstreamer"),
        Err(e) => {
            assert_eq!(e.kind(), ErrorKind::CameraAccess);
            assert_eq!(e.user_message(), CAMERA_UNAVAILABLE_MESSAGE);
        }
    }
}

#[cfg(not(all(target_os = "linux", feature = "camera")))]
#[test]
fn test_auto_backend_without_camera_support_is_access_error() {
    let config = CameraConfig::default();
    assert_eq!(config.backend, CameraBackendKind::Auto);

    match backend_from_config(&config) {
        Err(e) => assert_eq!(e.kind(), ErrorKind::CameraAccess),
        Ok(backend) => panic!("unexpected {} backend", backend.name()),
    }

    match FrameCapturerBuilder::new().config(config).build() {
        Err(e) => assert_eq!(e.user_message(), CAMERA_UNAVAILABLE_MESSAGE),
        Ok(_) => panic!("capturer must not build without a camera"),
    }
}
