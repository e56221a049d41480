//! End-to-end pipeline scenarios through the public API, with synthetic
//! frames and scripted detectors.

use std::time::Duration;

use follow_scan_vision::{
    controller::{LABEL_CAMERA_ERROR, LABEL_NO_MARKER},
    detect::{StubFiducialDetector, StubPersonDetector, StubRecognizer},
    BBox, CalibrationRequest, FrameSource, MarkerQuad, ModeController, OperatingMode, Point,
    RawDetection, RecognizedObject, RecognizerRegistry, SkipIntervals, SourceConfig,
    StatusSnapshot, SyntheticSource, VisionConfig,
};

fn synthetic(frame_limit: Option<u64>) -> Box<dyn FrameSource> {
    Box::new(
        SyntheticSource::new(SourceConfig {
            url: "stub://scenario".to_string(),
            width: 640,
            height: 480,
            fps: 30,
            frame_limit,
        })
        .expect("synthetic source"),
    )
}

fn marker(x: f32, width: f32) -> MarkerQuad {
    MarkerQuad::square(1, Point::new(x, 240.0), width)
}

fn config(mode: OperatingMode) -> VisionConfig {
    let mut config = VisionConfig::default();
    config.mode = mode;
    config
}

#[test]
fn calibrate_then_estimate_distance() {
    // 10 calibration frames at 100 px, then the marker appears at 50 px.
    let calibration_frames = (0..10).map(|_| vec![marker(320.0, 100.0)]).collect();
    let fiducial = StubFiducialDetector::scripted(calibration_frames, vec![marker(320.0, 50.0)]);
    let mut controller = ModeController::new(
        &config(OperatingMode::Follow),
        synthetic(Some(20)),
        Box::new(fiducial),
        None,
        Box::new(StubRecognizer::none("stub")),
    )
    .expect("controller");

    let focal = controller
        .calibrate(&CalibrationRequest {
            known_distance: 50.0,
            sample_count: 10,
            timeout: Duration::from_secs(5),
        })
        .expect("calibration succeeds");
    assert!((focal - 1000.0).abs() < 1e-2, "focal {}", focal);
    assert!(controller.is_calibrated());

    let result = controller.process_frame();
    assert!(result.found);
    assert_eq!(result.label, "Marker #1");
    let distance = result.distance.expect("calibrated distance");
    assert!((distance - 100.0).abs() < 1e-2, "distance {}", distance);

    let status = StatusSnapshot::from_result(&result, controller.is_calibrated());
    assert!(status.target_locked);
    assert!(status.calibrated);
}

#[test]
fn failed_calibration_leaves_previous_focal_length() {
    let mut controller = ModeController::new(
        &config(OperatingMode::Follow),
        synthetic(None),
        Box::new(StubFiducialDetector::none()),
        None,
        Box::new(StubRecognizer::none("stub")),
    )
    .expect("controller");

    let request = CalibrationRequest {
        known_distance: 30.0,
        sample_count: 5,
        timeout: Duration::from_millis(50),
    };
    assert_eq!(controller.calibrate(&request), None);
    assert!(!controller.is_calibrated());
    assert_eq!(controller.tracker().focal_length_px(), None);
    assert_eq!(controller.tracker().estimate_distance(100.0), None);
}

#[test]
fn fall_requires_consecutive_triggering_frames() {
    // Same center so only the aspect ratio changes.
    let upright = BBox::new(280.0, 140.0, 80.0, 200.0);
    let lying = BBox::new(220.0, 200.0, 200.0, 80.0);
    let script = vec![
        vec![lying],
        vec![lying],
        vec![upright],
        vec![lying],
        vec![lying],
    ];
    let mut controller = ModeController::new(
        &config(OperatingMode::Follow),
        synthetic(None),
        Box::new(StubFiducialDetector::none()),
        Some(Box::new(StubPersonDetector::scripted(script, vec![lying]))),
        Box::new(StubRecognizer::none("stub")),
    )
    .expect("controller");

    let verdicts: Vec<bool> = (0..6)
        .map(|_| controller.process_frame().fall_detected)
        .collect();
    assert_eq!(verdicts, vec![false, false, false, false, false, true]);
}

#[test]
fn lost_person_resets_the_fall_streak() {
    let lying = BBox::new(220.0, 200.0, 200.0, 80.0);
    let script = vec![vec![lying], vec![lying], vec![], vec![lying], vec![lying]];
    let mut controller = ModeController::new(
        &config(OperatingMode::Follow),
        synthetic(None),
        Box::new(StubFiducialDetector::none()),
        Some(Box::new(StubPersonDetector::scripted(script, vec![lying]))),
        Box::new(StubRecognizer::none("stub")),
    )
    .expect("controller");

    let results: Vec<_> = (0..6).map(|_| controller.process_frame()).collect();
    assert!(results.iter().take(5).all(|r| !r.fall_detected));
    assert_eq!(results[2].fall_reason, "no_person");
    assert!(results[5].fall_detected);
    assert_eq!(results[5].label, LABEL_NO_MARKER);
}

#[test]
fn scan_skips_frames_and_mode_switch_reprocesses() {
    let recognizer = StubRecognizer::steady(
        "stub",
        vec![RecognizedObject::new(
            "cereal",
            0.7,
            BBox::new(100.0, 100.0, 100.0, 200.0),
            "",
        )],
    );
    let object_calls = recognizer.calls();
    let fiducial = StubFiducialDetector::steady(marker(500.0, 80.0));
    let marker_calls = fiducial.calls();

    let mut cfg = config(OperatingMode::Scan);
    cfg.scheduler = SkipIntervals { follow: 2, scan: 2 };
    let mut controller = ModeController::new(
        &cfg,
        synthetic(None),
        Box::new(fiducial),
        None,
        Box::new(RecognizerRegistry::new().with(recognizer)),
    )
    .expect("controller");

    for _ in 0..8 {
        let result = controller.process_frame();
        assert_eq!(result.label, "cereal");
        assert_eq!(result.distance, Some(50.0));
        assert!(result.tracking_offset < 0.0);
    }
    assert_eq!(object_calls.get(), 3);

    // Tick 8 would reuse the cached result; the switch forces a pass.
    controller.set_mode(OperatingMode::Follow);
    let result = controller.process_frame();
    assert_eq!(result.mode, OperatingMode::Follow);
    assert!(result.tracking_offset > 0.0);
    assert!(matches!(result.raw_detection, RawDetection::Marker(_)));
    assert_eq!(marker_calls.get(), 1);
}

#[test]
fn recognizer_fallback_stamps_backend_name() {
    let registry = RecognizerRegistry::new()
        .with(StubRecognizer::failing("model"))
        .with(StubRecognizer::steady(
            "color",
            vec![RecognizedObject::new("lemon", 0.5, BBox::new(300.0, 200.0, 40.0, 40.0), "")],
        ));
    let mut controller = ModeController::new(
        &config(OperatingMode::Scan),
        synthetic(None),
        Box::new(StubFiducialDetector::none()),
        None,
        Box::new(registry),
    )
    .expect("controller");

    let result = controller.process_frame();
    assert_eq!(result.label, "lemon");
    match result.raw_detection {
        RawDetection::Object(obs) => assert_eq!(obs.method, "color"),
        other => panic!("expected object detection, got {:?}", other),
    }
}

#[test]
fn exhausted_camera_reports_errors_without_caching() {
    let mut controller = ModeController::new(
        &config(OperatingMode::Follow),
        synthetic(Some(2)),
        Box::new(StubFiducialDetector::steady(marker(320.0, 60.0))),
        None,
        Box::new(StubRecognizer::none("stub")),
    )
    .expect("controller");

    assert!(controller.process_frame().found);
    assert!(controller.process_frame().found);
    for _ in 0..3 {
        let result = controller.process_frame();
        assert!(!result.found);
        assert_eq!(result.label, LABEL_CAMERA_ERROR);
    }
    let stats = controller.stats();
    assert_eq!(stats.frames_read, 2);
    assert_eq!(stats.read_failures, 3);
    assert_eq!(controller.follow_distance(), None);
}
