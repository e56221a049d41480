use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use follow_scan_vision::{OperatingMode, VisionConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "VISION_CONFIG",
        "VISION_SOURCE_URL",
        "VISION_MODE",
        "VISION_MARKER_SIZE",
        "VISION_FALL_ENABLED",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = VisionConfig::load().expect("load defaults");
    assert_eq!(cfg, VisionConfig::default());
    assert_eq!(cfg.source.url, "stub://camera");
    assert_eq!(cfg.mode, OperatingMode::Scan);
    assert_eq!(cfg.marker.real_size, 5.0);
    assert_eq!(cfg.marker.calibration_timeout, Duration::from_secs(10));
    assert_eq!(cfg.fall.consecutive_frames, 3);
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        ".json",
        r#"{
            "mode": "follow",
            "source": { "url": "stub://hallway", "width": 320, "height": 240, "fps": 15 },
            "marker": { "real_size": 8.0, "calibration_distance": 40.0, "calibration_samples": 5 },
            "scheduler": { "follow_skip": 1, "scan_skip": 3 },
            "fall": { "consecutive_frames": 5, "aspect_ratio_threshold": 1.5 }
        }"#,
    );
    std::env::set_var("VISION_CONFIG", file.path());
    std::env::set_var("VISION_MODE", "SCAN");
    std::env::set_var("VISION_MARKER_SIZE", "6.5");
    std::env::set_var("VISION_FALL_ENABLED", "false");

    let cfg = VisionConfig::load().expect("load config");

    assert_eq!(cfg.mode, OperatingMode::Scan);
    assert_eq!(cfg.source.url, "stub://hallway");
    assert_eq!(cfg.source.width, 320);
    assert_eq!(cfg.source.fps, 15);
    assert_eq!(cfg.marker.real_size, 6.5);
    let request = cfg.marker.calibration_request();
    assert_eq!(request.known_distance, 40.0);
    assert_eq!(request.sample_count, 5);
    assert_eq!(cfg.scheduler.follow, 1);
    assert_eq!(cfg.scheduler.scan, 3);
    assert!(!cfg.fall.enabled);
    assert_eq!(cfg.fall.consecutive_frames, 5);
    assert_eq!(cfg.fall.aspect_ratio_threshold, 1.5);
    assert_eq!(cfg.fall.vertical_speed_threshold, 300.0);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        ".toml",
        r#"
mode = "follow"

[source]
url = "stub://kitchen"

[marker]
calibration_timeout_secs = 2.5

[object_distance]
reference_extent_px = 150.0
reference_distance = 40.0
"#,
    );
    std::env::set_var("VISION_CONFIG", file.path());
    std::env::set_var("VISION_SOURCE_URL", "stub://override");

    let cfg = VisionConfig::load().expect("load toml config");
    assert_eq!(cfg.mode, OperatingMode::Follow);
    assert_eq!(cfg.source.url, "stub://override");
    assert_eq!(cfg.marker.calibration_timeout, Duration::from_millis(2500));
    assert_eq!(cfg.object_distance.reference_extent_px, 150.0);
    assert_eq!(cfg.object_distance.reference_distance, 40.0);

    clear_env();
}

#[test]
fn rejects_invalid_configs() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(".json", r#"{ "marker": { "real_size": -2.0 } }"#);
    std::env::set_var("VISION_CONFIG", file.path());
    assert!(VisionConfig::load().is_err());

    let file = write_config(".json", r#"{ "fall": { "consecutive_frames": 0 } }"#);
    std::env::set_var("VISION_CONFIG", file.path());
    assert!(VisionConfig::load().is_err());

    let file = write_config(".json", r#"{ "source": { "fps": 0 } }"#);
    std::env::set_var("VISION_CONFIG", file.path());
    assert!(VisionConfig::load().is_err());

    let file = write_config(
        ".json",
        r#"{ "scheduler": { "follow_skip": 3, "scan_skip": 1 } }"#,
    );
    std::env::set_var("VISION_CONFIG", file.path());
    assert!(VisionConfig::load().is_err());

    let file = write_config(".json", "{ not json");
    std::env::set_var("VISION_CONFIG", file.path());
    assert!(VisionConfig::load().is_err());

    clear_env();
    std::env::set_var("VISION_MODE", "drive");
    assert!(VisionConfig::load().is_err());

    clear_env();
    std::env::set_var("VISION_MARKER_SIZE", "five");
    assert!(VisionConfig::load().is_err());

    clear_env();
    std::env::set_var("VISION_FALL_ENABLED", "sometimes");
    assert!(VisionConfig::load().is_err());

    clear_env();
    std::env::set_var("VISION_CONFIG", "/nonexistent/vision.json");
    assert!(VisionConfig::load().is_err());

    clear_env();
}

#[test]
fn load_from_explicit_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(".json", r#"{ "scheduler": { "scan_skip": 4 } }"#);
    let cfg = VisionConfig::load_from(file.path()).expect("load from path");
    assert_eq!(cfg.scheduler.scan, 4);
    assert_eq!(cfg.scheduler.follow, 0);
}
