//! visiond - follow/scan vision loop
//!
//! This daemon:
//! 1. Loads `VisionConfig` (file from VISION_CONFIG plus env overrides)
//! 2. Opens the configured frame source
//! 3. Runs the mode controller once per frame
//! 4. Publishes status snapshots and warns on detected falls
//! 5. Stops cleanly on Ctrl-C

use anyhow::{anyhow, Result};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use follow_scan_vision::{
    controller::LABEL_CAMERA_ERROR,
    detect::{StubFiducialDetector, StubPersonDetector, StubRecognizer},
    open_source, LogStatusSink, ModeController, ObjectRecognizer, PersonDetector,
    RecognizerRegistry, StatusSink, StatusSnapshot, VisionConfig,
};

const STATUS_INTERVAL: Duration = Duration::from_millis(500);
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);
const MAX_CONSECUTIVE_CAMERA_ERRORS: u32 = 50;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = VisionConfig::load()?;
    let source = open_source(config.source.clone())?;

    // Detection models are supplied by the host integration; the built-in
    // backends only answer with empty detections.
    log::warn!("no detection models configured; using stub detectors");
    let mut recognizer = RecognizerRegistry::new().with(StubRecognizer::none("stub"));
    recognizer.warm_up()?;
    let person = config
        .fall
        .enabled
        .then(|| Box::new(StubPersonDetector::none()) as Box<dyn PersonDetector>);
    let mut controller = ModeController::new(
        &config,
        source,
        Box::new(StubFiducialDetector::none()),
        person,
        Box::new(recognizer),
    )?;
    let mut sink = LogStatusSink::new();

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!(
        "visiond running. source={} mode={} fall_detection={}",
        controller.source_name(),
        controller.mode(),
        controller.fall_detection_enabled()
    );

    let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.source.fps));
    let mut last_status: Option<Instant> = None;
    let mut last_health_log = Instant::now();
    let mut consecutive_errors = 0u32;
    let mut fall_active = false;

    while rx.try_recv().is_err() {
        let started = Instant::now();
        let result = controller.process_frame();

        if result.label == LABEL_CAMERA_ERROR {
            consecutive_errors += 1;
            if consecutive_errors >= MAX_CONSECUTIVE_CAMERA_ERRORS {
                return Err(anyhow!(
                    "camera {} failed {} frames in a row",
                    controller.source_name(),
                    consecutive_errors
                ));
            }
        } else {
            consecutive_errors = 0;
        }

        if result.fall_detected && !fall_active {
            log::warn!("FALL DETECTED ({})", result.fall_reason);
        }
        fall_active = result.fall_detected;

        if last_status.map_or(true, |t| t.elapsed() >= STATUS_INTERVAL) {
            let snapshot = StatusSnapshot::from_result(&result, controller.is_calibrated());
            if let Err(e) = sink.publish(&snapshot) {
                log::warn!("status publish failed: {:#}", e);
            }
            last_status = Some(Instant::now());
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = controller.stats();
            log::info!(
                "health: frames_read={} processed={} reused={} read_failures={} status_published={}",
                stats.frames_read,
                stats.frames_processed,
                stats.frames_reused,
                stats.read_failures,
                sink.published()
            );
            last_health_log = Instant::now();
        }

        if let Some(remaining) = frame_period.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    log::info!("shutdown signal received, stopping...");
    let stats = controller.stats();
    log::info!(
        "visiond stopped after {} frames ({} processed)",
        stats.frames_read,
        stats.frames_processed
    );
    Ok(())
}
