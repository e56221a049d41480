//! vision_demo - staged synthetic run of the follow/scan pipeline
//!
//! Runs without a camera or models:
//! 1. Calibrates the marker tracker against a marker held at a known distance
//! 2. Follows the marker as it walks away, then stages a fall
//! 3. Switches to SCAN with a failing primary recognizer and a fallback

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;

use follow_scan_vision::{
    detect::{StubFiducialDetector, StubPersonDetector, StubRecognizer},
    open_source, BBox, MarkerQuad, ModeController, OperatingMode, Point, RecognizedObject,
    RecognizerRegistry, SourceConfig, StatusSnapshot, VisionConfig,
};

#[path = "../ui.rs"]
mod ui;

const MARKER_ID: i32 = 7;
const CALIBRATION_WIDTH_PX: f32 = 100.0;

#[derive(Parser, Debug)]
#[command(
    name = "vision_demo",
    about = "Run the follow/scan pipeline against a scripted synthetic scene"
)]
struct Args {
    /// Frames to run in each of the follow and scan stages
    #[arg(long, default_value_t = 30)]
    frames: u64,

    /// Physical marker side length (cm)
    #[arg(long, default_value_t = 5.0, env = "VISION_MARKER_SIZE")]
    marker_size: f32,

    /// Distance at which the marker is held during calibration (cm)
    #[arg(long, default_value_t = 50.0)]
    calibration_distance: f32,

    /// Calibration samples to average
    #[arg(long, default_value_t = 10)]
    samples: usize,

    /// Frames skipped between processed frames in SCAN mode
    #[arg(long, default_value_t = 1)]
    scan_skip: u32,

    /// Print each status snapshot as JSON on stdout
    #[arg(long)]
    json: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    if args.frames < 4 {
        return Err(anyhow!("--frames must be at least 4"));
    }
    let ui = ui::Ui::new(ui::UiMode::parse(&args.ui), std::io::stderr().is_terminal());

    let mut config = VisionConfig::default();
    config.mode = OperatingMode::Follow;
    config.source = SourceConfig {
        url: "stub://demo".to_string(),
        ..SourceConfig::default()
    };
    config.marker.real_size = args.marker_size;
    config.marker.calibration_distance = args.calibration_distance;
    config.marker.calibration_samples = args.samples;
    config.scheduler.scan = args.scan_skip;
    config.validate()?;

    let mut controller = ModeController::new(
        &config,
        open_source(config.source.clone())?,
        Box::new(scripted_marker(args.samples, args.frames, config.source.width)),
        Some(Box::new(scripted_person(args.frames))),
        Box::new(recognizers()),
    )?;

    let focal = {
        let stage = ui.stage("Calibrate marker", 0);
        let focal = controller
            .calibrate_default()
            .ok_or_else(|| anyhow!("calibration saw no marker"))?;
        stage.note(&format!("focal length {:.1}px", focal));
        focal
    };

    let mut fall_frame = None;
    let mut last_distance = None;
    {
        let stage = ui.stage("Follow marker", args.frames);
        for i in 0..args.frames {
            let result = controller.process_frame();
            emit(&args, &StatusSnapshot::from_result(&result, controller.is_calibrated()))?;
            if result.distance.is_some() {
                last_distance = result.distance;
            }
            if result.fall_detected && fall_frame.is_none() {
                stage.note(&format!("fall detected at frame {} ({})", i, result.fall_reason));
                fall_frame = Some(i);
            }
            stage.tick();
        }
    }

    controller.set_mode(OperatingMode::Scan);
    let mut seen = Vec::new();
    {
        let stage = ui.stage("Scan for items", args.frames);
        for _ in 0..args.frames {
            let result = controller.process_frame();
            emit(&args, &StatusSnapshot::from_result(&result, controller.is_calibrated()))?;
            if result.found && !seen.contains(&result.label) {
                stage.note(&format!(
                    "recognised {} ({:.0}%)",
                    result.label,
                    result.confidence * 100.0
                ));
                seen.push(result.label.clone());
            }
            stage.tick();
        }
    }

    let stats = controller.stats();
    println!("vision_demo summary");
    println!("  focal length:     {:.1}px", focal);
    match last_distance {
        Some(d) => println!("  last distance:    {:.1}cm", d),
        None => println!("  last distance:    n/a"),
    }
    match fall_frame {
        Some(i) => println!("  fall detected:    follow frame {}", i),
        None => println!("  fall detected:    no"),
    }
    println!("  items recognised: {}", seen.join(", "));
    println!(
        "  frames:           {} read, {} processed, {} reused",
        stats.frames_read, stats.frames_processed, stats.frames_reused
    );
    Ok(())
}

fn emit(args: &Args, snapshot: &StatusSnapshot) -> Result<()> {
    if args.json {
        println!("{}", snapshot.to_json()?);
    }
    Ok(())
}

/// Calibration frames at a fixed width, then the marker drifts right while
/// walking away.
fn scripted_marker(samples: usize, frames: u64, frame_width: u32) -> StubFiducialDetector {
    let center_x = frame_width as f32 / 2.0;
    let mut queued: Vec<Vec<MarkerQuad>> = (0..samples)
        .map(|_| {
            vec![MarkerQuad::square(
                MARKER_ID,
                Point::new(center_x, 240.0),
                CALIBRATION_WIDTH_PX,
            )]
        })
        .collect();
    for i in 0..frames {
        let t = i as f32 / frames as f32;
        let width = CALIBRATION_WIDTH_PX * (1.0 - 0.5 * t);
        let x = center_x + 150.0 * t;
        queued.push(vec![MarkerQuad::square(MARKER_ID, Point::new(x, 240.0), width)]);
    }
    StubFiducialDetector::scripted(queued, vec![])
}

/// Upright for the first half of the follow stage, lying down afterwards.
fn scripted_person(frames: u64) -> StubPersonDetector {
    let upright = BBox::new(280.0, 120.0, 80.0, 200.0);
    let lying = BBox::new(220.0, 300.0, 200.0, 80.0);
    let queued = (0..frames / 2).map(|_| vec![upright]).collect();
    StubPersonDetector::scripted(queued, vec![lying])
}

fn recognizers() -> RecognizerRegistry {
    let items = vec![
        RecognizedObject::new("apple", 0.62, BBox::new(120.0, 260.0, 90.0, 80.0), ""),
        RecognizedObject::new("milk", 0.81, BBox::new(380.0, 180.0, 70.0, 150.0), ""),
    ];
    RecognizerRegistry::new()
        .with(StubRecognizer::failing("model"))
        .with(StubRecognizer::steady("color", items))
}
