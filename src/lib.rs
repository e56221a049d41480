//! Follow/scan vision core.
//!
//! This crate implements the frame-processing and mode-arbitration pipeline
//! of a mobile assistant robot with one camera. The robot either follows a
//! person carrying a fiducial marker (FOLLOW) or recognises grocery items
//! (SCAN), and watches for falls while following.
//!
//! # Architecture
//!
//! Frames flow one at a time:
//!
//! ```text
//! FrameSource -> ModeController -> FrameScheduler decision
//!             -> MarkerTracker (+ FallMonitor) | ObjectScanner
//!             -> VisionResult -> downstream consumers
//! ```
//!
//! The pipeline is synchronous and single-threaded. Detection models, the
//! camera, actuation and networking are external; the crate consumes them
//! through the capability traits in `detect` and `frame`, and ships stub
//! implementations for tests and bring-up.
//!
//! # Module Structure
//!
//! - `frame`: `Frame` and the `FrameSource` capture seam
//! - `ingest`: built-in frame sources (synthetic `stub://`)
//! - `detect`: detection capabilities, geometry, recognizer registry, stubs
//! - `marker`: marker detection, focal-length calibration, distance
//! - `fall`: fall heuristic with hysteresis
//! - `scanner`: best object detection and coarse object distance
//! - `scheduler`: per-mode frame skipping with a result cache
//! - `controller`: the orchestrator and the unified `VisionResult`
//! - `status`: status snapshot for the network publisher
//! - `config`: file + environment configuration

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod controller;
pub mod detect;
pub mod fall;
pub mod frame;
pub mod ingest;
pub mod marker;
pub mod scanner;
pub mod scheduler;
pub mod status;

pub use config::VisionConfig;
pub use controller::{ModeController, PipelineStats, RawDetection, VisionResult};
pub use detect::{
    BBox, FiducialDetector, MarkerQuad, ObjectRecognizer, PersonDetector, Point,
    RecognizedObject, RecognizerRegistry,
};
pub use fall::{FallConfig, FallMonitor, FallVerdict};
pub use frame::{Frame, FrameSource};
pub use ingest::{open_source, SourceConfig, SyntheticSource};
pub use marker::{CalibrationRequest, CalibrationState, MarkerObservation, MarkerTracker};
pub use scanner::{ObjectDistanceHeuristic, ObjectObservation, ObjectScanner};
pub use scheduler::{FrameScheduler, ProcessReason, ScheduleDecision, SkipIntervals};
pub use status::{LogStatusSink, StatusSink, StatusSnapshot};

// -------------------- Operating Mode --------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Follow the person carrying the marker.
    Follow,
    /// Recognise grocery items.
    #[default]
    Scan,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Follow => "follow",
            OperatingMode::Scan => "scan",
        }
    }

    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            OperatingMode::Follow => OperatingMode::Scan,
            OperatingMode::Scan => OperatingMode::Follow,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow" => Ok(OperatingMode::Follow),
            "scan" => Ok(OperatingMode::Scan),
            other => Err(anyhow!("unknown mode '{}' (expected follow or scan)", other)),
        }
    }
}
