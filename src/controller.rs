//! Mode controller: the per-frame orchestrator.
//!
//! The controller owns the active mode, the camera, the three detection
//! components and the frame scheduler. `process_frame` pulls one frame,
//! asks the scheduler whether to run detection, routes the frame through
//! the marker tracker (FOLLOW, plus the fall monitor) or the object scanner
//! (SCAN), and returns one `VisionResult`.
//!
//! The controller is not meant for concurrent use. A host that drives it
//! from several threads must serialise `process_frame`, `set_mode` and
//! `calibrate` behind one lock.

use anyhow::Result;
use serde::Serialize;

use crate::config::VisionConfig;
use crate::detect::{BBox, FiducialDetector, ObjectRecognizer, PersonDetector, Point};
use crate::fall::{FallMonitor, FallVerdict};
use crate::frame::{Frame, FrameSource};
use crate::marker::{CalibrationRequest, MarkerObservation, MarkerTracker};
use crate::scanner::{ObjectObservation, ObjectScanner};
use crate::scheduler::{FrameScheduler, ScheduleDecision};
use crate::OperatingMode;

pub const LABEL_CAMERA_ERROR: &str = "Camera error";
pub const LABEL_NO_MARKER: &str = "No marker detected";
pub const LABEL_NO_OBJECTS: &str = "No objects detected";
pub const LABEL_UNCALIBRATED_SUFFIX: &str = " (Uncalibrated)";

/// Detector output attached to a result. Dispatched on `mode`: FOLLOW
/// results carry a marker observation, SCAN results an object observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawDetection {
    Marker(MarkerObservation),
    Object(ObjectObservation),
    None,
}

/// Unified per-frame output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisionResult {
    pub mode: OperatingMode,
    pub found: bool,
    pub label: String,
    pub confidence: f32,
    pub center: Option<Point>,
    pub bbox: Option<BBox>,
    /// `None` when unknown (no target, or marker seen but uncalibrated).
    pub distance: Option<f32>,
    /// Horizontal steering signal in `[-1, 1]`, positive to the right.
    pub tracking_offset: f32,
    pub fall_detected: bool,
    pub fall_reason: String,
    pub fall_bbox: Option<BBox>,
    pub raw_detection: RawDetection,
}

impl VisionResult {
    /// A "nothing found" result with no detector output attached.
    pub fn empty(mode: OperatingMode, label: &str) -> Self {
        Self {
            mode,
            found: false,
            label: label.to_string(),
            confidence: 0.0,
            center: None,
            bbox: None,
            distance: None,
            tracking_offset: 0.0,
            fall_detected: false,
            fall_reason: String::new(),
            fall_bbox: None,
            raw_detection: RawDetection::None,
        }
    }

    pub fn camera_error(mode: OperatingMode) -> Self {
        Self::empty(mode, LABEL_CAMERA_ERROR)
    }

    fn with_fall(mut self, verdict: Option<FallVerdict>) -> Self {
        if let Some(verdict) = verdict {
            self.fall_detected = verdict.fall_detected;
            self.fall_reason = verdict.reason;
            self.fall_bbox = verdict.bbox;
        }
        self
    }
}

/// Frame counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub frames_read: u64,
    pub read_failures: u64,
    pub frames_processed: u64,
    pub frames_reused: u64,
}

pub struct ModeController {
    mode: OperatingMode,
    source: Box<dyn FrameSource>,
    tracker: MarkerTracker,
    scanner: ObjectScanner,
    fall_monitor: Option<FallMonitor>,
    fall_enabled: bool,
    scheduler: FrameScheduler,
    calibration_defaults: CalibrationRequest,
    stats: PipelineStats,
}

impl ModeController {
    /// Build a controller from configuration and injected capabilities.
    ///
    /// Without a person detector, fall detection stays off regardless of
    /// `config.fall.enabled`.
    pub fn new(
        config: &VisionConfig,
        source: Box<dyn FrameSource>,
        fiducial: Box<dyn FiducialDetector>,
        person: Option<Box<dyn PersonDetector>>,
        recognizer: Box<dyn ObjectRecognizer>,
    ) -> Result<Self> {
        let tracker = MarkerTracker::new(fiducial, config.marker.real_size)?;
        let scanner = ObjectScanner::new(recognizer, config.object_distance.clone());
        let fall_monitor = person.map(|detector| FallMonitor::new(detector, config.fall.clone()));
        let fall_enabled = config.fall.enabled && fall_monitor.is_some();
        if config.fall.enabled && !fall_enabled {
            log::warn!("fall detection enabled but no person detector supplied; disabled");
        }

        Ok(Self {
            mode: config.mode,
            source,
            tracker,
            scanner,
            fall_monitor,
            fall_enabled,
            scheduler: FrameScheduler::new(config.scheduler),
            calibration_defaults: config.marker.calibration_request(),
            stats: PipelineStats::default(),
        })
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Switch the active mode. Takes effect on the next processed frame.
    ///
    /// Leaving FOLLOW resets the fall monitor so no velocity history
    /// survives into the next FOLLOW session.
    pub fn set_mode(&mut self, mode: OperatingMode) {
        if mode == self.mode {
            return;
        }
        if self.mode == OperatingMode::Follow {
            if let Some(monitor) = self.fall_monitor.as_mut() {
                monitor.reset();
            }
        }
        log::info!("mode changed: {} -> {}", self.mode, mode);
        self.mode = mode;
    }

    pub fn fall_detection_enabled(&self) -> bool {
        self.fall_enabled
    }

    /// Turn fall detection on or off. Stays off without a person detector.
    pub fn set_fall_detection(&mut self, enabled: bool) {
        self.fall_enabled = enabled && self.fall_monitor.is_some();
        if !self.fall_enabled {
            if let Some(monitor) = self.fall_monitor.as_mut() {
                monitor.reset();
            }
        }
    }

    pub fn tracker(&self) -> &MarkerTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn is_calibrated(&self) -> bool {
        self.tracker.is_calibrated()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Capture and process one frame in the current mode.
    pub fn process_frame(&mut self) -> VisionResult {
        let frame = match self.source.read() {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.read_failures += 1;
                log::warn!("frame read from {} failed: {:#}", self.source.name(), err);
                return VisionResult::camera_error(self.mode);
            }
        };
        self.stats.frames_read += 1;

        match self.scheduler.decide(self.mode) {
            ScheduleDecision::Reuse(cached) => {
                self.stats.frames_reused += 1;
                cached
            }
            ScheduleDecision::Process(_) => {
                let result = match self.mode {
                    OperatingMode::Follow => self.process_follow(&frame),
                    OperatingMode::Scan => self.process_scan(&frame),
                };
                self.stats.frames_processed += 1;
                self.scheduler.store(result.clone());
                result
            }
        }
    }

    fn process_follow(&mut self, frame: &Frame) -> VisionResult {
        let detection = self.tracker.detect(frame);
        let fall = if self.fall_enabled {
            self.fall_monitor.as_mut().map(|m| m.update(frame))
        } else {
            None
        };
        if let Some(verdict) = fall.as_ref().filter(|v| v.fall_detected) {
            if verdict.onset {
                log::warn!(
                    "fall detected on frame {} ({})",
                    frame.sequence,
                    verdict.reason
                );
            } else {
                log::debug!("fall ongoing on frame {}", frame.sequence);
            }
        }

        if !detection.found {
            return VisionResult {
                raw_detection: RawDetection::Marker(detection),
                ..VisionResult::empty(OperatingMode::Follow, LABEL_NO_MARKER)
            }
            .with_fall(fall);
        }

        let mut label = match detection.marker_id {
            Some(id) => format!("Marker #{}", id),
            None => "Marker".to_string(),
        };
        if !self.tracker.is_calibrated() {
            label.push_str(LABEL_UNCALIBRATED_SUFFIX);
        }

        VisionResult {
            mode: OperatingMode::Follow,
            found: true,
            label,
            confidence: 1.0,
            center: detection.center,
            bbox: detection.bbox,
            distance: detection.distance,
            tracking_offset: detection
                .center
                .map_or(0.0, |c| frame.horizontal_offset(c.x)),
            fall_detected: false,
            fall_reason: String::new(),
            fall_bbox: None,
            raw_detection: RawDetection::Marker(detection),
        }
        .with_fall(fall)
    }

    fn process_scan(&mut self, frame: &Frame) -> VisionResult {
        let Some(detection) = self.scanner.get_best_detection(frame) else {
            return VisionResult::empty(OperatingMode::Scan, LABEL_NO_OBJECTS);
        };

        VisionResult {
            mode: OperatingMode::Scan,
            found: true,
            label: detection.label.clone(),
            confidence: detection.confidence,
            center: Some(detection.center),
            bbox: Some(detection.bbox),
            distance: detection.distance,
            tracking_offset: frame.horizontal_offset(detection.center.x),
            fall_detected: false,
            fall_reason: String::new(),
            fall_bbox: None,
            raw_detection: RawDetection::Object(detection),
        }
    }

    /// Calibrate the marker tracker from the camera.
    ///
    /// On success the cached result is dropped so the next frame reports
    /// calibrated distances. Returns the new focal length, or `None` when no
    /// marker was seen before the timeout (state unchanged).
    pub fn calibrate(&mut self, request: &CalibrationRequest) -> Option<f32> {
        let focal = self.tracker.calibrate(self.source.as_mut(), request)?;
        self.scheduler.invalidate();
        Some(focal)
    }

    /// Calibrate with the configured distance, sample count and timeout.
    pub fn calibrate_default(&mut self) -> Option<f32> {
        let request = self.calibration_defaults.clone();
        self.calibrate(&request)
    }

    /// One-shot distance to the marker, outside the frame schedule.
    ///
    /// `None` when the frame read fails, no marker is visible, or the
    /// tracker is uncalibrated.
    pub fn follow_distance(&mut self) -> Option<f32> {
        let frame = match self.source.read() {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.read_failures += 1;
                log::warn!("frame read from {} failed: {:#}", self.source.name(), err);
                return None;
            }
        };
        self.stats.frames_read += 1;
        self.tracker.detect(&frame).distance
    }
}
