//! Fall monitor: temporal heuristic over person regions.
//!
//! A frame is "fall-likely" when the largest person box is wider than tall
//! beyond a threshold, or its center moves down faster than a threshold. A
//! fall is reported only after `consecutive_frames` fall-likely frames in a
//! row. Any frame without a person resets all temporal state.

use serde::{Deserialize, Serialize};

use crate::detect::{BBox, PersonDetector};
use crate::frame::Frame;

pub const REASON_NO_PERSON: &str = "no_person";
pub const REASON_DETECTOR_ERROR: &str = "detector_error";
pub const REASON_ASPECT_RATIO: &str = "aspect_ratio";
pub const REASON_VERTICAL_SPEED: &str = "vertical_speed";

/// Tunable fall heuristics. The defaults are empirical, not derived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallConfig {
    pub enabled: bool,
    /// Width/height above which a person box counts as lying down.
    pub aspect_ratio_threshold: f32,
    /// Downward center speed (px/s) above which a frame counts as falling.
    pub vertical_speed_threshold: f32,
    /// Fall-likely frames in a row required before reporting a fall.
    pub consecutive_frames: u32,
    /// Floor on the elapsed time between samples, in seconds.
    pub min_elapsed_s: f64,
    /// Minimum frame time between two diagnostic log lines, in seconds.
    pub debug_log_interval_s: f64,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            aspect_ratio_threshold: 1.2,
            vertical_speed_threshold: 300.0,
            consecutive_frames: 3,
            min_elapsed_s: 1e-3,
            debug_log_interval_s: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FallVerdict {
    /// A person region was found on this frame.
    pub found: bool,
    pub fall_detected: bool,
    /// First frame of the current reported fall.
    pub onset: bool,
    pub bbox: Option<BBox>,
    pub aspect_ratio: f32,
    pub vertical_speed_px_s: f32,
    /// Which thresholds fired on this frame, `+`-joined, or why nothing was measured.
    pub reason: String,
}

impl FallVerdict {
    fn absent(reason: &str) -> Self {
        Self {
            found: false,
            fall_detected: false,
            onset: false,
            bbox: None,
            aspect_ratio: 0.0,
            vertical_speed_px_s: 0.0,
            reason: reason.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct FallState {
    previous_center_y: Option<f32>,
    previous_timestamp: Option<f64>,
    consecutive_trigger_frames: u32,
}

pub struct FallMonitor {
    detector: Box<dyn PersonDetector>,
    config: FallConfig,
    state: FallState,
    last_log_s: Option<f64>,
}

impl FallMonitor {
    pub fn new(detector: Box<dyn PersonDetector>, config: FallConfig) -> Self {
        Self {
            detector,
            config,
            state: FallState::default(),
            last_log_s: None,
        }
    }

    pub fn config(&self) -> &FallConfig {
        &self.config
    }

    /// Current fall-likely streak.
    pub fn streak(&self) -> u32 {
        self.state.consecutive_trigger_frames
    }

    /// Forget velocity history, the current streak and the diagnostics clock.
    pub fn reset(&mut self) {
        self.state = FallState::default();
        self.last_log_s = None;
    }

    /// Feed one frame and get this frame's verdict.
    ///
    /// Elapsed time is taken from the frames' capture timestamps. A timestamp
    /// earlier than the previous sample restarts the velocity history.
    pub fn update(&mut self, frame: &Frame) -> FallVerdict {
        let regions = match self.detector.detect(frame) {
            Ok(regions) => regions,
            Err(err) => {
                log::warn!(
                    "person detector '{}' failed on frame {}: {:#}",
                    self.detector.name(),
                    frame.sequence,
                    err
                );
                self.reset();
                return FallVerdict::absent(REASON_DETECTOR_ERROR);
            }
        };

        // Largest box wins; the first one reported wins a tie.
        let Some(bbox) = regions
            .into_iter()
            .reduce(|best, b| if b.area() > best.area() { b } else { best })
        else {
            self.reset();
            return FallVerdict::absent(REASON_NO_PERSON);
        };

        let now = frame.timestamp_s;
        let aspect_ratio = bbox.aspect_ratio();
        let center_y = bbox.center().y;
        let vertical_speed = match (self.state.previous_center_y, self.state.previous_timestamp) {
            (Some(prev_y), Some(prev_t)) if now >= prev_t => {
                let dt = (now - prev_t).max(self.config.min_elapsed_s);
                ((center_y - prev_y) as f64 / dt) as f32
            }
            _ => 0.0,
        };
        self.state.previous_center_y = Some(center_y);
        self.state.previous_timestamp = Some(now);

        let aspect_fired = aspect_ratio > self.config.aspect_ratio_threshold;
        let speed_fired = vertical_speed > self.config.vertical_speed_threshold;
        if aspect_fired || speed_fired {
            self.state.consecutive_trigger_frames =
                self.state.consecutive_trigger_frames.saturating_add(1);
        } else {
            self.state.consecutive_trigger_frames = 0;
        }
        let fall_detected = self.state.consecutive_trigger_frames >= self.config.consecutive_frames;
        let onset = self.state.consecutive_trigger_frames == self.config.consecutive_frames;

        let reason = [
            (aspect_fired, REASON_ASPECT_RATIO),
            (speed_fired, REASON_VERTICAL_SPEED),
        ]
        .iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join("+");

        self.log_diagnostics(now, &bbox, aspect_ratio, vertical_speed, fall_detected);

        FallVerdict {
            found: true,
            fall_detected,
            onset,
            bbox: Some(bbox),
            aspect_ratio,
            vertical_speed_px_s: vertical_speed,
            reason,
        }
    }

    fn log_diagnostics(&mut self, now: f64, bbox: &BBox, ar: f32, vy: f32, fall: bool) {
        let due = self
            .last_log_s
            .map_or(true, |last| now - last >= self.config.debug_log_interval_s);
        if !due {
            return;
        }
        self.last_log_s = Some(now);
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        log::debug!(
            "fall_debug bbox=({:.0},{:.0},{:.0},{:.0}) ar={:.2} vy={:.1} frames={} fall={}",
            bbox.x,
            bbox.y,
            bbox.w,
            bbox.h,
            ar,
            vy,
            self.state.consecutive_trigger_frames,
            fall
        );
    }
}
