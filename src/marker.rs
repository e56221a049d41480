//! Marker tracker: fiducial detection, focal-length calibration and
//! pinhole distance estimation.
//!
//! Distance is only ever derived from the calibrated focal length through
//! `distance = real_size * focal_length / pixel_width`. Calibration and live
//! tracking both go through `CalibrationState`.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::detect::{BBox, FiducialDetector, MarkerQuad, Point};
use crate::frame::{Frame, FrameSource};

/// Pause between frame reads after a failed read during calibration.
const CALIBRATION_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Result of one marker detection attempt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerObservation {
    pub found: bool,
    pub marker_id: Option<i32>,
    /// Mean of the four corners.
    pub center: Option<Point>,
    /// Average of the top and bottom edge lengths; 0 when not found.
    pub pixel_width: f32,
    pub corners: Option<[Point; 4]>,
    /// Axis-aligned box around the corners.
    pub bbox: Option<BBox>,
    /// Estimated distance; `None` while uncalibrated.
    pub distance: Option<f32>,
}

impl MarkerObservation {
    pub fn not_found() -> Self {
        Self {
            found: false,
            marker_id: None,
            center: None,
            pixel_width: 0.0,
            corners: None,
            bbox: None,
            distance: None,
        }
    }

    /// Marker center relative to the frame center, each axis in `[-1, 1]`.
    ///
    /// Positive x is right of center, positive y is below center.
    pub fn normalized_center(&self, width: u32, height: u32) -> Option<(f32, f32)> {
        let center = self.center?;
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        if half_w <= 0.0 || half_h <= 0.0 {
            return None;
        }
        Some((
            ((center.x - half_w) / half_w).clamp(-1.0, 1.0),
            ((center.y - half_h) / half_h).clamp(-1.0, 1.0),
        ))
    }
}

/// Focal-length calibration for one physical marker size.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationState {
    focal_length_px: Option<f32>,
    marker_real_size: f32,
}

impl CalibrationState {
    pub fn new(marker_real_size: f32) -> Result<Self> {
        if !(marker_real_size > 0.0) {
            return Err(anyhow!(
                "marker real size must be > 0 (got {})",
                marker_real_size
            ));
        }
        Ok(Self {
            focal_length_px: None,
            marker_real_size,
        })
    }

    pub fn focal_length_px(&self) -> Option<f32> {
        self.focal_length_px
    }

    pub fn marker_real_size(&self) -> f32 {
        self.marker_real_size
    }

    pub fn is_calibrated(&self) -> bool {
        self.focal_length_px.is_some()
    }

    /// Pinhole distance for a marker seen `pixel_width` pixels wide.
    ///
    /// `None` while uncalibrated, and for non-positive widths.
    pub fn estimate_distance(&self, pixel_width: f32) -> Option<f32> {
        let focal = self.focal_length_px?;
        if !(pixel_width > 0.0) {
            return None;
        }
        Some(self.marker_real_size * focal / pixel_width)
    }

    /// Focal length that makes a marker `pixel_width` wide sit at `known_distance`.
    fn focal_length_for(&self, pixel_width: f32, known_distance: f32) -> f32 {
        pixel_width * known_distance / self.marker_real_size
    }
}

/// Parameters for one calibration run.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationRequest {
    /// Distance the marker is held at, in the marker size's unit.
    pub known_distance: f32,
    pub sample_count: usize,
    pub timeout: Duration,
}

impl Default for CalibrationRequest {
    fn default() -> Self {
        Self {
            known_distance: 30.0,
            sample_count: 15,
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct MarkerTracker {
    detector: Box<dyn FiducialDetector>,
    calibration: CalibrationState,
}

impl MarkerTracker {
    pub fn new(detector: Box<dyn FiducialDetector>, marker_real_size: f32) -> Result<Self> {
        Ok(Self {
            detector,
            calibration: CalibrationState::new(marker_real_size)?,
        })
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn focal_length_px(&self) -> Option<f32> {
        self.calibration.focal_length_px()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    pub fn estimate_distance(&self, pixel_width: f32) -> Option<f32> {
        self.calibration.estimate_distance(pixel_width)
    }

    /// Detect the first marker the detector reports in `frame`.
    ///
    /// A detector error counts as "no marker" for this frame.
    pub fn detect(&mut self, frame: &Frame) -> MarkerObservation {
        let markers = match self.detector.detect(frame) {
            Ok(markers) => markers,
            Err(err) => {
                log::warn!(
                    "fiducial detector '{}' failed on frame {}: {:#}",
                    self.detector.name(),
                    frame.sequence,
                    err
                );
                return MarkerObservation::not_found();
            }
        };
        // Detector order is kept; no re-sorting.
        match markers.first() {
            Some(marker) => self.observe(marker),
            None => MarkerObservation::not_found(),
        }
    }

    fn observe(&self, marker: &MarkerQuad) -> MarkerObservation {
        let c = &marker.corners;
        let center = Point::new(
            c.iter().map(|p| p.x).sum::<f32>() / 4.0,
            c.iter().map(|p| p.y).sum::<f32>() / 4.0,
        );
        let top = c[0].distance(&c[1]);
        let bottom = c[2].distance(&c[3]);
        let pixel_width = (top + bottom) / 2.0;

        MarkerObservation {
            found: true,
            marker_id: Some(marker.id),
            center: Some(center),
            pixel_width,
            corners: Some(*c),
            bbox: BBox::enclosing(c),
            distance: self.calibration.estimate_distance(pixel_width),
        }
    }

    /// Calibrate the focal length from a marker held at a known distance.
    ///
    /// Pulls frames from `source` until `sample_count` markers were measured
    /// or `timeout` elapsed, whichever comes first. Returns the new focal
    /// length, or `None` when no sample was collected; the previous
    /// calibration is then left untouched.
    pub fn calibrate(
        &mut self,
        source: &mut dyn FrameSource,
        request: &CalibrationRequest,
    ) -> Option<f32> {
        if !(request.known_distance > 0.0) {
            log::warn!(
                "calibration rejected: known distance must be > 0 (got {})",
                request.known_distance
            );
            return None;
        }

        let start = Instant::now();
        let mut widths = Vec::with_capacity(request.sample_count);
        let mut read_failures = 0u64;
        while widths.len() < request.sample_count && start.elapsed() < request.timeout {
            let frame = match source.read() {
                Ok(frame) => frame,
                Err(err) => {
                    if read_failures == 0 {
                        log::warn!("calibration: frame read failed, retrying: {:#}", err);
                    }
                    read_failures += 1;
                    let remaining = request.timeout.saturating_sub(start.elapsed());
                    std::thread::sleep(remaining.min(CALIBRATION_RETRY_DELAY));
                    continue;
                }
            };
            let observation = self.detect(&frame);
            if observation.found && observation.pixel_width > 0.0 {
                widths.push(observation.pixel_width);
            }
        }

        if read_failures > 0 {
            log::debug!("calibration: {} frame reads failed", read_failures);
        }
        if widths.is_empty() {
            log::warn!(
                "calibration failed: no marker seen within {:?}",
                request.timeout
            );
            return None;
        }

        let mean_width = widths.iter().sum::<f32>() / widths.len() as f32;
        let focal = self
            .calibration
            .focal_length_for(mean_width, request.known_distance);
        self.calibration.focal_length_px = Some(focal);
        log::info!(
            "calibrated focal length {:.1}px from {} samples (mean width {:.1}px at {})",
            focal,
            widths.len(),
            mean_width,
            request.known_distance
        );
        Some(focal)
    }
}
