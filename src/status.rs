//! Status snapshot for the downstream network publisher.
//!
//! The publisher only sees a flat subset of `VisionResult`. The field names
//! match what the robot's status channel already consumes.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::controller::VisionResult;
use crate::OperatingMode;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusSnapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: OperatingMode,
    /// FOLLOW: a marker is locked.
    pub target_locked: bool,
    pub label: String,
    /// SCAN: the recognised item, if any.
    pub detected_object: Option<String>,
    pub confidence: f32,
    pub distance: Option<f32>,
    pub tracking_offset: f32,
    pub fall_detected: bool,
    pub fall_reason: String,
    pub calibrated: bool,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl StatusSnapshot {
    pub fn from_result(result: &VisionResult, calibrated: bool) -> Self {
        let follow = result.mode == OperatingMode::Follow;
        let scan = result.mode == OperatingMode::Scan;
        Self {
            kind: "status",
            mode: result.mode,
            target_locked: follow && result.found,
            label: result.label.clone(),
            detected_object: (scan && result.found).then(|| result.label.clone()),
            confidence: result.confidence,
            distance: result.distance,
            tracking_offset: result.tracking_offset,
            fall_detected: result.fall_detected,
            fall_reason: result.fall_reason.clone(),
            calibrated,
            timestamp: unix_now(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| anyhow!("status serialization failed: {}", e))
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Downstream consumer of status snapshots.
pub trait StatusSink {
    fn publish(&mut self, status: &StatusSnapshot) -> Result<()>;
}

/// Writes each snapshot as one JSON line at `info`.
#[derive(Debug, Default)]
pub struct LogStatusSink {
    published: u64,
}

impl LogStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl StatusSink for LogStatusSink {
    fn publish(&mut self, status: &StatusSnapshot) -> Result<()> {
        log::info!("status {}", status.to_json()?);
        self.published += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BBox, Point};

    fn follow_result() -> VisionResult {
        VisionResult {
            found: true,
            label: "Marker #3".to_string(),
            confidence: 1.0,
            center: Some(Point::new(400.0, 240.0)),
            bbox: Some(BBox::new(350.0, 190.0, 100.0, 100.0)),
            distance: Some(42.0),
            tracking_offset: 0.25,
            ..VisionResult::empty(OperatingMode::Follow, "")
        }
    }

    #[test]
    fn follow_snapshot_locks_target() {
        let snapshot = StatusSnapshot::from_result(&follow_result(), true);
        assert!(snapshot.target_locked);
        assert_eq!(snapshot.detected_object, None);
        assert_eq!(snapshot.distance, Some(42.0));
        assert!(snapshot.calibrated);
        assert!(snapshot.timestamp > 0.0);
    }

    #[test]
    fn scan_snapshot_names_object() {
        let mut result = VisionResult::empty(OperatingMode::Scan, "apple");
        result.found = true;
        result.confidence = 0.8;
        let snapshot = StatusSnapshot::from_result(&result, false);
        assert!(!snapshot.target_locked);
        assert_eq!(snapshot.detected_object.as_deref(), Some("apple"));

        let missing = VisionResult::empty(OperatingMode::Scan, "No objects detected");
        assert_eq!(StatusSnapshot::from_result(&missing, false).detected_object, None);
    }

    #[test]
    fn json_uses_publisher_field_names() {
        let json = StatusSnapshot::from_result(&follow_result(), false)
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["mode"], "follow");
        assert_eq!(value["target_locked"], true);
        assert_eq!(value["fall_reason"], "");
    }

    #[test]
    fn log_sink_counts_publications() {
        let mut sink = LogStatusSink::new();
        let snapshot = StatusSnapshot::from_result(&follow_result(), true);
        sink.publish(&snapshot).unwrap();
        sink.publish(&snapshot).unwrap();
        assert_eq!(sink.published(), 2);
    }
}
