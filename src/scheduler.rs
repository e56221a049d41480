//! Frame scheduler: per-mode frame skipping with a one-entry result cache.
//!
//! Every call to `decide` counts one frame. A frame is processed when the
//! pre-increment counter is a multiple of `interval + 1`, when nothing is
//! cached yet, or when the cached result belongs to another mode. Otherwise
//! the cached result is handed back verbatim.

use serde::{Deserialize, Serialize};

use crate::controller::VisionResult;
use crate::OperatingMode;

/// Frames skipped between two processed frames, per mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipIntervals {
    pub follow: u32,
    pub scan: u32,
}

impl Default for SkipIntervals {
    fn default() -> Self {
        // Marker detection is cheap; object recognition is not.
        Self { follow: 0, scan: 1 }
    }
}

impl SkipIntervals {
    pub fn for_mode(&self, mode: OperatingMode) -> u32 {
        match mode {
            OperatingMode::Follow => self.follow,
            OperatingMode::Scan => self.scan,
        }
    }
}

/// Why a frame is being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessReason {
    /// Nothing cached yet.
    Empty,
    /// The cached result belongs to another mode.
    ModeChanged,
    /// The skip interval elapsed.
    Interval,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScheduleDecision {
    Process(ProcessReason),
    Reuse(VisionResult),
}

pub struct FrameScheduler {
    intervals: SkipIntervals,
    last_result: Option<VisionResult>,
    frame_counter: u64,
}

impl FrameScheduler {
    pub fn new(intervals: SkipIntervals) -> Self {
        Self {
            intervals,
            last_result: None,
            frame_counter: 0,
        }
    }

    pub fn intervals(&self) -> SkipIntervals {
        self.intervals
    }

    /// Frames seen so far.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn cached(&self) -> Option<&VisionResult> {
        self.last_result.as_ref()
    }

    /// Decide whether the current frame in `mode` needs a detector pass.
    pub fn decide(&mut self, mode: OperatingMode) -> ScheduleDecision {
        let tick = self.frame_counter;
        self.frame_counter = self.frame_counter.wrapping_add(1);
        let period = self.intervals.for_mode(mode) as u64 + 1;

        let decision = match &self.last_result {
            None => ScheduleDecision::Process(ProcessReason::Empty),
            Some(cached) if cached.mode != mode => {
                ScheduleDecision::Process(ProcessReason::ModeChanged)
            }
            Some(_) if tick % period == 0 => ScheduleDecision::Process(ProcessReason::Interval),
            Some(cached) => ScheduleDecision::Reuse(cached.clone()),
        };
        log::debug!(
            "frame {} ({}): {}",
            tick,
            mode,
            match &decision {
                ScheduleDecision::Process(reason) => format!("process ({:?})", reason),
                ScheduleDecision::Reuse(_) => "reuse".to_string(),
            }
        );
        decision
    }

    /// Cache a freshly processed result.
    pub fn store(&mut self, result: VisionResult) {
        self.last_result = Some(result);
    }

    /// Drop the cached result so the next frame is processed.
    pub fn invalidate(&mut self) {
        self.last_result = None;
    }
}
