use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::fall::FallConfig;
use crate::ingest::SourceConfig;
use crate::marker::CalibrationRequest;
use crate::scanner::ObjectDistanceHeuristic;
use crate::scheduler::SkipIntervals;
use crate::OperatingMode;

const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_SOURCE_FPS: u32 = 30;
const DEFAULT_MARKER_SIZE: f32 = 5.0;
const DEFAULT_CALIBRATION_DISTANCE: f32 = 30.0;
const DEFAULT_CALIBRATION_SAMPLES: usize = 15;
const DEFAULT_CALIBRATION_TIMEOUT_SECS: f64 = 10.0;

#[derive(Debug, Deserialize, Default)]
struct VisionConfigFile {
    mode: Option<String>,
    source: Option<SourceConfigFile>,
    marker: Option<MarkerConfigFile>,
    scheduler: Option<SchedulerConfigFile>,
    fall: Option<FallConfigFile>,
    object_distance: Option<ObjectDistanceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct MarkerConfigFile {
    real_size: Option<f32>,
    calibration_distance: Option<f32>,
    calibration_samples: Option<usize>,
    calibration_timeout_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SchedulerConfigFile {
    follow_skip: Option<u32>,
    scan_skip: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct FallConfigFile {
    enabled: Option<bool>,
    aspect_ratio_threshold: Option<f32>,
    vertical_speed_threshold: Option<f32>,
    consecutive_frames: Option<u32>,
    min_elapsed_secs: Option<f64>,
    debug_log_interval_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ObjectDistanceConfigFile {
    reference_extent_px: Option<f32>,
    reference_distance: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionConfig {
    pub mode: OperatingMode,
    pub source: SourceConfig,
    pub marker: MarkerSettings,
    pub scheduler: SkipIntervals,
    pub fall: FallConfig,
    pub object_distance: ObjectDistanceHeuristic,
}

/// Marker geometry and calibration defaults. Distances share the unit of
/// `real_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSettings {
    pub real_size: f32,
    pub calibration_distance: f32,
    pub calibration_samples: usize,
    pub calibration_timeout: Duration,
}

impl MarkerSettings {
    pub fn calibration_request(&self) -> CalibrationRequest {
        CalibrationRequest {
            known_distance: self.calibration_distance,
            sample_count: self.calibration_samples,
            timeout: self.calibration_timeout,
        }
    }
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            real_size: DEFAULT_MARKER_SIZE,
            calibration_distance: DEFAULT_CALIBRATION_DISTANCE,
            calibration_samples: DEFAULT_CALIBRATION_SAMPLES,
            calibration_timeout: Duration::from_secs_f64(DEFAULT_CALIBRATION_TIMEOUT_SECS),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            source: SourceConfig {
                url: DEFAULT_SOURCE_URL.to_string(),
                width: DEFAULT_SOURCE_WIDTH,
                height: DEFAULT_SOURCE_HEIGHT,
                fps: DEFAULT_SOURCE_FPS,
                frame_limit: None,
            },
            marker: MarkerSettings::default(),
            scheduler: SkipIntervals::default(),
            fall: FallConfig::default(),
            object_distance: ObjectDistanceHeuristic::default(),
        }
    }
}

impl VisionConfig {
    /// Load from `VISION_CONFIG` (JSON, or TOML for `.toml` paths) if set,
    /// then apply environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("VISION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path, with environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: VisionConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let mode = match file.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => defaults.mode,
        };

        let source_file = file.source.unwrap_or_default();
        let source = SourceConfig {
            url: source_file.url.unwrap_or(defaults.source.url),
            width: source_file.width.unwrap_or(defaults.source.width),
            height: source_file.height.unwrap_or(defaults.source.height),
            fps: source_file.fps.unwrap_or(defaults.source.fps),
            frame_limit: None,
        };

        let marker_file = file.marker.unwrap_or_default();
        let timeout_secs = marker_file
            .calibration_timeout_secs
            .unwrap_or(DEFAULT_CALIBRATION_TIMEOUT_SECS);
        let calibration_timeout = Duration::try_from_secs_f64(timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .ok_or_else(|| {
                anyhow!("marker.calibration_timeout_secs must be a positive number of seconds")
            })?;
        let marker = MarkerSettings {
            real_size: marker_file.real_size.unwrap_or(defaults.marker.real_size),
            calibration_distance: marker_file
                .calibration_distance
                .unwrap_or(defaults.marker.calibration_distance),
            calibration_samples: marker_file
                .calibration_samples
                .unwrap_or(defaults.marker.calibration_samples),
            calibration_timeout,
        };

        let scheduler_file = file.scheduler.unwrap_or_default();
        let scheduler = SkipIntervals {
            follow: scheduler_file
                .follow_skip
                .unwrap_or(defaults.scheduler.follow),
            scan: scheduler_file.scan_skip.unwrap_or(defaults.scheduler.scan),
        };

        let fall_file = file.fall.unwrap_or_default();
        let fall = FallConfig {
            enabled: fall_file.enabled.unwrap_or(defaults.fall.enabled),
            aspect_ratio_threshold: fall_file
                .aspect_ratio_threshold
                .unwrap_or(defaults.fall.aspect_ratio_threshold),
            vertical_speed_threshold: fall_file
                .vertical_speed_threshold
                .unwrap_or(defaults.fall.vertical_speed_threshold),
            consecutive_frames: fall_file
                .consecutive_frames
                .unwrap_or(defaults.fall.consecutive_frames),
            min_elapsed_s: fall_file
                .min_elapsed_secs
                .unwrap_or(defaults.fall.min_elapsed_s),
            debug_log_interval_s: fall_file
                .debug_log_interval_secs
                .unwrap_or(defaults.fall.debug_log_interval_s),
        };

        let distance_file = file.object_distance.unwrap_or_default();
        let object_distance = ObjectDistanceHeuristic {
            reference_extent_px: distance_file
                .reference_extent_px
                .unwrap_or(defaults.object_distance.reference_extent_px),
            reference_distance: distance_file
                .reference_distance
                .unwrap_or(defaults.object_distance.reference_distance),
        };

        Ok(Self {
            mode,
            source,
            marker,
            scheduler,
            fall,
            object_distance,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("VISION_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(mode) = std::env::var("VISION_MODE") {
            if !mode.trim().is_empty() {
                self.mode = mode.parse()?;
            }
        }
        if let Ok(enabled) = std::env::var("VISION_FALL_ENABLED") {
            self.fall.enabled = parse_bool(&enabled)
                .ok_or_else(|| anyhow!("VISION_FALL_ENABLED must be true/false/1/0"))?;
        }
        if let Ok(size) = std::env::var("VISION_MARKER_SIZE") {
            self.marker.real_size = size
                .trim()
                .parse()
                .map_err(|_| anyhow!("VISION_MARKER_SIZE must be a number"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }
        if self.source.fps == 0 {
            return Err(anyhow!("source fps must be greater than zero"));
        }
        if !(self.marker.real_size > 0.0) {
            return Err(anyhow!("marker.real_size must be greater than zero"));
        }
        if !(self.marker.calibration_distance > 0.0) {
            return Err(anyhow!("marker.calibration_distance must be greater than zero"));
        }
        if self.marker.calibration_samples == 0 {
            return Err(anyhow!("marker.calibration_samples must be at least 1"));
        }
        if self.marker.calibration_timeout.is_zero() {
            return Err(anyhow!("marker.calibration_timeout_secs must be greater than zero"));
        }
        if self.scheduler.follow > self.scheduler.scan {
            return Err(anyhow!(
                "scheduler.follow_skip ({}) must not exceed scheduler.scan_skip ({})",
                self.scheduler.follow,
                self.scheduler.scan
            ));
        }
        if self.fall.consecutive_frames == 0 {
            return Err(anyhow!("fall.consecutive_frames must be at least 1"));
        }
        if !(self.fall.aspect_ratio_threshold > 0.0) || !(self.fall.vertical_speed_threshold > 0.0)
        {
            return Err(anyhow!("fall thresholds must be greater than zero"));
        }
        if !(self.fall.min_elapsed_s > 0.0) {
            return Err(anyhow!("fall.min_elapsed_secs must be greater than zero"));
        }
        if !(self.object_distance.reference_extent_px > 0.0)
            || !(self.object_distance.reference_distance > 0.0)
        {
            return Err(anyhow!("object_distance parameters must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<VisionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
