// THEORY:
// Configuration for the chip station.
//
// Every field has a default, so an empty (or missing) TOML file yields a
// working 1280×720 conveyor. Files only need the keys they change:
//
//     [scene]
//     conveyor_speed = 4
//
//     [spawning]
//     seed = 42

use crate::core_modules::chip::ChipClass;
use crate::core_modules::pixel::pixel::HSV_MAX;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StationConfig {
    pub scene: SceneConfig,
    pub spawning: SpawnConfig,
    pub detector: DetectorConfig,
    pub tracking: TrackingConfig,
    pub runtime: RuntimeConfig,
}

/// Geometry and motion of the rendered conveyor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    /// Fraction of the scene width covered by the belt, centred.
    pub belt_fraction: f64,
    /// Pixels per tick along the transit axis.
    pub conveyor_speed: i32,
    /// Transit coordinate at which chips are counted. `None` means half the height.
    pub scan_line: Option<i32>,
    /// How far past the bottom edge a chip travels before it expires.
    pub expire_margin: i32,
    pub chip_width: u32,
    pub chip_height: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            belt_fraction: 0.5,
            conveyor_speed: 3,
            scan_line: None,
            expire_margin: 50,
            chip_width: 120,
            chip_height: 80,
        }
    }
}

impl SceneConfig {
    pub fn scan_line(&self) -> i32 {
        self.scan_line.unwrap_or(self.height as i32 / 2)
    }

    /// Chips whose transit coordinate exceeds this are removed.
    pub fn far_bound(&self) -> i32 {
        self.height as i32 + self.expire_margin
    }

    /// Left edge and width of the belt in pixels.
    pub fn belt(&self) -> (i32, u32) {
        let belt_width = (self.width as f64 * self.belt_fraction) as u32;
        (((self.width - belt_width) / 2) as i32, belt_width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub interval_min: u32,
    pub interval_max: u32,
    pub fake_probability: f64,
    /// Relative weights for GOLD, SILVER, BRONZE.
    pub class_weights: [f64; 3],
    pub burst_size: usize,
    /// Fixed seed for reproducible sessions; a random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            interval_min: 30,
            interval_max: 60,
            fake_probability: 0.2,
            class_weights: [0.15, 0.35, 0.50],
            burst_size: 5,
            seed: None,
        }
    }
}

impl SpawnConfig {
    pub fn weight(&self, class: ChipClass) -> f64 {
        self.class_weights[class.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub min_area: usize,
    pub max_area: usize,
    /// Side of the square morphology kernel; odd.
    pub kernel_size: u32,
    /// Gaussian sigma applied before HSV conversion; 0 disables blurring.
    pub blur_sigma: f32,
    /// Per-channel H, S, V slack added around a calibrated mean.
    pub calibration_tolerance: [f64; 3],
    /// Half side of the centred square sampled during calibration.
    pub calibration_roi: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_area: 2000,
            max_area: 50000,
            kernel_size: 5,
            blur_sigma: 1.1,
            calibration_tolerance: [15.0, 50.0, 50.0],
            calibration_roi: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Largest centroid jump (pixels) still treated as the same chip.
    pub max_match_distance: f64,
    /// Observations a chip may go undetected before it expires.
    pub max_missed_frames: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_match_distance: 50.0,
            max_missed_frames: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Frame period.
    pub tick_ms: u64,
    /// Capacity of the queue between frame acquisition and the tick loop.
    pub frame_queue_capacity: usize,
    pub assets_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_ms: 30,
            frame_queue_capacity: 4,
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl StationConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StationConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let scene = &self.scene;
        if scene.width == 0 || scene.height == 0 {
            return Err(Error::Config("scene dimensions must be non-zero".into()));
        }
        if scene.chip_width == 0 || scene.chip_height == 0 {
            return Err(Error::Config("chip dimensions must be non-zero".into()));
        }
        if !(0.0 < scene.belt_fraction && scene.belt_fraction <= 1.0) {
            return Err(Error::Config(format!(
                "belt_fraction {} must lie in (0, 1]",
                scene.belt_fraction
            )));
        }
        if scene.conveyor_speed <= 0 {
            return Err(Error::Config("conveyor_speed must be positive".into()));
        }
        if scene.scan_line() >= scene.far_bound() {
            return Err(Error::Config(format!(
                "scan line {} must lie before the far bound {}",
                scene.scan_line(),
                scene.far_bound()
            )));
        }

        let spawning = &self.spawning;
        if spawning.interval_min == 0 || spawning.interval_min > spawning.interval_max {
            return Err(Error::Config(format!(
                "spawn interval [{}, {}] is empty or starts at zero",
                spawning.interval_min, spawning.interval_max
            )));
        }
        if !(0.0..=1.0).contains(&spawning.fake_probability) {
            return Err(Error::Config(format!(
                "fake_probability {} must lie in [0, 1]",
                spawning.fake_probability
            )));
        }
        if spawning.class_weights.iter().any(|w| w.is_nan() || *w < 0.0)
            || spawning.class_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(Error::Config(
                "class_weights must be non-negative with a positive sum".into(),
            ));
        }

        let detector = &self.detector;
        if detector.min_area > detector.max_area {
            return Err(Error::Config(format!(
                "min_area {} exceeds max_area {}",
                detector.min_area, detector.max_area
            )));
        }
        if detector.kernel_size % 2 == 0 {
            return Err(Error::Config("kernel_size must be odd".into()));
        }
        for (tolerance, max) in detector.calibration_tolerance.iter().zip(HSV_MAX) {
            if !(0.0..=max as f64).contains(tolerance) {
                return Err(Error::Config(format!(
                    "calibration tolerance {tolerance} outside [0, {max}]"
                )));
            }
        }

        if self.tracking.max_match_distance < 0.0 {
            return Err(Error::Config("max_match_distance must be non-negative".into()));
        }
        if self.runtime.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be at least 1".into()));
        }
        if self.runtime.frame_queue_capacity == 0 {
            return Err(Error::Config("frame_queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scene.scan_line(), 360);
        assert_eq!(config.scene.far_bound(), 770);
        assert_eq!(config.scene.belt(), (320, 640));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = StationConfig::from_toml_str(
            r#"
            [scene]
            conveyor_speed = 4

            [spawning]
            seed = 42
            class_weights = [1.0, 0.0, 0.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.scene.conveyor_speed, 4);
        assert_eq!(config.scene.width, 1280);
        assert_eq!(config.spawning.seed, Some(42));
        assert_eq!(config.spawning.weight(ChipClass::Gold), 1.0);
        assert_eq!(config.detector.min_area, 2000);
    }

    #[test]
    fn rejects_inconsistent_values() {
        let bad = [
            "[spawning]\ninterval_min = 70",
            "[spawning]\nfake_probability = 1.5",
            "[spawning]\nclass_weights = [0.0, 0.0, 0.0]",
            "[scene]\nscan_line = 800",
            "[detector]\nmin_area = 60000",
            "[detector]\nkernel_size = 4",
            "[runtime]\nframe_queue_capacity = 0",
            "[runtime]\ntick_ms = 0",
        ];
        for text in bad {
            assert!(
                matches!(StationConfig::from_toml_str(text), Err(Error::Config(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(
            StationConfig::from_toml_str("[scene\nwidth = "),
            Err(Error::Config(_))
        ));
    }
}
