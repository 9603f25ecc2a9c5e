use std::{fs, path::Path};

use pathing::TerrainClassifier;
use serde::{Deserialize, Serialize};

use crate::error::CourierError;

/// When the courier may be sent back to the start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPolicy {
    /// From any point of the route, moving or not
    #[default]
    Anytime,
    /// Only once the courier stands still on the destination
    AfterArrival,
}

/// Where a return trip ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnTarget {
    #[default]
    Pickup,
    Origin,
}

/// How map pixels are turned into road and wall cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Mean colour within `road_tolerance` of `road_reference` on every channel
    #[default]
    Band,
    /// Mean luminance below `luma_cutoff`
    LumaThreshold,
}

/// Tunables of a courier session. Every field has a default, so a config file only needs the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CourierConfig {
    /// Edge length of a grid cell in pixels
    pub cell_size: u32,
    pub classifier: ClassifierMode,
    /// Gray value of the roads on the map
    pub road_reference: f64,
    /// Allowed distance of each channel mean from `road_reference`
    pub road_tolerance: f64,
    /// Luminance under which a block counts as road in `luma_threshold` mode
    pub luma_cutoff: f64,
    /// The courier moves one cell every this many ticks
    pub ticks_per_step: u32,
    /// Ticks spent at the pickup before leaving for the destination
    pub settle_ticks: u32,
    /// Draws allowed when picking a random route
    pub max_route_attempts: usize,
    pub return_policy: ReturnPolicy,
    pub return_target: ReturnTarget,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            cell_size: 20,
            classifier: ClassifierMode::default(),
            road_reference: 90.0,
            road_tolerance: 5.0,
            luma_cutoff: 128.0,
            ticks_per_step: 15,
            settle_ticks: 30,
            max_route_attempts: 100,
            return_policy: ReturnPolicy::default(),
            return_target: ReturnTarget::default(),
        }
    }
}

impl CourierConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, CourierError> {
        let config: CourierConfig =
            toml::from_str(contents).map_err(|e| CourierError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CourierError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CourierError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), CourierError> {
        if self.cell_size == 0 {
            return Err(CourierError::Config("cell_size must be positive".into()));
        }
        if self.ticks_per_step == 0 {
            return Err(CourierError::Config("ticks_per_step must be positive".into()));
        }
        if self.max_route_attempts == 0 {
            return Err(CourierError::Config(
                "max_route_attempts must be positive".into(),
            ));
        }
        if !(self.road_tolerance >= 0.0 && self.road_reference.is_finite()) {
            return Err(CourierError::Config(format!(
                "road band {} ± {} is not a valid colour range",
                self.road_reference, self.road_tolerance
            )));
        }
        if !self.luma_cutoff.is_finite() {
            return Err(CourierError::Config(format!(
                "luma_cutoff {} is not a number",
                self.luma_cutoff
            )));
        }
        Ok(())
    }

    pub fn classifier(&self) -> TerrainClassifier {
        match self.classifier {
            ClassifierMode::Band => {
                TerrainClassifier::around(self.road_reference, self.road_tolerance)
            }
            ClassifierMode::LumaThreshold => TerrainClassifier::luma_below(self.luma_cutoff),
        }
    }
}
