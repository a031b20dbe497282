//! Tunable parameters for one pipeline run.
//!
//! Every struct deserializes with defaults for missing fields, so a partial
//! `config.toml` (or none at all) is valid. Validation happens once, in
//! [`PipelineConfig::validate`], before any clustering starts.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CANVAS_HEIGHT, CANVAS_WIDTH, DEFAULT_EPS, DEFAULT_MIN_PTS, MIN_SEPARATION, NODE_RADIUS,
    NODE_SPACING, REFINE_ITERATIONS, REFINE_SEED, REFINE_TOLERANCE, REGION_PADDING, REGION_WIDTH,
    RESPONSE_X, THOUGHT_X, TRIGGER_X,
};
use crate::dbscan::Dbscan;
use crate::error::ConfigError;
use crate::palette::Palette;
use crate::record::Family;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub eps: f64,
    pub min_pts: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_pts: DEFAULT_MIN_PTS,
        }
    }
}

impl ClusterParams {
    pub fn dbscan(&self) -> Result<Dbscan, ConfigError> {
        Dbscan::new(self.eps, self.min_pts)
    }
}

/// Fixed x coordinate of each family's column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub trigger: f64,
    pub thought: f64,
    pub response: f64,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            trigger: TRIGGER_X,
            thought: THOUGHT_X,
            response: RESPONSE_X,
        }
    }
}

impl Columns {
    pub fn x(&self, family: Family) -> f64 {
        match family {
            Family::Trigger => self.trigger,
            Family::Thought => self.thought,
            Family::Response => self.response,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub columns: Columns,
    pub node_spacing: f64,
    pub region_padding: f64,
    pub region_width: f64,
    pub node_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            columns: Columns::default(),
            node_spacing: NODE_SPACING,
            region_padding: REGION_PADDING,
            region_width: REGION_WIDTH,
            node_radius: NODE_RADIUS,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.canvas_height.is_finite() || self.canvas_height <= 0.0 {
            return Err(ConfigError::InvalidCanvasHeight(self.canvas_height));
        }
        if !self.node_spacing.is_finite() || self.node_spacing <= 0.0 {
            return Err(ConfigError::InvalidSpacing(self.node_spacing));
        }
        for family in Family::ALL {
            let x = self.columns.x(family);
            if !x.is_finite() {
                return Err(ConfigError::InvalidColumn {
                    family: family.as_str(),
                    x,
                });
            }
        }
        Ok(())
    }
}

/// Cosmetic layout relaxation settings. Disabled by default.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub enabled: bool,
    pub iterations: usize,
    pub min_separation: f64,
    /// Pull applied along links, as a fraction of the vertical gap.
    pub link_strength: f64,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            iterations: REFINE_ITERATIONS,
            min_separation: MIN_SEPARATION,
            link_strength: 0.05,
            tolerance: REFINE_TOLERANCE,
            seed: REFINE_SEED,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub clustering: ClusterParams,
    pub palette: Palette,
    pub layout: LayoutConfig,
    pub refine: RefineConfig,
}

impl PipelineConfig {
    /// Check every fatal condition. The palette is validated on construction.
    pub fn validate(&self) -> Result<Dbscan, ConfigError> {
        let dbscan = self.clustering.dbscan()?;
        self.layout.validate()?;
        Ok(dbscan)
    }
}
