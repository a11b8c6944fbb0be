use serde::{Deserialize, Serialize};

use crate::config::color::Rgb;
use crate::error::GalaxyError;

/// Safety ceilings checked before and during generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceLimits {
    pub max_particles: usize,
    pub max_line_segments: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits {
            max_particles: 1_000_000,
            max_line_segments: 5_000_000,
        }
    }
}

/// Input of one generation pass. Treated as an immutable value: a parameter
/// change means building a new value and regenerating from scratch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GalaxyParameters {
    pub count: u32,
    /// Point sprite size; only meaningful to the renderer.
    pub size: f32,
    pub radius: f32,
    pub branches: u32,
    pub spin: f32,
    /// Kept for parameter-file compatibility. Offsets are shaped by
    /// `randomness_power` alone.
    pub randomness: f32,
    pub randomness_power: f32,
    pub inside_color: Rgb,
    pub outside_color: Rgb,

    pub show_lines: bool,
    pub line_distance: f32,
    pub line_opacity: f32,
    pub line_color: Rgb,
    pub max_connections: u32,

    /// Fixed seed for reproducible output. `None` draws from thread-local entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub limits: ResourceLimits,
}

impl Default for GalaxyParameters {
    fn default() -> Self {
        GalaxyParameters {
            count: 100_000,
            size: 0.01,
            radius: 5.0,
            branches: 3,
            spin: 1.0,
            randomness: 0.2,
            randomness_power: 3.0,
            inside_color: Rgb::new(1.0, 96.0 / 255.0, 48.0 / 255.0),
            outside_color: Rgb::new(27.0 / 255.0, 57.0 / 255.0, 132.0 / 255.0),
            show_lines: false,
            line_distance: 0.1,
            line_opacity: 0.2,
            line_color: Rgb::WHITE,
            max_connections: 3,
            seed: None,
            limits: ResourceLimits::default(),
        }
    }
}

impl GalaxyParameters {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_lines(mut self, line_distance: f32, max_connections: u32) -> Self {
        self.show_lines = true;
        self.line_distance = line_distance;
        self.max_connections = max_connections;
        self
    }

    /// Checks the preconditions of point generation.
    pub fn validate_field(&self) -> Result<(), GalaxyError> {
        if self.count < 1 {
            return Err(GalaxyError::invalid("count", "must be at least 1"));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(GalaxyError::invalid(
                "radius",
                format!("must be a positive finite number, got {}", self.radius),
            ));
        }
        if self.branches < 1 {
            return Err(GalaxyError::invalid("branches", "must be at least 1"));
        }
        // below 1 the offsets are no longer confined to (-1, 1)
        if !(self.randomness_power.is_finite() && self.randomness_power >= 1.0) {
            return Err(GalaxyError::invalid(
                "randomnessPower",
                format!("must be a finite number >= 1, got {}", self.randomness_power),
            ));
        }
        Ok(())
    }

    /// Checks the preconditions of connection building. Only enforced when
    /// lines are shown.
    pub fn validate_lines(&self) -> Result<(), GalaxyError> {
        if !self.show_lines {
            return Ok(());
        }
        if self.max_connections < 1 {
            return Err(GalaxyError::invalid("maxConnections", "must be at least 1"));
        }
        if !(self.line_distance.is_finite() && self.line_distance > 0.0) {
            return Err(GalaxyError::invalid(
                "lineDistance",
                format!("must be a positive finite number, got {}", self.line_distance),
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GalaxyError> {
        self.validate_field()?;
        self.validate_lines()
    }
}
