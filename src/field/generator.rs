use std::f32::consts::TAU;

use log::debug;
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

use crate::config::parameters::GalaxyParameters;
use crate::error::GalaxyError;

/// Flat, index-aligned particle buffers: particle `i` occupies `[3i, 3i + 3)`
/// in both `positions` and `colors`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointField {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl PointField {
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, i: usize) -> [f32; 3] {
        [
            self.positions[3 * i],
            self.positions[3 * i + 1],
            self.positions[3 * i + 2],
        ]
    }

    pub fn color(&self, i: usize) -> [f32; 3] {
        [self.colors[3 * i], self.colors[3 * i + 1], self.colors[3 * i + 2]]
    }
}

/// Angle of the arm that particle `index` is assigned to.
///
/// Assignment is by index, so arm populations differ by at most one.
pub fn branch_angle(index: u32, branches: u32) -> f32 {
    (index % branches) as f32 / branches as f32 * TAU
}

/// Places particles along spiral arms.
pub struct PointFieldGenerator<R: Rng> {
    rng: R,
}

impl PointFieldGenerator<ThreadRng> {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for PointFieldGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl PointFieldGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> PointFieldGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self, params: &GalaxyParameters) -> Result<PointField, GalaxyError> {
        params.validate_field()?;

        let count = params.count as usize;
        if count > params.limits.max_particles {
            return Err(GalaxyError::ResourceExhaustion {
                resource: "particles",
                requested: count,
                limit: params.limits.max_particles,
            });
        }

        debug!(
            "generating {} particles over {} branches (radius {}, spin {})",
            count, params.branches, params.radius, params.spin
        );

        let mut positions = Vec::with_capacity(3 * count);
        let mut colors = Vec::with_capacity(3 * count);

        for i in 0..params.count {
            // uniform in distance, not area: denser towards the core
            let radius = self.rng.gen::<f32>() * params.radius;
            let spin_angle = radius * params.spin;
            let angle = branch_angle(i, params.branches) + spin_angle;

            let offset_x = self.offset(params.randomness_power);
            let offset_y = self.offset(params.randomness_power);
            let offset_z = self.offset(params.randomness_power);

            positions.push(angle.cos() * radius + offset_x);
            positions.push(offset_y);
            positions.push(angle.sin() * radius + offset_z);

            let color = params
                .inside_color
                .lerp(&params.outside_color, radius / params.radius);
            colors.extend_from_slice(&color.to_array());
        }

        Ok(PointField { positions, colors })
    }

    /// Signed offset in `(-1, 1)`, peaked at zero for `power > 1`.
    fn offset(&mut self, power: f32) -> f32 {
        let magnitude = self.rng.gen::<f32>().powf(power);
        if self.rng.gen_bool(0.5) {
            magnitude
        } else {
            -magnitude
        }
    }
}

/// Generates a point field, seeded from `params.seed` when present.
pub fn generate(params: &GalaxyParameters) -> Result<PointField, GalaxyError> {
    match params.seed {
        Some(seed) => PointFieldGenerator::seeded(seed).generate(params),
        None => PointFieldGenerator::new().generate(params),
    }
}
