use log::info;
use serde::Serialize;

use crate::config::parameters::GalaxyParameters;
use crate::connections::builder::{degrees, ConnectionGraphBuilder, LineSegments};
use crate::error::GalaxyError;
use crate::field::generator::{self, PointField};

/// Everything one generation pass produces. Owned by the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GalaxyGeometry {
    pub points: PointField,
    /// `None` when lines are hidden.
    pub lines: Option<LineSegments>,
    /// Highest number of edges touching one particle.
    pub max_degree: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryStats {
    pub particles: usize,
    pub line_segments: usize,
    pub max_planar_radius: f32,
    pub mean_abs_height: f32,
    pub max_degree: u32,
}

impl GalaxyGeometry {
    pub fn stats(&self) -> GeometryStats {
        let particles = self.points.len();
        let mut max_planar_radius = 0.0_f32;
        let mut height_sum = 0.0_f64;
        for p in self.points.positions.chunks_exact(3) {
            max_planar_radius = max_planar_radius.max((p[0] * p[0] + p[2] * p[2]).sqrt());
            height_sum += f64::from(p[1].abs());
        }
        let mean_abs_height = if particles == 0 {
            0.0
        } else {
            (height_sum / particles as f64) as f32
        };

        GeometryStats {
            particles,
            line_segments: self.lines.as_ref().map_or(0, LineSegments::len),
            max_planar_radius,
            mean_abs_height,
            max_degree: self.max_degree,
        }
    }
}

/// Runs the full pipeline with the given builder: points first, then lines
/// when `show_lines` is set. Fails without producing anything.
pub fn generate_galaxy_with(
    params: &GalaxyParameters,
    builder: &ConnectionGraphBuilder,
) -> Result<GalaxyGeometry, GalaxyError> {
    // line settings are checked up front so a bad value fails before the
    // point buffers are allocated; field settings are checked by the generator
    params.validate_lines()?;

    let points = generator::generate(params)?;
    let (lines, max_degree) = if params.show_lines {
        let connections = builder.find_connections(&points.positions, params)?;
        let max_degree = degrees(&connections, points.len())
            .into_iter()
            .max()
            .unwrap_or(0);
        let lines = ConnectionGraphBuilder::emit(&points.positions, &connections, params);
        (Some(lines), max_degree)
    } else {
        (None, 0)
    };

    info!(
        "generated {} particles and {} line segments",
        points.len(),
        lines.as_ref().map_or(0, LineSegments::len)
    );

    Ok(GalaxyGeometry {
        points,
        lines,
        max_degree,
    })
}

pub fn generate_galaxy(params: &GalaxyParameters) -> Result<GalaxyGeometry, GalaxyError> {
    generate_galaxy_with(params, &ConnectionGraphBuilder::new())
}

/// Holds the geometry currently on display. A new pass replaces the old
/// buffers only once it has succeeded.
#[derive(Debug, Default)]
pub struct GalaxyScene {
    builder: ConnectionGraphBuilder,
    params: Option<GalaxyParameters>,
    geometry: Option<GalaxyGeometry>,
}

impl GalaxyScene {
    pub fn new(builder: ConnectionGraphBuilder) -> Self {
        GalaxyScene {
            builder,
            params: None,
            geometry: None,
        }
    }

    pub fn regenerate(&mut self, params: GalaxyParameters) -> Result<&GalaxyGeometry, GalaxyError> {
        let geometry = generate_galaxy_with(&params, &self.builder)?;
        self.params = Some(params);
        // dropping the previous pass releases its buffers
        Ok(&*self.geometry.insert(geometry))
    }

    pub fn geometry(&self) -> Option<&GalaxyGeometry> {
        self.geometry.as_ref()
    }

    pub fn parameters(&self) -> Option<&GalaxyParameters> {
        self.params.as_ref()
    }

    /// Hands the current buffers to the caller, leaving the scene empty.
    pub fn take(&mut self) -> Option<GalaxyGeometry> {
        self.params = None;
        self.geometry.take()
    }

    pub fn clear(&mut self) {
        self.params = None;
        self.geometry = None;
    }
}
