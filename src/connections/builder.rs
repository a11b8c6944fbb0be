use log::{debug, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::config::parameters::GalaxyParameters;
use crate::error::GalaxyError;
use crate::spatial::spatial_hash::SpatialHashGrid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Execution {
    #[default]
    SingleThreaded,
    #[cfg(feature = "rayon")]
    MultiThreaded,
}

/// An edge between two particles, always stored with `from < to`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    pub from: usize,
    pub to: usize,
    pub distance: f32,
}

/// Line-segment buffers: each segment is two consecutive vertices, so
/// segment `k` occupies `[6k, 6k + 6)` in both vectors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineSegments {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl LineSegments {
    pub fn len(&self) -> usize {
        self.positions.len() / 6
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Connects nearby particles for line rendering.
///
/// Each particle only looks at higher-indexed neighbours and keeps its
/// `max_connections` nearest. The cap therefore bounds outgoing edges: a
/// particle can still end up with more incident edges when several
/// lower-indexed particles pick it.
///
/// Cost is close to linear while cells stay sparse. When `line_distance` is
/// comparable to the field radius every particle shares a neighbourhood and
/// the search degrades towards O(n^2) in time and candidate memory; the
/// `max_line_segments` limit bounds the retained output only.
#[derive(Clone, Debug, Default)]
pub struct ConnectionGraphBuilder {
    execution: Execution,
}

impl ConnectionGraphBuilder {
    pub fn new() -> Self {
        Self {
            execution: Execution::SingleThreaded,
        }
    }

    #[cfg(feature = "rayon")]
    pub fn multi_threaded(mut self) -> Self {
        self.execution = Execution::MultiThreaded;
        self
    }

    pub fn execution(&self) -> Execution {
        self.execution
    }

    /// Finds the retained connections, ordered by lower index, then by
    /// distance, then by higher index.
    pub fn find_connections(
        &self,
        positions: &[f32],
        params: &GalaxyParameters,
    ) -> Result<Vec<Connection>, GalaxyError> {
        if !params.show_lines {
            return Ok(Vec::new());
        }
        params.validate_lines()?;
        if positions.len() % 3 != 0 {
            return Err(GalaxyError::MalformedPositions {
                len: positions.len(),
            });
        }

        let count = positions.len() / 3;
        let grid = SpatialHashGrid::build(positions, 2.0 * params.line_distance);
        debug!(
            "hashed {} particles into {} cells (largest bucket {})",
            count,
            grid.occupied_cells(),
            grid.largest_bucket()
        );
        if count > 1 && grid.occupied_cells() == 1 {
            warn!(
                "all {} particles share one cell; line distance {} is too large for a sparse search",
                count, params.line_distance
            );
        }

        let connections = match self.execution {
            Execution::SingleThreaded => search_sequential(&grid, positions, params)?,
            #[cfg(feature = "rayon")]
            Execution::MultiThreaded => search_parallel(&grid, positions, params)?,
        };

        debug!("retained {} connections", connections.len());
        Ok(connections)
    }

    /// Builds line-segment buffers. Returns empty buffers when lines are hidden.
    pub fn build(
        &self,
        positions: &[f32],
        params: &GalaxyParameters,
    ) -> Result<LineSegments, GalaxyError> {
        let connections = self.find_connections(positions, params)?;
        Ok(Self::emit(positions, &connections, params))
    }

    /// Turns connections into segment buffers, one uniformly colored segment each.
    pub fn emit(
        positions: &[f32],
        connections: &[Connection],
        params: &GalaxyParameters,
    ) -> LineSegments {
        let mut segments = LineSegments {
            positions: Vec::with_capacity(connections.len() * 6),
            colors: Vec::with_capacity(connections.len() * 6),
        };
        let color = params.line_color.to_array();
        for c in connections {
            segments.positions.extend_from_slice(&point(positions, c.from));
            segments.positions.extend_from_slice(&point(positions, c.to));
            segments.colors.extend_from_slice(&color);
            segments.colors.extend_from_slice(&color);
        }
        segments
    }
}

fn search_sequential(
    grid: &SpatialHashGrid,
    positions: &[f32],
    params: &GalaxyParameters,
) -> Result<Vec<Connection>, GalaxyError> {
    let limit = params.limits.max_line_segments;
    let mut connections = Vec::new();
    let mut nearest = Vec::new();
    for i in 0..positions.len() / 3 {
        nearest_higher(grid, positions, i, params, &mut nearest);
        connections.extend_from_slice(&nearest);
        if connections.len() > limit {
            return Err(exhausted(connections.len(), limit));
        }
    }
    Ok(connections)
}

/// Queries the frozen grid from all threads; per-particle lists are joined in
/// index order so the result equals the sequential one.
#[cfg(feature = "rayon")]
fn search_parallel(
    grid: &SpatialHashGrid,
    positions: &[f32],
    params: &GalaxyParameters,
) -> Result<Vec<Connection>, GalaxyError> {
    let per_particle: Vec<Vec<Connection>> = (0..positions.len() / 3)
        .into_par_iter()
        .map(|i| {
            let mut nearest = Vec::new();
            nearest_higher(grid, positions, i, params, &mut nearest);
            nearest
        })
        .collect();

    let limit = params.limits.max_line_segments;
    let total: usize = per_particle.iter().map(Vec::len).sum();
    if total > limit {
        return Err(exhausted(total, limit));
    }
    Ok(per_particle.into_iter().flatten().collect())
}

fn exhausted(requested: usize, limit: usize) -> GalaxyError {
    GalaxyError::ResourceExhaustion {
        resource: "line segments",
        requested,
        limit,
    }
}

/// Fills `out` with the nearest higher-indexed neighbours of particle `i`
/// within `line_distance`, at most `max_connections` of them.
fn nearest_higher(
    grid: &SpatialHashGrid,
    positions: &[f32],
    i: usize,
    params: &GalaxyParameters,
    out: &mut Vec<Connection>,
) {
    out.clear();
    let p = point(positions, i);
    for j in grid.neighbourhood(grid.cell_of(p)) {
        if j <= i {
            continue;
        }
        let d = distance(p, point(positions, j));
        if d <= params.line_distance {
            out.push(Connection {
                from: i,
                to: j,
                distance: d,
            });
        }
    }
    // (distance, index) is a total order, so ties resolve the same way every run
    out.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.to.cmp(&b.to)));
    out.truncate(params.max_connections as usize);
}

/// Total incident edges per particle.
pub fn degrees(connections: &[Connection], count: usize) -> Vec<u32> {
    let mut degrees = vec![0u32; count];
    for c in connections {
        degrees[c.from] += 1;
        degrees[c.to] += 1;
    }
    degrees
}

fn point(positions: &[f32], i: usize) -> [f32; 3] {
    [positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]]
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::color::Rgb;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn line_params(line_distance: f32, max_connections: u32) -> GalaxyParameters {
        GalaxyParameters::default().with_lines(line_distance, max_connections)
    }

    fn pairs(connections: &[Connection]) -> Vec<(usize, usize)> {
        connections.iter().map(|c| (c.from, c.to)).collect()
    }

    /// All-pairs reference with the same selection rules.
    fn brute_force(positions: &[f32], params: &GalaxyParameters) -> Vec<(usize, usize)> {
        let n = positions.len() / 3;
        let mut out = Vec::new();
        for i in 0..n {
            let mut candidates: Vec<(usize, f32)> = (i + 1..n)
                .map(|j| (j, distance(point(positions, i), point(positions, j))))
                .filter(|&(_, d)| d <= params.line_distance)
                .collect();
            candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            candidates.truncate(params.max_connections as usize);
            out.extend(candidates.into_iter().map(|(j, _)| (i, j)));
        }
        out
    }

    #[test]
    fn unit_square_connects_every_pair() {
        let square = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, //
            1.0, 0.0, 1.0, //
        ];
        let connections = ConnectionGraphBuilder::new()
            .find_connections(&square, &line_params(1.5, 3))
            .unwrap();
        assert_eq!(
            pairs(&connections),
            vec![(0, 1), (0, 2), (0, 3), (1, 3), (1, 2), (2, 3)]
        );
        // nearest first within each particle's list
        assert_approx_eq!(connections[2].distance, 2.0_f32.sqrt());
    }

    #[test]
    fn distant_pair_is_not_connected() {
        let pts = [0.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let lines = ConnectionGraphBuilder::new()
            .build(&pts, &line_params(1.0, 3))
            .unwrap();
        assert!(lines.is_empty());
        assert!(lines.colors.is_empty());
    }

    #[test]
    fn hidden_lines_short_circuit() {
        let pts = [0.0, 0.0, 0.0, 0.1, 0.0, 0.0];
        let mut params = line_params(1.0, 3);
        params.show_lines = false;
        // invalid line settings are ignored when lines are hidden
        params.max_connections = 0;
        let lines = ConnectionGraphBuilder::new().build(&pts, &params).unwrap();
        assert_eq!(lines, LineSegments::default());
    }

    #[test]
    fn emits_both_endpoints_with_line_color() {
        let pts = [0.0, 0.0, 0.0, 0.5, 0.25, 0.0];
        let mut params = line_params(1.0, 1);
        params.line_color = Rgb::new(0.2, 0.4, 0.6);
        let lines = ConnectionGraphBuilder::new().build(&pts, &params).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.positions, vec![0.0, 0.0, 0.0, 0.5, 0.25, 0.0]);
        assert_eq!(lines.colors, vec![0.2, 0.4, 0.6, 0.2, 0.4, 0.6]);
    }

    #[test]
    fn cap_applies_to_outgoing_edges_only() {
        // particles 0..4 surround particle 4 and each is closer to it than to each other
        let pts = [
            1.0, 0.0, 0.0, //
            -1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, -1.0, //
            0.0, 0.0, 0.0, //
        ];
        let connections = ConnectionGraphBuilder::new()
            .find_connections(&pts, &line_params(1.2, 1))
            .unwrap();
        assert_eq!(pairs(&connections), vec![(0, 4), (1, 4), (2, 4), (3, 4)]);

        let degrees = degrees(&connections, 5);
        assert_eq!(degrees[4], 4);
        for i in 0..5 {
            let outgoing = connections.iter().filter(|c| c.from == i).count();
            assert!(outgoing <= 1);
        }
    }

    #[test]
    fn ties_break_on_index() {
        let pts = [
            0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
        ];
        let connections = ConnectionGraphBuilder::new()
            .find_connections(&pts, &line_params(1.0, 2))
            .unwrap();
        let from_zero: Vec<usize> = connections
            .iter()
            .filter(|c| c.from == 0)
            .map(|c| c.to)
            .collect();
        assert_eq!(from_zero, vec![1, 2]);
    }

    #[test]
    fn matches_brute_force_and_is_repeatable() {
        let mut rng = StdRng::seed_from_u64(42);
        let pts: Vec<f32> = (0..3 * 800).map(|_| rng.gen_range(-3.0..3.0)).collect();
        let params = line_params(0.6, 4);
        let builder = ConnectionGraphBuilder::new();

        let first = builder.find_connections(&pts, &params).unwrap();
        let second = builder.find_connections(&pts, &params).unwrap();
        assert_eq!(first, second);
        assert_eq!(pairs(&first), brute_force(&pts, &params));

        for c in &first {
            assert!(c.from < c.to);
            assert!(c.distance <= params.line_distance);
        }
    }

    #[test]
    fn segment_ceiling_is_enforced() {
        let pts: Vec<f32> = (0..30).map(|i| (i / 3) as f32 * 0.01).collect();
        let mut params = line_params(1.0, 5);
        params.limits.max_line_segments = 3;
        let err = ConnectionGraphBuilder::new()
            .build(&pts, &params)
            .unwrap_err();
        assert!(matches!(
            err,
            GalaxyError::ResourceExhaustion {
                resource: "line segments",
                limit: 3,
                ..
            }
        ));
    }

    #[test]
    fn far_out_points_connect_once() {
        let pts = [1e10, 0.0, 0.0, 1e10, 0.0, 0.0];
        let connections = ConnectionGraphBuilder::new()
            .find_connections(&pts, &line_params(1.0, 3))
            .unwrap();
        assert_eq!(pairs(&connections), vec![(0, 1)]);
    }

    #[test]
    fn rejects_ragged_buffers() {
        let err = ConnectionGraphBuilder::new()
            .build(&[0.0, 1.0], &line_params(1.0, 1))
            .unwrap_err();
        assert_eq!(err, GalaxyError::MalformedPositions { len: 2 });
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn multi_threaded_matches_single_threaded() {
        let mut rng = StdRng::seed_from_u64(3);
        let pts: Vec<f32> = (0..3 * 2_000).map(|_| rng.gen_range(-5.0..5.0)).collect();
        let params = line_params(0.5, 3);

        let single = ConnectionGraphBuilder::new().build(&pts, &params).unwrap();
        let multi = ConnectionGraphBuilder::new()
            .multi_threaded()
            .build(&pts, &params)
            .unwrap();
        assert_eq!(single, multi);
        assert_eq!(
            ConnectionGraphBuilder::new().multi_threaded().execution(),
            Execution::MultiThreaded
        );
    }
}
