//! Weighted iterative Laplacian relaxation.
//!
//! Each weighted vertex is pulled toward the plain average of its edge
//! neighbors. One call runs `iterations` outer passes of `steps` sub-passes:
//!
//! ```text
//! for i in 0..iterations:
//!     for s in 0..steps:
//!         snapshot = positions
//!         for (v, w) in weights:
//!             avg    = mean(snapshot[n] for n in neighbors(v))
//!             offset = (avg - snapshot[v]) * w * envelope * strength
//!             positions[v] = snapshot[v] + offset / (steps - s)
//! ```
//!
//! The divisor counts down from `steps` to `1` inside every iteration, so the
//! first sub-pass applies a third of its offset when `steps == 3`, the second
//! half, the last all of it. Every sub-pass reads one snapshot, which makes the
//! result independent of the order vertices are visited in.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::adjacency::Adjacency;
use crate::error::{RelaxError, RelaxResult};
use crate::params::RelaxParams;
use crate::residual::mean_squared_residual;
use crate::result::{RelaxOutput, RelaxStatus, SkipReason};
use crate::weights::WeightMap;

/// A weighted vertex with its resolved neighbor ring.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub vertex: usize,
    pub weight: f64,
    pub neighbors: &'a [u32],
}

/// Relaxes a mesh and returns the new positions.
///
/// The input slice is never modified. Degenerate controls (zero envelope,
/// iterations, steps or strength) and an empty weight map short-circuit and
/// return the input positions unchanged with [`RelaxStatus::Skipped`].
/// Weighted vertices without neighbors stay where they are.
///
/// # Arguments
///
/// * `positions` - One point per vertex of `adjacency`
/// * `adjacency` - Edge connectivity of the mesh
/// * `weights` - Vertices allowed to move and their influence
/// * `params` - Envelope, strength, iterations and steps
///
/// # Errors
///
/// Returns an error, and no partial result, if:
/// - `positions.len()` differs from the adjacency vertex count
/// - a weighted vertex or a reported neighbor is out of range
/// - the envelope, strength or a weight is not finite
///
/// # Examples
///
/// ```
/// use mesh_relax::{relax, MeshAdjacency, RelaxParams, WeightMap};
/// use nalgebra::Point3;
///
/// // Square ring 0-1-2-3-0
/// let adjacency = MeshAdjacency::from_edges(4, &[[0, 1], [1, 2], [2, 3], [3, 0]])?;
/// let positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let weights = WeightMap::from_dense(&[1.0, 0.0, 0.0, 0.0]);
/// let params = RelaxParams::new()
///     .with_strength(1.0)
///     .with_iterations(1)
///     .with_steps(1);
///
/// let output = relax(&positions, &adjacency, &weights, &params)?;
///
/// // Vertex 0 lands on the average of vertices 1 and 3
/// assert!((output.positions[0] - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);
/// assert_eq!(output.positions[2], positions[2]);
/// # Ok::<(), mesh_relax::RelaxError>(())
/// ```
pub fn relax<A>(
    positions: &[Point3<f64>],
    adjacency: &A,
    weights: &WeightMap,
    params: &RelaxParams,
) -> RelaxResult<RelaxOutput>
where
    A: Adjacency + Sync + ?Sized,
{
    if let Some(reason) = params.skip_reason() {
        debug!("Relax skipped: {}", reason);
        return Ok(RelaxOutput::skipped(positions.to_vec(), reason));
    }
    if weights.is_empty() {
        debug!("Relax skipped: {}", SkipReason::NoWeights);
        return Ok(RelaxOutput::skipped(positions.to_vec(), SkipReason::NoWeights));
    }

    params.validate()?;

    let (targets, isolated) = resolve_targets(positions, adjacency, weights)?;
    if isolated > 0 {
        warn!(
            "{} weighted vertices have no neighbors and will not move",
            isolated
        );
    }

    debug!(
        "Relaxing {} of {} vertices: {} iterations x {} steps, envelope {}, strength {}",
        targets.len(),
        positions.len(),
        params.iterations,
        params.steps,
        params.envelope,
        params.strength
    );

    let residual_before = mean_squared_residual(positions, &targets);

    let mut current = positions.to_vec();
    let mut max_step_displacement = 0.0_f64;

    for iteration in 0..params.iterations {
        for step in 0..params.steps {
            let divisor = f64::from(params.steps - step);
            let step_max = relax_sub_pass(&mut current, &targets, params, divisor);
            max_step_displacement = max_step_displacement.max(step_max);
        }
        debug!(
            "Iteration {}: residual {:.6e}",
            iteration + 1,
            mean_squared_residual(&current, &targets)
        );
    }

    let max_displacement = targets
        .iter()
        .map(|t| (current[t.vertex] - positions[t.vertex]).norm())
        .fold(0.0_f64, f64::max);
    let residual_after = mean_squared_residual(&current, &targets);

    let output = RelaxOutput {
        positions: current,
        status: RelaxStatus::Relaxed,
        sub_passes: params.sub_pass_count(),
        vertices_relaxed: targets.len(),
        isolated_skipped: isolated,
        max_step_displacement,
        max_displacement,
        residual_before,
        residual_after,
    };
    debug!("{}", output);

    Ok(output)
}

/// Relaxes a position buffer in place.
///
/// Runs [`relax`] and copies the result back into `positions`. On error the
/// buffer is left untouched.
///
/// # Errors
///
/// Same as [`relax`].
///
/// # Examples
///
/// ```
/// use mesh_relax::{relax_in_place, MeshAdjacency, RelaxParams, RelaxStatus, WeightMap};
/// use nalgebra::Point3;
///
/// let adjacency = MeshAdjacency::from_edges(3, &[[0, 1], [1, 2]])?;
/// let mut positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
/// ];
/// let weights = WeightMap::uniform([1], 1.0);
/// let params = RelaxParams::gentle().with_strength(1.0);
///
/// let status = relax_in_place(&mut positions, &adjacency, &weights, &params)?;
///
/// assert_eq!(status, RelaxStatus::Relaxed);
/// assert!(positions[1].y.abs() < 1e-12);
/// # Ok::<(), mesh_relax::RelaxError>(())
/// ```
pub fn relax_in_place<A>(
    positions: &mut [Point3<f64>],
    adjacency: &A,
    weights: &WeightMap,
    params: &RelaxParams,
) -> RelaxResult<RelaxStatus>
where
    A: Adjacency + Sync + ?Sized,
{
    let output = relax(positions, adjacency, weights, params)?;
    if output.was_relaxed() {
        positions.copy_from_slice(&output.positions);
    }
    Ok(output.status)
}

/// Runs one damped sub-pass and returns the largest vertex move.
///
/// All targets read `positions` as it was on entry; new positions are only
/// written back once every target has been computed.
fn relax_sub_pass(
    positions: &mut [Point3<f64>],
    targets: &[Target<'_>],
    params: &RelaxParams,
    divisor: f64,
) -> f64 {
    let blend = params.blend();
    let snapshot: &[Point3<f64>] = positions;
    let updates: Vec<(usize, Point3<f64>)> = targets
        .par_iter()
        .map(|target| {
            let current = snapshot[target.vertex];
            let average = neighbor_average(snapshot, target.neighbors);
            let offset = (average - current) * (target.weight * blend);
            (target.vertex, current + offset / divisor)
        })
        .collect();

    let mut max_move = 0.0_f64;
    for (vertex, position) in updates {
        max_move = max_move.max((position - positions[vertex]).norm());
        positions[vertex] = position;
    }
    max_move
}

/// Unweighted mean of the neighbor positions.
///
/// `neighbors` must be non-empty and in range; [`resolve_targets`] guarantees both.
pub(crate) fn neighbor_average(positions: &[Point3<f64>], neighbors: &[u32]) -> Point3<f64> {
    let sum = neighbors
        .iter()
        .fold(Vector3::zeros(), |acc, &n| acc + positions[n as usize].coords);

    #[allow(clippy::cast_precision_loss)]
    let count = neighbors.len() as f64;
    Point3::from(sum / count)
}

/// Validates inputs and pairs each weighted vertex with its neighbors.
///
/// Returns the movable targets, sorted by vertex, and the number of weighted
/// vertices dropped for having no neighbors.
pub(crate) fn resolve_targets<'a, A>(
    positions: &[Point3<f64>],
    adjacency: &'a A,
    weights: &WeightMap,
) -> RelaxResult<(Vec<Target<'a>>, usize)>
where
    A: Adjacency + ?Sized,
{
    let vertex_count = positions.len();
    if adjacency.vertex_count() != vertex_count {
        return Err(RelaxError::PositionCountMismatch {
            expected: adjacency.vertex_count(),
            actual: vertex_count,
        });
    }

    let mut targets = Vec::with_capacity(weights.len());
    let mut isolated = 0;

    for (vertex, weight) in weights.to_sorted_vec() {
        let vertex = vertex as usize;
        if vertex >= vertex_count {
            return Err(RelaxError::VertexOutOfRange {
                index: vertex,
                vertex_count,
            });
        }
        if !weight.is_finite() {
            return Err(RelaxError::NonFiniteControl {
                name: "weight",
                value: weight,
            });
        }

        let neighbors = adjacency.neighbors(vertex)?;
        if let Some(&bad) = neighbors.iter().find(|&&n| n as usize >= vertex_count) {
            return Err(RelaxError::VertexOutOfRange {
                index: bad as usize,
                vertex_count,
            });
        }

        if neighbors.is_empty() {
            isolated += 1;
            continue;
        }

        targets.push(Target {
            vertex,
            weight,
            neighbors,
        });
    }

    Ok((targets, isolated))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::MeshAdjacency;
    use approx::assert_relative_eq;

    fn square_ring() -> (MeshAdjacency, Vec<Point3<f64>>) {
        let adjacency =
            MeshAdjacency::from_edges(4, &[[0, 1], [1, 2], [2, 3], [3, 0]]).unwrap();
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        (adjacency, positions)
    }

    /// Path 0-1-2 with the middle vertex lifted.
    fn bent_path() -> (MeshAdjacency, Vec<Point3<f64>>) {
        let adjacency = MeshAdjacency::from_edges(3, &[[0, 1], [1, 2]]).unwrap();
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        (adjacency, positions)
    }

    fn full_strength(iterations: u32, steps: u32) -> RelaxParams {
        RelaxParams::new()
            .with_strength(1.0)
            .with_iterations(iterations)
            .with_steps(steps)
    }

    #[test]
    fn test_ring_vertex_moves_to_neighbor_average() {
        let (adjacency, positions) = square_ring();
        let weights = WeightMap::from_dense(&[1.0, 0.0, 0.0, 0.0]);

        let output = relax(&positions, &adjacency, &weights, &full_strength(1, 1)).unwrap();

        assert!(output.was_relaxed());
        assert_relative_eq!(output.positions[0].x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(output.positions[0].y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(output.positions[0].z, 0.0, epsilon = 1e-12);
        for v in 1..4 {
            assert_eq!(output.positions[v], positions[v]);
        }
        assert_eq!(output.sub_passes, 1);
        assert_eq!(output.vertices_relaxed, 1);
    }

    #[test]
    fn test_damping_schedule_three_steps() {
        // Middle vertex of the path: neighbor average is (1, 0, 0), so the raw
        // offset is -z. Divisors 3, 2, 1 give z = 1 -> 2/3 -> 1/3 -> 0.
        let (adjacency, positions) = bent_path();
        let weights = WeightMap::uniform([1], 1.0);

        let after = |steps_done: u32| {
            // First `steps_done` sub-passes of a 3-step iteration
            let (targets, _) = resolve_targets(&positions, &adjacency, &weights).unwrap();
            let mut current = positions.clone();
            for step in 0..steps_done {
                relax_sub_pass(&mut current, &targets, &full_strength(1, 3), f64::from(3 - step));
            }
            current[1].z
        };

        assert_relative_eq!(after(1), 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(after(2), 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(after(3), 0.0, epsilon = 1e-12);

        let output = relax(&positions, &adjacency, &weights, &full_strength(1, 3)).unwrap();
        assert_relative_eq!(output.positions[1].z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(output.max_step_displacement, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_damping_is_not_uniform_division() {
        // Uniform offset/steps would leave (1 - 1/3)^3 of the lift
        let (adjacency, positions) = bent_path();
        let weights = WeightMap::uniform([1], 1.0);

        let output = relax(&positions, &adjacency, &weights, &full_strength(1, 3)).unwrap();
        let uniform = (2.0_f64 / 3.0).powi(3);

        assert!((output.positions[1].z - uniform).abs() > 0.1);
    }

    #[test]
    fn test_weight_envelope_strength_scale_offset() {
        let (adjacency, positions) = bent_path();
        let weights = WeightMap::uniform([1], 0.5);
        let params = RelaxParams::new()
            .with_envelope(0.5)
            .with_strength(0.8)
            .with_iterations(1)
            .with_steps(1);

        let output = relax(&positions, &adjacency, &weights, &params).unwrap();

        // Offset scale 0.5 * 0.5 * 0.8 = 0.2
        assert_relative_eq!(output.positions[1].z, 0.8, epsilon = 1e-12);
        assert_relative_eq!(output.max_displacement, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_above_one_overshoot() {
        let (adjacency, positions) = bent_path();
        let weights = WeightMap::uniform([1], 2.0);

        let output = relax(&positions, &adjacency, &weights, &full_strength(1, 1)).unwrap();

        // Not clamped: the vertex goes past the neighbor average
        assert_relative_eq!(output.positions[1].z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_guards_return_input_unchanged() {
        let (adjacency, positions) = square_ring();
        let weights = WeightMap::uniform(0..4, 1.0);

        let cases = [
            (full_strength(1, 1).with_envelope(0.0), SkipReason::ZeroEnvelope),
            (full_strength(0, 1), SkipReason::ZeroIterations),
            (full_strength(1, 0), SkipReason::ZeroSteps),
            (full_strength(1, 1).with_strength(0.0), SkipReason::ZeroStrength),
        ];

        for (params, reason) in cases {
            let output = relax(&positions, &adjacency, &weights, &params).unwrap();
            assert_eq!(output.status, RelaxStatus::Skipped(reason));
            assert_eq!(output.positions, positions);
        }

        let output = relax(&positions, &adjacency, &WeightMap::new(), &full_strength(1, 1)).unwrap();
        assert_eq!(output.status, RelaxStatus::Skipped(SkipReason::NoWeights));
        assert_eq!(output.positions, positions);
    }

    #[test]
    fn test_guards_precede_validation() {
        // A skipped call does not inspect the buffers
        let (adjacency, _) = square_ring();
        let weights = WeightMap::uniform([99], 1.0);
        let output = relax(&[], &adjacency, &weights, &full_strength(0, 3)).unwrap();
        assert!(!output.was_relaxed());
    }

    #[test]
    fn test_isolated_vertex_is_skipped() {
        let adjacency = MeshAdjacency::from_edges(4, &[[0, 1], [1, 2]]).unwrap();
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let weights = WeightMap::uniform([1, 3], 1.0);

        let output = relax(&positions, &adjacency, &weights, &full_strength(4, 3)).unwrap();

        assert_eq!(output.positions[3], positions[3]);
        assert_eq!(output.isolated_skipped, 1);
        assert_eq!(output.vertices_relaxed, 1);
        assert!(output.positions[1].y < positions[1].y);
    }

    #[test]
    fn test_all_weighted_isolated_still_relaxes_nothing() {
        let adjacency = MeshAdjacency::isolated(2);
        let positions = vec![Point3::origin(), Point3::new(1.0, 1.0, 1.0)];
        let weights = WeightMap::uniform([0, 1], 1.0);

        let output = relax(&positions, &adjacency, &weights, &full_strength(3, 3)).unwrap();

        assert!(output.was_relaxed());
        assert_eq!(output.positions, positions);
        assert_eq!(output.vertices_relaxed, 0);
        assert_eq!(output.isolated_skipped, 2);
    }

    #[test]
    fn test_vertex_on_average_is_relaxed_without_moving() {
        // Vertex 1 of a straight path already sits on its neighbor average
        let adjacency = MeshAdjacency::from_edges(3, &[[0, 1], [1, 2]]).unwrap();
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let weights = WeightMap::uniform([1], 1.0);

        let output = relax(&positions, &adjacency, &weights, &full_strength(2, 3)).unwrap();

        assert_eq!(output.vertices_relaxed, 1);
        assert_eq!(output.max_displacement, 0.0);
        assert_eq!(output.max_step_displacement, 0.0);
        assert_eq!(output.positions, positions);
    }

    #[test]
    fn test_unweighted_neighbors_stay_fixed() {
        let (adjacency, positions) = square_ring();
        let weights = WeightMap::uniform([0, 2], 1.0);

        let output = relax(&positions, &adjacency, &weights, &full_strength(5, 3)).unwrap();

        assert_eq!(output.positions[1], positions[1]);
        assert_eq!(output.positions[3], positions[3]);
    }

    #[test]
    fn test_sub_pass_reads_snapshot() {
        // Both endpoints of an edge move; each must see the other's old position
        let adjacency = MeshAdjacency::from_edges(2, &[[0, 1]]).unwrap();
        let positions = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
        let weights = WeightMap::uniform([0, 1], 1.0);
        let params = RelaxParams::new()
            .with_strength(0.5)
            .with_iterations(1)
            .with_steps(1);

        let output = relax(&positions, &adjacency, &weights, &params).unwrap();

        assert_relative_eq!(output.positions[0].x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(output.positions[1].x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_position_count_mismatch() {
        let (adjacency, positions) = square_ring();
        let weights = WeightMap::uniform([0], 1.0);

        let err = relax(&positions[..3], &adjacency, &weights, &full_strength(1, 1)).unwrap_err();
        assert_eq!(
            err,
            RelaxError::PositionCountMismatch {
                expected: 4,
                actual: 3,
            }
        );
    }

    #[test]
    fn test_weighted_vertex_out_of_range() {
        let (adjacency, positions) = square_ring();
        let weights = WeightMap::uniform([0, 4], 1.0);

        let err = relax(&positions, &adjacency, &weights, &full_strength(1, 1)).unwrap_err();
        assert_eq!(
            err,
            RelaxError::VertexOutOfRange {
                index: 4,
                vertex_count: 4,
            }
        );
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let (adjacency, positions) = square_ring();
        let weights = WeightMap::uniform([1], f64::NAN);

        let err = relax(&positions, &adjacency, &weights, &full_strength(1, 1)).unwrap_err();
        assert!(matches!(err, RelaxError::NonFiniteControl { name: "weight", .. }));
    }

    #[test]
    fn test_relax_in_place_writes_back() {
        let (adjacency, mut positions) = square_ring();
        let weights = WeightMap::from_dense(&[1.0, 0.0, 0.0, 0.0]);

        let status =
            relax_in_place(&mut positions, &adjacency, &weights, &full_strength(1, 1)).unwrap();

        assert_eq!(status, RelaxStatus::Relaxed);
        assert_relative_eq!(
            positions[0].coords,
            Vector3::new(0.5, 0.5, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_relax_in_place_untouched_on_error() {
        let (adjacency, mut positions) = square_ring();
        let original = positions.clone();
        let weights = WeightMap::uniform([0, 9], 1.0);

        assert!(relax_in_place(&mut positions, &adjacency, &weights, &full_strength(1, 1)).is_err());
        assert_eq!(positions, original);
    }

    #[test]
    fn test_neighbor_average() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        ];
        let avg = neighbor_average(&positions, &[1, 2]);
        assert_relative_eq!(avg.coords, Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }
}
