//! Laplacian residual measurement.
//!
//! The residual is the mean squared distance between each weighted vertex and
//! the average of its neighbors. Relaxation drives it toward zero, so it is a
//! direct measure of how far a surface is from being fully smoothed.

use nalgebra::Point3;

use crate::adjacency::Adjacency;
use crate::error::RelaxResult;
use crate::relax::{Target, neighbor_average, resolve_targets};
use crate::weights::WeightMap;

/// Mean squared Laplacian residual of the weighted vertices.
///
/// Weights only select vertices here; they do not scale the residual.
/// Weighted vertices without neighbors are ignored. Returns `0.0` when no
/// weighted vertex has neighbors.
///
/// # Errors
///
/// Fails under the same input conditions as [`relax`](crate::relax): a
/// position count that disagrees with the adjacency, or a weighted vertex or
/// neighbor out of range.
///
/// # Example
///
/// ```
/// use mesh_relax::{laplacian_residual, MeshAdjacency, WeightMap};
/// use nalgebra::Point3;
///
/// let adjacency = MeshAdjacency::from_edges(3, &[[0, 1], [1, 2]])?;
/// let positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 2.0),
///     Point3::new(2.0, 0.0, 0.0),
/// ];
///
/// let residual = laplacian_residual(&positions, &adjacency, &WeightMap::uniform([1], 1.0))?;
/// assert!((residual - 4.0).abs() < 1e-12);
/// # Ok::<(), mesh_relax::RelaxError>(())
/// ```
pub fn laplacian_residual<A>(
    positions: &[Point3<f64>],
    adjacency: &A,
    weights: &WeightMap,
) -> RelaxResult<f64>
where
    A: Adjacency + ?Sized,
{
    let (targets, _) = resolve_targets(positions, adjacency, weights)?;
    Ok(mean_squared_residual(positions, &targets))
}

/// Residual over already validated targets.
pub(crate) fn mean_squared_residual(positions: &[Point3<f64>], targets: &[Target<'_>]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }

    let total: f64 = targets
        .iter()
        .map(|t| (neighbor_average(positions, t.neighbors) - positions[t.vertex]).norm_squared())
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let count = targets.len() as f64;
    total / count
}
