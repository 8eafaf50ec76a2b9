//! Host-agnostic relax deformer.
//!
//! A deformation host calls a deformer once per evaluation with the current
//! point buffer and per-vertex paint weights. [`RelaxDeformer`] keeps the
//! relax controls and the mesh adjacency between those calls, rebuilding the
//! adjacency only when the topology it is handed actually changes.

use std::hash::{DefaultHasher, Hash, Hasher};

use nalgebra::Point3;
use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::error::{RelaxError, RelaxResult};
use crate::params::RelaxParams;
use crate::relax::relax_in_place;
use crate::weights::WeightMap;

/// Relax deformer with cached topology.
///
/// # Example
///
/// ```
/// use mesh_relax::{RelaxDeformer, RelaxParams};
/// use nalgebra::Point3;
///
/// let mut deformer = RelaxDeformer::new(RelaxParams::gentle().with_strength(1.0));
/// deformer.update_topology(4, &[[0u32, 1, 2, 3]])?;
///
/// let mut points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 1.0),
/// ];
///
/// // Paint weight on the last corner only
/// let changed = deformer.deform(&mut points, &[0.0, 0.0, 0.0, 1.0])?;
///
/// assert!(changed);
/// assert!(points[3].z < 1.0);
/// # Ok::<(), mesh_relax::RelaxError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelaxDeformer {
    params: RelaxParams,
    adjacency: Option<MeshAdjacency>,
    fingerprint: Option<u64>,
}

impl RelaxDeformer {
    /// Create a deformer with no topology.
    #[must_use]
    pub fn new(params: RelaxParams) -> Self {
        Self {
            params,
            adjacency: None,
            fingerprint: None,
        }
    }

    /// Current relax controls.
    #[must_use]
    pub const fn params(&self) -> &RelaxParams {
        &self.params
    }

    /// Replace the relax controls. The cached topology is kept.
    pub fn set_params(&mut self, params: RelaxParams) {
        self.params = params;
    }

    /// Cached adjacency, if any.
    #[must_use]
    pub const fn adjacency(&self) -> Option<&MeshAdjacency> {
        self.adjacency.as_ref()
    }

    /// Check whether a topology has been assigned.
    #[must_use]
    pub const fn has_topology(&self) -> bool {
        self.adjacency.is_some()
    }

    /// Assign topology from polygon faces, rebuilding only if it changed.
    ///
    /// Returns `true` when the adjacency was rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::FaceIndexOutOfRange`] if a face references a
    /// missing vertex. The previous topology is kept in that case.
    pub fn update_topology<F>(&mut self, vertex_count: usize, faces: &[F]) -> RelaxResult<bool>
    where
        F: AsRef<[u32]>,
    {
        let fingerprint = topology_fingerprint(vertex_count, faces);
        if self.adjacency.is_some() && self.fingerprint == Some(fingerprint) {
            return Ok(false);
        }

        let adjacency = MeshAdjacency::from_faces(vertex_count, faces)?;
        debug!(
            "Rebuilt relax adjacency: {} vertices, {} edges",
            adjacency.vertex_count(),
            adjacency.edge_count()
        );

        self.adjacency = Some(adjacency);
        self.fingerprint = Some(fingerprint);
        Ok(true)
    }

    /// Assign a prebuilt adjacency.
    pub fn set_adjacency(&mut self, adjacency: MeshAdjacency) {
        self.adjacency = Some(adjacency);
        self.fingerprint = None;
    }

    /// Drop the cached topology.
    pub fn clear_topology(&mut self) {
        self.adjacency = None;
        self.fingerprint = None;
    }

    /// Relax `positions` using dense per-vertex paint weights.
    ///
    /// Zero weights are dropped; a weight array shorter than `positions`
    /// leaves the remaining vertices unweighted. Returns `true` if the
    /// positions were relaxed and `false` if the call was a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::MissingTopology`] if no topology was assigned, or
    /// any error from [`relax`](crate::relax). Positions are untouched on error.
    pub fn deform(&self, positions: &mut [Point3<f64>], paint_weights: &[f64]) -> RelaxResult<bool> {
        if let Some(reason) = self.params.skip_reason() {
            debug!("Relax deformer idle: {}", reason);
            return Ok(false);
        }

        self.deform_weighted(positions, &WeightMap::from_dense(paint_weights))
    }

    /// Relax `positions` using a sparse weight map.
    ///
    /// # Errors
    ///
    /// Same as [`deform`](Self::deform).
    pub fn deform_weighted(
        &self,
        positions: &mut [Point3<f64>],
        weights: &WeightMap,
    ) -> RelaxResult<bool> {
        let adjacency = self.adjacency.as_ref().ok_or(RelaxError::MissingTopology)?;

        let status = relax_in_place(positions, adjacency, weights, &self.params)?;
        if status.is_relaxed() {
            info!(
                "Relaxed {} weighted vertices ({} iterations x {} steps)",
                weights.len(),
                self.params.iterations,
                self.params.steps
            );
        }

        Ok(status.is_relaxed())
    }
}

/// Cheap identity of a face list, used to skip adjacency rebuilds.
fn topology_fingerprint<F: AsRef<[u32]>>(vertex_count: usize, faces: &[F]) -> u64 {
    let mut hasher = DefaultHasher::new();
    vertex_count.hash(&mut hasher);
    faces.len().hash(&mut hasher);
    for face in faces {
        face.as_ref().hash(&mut hasher);
    }
    hasher.finish()
}
