//! Weighted iterative Laplacian relaxation for polygonal mesh surfaces.
//!
//! Relaxation repeatedly moves each weighted vertex toward the average of its
//! edge-connected neighbors, scaled by its weight and by a global envelope
//! and strength. It smooths noise out of a surface without changing its
//! topology: vertex count and connectivity are fixed, only positions move.
//!
//! - [`MeshAdjacency`] - Vertex neighbor table built from faces, edges or neighbor lists
//! - [`WeightMap`] - Sparse per-vertex influence weights
//! - [`RelaxParams`] - Envelope, strength, iterations and sub-steps
//! - [`relax`] - The solver
//! - [`RelaxDeformer`] - Deformer wrapper that caches adjacency between calls
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero Bevy dependencies. It knows nothing of
//! scene graphs or host attribute systems; a host hands it positions, topology
//! and weights and writes the returned positions back.
//!
//! # Quick Start
//!
//! ```
//! use mesh_relax::{relax, MeshAdjacency, RelaxParams, WeightMap};
//! use nalgebra::Point3;
//!
//! // Two triangles forming a square, with one corner pushed up
//! let adjacency = MeshAdjacency::from_faces(4, &[[0u32, 1, 2], [0, 2, 3]])?;
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.5),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//!
//! // Only the raised corner may move
//! let weights = WeightMap::from_dense(&[0.0, 0.0, 1.0, 0.0]);
//! let params = RelaxParams::new().with_strength(1.0).with_iterations(2);
//!
//! let output = relax(&positions, &adjacency, &weights, &params)?;
//!
//! assert!(output.was_relaxed());
//! assert!(output.positions[2].z < 0.5);
//! assert_eq!(output.positions[0], positions[0]);
//! println!("{output}");
//! # Ok::<(), mesh_relax::RelaxError>(())
//! ```
//!
//! # Sub-step Damping
//!
//! Each iteration runs `steps` sub-passes. Sub-pass `s` (0-based) divides its
//! offset by `steps - s`, so with three steps the passes apply 1/3, 1/2 and
//! the full offset in turn, each measured from the previous pass's result.
//!
//! # No-op Inputs
//!
//! A zero envelope, iteration count, step count or strength, or an empty
//! weight map, returns the input unchanged with
//! [`RelaxStatus::Skipped`] rather than an error.
//!
//! # Features
//!
//! - `serde` - Serialize/deserialize [`RelaxParams`], [`WeightMap`] and status types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod adjacency;
mod deformer;
mod error;
mod params;
mod relax;
mod residual;
mod result;
mod weights;

pub use adjacency::{Adjacency, MeshAdjacency};
pub use deformer::RelaxDeformer;
pub use error::{RelaxError, RelaxResult};
pub use params::RelaxParams;
pub use relax::{relax, relax_in_place};
pub use residual::laplacian_residual;
pub use result::{RelaxOutput, RelaxStatus, SkipReason};
pub use weights::WeightMap;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
