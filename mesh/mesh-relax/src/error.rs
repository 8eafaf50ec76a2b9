//! Error types for mesh relaxation.

use thiserror::Error;

/// Errors that can occur while building adjacency or relaxing a mesh.
///
/// Degenerate controls (zero envelope, zero iterations, ...) and isolated
/// vertices are not errors; they are reported through
/// [`RelaxStatus`](crate::RelaxStatus) and [`RelaxOutput`](crate::RelaxOutput).
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum RelaxError {
    /// A vertex index is outside `[0, vertex_count)`.
    #[error("vertex index {index} out of range (mesh has {vertex_count} vertices)")]
    VertexOutOfRange {
        /// The invalid index.
        index: usize,
        /// The number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index} (mesh has {vertex_count} vertices)")]
    FaceIndexOutOfRange {
        /// Index of the offending face.
        face: usize,
        /// The invalid vertex index.
        index: u32,
        /// The number of vertices in the mesh.
        vertex_count: usize,
    },

    /// The position buffer does not match the adjacency vertex count.
    #[error("position buffer has {actual} points but topology has {expected} vertices")]
    PositionCountMismatch {
        /// Vertex count reported by the adjacency.
        expected: usize,
        /// Length of the position buffer.
        actual: usize,
    },

    /// A deformer was asked to deform before any topology was assigned.
    #[error("no topology assigned to deformer")]
    MissingTopology,

    /// A control value or weight is NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFiniteControl {
        /// Name of the control.
        name: &'static str,
        /// The offending value.
        value: f64,
    },
}

/// Result type for relaxation operations.
pub type RelaxResult<T> = std::result::Result<T, RelaxError>;
