//! Vertex adjacency for relaxation.
//!
//! The solver only ever asks one question of the mesh topology: which
//! vertices share an edge with vertex `v`. [`Adjacency`] is that question as a
//! trait, so a host can answer it from its own connectivity structures, and
//! [`MeshAdjacency`] is the table-backed answer built once from faces, edges
//! or per-vertex neighbor lists.

use crate::error::{RelaxError, RelaxResult};

/// Read-only edge connectivity of a mesh.
///
/// Implementations must be undirected (if `b` is a neighbor of `a`, then `a` is
/// a neighbor of `b`) and must not change while a relaxation is running.
/// Neighbor order is unspecified.
pub trait Adjacency {
    /// Number of vertices covered by this adjacency.
    fn vertex_count(&self) -> usize;

    /// Vertices directly edge-connected to `vertex`.
    ///
    /// Returns an empty slice for an isolated vertex.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::VertexOutOfRange`] if `vertex >= vertex_count()`.
    fn neighbors(&self, vertex: usize) -> RelaxResult<&[u32]>;
}

/// Precomputed vertex neighbor table.
///
/// Each vertex stores a deduplicated list of its edge neighbors, so a lookup
/// is a single index into the table.
///
/// # Example
///
/// ```
/// use mesh_relax::MeshAdjacency;
///
/// // A quad split into two triangles
/// let faces = [[0u32, 1, 2], [0, 2, 3]];
/// let adj = MeshAdjacency::from_faces(4, &faces)?;
///
/// assert_eq!(adj.edge_count(), 5);
/// assert_eq!(adj.neighbors(0)?.len(), 3);
/// assert_eq!(adj.neighbors(1)?.len(), 2);
/// # Ok::<(), mesh_relax::RelaxError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshAdjacency {
    neighbors: Vec<Vec<u32>>,
}

impl MeshAdjacency {
    /// Create an adjacency with `vertex_count` isolated vertices.
    #[must_use]
    pub fn isolated(vertex_count: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); vertex_count],
        }
    }

    /// Build adjacency from polygon faces.
    ///
    /// Faces may have any number of corners (triangles, quads, n-gons).
    /// Consecutive corners, including the last and first, are connected.
    /// Faces with fewer than two corners contribute no edges.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::FaceIndexOutOfRange`] if a face references a
    /// vertex `>= vertex_count`.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_relax::MeshAdjacency;
    ///
    /// // A single quad face
    /// let adj = MeshAdjacency::from_faces(4, &[[0u32, 1, 2, 3]])?;
    /// let mut ring = adj.neighbors(0)?.to_vec();
    /// ring.sort_unstable();
    /// assert_eq!(ring, vec![1, 3]);
    /// # Ok::<(), mesh_relax::RelaxError>(())
    /// ```
    pub fn from_faces<F>(vertex_count: usize, faces: &[F]) -> RelaxResult<Self>
    where
        F: AsRef<[u32]>,
    {
        let mut adjacency = Self::isolated(vertex_count);

        for (face_idx, face) in faces.iter().enumerate() {
            let corners = face.as_ref();

            if let Some(&index) = corners.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(RelaxError::FaceIndexOutOfRange {
                    face: face_idx,
                    index,
                    vertex_count,
                });
            }

            if corners.len() < 2 {
                continue;
            }

            for (i, &v0) in corners.iter().enumerate() {
                let v1 = corners[(i + 1) % corners.len()];
                adjacency.add_edge(v0, v1);
            }
        }

        Ok(adjacency)
    }

    /// Build adjacency from an explicit list of undirected edges.
    ///
    /// Self-loops are ignored and duplicate edges collapse.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::VertexOutOfRange`] if an edge endpoint is
    /// `>= vertex_count`.
    pub fn from_edges(vertex_count: usize, edges: &[[u32; 2]]) -> RelaxResult<Self> {
        let mut adjacency = Self::isolated(vertex_count);

        for &[v0, v1] in edges {
            for v in [v0, v1] {
                if v as usize >= vertex_count {
                    return Err(RelaxError::VertexOutOfRange {
                        index: v as usize,
                        vertex_count,
                    });
                }
            }
            adjacency.add_edge(v0, v1);
        }

        Ok(adjacency)
    }

    /// Build adjacency from per-vertex neighbor lists.
    ///
    /// This is the natural form when a host already answers "connected
    /// vertices" queries. The vertex count is `lists.len()`. Lists are
    /// deduplicated, self-references dropped, and the relation is made
    /// symmetric, so one-sided entries are mirrored.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::VertexOutOfRange`] if any list names a vertex
    /// `>= lists.len()`.
    pub fn from_neighbor_lists(lists: &[Vec<u32>]) -> RelaxResult<Self> {
        let vertex_count = lists.len();
        let mut adjacency = Self::isolated(vertex_count);

        for (v, list) in lists.iter().enumerate() {
            for &n in list {
                if n as usize >= vertex_count {
                    return Err(RelaxError::VertexOutOfRange {
                        index: n as usize,
                        vertex_count,
                    });
                }
                #[allow(clippy::cast_possible_truncation)]
                adjacency.add_edge(v as u32, n);
            }
        }

        Ok(adjacency)
    }

    /// Add an undirected edge, skipping self-loops and duplicates.
    fn add_edge(&mut self, v0: u32, v1: u32) {
        if v0 == v1 {
            return;
        }

        if !self.neighbors[v0 as usize].contains(&v1) {
            self.neighbors[v0 as usize].push(v1);
        }
        if !self.neighbors[v1 as usize].contains(&v0) {
            self.neighbors[v1 as usize].push(v0);
        }
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Check whether the adjacency covers no vertices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        // Each edge is stored once per endpoint
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Neighbors of `vertex`.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::VertexOutOfRange`] if `vertex` is not a valid index.
    #[inline]
    pub fn neighbors(&self, vertex: usize) -> RelaxResult<&[u32]> {
        self.neighbors
            .get(vertex)
            .map(Vec::as_slice)
            .ok_or(RelaxError::VertexOutOfRange {
                index: vertex,
                vertex_count: self.neighbors.len(),
            })
    }

    /// Number of neighbors of `vertex`.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::VertexOutOfRange`] if `vertex` is not a valid index.
    #[inline]
    pub fn degree(&self, vertex: usize) -> RelaxResult<usize> {
        self.neighbors(vertex).map(<[u32]>::len)
    }

    /// Iterate over vertices with no neighbors.
    pub fn isolated_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.neighbors
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_empty())
            .map(|(v, _)| v)
    }
}

impl Adjacency for MeshAdjacency {
    #[inline]
    fn vertex_count(&self) -> usize {
        Self::vertex_count(self)
    }

    #[inline]
    fn neighbors(&self, vertex: usize) -> RelaxResult<&[u32]> {
        Self::neighbors(self, vertex)
    }
}
