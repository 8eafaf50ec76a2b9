//! Sparse per-vertex influence weights.

use hashbrown::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sparse mapping from vertex index to influence weight.
///
/// Only vertices with a nonzero weight are stored, so the map doubles as the
/// set of vertices a relaxation is allowed to move. Weights are taken as-is:
/// they are multiplied into the offset and never clamped, so paint weights
/// outside `[0, 1]` behave as the host defines them.
///
/// # Example
///
/// ```
/// use mesh_relax::WeightMap;
///
/// // Dense paint weights, one per vertex
/// let weights = WeightMap::from_dense(&[0.0, 1.0, 0.25, 0.0]);
///
/// assert_eq!(weights.len(), 2);
/// assert!((weights.get(2) - 0.25).abs() < f64::EPSILON);
/// assert!(!weights.contains(0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawWeights"))]
pub struct WeightMap {
    weights: HashMap<u32, f64>,
}

/// Serialized form of [`WeightMap`], before zero weights are dropped.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawWeights {
    weights: HashMap<u32, f64>,
}

#[cfg(feature = "serde")]
impl From<RawWeights> for WeightMap {
    fn from(raw: RawWeights) -> Self {
        raw.weights.into_iter().collect()
    }
}

impl WeightMap {
    /// Create an empty weight map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a dense weight array indexed by vertex.
    ///
    /// Zero weights are dropped. Vertex indices are `u32`, so entries past
    /// index `u32::MAX` are ignored.
    #[must_use]
    pub fn from_dense(weights: &[f64]) -> Self {
        weights
            .iter()
            .enumerate()
            .map_while(|(v, &w)| u32::try_from(v).ok().map(|v| (v, w)))
            .filter(|&(_, w)| w != 0.0)
            .collect()
    }

    /// Assign the same weight to every listed vertex.
    ///
    /// A zero weight produces an empty map.
    #[must_use]
    pub fn uniform<I>(vertices: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        vertices.into_iter().map(|v| (v, weight)).collect()
    }

    /// Set the weight of a vertex, returning the previous weight.
    ///
    /// Setting a zero weight removes the vertex.
    pub fn insert(&mut self, vertex: u32, weight: f64) -> Option<f64> {
        if weight == 0.0 {
            self.weights.remove(&vertex)
        } else {
            self.weights.insert(vertex, weight)
        }
    }

    /// Remove a vertex, returning its weight.
    pub fn remove(&mut self, vertex: u32) -> Option<f64> {
        self.weights.remove(&vertex)
    }

    /// Weight of a vertex, `0.0` if absent.
    #[must_use]
    pub fn get(&self, vertex: u32) -> f64 {
        self.weights.get(&vertex).copied().unwrap_or(0.0)
    }

    /// Check whether a vertex has a nonzero weight.
    #[must_use]
    pub fn contains(&self, vertex: u32) -> bool {
        self.weights.contains_key(&vertex)
    }

    /// Number of weighted vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Check whether no vertex is weighted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Iterate over `(vertex, weight)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.weights.iter().map(|(&v, &w)| (v, w))
    }

    /// Weighted entries sorted by vertex index.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<(u32, f64)> {
        let mut entries: Vec<(u32, f64)> = self.iter().collect();
        entries.sort_unstable_by_key(|&(v, _)| v);
        entries
    }
}

impl FromIterator<(u32, f64)> for WeightMap {
    fn from_iter<T: IntoIterator<Item = (u32, f64)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (v, w) in iter {
            map.insert(v, w);
        }
        map
    }
}

impl Extend<(u32, f64)> for WeightMap {
    fn extend<T: IntoIterator<Item = (u32, f64)>>(&mut self, iter: T) {
        for (v, w) in iter {
            self.insert(v, w);
        }
    }
}
