//! Result types for relaxation.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a relaxation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SkipReason {
    /// The envelope is zero.
    ZeroEnvelope,
    /// The iteration count is zero.
    ZeroIterations,
    /// The sub-step count is zero.
    ZeroSteps,
    /// The strength is zero.
    ZeroStrength,
    /// No vertex carries a nonzero weight.
    NoWeights,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::ZeroEnvelope => "envelope is zero",
            Self::ZeroIterations => "iterations is zero",
            Self::ZeroSteps => "steps is zero",
            Self::ZeroStrength => "strength is zero",
            Self::NoWeights => "no weighted vertices",
        };
        f.write_str(reason)
    }
}

/// Outcome of a relaxation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RelaxStatus {
    /// The relaxation ran its sub-passes.
    Relaxed,
    /// The relaxation short-circuited and positions are unchanged.
    Skipped(SkipReason),
}

impl RelaxStatus {
    /// Check whether the relaxation ran.
    #[must_use]
    pub const fn is_relaxed(&self) -> bool {
        matches!(self, Self::Relaxed)
    }

    /// The skip reason, if the relaxation short-circuited.
    #[must_use]
    pub const fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Relaxed => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

/// Result of a relaxation.
#[derive(Debug, Clone)]
pub struct RelaxOutput {
    /// Final positions, same length and order as the input.
    pub positions: Vec<Point3<f64>>,

    /// Whether the relaxation ran or was skipped.
    pub status: RelaxStatus,

    /// Number of sub-passes performed (`iterations * steps`, or 0 when skipped).
    pub sub_passes: u64,

    /// Weighted vertices with at least one neighbor.
    ///
    /// Every one of them is updated each sub-pass, but a vertex already on its
    /// neighbor average is counted without moving.
    pub vertices_relaxed: usize,

    /// Weighted vertices skipped because they have no neighbors.
    pub isolated_skipped: usize,

    /// Largest single-vertex move within one sub-pass.
    pub max_step_displacement: f64,

    /// Largest distance between a final and an input position.
    pub max_displacement: f64,

    /// Laplacian residual of the weighted vertices before relaxing.
    pub residual_before: f64,

    /// Laplacian residual of the weighted vertices after relaxing.
    pub residual_after: f64,
}

impl RelaxOutput {
    /// Output for a skipped relaxation: positions unchanged, all metrics zero.
    #[must_use]
    pub fn skipped(positions: Vec<Point3<f64>>, reason: SkipReason) -> Self {
        Self {
            positions,
            status: RelaxStatus::Skipped(reason),
            sub_passes: 0,
            vertices_relaxed: 0,
            isolated_skipped: 0,
            max_step_displacement: 0.0,
            max_displacement: 0.0,
            residual_before: 0.0,
            residual_after: 0.0,
        }
    }

    /// Check whether the relaxation ran.
    #[must_use]
    pub const fn was_relaxed(&self) -> bool {
        self.status.is_relaxed()
    }

    /// Fraction of the initial residual left after relaxing.
    ///
    /// Returns `1.0` when the initial residual is zero.
    #[must_use]
    pub fn residual_ratio(&self) -> f64 {
        if self.residual_before > 0.0 {
            self.residual_after / self.residual_before
        } else {
            1.0
        }
    }
}

impl std::fmt::Display for RelaxOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            RelaxStatus::Skipped(reason) => write!(f, "Relax skipped: {reason}"),
            RelaxStatus::Relaxed => write!(
                f,
                "Relax: {} vertices over {} sub-passes, max displacement {:.6}, residual {:.6} → {:.6}",
                self.vertices_relaxed,
                self.sub_passes,
                self.max_displacement,
                self.residual_before,
                self.residual_after
            ),
        }
    }
}
