//! Relaxation parameters.
//!
//! This module provides the [`RelaxParams`] struct, the immutable set of
//! scalar controls passed to every relaxation call.

use crate::error::{RelaxError, RelaxResult};
use crate::result::SkipReason;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scalar controls for a relaxation.
///
/// The offset applied to a weighted vertex per sub-pass is
/// `(neighbor_average - position) * weight * envelope * strength`, divided by
/// the sub-step damping divisor.
///
/// Defaults follow the usual deformer attribute defaults: full envelope,
/// half strength, no iterations and three sub-steps. With zero iterations the
/// default parameters leave the mesh untouched until the caller asks for
/// iterations.
///
/// # Examples
///
/// ```
/// use mesh_relax::RelaxParams;
///
/// let params = RelaxParams::new()
///     .with_strength(1.0)
///     .with_iterations(4)
///     .with_steps(2);
///
/// assert_eq!(params.iterations, 4);
/// assert_eq!(params.sub_pass_count(), 8);
/// assert!(params.skip_reason().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RelaxParams {
    /// Global blend factor for the whole effect, typically `0.0..=1.0`.
    pub envelope: f64,

    /// Fraction of the computed offset applied, recognized range `0.0..=1.0`.
    pub strength: f64,

    /// Number of outer passes.
    pub iterations: u32,

    /// Damped sub-passes per iteration.
    pub steps: u32,
}

impl Default for RelaxParams {
    fn default() -> Self {
        Self {
            envelope: 1.0,
            strength: 0.5,
            iterations: 0,
            steps: 3,
        }
    }
}

impl RelaxParams {
    /// Create parameters with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A light single-iteration smoothing.
    #[must_use]
    pub fn gentle() -> Self {
        Self {
            iterations: 1,
            ..Self::default()
        }
    }

    /// Full-strength smoothing with several iterations.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            strength: 1.0,
            iterations: 10,
            ..Self::default()
        }
    }

    /// Set the envelope.
    #[must_use]
    pub const fn with_envelope(mut self, envelope: f64) -> Self {
        self.envelope = envelope;
        self
    }

    /// Set the strength.
    #[must_use]
    pub const fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Set the number of iterations.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the number of sub-steps per iteration.
    #[must_use]
    pub const fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Combined scalar blend, `envelope * strength`.
    #[must_use]
    pub fn blend(&self) -> f64 {
        self.envelope * self.strength
    }

    /// Total number of sub-passes a relaxation will run.
    #[must_use]
    pub const fn sub_pass_count(&self) -> u64 {
        self.iterations as u64 * self.steps as u64
    }

    /// Reason these controls alone make a relaxation a no-op.
    ///
    /// Checked in order: envelope, iterations, steps, strength. An empty
    /// weight map is the remaining no-op case and is checked by the solver.
    #[must_use]
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if self.envelope == 0.0 {
            Some(SkipReason::ZeroEnvelope)
        } else if self.iterations == 0 {
            Some(SkipReason::ZeroIterations)
        } else if self.steps == 0 {
            Some(SkipReason::ZeroSteps)
        } else if self.strength == 0.0 {
            Some(SkipReason::ZeroStrength)
        } else {
            None
        }
    }

    /// Check that the scalar controls are finite.
    ///
    /// Negative values are accepted; the declared `0..=1` range is a host
    /// concern.
    ///
    /// # Errors
    ///
    /// Returns [`RelaxError::NonFiniteControl`] naming the first non-finite control.
    pub fn validate(&self) -> RelaxResult<()> {
        for (name, value) in [("envelope", self.envelope), ("strength", self.strength)] {
            if !value.is_finite() {
                return Err(RelaxError::NonFiniteControl { name, value });
            }
        }
        Ok(())
    }
}
