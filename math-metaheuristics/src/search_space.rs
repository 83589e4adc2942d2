use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MetaheuristicError, Result};

/// Per-variable initialization ranges and hard bounds.
///
/// Every variable is initialized uniformly in `[lower, upper]`. Bounded
/// variables are additionally clamped into that range after every move;
/// unbounded ones may leave it during the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    lower: Array1<f64>,
    upper: Array1<f64>,
    bounded: Vec<bool>,
}

impl SearchSpace {
    /// Builds a search space from `(min, max)` pairs and bounded flags.
    ///
    /// # Errors
    ///
    /// `EmptySearchSpace` when no variable is given, `RangeFlagMismatch` when
    /// the two lists differ in length, `InvalidRange` for a reversed or
    /// non-finite range.
    pub fn new(ranges: &[(f64, f64)], bounded: &[bool]) -> Result<Self> {
        if ranges.is_empty() || bounded.is_empty() {
            return Err(MetaheuristicError::EmptySearchSpace);
        }
        if ranges.len() != bounded.len() {
            return Err(MetaheuristicError::RangeFlagMismatch {
                ranges: ranges.len(),
                flags: bounded.len(),
            });
        }
        for (index, &(lower, upper)) in ranges.iter().enumerate() {
            if !lower.is_finite() || !upper.is_finite() || lower > upper {
                return Err(MetaheuristicError::InvalidRange {
                    index,
                    lower,
                    upper,
                });
            }
        }
        Ok(Self {
            lower: ranges.iter().map(|r| r.0).collect(),
            upper: ranges.iter().map(|r| r.1).collect(),
            bounded: bounded.to_vec(),
        })
    }

    /// Same range for every variable.
    pub fn uniform(n: usize, range: (f64, f64), bounded: bool) -> Result<Self> {
        Self::new(&vec![range; n], &vec![bounded; n])
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// `true` when there are no variables (never the case once built).
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower ends of the ranges.
    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    /// Upper ends of the ranges.
    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Whether variable `j` is hard-bounded.
    pub fn is_bounded(&self, j: usize) -> bool {
        self.bounded[j]
    }

    /// Clamps `value` into the range of variable `j` if it is bounded.
    pub fn clamp_variable(&self, j: usize, value: f64) -> f64 {
        if self.bounded[j] {
            value.clamp(self.lower[j], self.upper[j])
        } else {
            value
        }
    }

    /// Clamps every bounded variable of `x` into its range.
    pub fn clamp(&self, x: &mut Array1<f64>) {
        for (j, v) in x.iter_mut().enumerate() {
            *v = self.clamp_variable(j, *v);
        }
    }

    /// `true` when every bounded variable of `x` lies in its range.
    pub fn contains(&self, x: &Array1<f64>) -> bool {
        x.len() == self.len()
            && x.iter()
                .enumerate()
                .all(|(j, &v)| !self.bounded[j] || (v >= self.lower[j] && v <= self.upper[j]))
    }

    /// Uniform sample inside the initialization ranges.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        Array1::from_shape_fn(self.len(), |j| self.sample_variable(j, rng))
    }

    /// Uniform sample of variable `j` inside its initialization range.
    pub fn sample_variable<R: Rng + ?Sized>(&self, j: usize, rng: &mut R) -> f64 {
        let u: f64 = rng.random::<f64>();
        self.lower[j] + u * (self.upper[j] - self.lower[j])
    }

    /// `npop` uniform samples, one per row.
    pub(crate) fn sample_population<R: Rng + ?Sized>(&self, npop: usize, rng: &mut R) -> Array2<f64> {
        let n = self.len();
        let mut pop = Array2::<f64>::zeros((npop, n));
        for i in 0..npop {
            for j in 0..n {
                pop[(i, j)] = self.sample_variable(j, rng);
            }
        }
        pop
    }
}
