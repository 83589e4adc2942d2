use ndarray::Array1;

use crate::error::CostError;

/// Which part of a candidate changed since its previous evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touched {
    /// Candidate is new or changed everywhere; recompute from scratch.
    All,
    /// Only the variable at this index was perturbed.
    Variable(usize),
}

/// Information an optimizer passes along with every evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalContext {
    /// What changed in the candidate.
    pub touched: Touched,
    /// Fraction of the run already completed, in [0, 1].
    pub progress: f64,
}

impl EvalContext {
    /// Context for a freshly generated candidate.
    pub fn fresh(progress: f64) -> Self {
        Self {
            touched: Touched::All,
            progress,
        }
    }

    /// Context for a candidate that differs from the last one in one variable.
    pub fn single(index: usize, progress: f64) -> Self {
        Self {
            touched: Touched::Variable(index),
            progress,
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::fresh(0.0)
    }
}

/// Black-box objective minimized by every optimizer.
///
/// Implementations must be thread-safe: population-based optimizers evaluate
/// independent candidates on the rayon pool.
pub trait CostFunction: Send + Sync {
    /// Cost of `candidate`; lower is better.
    fn cost(&self, candidate: &Array1<f64>, context: &EvalContext) -> Result<f64, CostError>;
}

impl<F> CostFunction for F
where
    F: Fn(&Array1<f64>) -> f64 + Send + Sync,
{
    fn cost(&self, candidate: &Array1<f64>, _context: &EvalContext) -> Result<f64, CostError> {
        Ok(self(candidate))
    }
}
