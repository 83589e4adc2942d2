use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cost::{CostFunction, EvalContext};
use crate::error::Result;

/// Parallel evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Enable parallel evaluation
    pub enabled: bool,
    /// Number of threads to use (None = use rayon default)
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_threads: None,
        }
    }
}

impl ParallelConfig {
    /// Configures the global rayon pool once if a thread count was requested.
    pub(crate) fn install(&self) {
        if let Some(n) = self.num_threads {
            // already initialised by an earlier run
            let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
        }
    }
}

/// Evaluate independent candidates, in parallel when enabled.
///
/// Costs are returned in candidate order. The first failing evaluation
/// aborts the batch.
pub fn evaluate_candidates(
    candidates: &[Array1<f64>],
    cost: &dyn CostFunction,
    context: &EvalContext,
    config: &ParallelConfig,
) -> Result<Vec<f64>> {
    if !config.enabled || candidates.len() < 4 {
        return candidates
            .iter()
            .map(|c| cost.cost(c, context).map_err(Into::into))
            .collect();
    }

    candidates
        .par_iter()
        .map(|c| cost.cost(c, context).map_err(Into::into))
        .collect()
}

/// Evaluate every row of `population`.
pub fn evaluate_population(
    population: &Array2<f64>,
    cost: &dyn CostFunction,
    context: &EvalContext,
    config: &ParallelConfig,
) -> Result<Array1<f64>> {
    let rows: Vec<Array1<f64>> = population.rows().into_iter().map(|r| r.to_owned()).collect();
    evaluate_candidates(&rows, cost, context, config).map(Array1::from_vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CostError, MetaheuristicError};
    use approx::assert_abs_diff_eq;

    /// Sphere scaled by the progress carried in the context.
    struct Scaled;

    impl CostFunction for Scaled {
        fn cost(&self, x: &Array1<f64>, ctx: &EvalContext) -> std::result::Result<f64, CostError> {
            Ok(ctx.progress * x.iter().map(|v| v * v).sum::<f64>())
        }
    }

    #[test]
    fn test_costs_keep_candidate_order() {
        let population =
            Array2::from_shape_fn((12, 3), |(i, j)| i as f64 * 0.5 - j as f64 * 0.25);
        let ctx = EvalContext::fresh(0.5);
        let parallel = ParallelConfig {
            enabled: true,
            num_threads: Some(2),
        };
        let sequential = ParallelConfig {
            enabled: false,
            num_threads: None,
        };
        let a = evaluate_population(&population, &Scaled, &ctx, &parallel).unwrap();
        let b = evaluate_population(&population, &Scaled, &ctx, &sequential).unwrap();
        assert_eq!(a, b);
        for (i, row) in population.rows().into_iter().enumerate() {
            assert_abs_diff_eq!(a[i], 0.5 * row.dot(&row), epsilon = 1e-12);
        }
    }

    struct Failing;

    impl CostFunction for Failing {
        fn cost(&self, x: &Array1<f64>, _: &EvalContext) -> std::result::Result<f64, CostError> {
            if x[0] > 0.5 {
                Err("out of domain".into())
            } else {
                Ok(x[0])
            }
        }
    }

    #[test]
    fn test_failure_aborts_batch() {
        let candidates: Vec<Array1<f64>> =
            (0..8).map(|i| Array1::from(vec![i as f64 * 0.1])).collect();
        let res = evaluate_candidates(
            &candidates,
            &Failing,
            &EvalContext::default(),
            &ParallelConfig::default(),
        );
        assert!(matches!(res, Err(MetaheuristicError::Cost(_))));
    }
}
