//! Simulated annealing over a single current solution.
//!
//! Every local iteration perturbs one randomly chosen variable and accepts
//! the move with the Metropolis rule. The temperature stays fixed during the
//! local loop and decays geometrically after each global iteration.
//!
//! Two perturbation schemes are available: a fixed `±step` on the chosen
//! variable, or a step whose spread follows a per-variable crystallization
//! factor (shrunk after accepted moves, grown after rejected ones).

use std::sync::Arc;

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::cost::{CostFunction, EvalContext};
use crate::error::{MetaheuristicError, Result, positive};
use crate::run_state::RunState;
use crate::search_space::SearchSpace;
use crate::{OptimizationReport, Optimizer, RunOptions, Setup, Solution, make_rng};

/// How the chosen variable is moved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Perturbation {
    /// Add `+step_size` or `-step_size` with equal probability.
    FixedStep {
        /// Magnitude of every move.
        step_size: f64,
    },
    /// Add `base_step * (u_1 + ... + u_c)` with `u_i ~ U(-1, 1)`, where `c` is
    /// the rounded crystallization factor of the variable.
    Crystallization {
        /// Scale of a single uniform term.
        base_step: f64,
    },
}

impl Default for Perturbation {
    fn default() -> Self {
        Perturbation::FixedStep { step_size: 1e-2 }
    }
}

/// Simulated annealing hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaParameters {
    /// Starting temperature.
    pub initial_temperature: f64,
    /// Geometric cooling factor in (0, 1].
    pub cooling_constant: f64,
    /// Moves attempted per global iteration.
    pub local_iterations: usize,
    /// Number of global iterations, or evaluation checkpoints.
    pub budget: Budget,
    /// Move generation scheme.
    pub perturbation: Perturbation,
}

impl Default for SaParameters {
    fn default() -> Self {
        Self {
            initial_temperature: 10.0,
            cooling_constant: 0.99,
            local_iterations: 100,
            budget: Budget::default(),
            perturbation: Perturbation::default(),
        }
    }
}

impl SaParameters {
    /// Crystallization preset.
    pub fn crystallization() -> Self {
        Self {
            initial_temperature: 50.0,
            perturbation: Perturbation::Crystallization { base_step: 0.1 },
            ..Self::default()
        }
    }

    /// Checks every hyperparameter and the reachability of the budget.
    pub fn validate(&self) -> Result<()> {
        positive("initial_temperature", self.initial_temperature)?;
        if !(self.cooling_constant > 0.0 && self.cooling_constant <= 1.0) {
            return Err(MetaheuristicError::invalid(
                "cooling_constant",
                self.cooling_constant,
                "must be in (0, 1]",
            ));
        }
        if self.local_iterations < 1 {
            return Err(MetaheuristicError::invalid(
                "local_iterations",
                self.local_iterations as f64,
                "must be >= 1",
            ));
        }
        match self.perturbation {
            Perturbation::FixedStep { step_size } => positive("step_size", step_size)?,
            Perturbation::Crystallization { base_step } => positive("base_step", base_step)?,
        }
        crate::budget::Schedule::new(&self.budget, 1, self.local_iterations)?;
        Ok(())
    }
}

/// Simulated annealing optimizer.
#[derive(Default)]
pub struct SimulatedAnnealing {
    setup: Setup<SaParameters>,
    crystallization: Array1<f64>,
}

impl SimulatedAnnealing {
    /// Creates an optimizer with nothing defined yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Crystallization factors at the end of the last run (all ones for the
    /// fixed-step scheme).
    pub fn crystallization_factors(&self) -> &Array1<f64> {
        &self.crystallization
    }
}

impl Optimizer for SimulatedAnnealing {
    type Parameters = SaParameters;

    fn set_parameters(&mut self, parameters: SaParameters) -> Result<()> {
        parameters.validate()?;
        self.setup.set_parameters(parameters);
        Ok(())
    }

    fn define_variables(&mut self, space: SearchSpace) {
        self.setup.set_space(space);
    }

    fn set_cost_function(&mut self, cost: Arc<dyn CostFunction>) {
        self.setup.set_cost(cost);
    }

    fn options_mut(&mut self) -> &mut RunOptions {
        &mut self.setup.options
    }

    fn optimize(&mut self) -> Result<OptimizationReport> {
        let (params, space, cost) = self.setup.ready()?;
        let n = space.len();
        let name = match params.perturbation {
            Perturbation::FixedStep { .. } => "SA",
            Perturbation::Crystallization { .. } => "ACF-SA",
        };

        let mut rng = make_rng(self.setup.options.seed);
        let mut state = RunState::new(
            name,
            &params.budget,
            1,
            params.local_iterations,
            &mut self.setup.options,
        )?;

        let mut current = space.sample(&mut rng);
        let mut current_cost = cost.cost(&current, &EvalContext::fresh(0.0))?;
        let mut best = Solution::new(current.clone(), current_cost);
        state.initialized(&best);

        let mut temperature = params.initial_temperature;
        let mut crystallization = Array1::<f64>::ones(n);

        for global in 0..state.iterations() {
            let progress = state.progress(global);
            for _ in 0..params.local_iterations {
                let j = rng.random_range(0..n);
                let previous = current[j];
                let step = match params.perturbation {
                    Perturbation::FixedStep { step_size } => {
                        if rng.random::<bool>() {
                            step_size
                        } else {
                            -step_size
                        }
                    }
                    Perturbation::Crystallization { base_step } => {
                        let terms = crystallization[j].round().max(1.0) as usize;
                        let walk: f64 = (0..terms).map(|_| rng.random_range(-1.0_f64..1.0)).sum();
                        base_step * walk
                    }
                };
                current[j] = space.clamp_variable(j, previous + step);

                let candidate_cost = cost.cost(&current, &EvalContext::single(j, progress))?;
                let delta = candidate_cost - current_cost;
                let accepted =
                    delta < 0.0 || rng.random::<f64>() < (-delta / temperature).exp();

                if accepted {
                    current_cost = candidate_cost;
                    if current_cost < best.cost {
                        best = Solution::new(current.clone(), current_cost);
                    }
                } else {
                    current[j] = previous;
                }
                if let Perturbation::Crystallization { .. } = params.perturbation {
                    crystallization[j] = if accepted {
                        (crystallization[j] / 4.0).max(1.0)
                    } else {
                        crystallization[j] + 1.0
                    };
                }
            }
            temperature *= params.cooling_constant;

            if !state.iteration_done(&best) {
                break;
            }
        }

        self.crystallization = crystallization;
        Ok(state.finish(best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sphere(x: &Array1<f64>) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    fn greedy(perturbation: Perturbation) -> SaParameters {
        SaParameters {
            initial_temperature: 1e-3,
            cooling_constant: 0.95,
            local_iterations: 50,
            budget: Budget::Iterations(200),
            perturbation,
        }
    }

    fn run(params: SaParameters, space: SearchSpace, seed: u64) -> (OptimizationReport, Array1<f64>) {
        let mut sa = SimulatedAnnealing::new();
        sa.set_parameters(params).unwrap();
        sa.define_variables(space);
        sa.set_cost_function(Arc::new(sphere));
        sa.options_mut().seed = Some(seed);
        let report = sa.optimize().unwrap();
        (report, sa.crystallization_factors().clone())
    }

    #[test]
    fn test_parameter_validation() {
        assert!(SaParameters::default().validate().is_ok());
        assert!(SaParameters::crystallization().validate().is_ok());
        let cases = [
            SaParameters {
                cooling_constant: 1.5,
                ..SaParameters::default()
            },
            SaParameters {
                initial_temperature: 0.0,
                ..SaParameters::default()
            },
            SaParameters {
                local_iterations: 0,
                ..SaParameters::default()
            },
            SaParameters {
                perturbation: Perturbation::FixedStep { step_size: -1.0 },
                ..SaParameters::default()
            },
        ];
        for params in cases {
            assert!(params.validate().is_err());
        }
        // 1 initial evaluation + 100 per global iteration
        let params = SaParameters {
            budget: Budget::Evaluations(vec![1, 101, 1001]),
            ..SaParameters::default()
        };
        assert!(params.validate().is_ok());
        let params = SaParameters {
            budget: Budget::Evaluations(vec![100]),
            ..SaParameters::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MetaheuristicError::Divisibility { .. })
        ));
    }

    #[test]
    fn test_fixed_step_descends() {
        let space = SearchSpace::uniform(2, (-2.0, 2.0), false).unwrap();
        let (report, factors) = run(
            greedy(Perturbation::FixedStep { step_size: 0.05 }),
            space,
            17,
        );
        assert!(report.best.cost < 1e-2, "best cost {}", report.best.cost);
        assert_eq!(report.nfev, 1 + 50 * 200);
        assert!(factors.iter().all(|&c| c == 1.0));
    }

    #[test]
    fn test_crystallization_descends() {
        let space = SearchSpace::uniform(2, (-2.0, 2.0), false).unwrap();
        let (report, factors) = run(
            greedy(Perturbation::Crystallization { base_step: 0.05 }),
            space,
            23,
        );
        assert!(report.best.cost < 1e-2, "best cost {}", report.best.cost);
        assert!(factors.iter().all(|&c| c >= 1.0));
    }

    #[test]
    fn test_bounded_variable_stays_in_range() {
        let mut sa = SimulatedAnnealing::new();
        sa.set_parameters(greedy(Perturbation::FixedStep { step_size: 0.05 }))
            .unwrap();
        sa.define_ranges(&[(-1.0, 1.0)], &[true]).unwrap();
        sa.set_cost_function(Arc::new(|x: &Array1<f64>| (x[0] - 10.0).powi(2)));
        sa.options_mut().seed = Some(2);
        let report = sa.optimize().unwrap();
        assert_abs_diff_eq!(report.best.variables[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_checkpoints_recorded() {
        let params = SaParameters {
            budget: Budget::Evaluations(vec![501, 1, 51]),
            ..greedy(Perturbation::FixedStep { step_size: 0.05 })
        };
        let space = SearchSpace::uniform(2, (-2.0, 2.0), false).unwrap();
        let (report, _) = run(params, space, 4);
        let evals: Vec<usize> = report.recorded.iter().map(|r| r.evaluations).collect();
        assert_eq!(evals, vec![1, 51, 501]);
        assert_eq!(report.recorded[0].iteration, 0);
        assert_eq!(report.nit, 10);
        assert!(
            report
                .recorded
                .windows(2)
                .all(|w| w[1].solution.cost <= w[0].solution.cost)
        );
    }
}
