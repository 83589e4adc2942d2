//! Particle swarm optimization.
//!
//! Particles are updated one after another, and the global best follows
//! every personal-best improvement immediately, so later particles in the
//! same iteration are already attracted to it.

use std::sync::Arc;

use ndarray::{Array1, Array2, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::cost::{CostFunction, EvalContext};
use crate::error::{MetaheuristicError, Result};
use crate::parallel_eval::evaluate_population;
use crate::run_state::RunState;
use crate::search_space::SearchSpace;
use crate::{OptimizationReport, Optimizer, RunOptions, Setup, Solution, argmin, make_rng};

/// Weight of the previous velocity in the update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inertia {
    /// Velocity carried over unchanged.
    #[default]
    Unit,
    /// Starts at `max`; after each iteration `w = max - (max - min) * s`,
    /// where `s` is the fraction of particles that improved their personal
    /// best.
    Adaptive {
        /// Lowest inertia.
        min: f64,
        /// Highest inertia.
        max: f64,
    },
}

/// Particle swarm hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoParameters {
    /// Number of particles.
    pub population_size: usize,
    /// Attraction toward each particle's personal best.
    pub personal_weight: f64,
    /// Attraction toward the swarm's global best.
    pub global_weight: f64,
    /// Run length and evaluation checkpoints.
    pub budget: Budget,
    /// Inertia scheme.
    pub inertia: Inertia,
}

impl Default for PsoParameters {
    fn default() -> Self {
        Self {
            population_size: 20,
            personal_weight: 2.0,
            global_weight: 2.0,
            budget: Budget::default(),
            inertia: Inertia::Unit,
        }
    }
}

impl PsoParameters {
    /// Adaptive-inertia preset with `w` in [0.3, 0.99].
    pub fn adaptive_inertia() -> Self {
        Self {
            inertia: Inertia::Adaptive {
                min: 0.3,
                max: 0.99,
            },
            ..Self::default()
        }
    }

    /// Checks every hyperparameter and the reachability of the budget.
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 1 {
            return Err(MetaheuristicError::invalid(
                "population_size",
                self.population_size as f64,
                "must be >= 1",
            ));
        }
        for (name, w) in [
            ("personal_weight", self.personal_weight),
            ("global_weight", self.global_weight),
        ] {
            if !(w >= 0.0 && w.is_finite()) {
                return Err(MetaheuristicError::invalid(name, w, "must be >= 0"));
            }
        }
        if let Inertia::Adaptive { min, max } = self.inertia {
            if !(min >= 0.0 && min.is_finite()) {
                return Err(MetaheuristicError::invalid("min_inertia", min, "must be >= 0"));
            }
            if !(max >= min && max.is_finite()) {
                return Err(MetaheuristicError::invalid(
                    "max_inertia",
                    max,
                    "must be >= min_inertia",
                ));
            }
        }
        crate::budget::Schedule::new(&self.budget, self.population_size, self.population_size)?;
        Ok(())
    }
}

/// Particle swarm optimizer.
#[derive(Default)]
pub struct ParticleSwarm {
    setup: Setup<PsoParameters>,
}

impl ParticleSwarm {
    /// Creates an optimizer with nothing defined yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Optimizer for ParticleSwarm {
    type Parameters = PsoParameters;

    fn set_parameters(&mut self, parameters: PsoParameters) -> Result<()> {
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
        let npop = params.population_size;
        let (name, mut inertia) = match params.inertia {
            Inertia::Unit => ("PSO", 1.0),
            Inertia::Adaptive { max, .. } => ("AIW-PSO", max),
        };

        let mut rng = make_rng(self.setup.options.seed);
        let mut state = RunState::new(name, &params.budget, npop, npop, &mut self.setup.options)?;

        let mut positions = space.sample_population(npop, &mut rng);
        let mut velocities: Array2<f64> = space.sample_population(npop, &mut rng);
        let energies = evaluate_population(
            &positions,
            cost.as_ref(),
            &EvalContext::fresh(0.0),
            &state.options().parallel,
        )?;

        let mut personal_best = positions.clone();
        let mut personal_cost = energies.to_vec();
        let (best_i, best_cost) = argmin(&personal_cost);
        let mut global = Solution::new(positions.row(best_i).to_owned(), best_cost);
        state.initialized(&global);

        for iteration in 0..state.iterations() {
            let context = EvalContext::fresh(state.progress(iteration));
            let mut improved = 0usize;

            for p in 0..npop {
                let r1: f64 = rng.random::<f64>();
                let r2: f64 = rng.random::<f64>();
                Zip::from(velocities.row_mut(p))
                    .and(positions.row(p))
                    .and(personal_best.row(p))
                    .and(&global.variables)
                    .for_each(|v, &x, &pb, &gb| {
                        *v = inertia * *v
                            + params.personal_weight * r1 * (pb - x)
                            + params.global_weight * r2 * (gb - x);
                    });

                let mut x: Array1<f64> = &positions.row(p) + &velocities.row(p);
                space.clamp(&mut x);
                positions.row_mut(p).assign(&x);

                let c = cost.cost(&x, &context)?;
                if c < personal_cost[p] {
                    improved += 1;
                    personal_cost[p] = c;
                    personal_best.row_mut(p).assign(&x);
                    if c < global.cost {
                        global = Solution::new(x, c);
                    }
                }
            }

            if let Inertia::Adaptive { min, max } = params.inertia {
                let rate = improved as f64 / npop as f64;
                inertia = max - (max - min) * rate;
            }

            if !state.iteration_done(&global) {
                break;
            }
        }

        Ok(state.finish(global))
    }
}
