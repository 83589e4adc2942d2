//! Derivative-free metaheuristic optimizers.
//!
//! Three families share one lifecycle ([`Optimizer`]): set the algorithm
//! parameters, define the search space, set the cost function, then call
//! `optimize()`.
//!
//! - [`Acor`]: Ant Colony Optimization for continuous domains, with an
//!   optional block-adaptive control of `q` and `xi`.
//! - [`SimulatedAnnealing`]: single-solution Metropolis walk, with either a
//!   fixed step or per-variable crystallization factors.
//! - [`ParticleSwarm`]: swarm search, with unit or adaptive inertia.
//!
//! Runs are limited by a [`Budget`]. When the budget is a list of
//! cumulative evaluation counts, the best solution is recorded at each of
//! them so a single run yields a whole convergence curve.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ndarray::Array1;
//! use math_audio_metaheuristics::{Acor, AcorParameters, Budget, Optimizer, SearchSpace};
//!
//! let mut acor = Acor::new();
//! acor.set_parameters(AcorParameters {
//!     budget: Budget::Iterations(200),
//!     ..AcorParameters::default()
//! })
//! .unwrap();
//! acor.define_variables(SearchSpace::uniform(2, (-5.0, 5.0), true).unwrap());
//! acor.set_cost_function(Arc::new(|x: &Array1<f64>| x.dot(x)));
//! acor.options_mut().seed = Some(42);
//!
//! let report = acor.optimize().unwrap();
//! assert!(report.best.cost < 1e-2);
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{CostError, MetaheuristicError, Result};

use std::fmt;
use std::sync::Arc;

use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Ant Colony Optimization for continuous domains.
pub mod acor;
/// Evaluation budgets and checkpoint scheduling.
pub mod budget;
/// Cost function contract and evaluation context.
pub mod cost;
/// Parallel candidate evaluation support.
pub mod parallel_eval;
/// Particle swarm optimization.
pub mod particle_swarm;
/// Per-run bookkeeping shared by all optimizers.
mod run_state;
/// Variable ranges and hard bounds.
pub mod search_space;
/// Simulated annealing.
pub mod simulated_annealing;

pub use acor::{Acor, AcorAdaptation, AcorParameters, SuccessMap};
pub use budget::Budget;
pub use cost::{CostFunction, EvalContext, Touched};
pub use parallel_eval::ParallelConfig;
pub use particle_swarm::{Inertia, ParticleSwarm, PsoParameters};
pub use search_space::SearchSpace;
pub use simulated_annealing::{Perturbation, SaParameters, SimulatedAnnealing};

/// Callback function type
pub type CallbackFn = Box<dyn FnMut(&Intermediate) -> CallbackAction>;

pub(crate) fn argmin(v: &[f64]) -> (usize, f64) {
    let mut best_i = 0usize;
    let mut best_v = v[0];
    for (i, &val) in v.iter().enumerate() {
        if val < best_v {
            best_v = val;
            best_i = i;
        }
    }
    (best_i, best_v)
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => {
            let mut thread_rng = rand::rng();
            StdRng::from_rng(&mut thread_rng)
        }
    }
}

/// A candidate vector together with its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Decision variables.
    pub variables: Array1<f64>,
    /// Cost of `variables`.
    pub cost: f64,
}

impl Solution {
    /// Pairs `variables` with its already computed `cost`.
    pub fn new(variables: Array1<f64>, cost: f64) -> Self {
        Self { variables, cost }
    }
}

/// Best solution captured when an evaluation checkpoint was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSolution {
    /// Requested cumulative evaluation count.
    pub evaluations: usize,
    /// Completed iterations when the snapshot was taken.
    pub iteration: usize,
    /// Best solution at that point.
    pub solution: Solution,
}

/// Result of an optimization run.
#[derive(Clone)]
pub struct OptimizationReport {
    /// Best solution found.
    pub best: Solution,
    /// Snapshots at the requested evaluation checkpoints, ascending.
    pub recorded: Vec<RecordedSolution>,
    /// Number of iterations performed.
    pub nit: usize,
    /// Number of cost evaluations performed.
    pub nfev: usize,
    /// Whether a callback stopped the run before the budget was spent.
    pub stopped_early: bool,
    /// Human-readable status message.
    pub message: String,
}

impl fmt::Debug for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizationReport")
            .field("x", &format!("len={}", self.best.variables.len()))
            .field("fun", &self.best.cost)
            .field("recorded", &self.recorded.len())
            .field("nit", &self.nit)
            .field("nfev", &self.nfev)
            .field("stopped_early", &self.stopped_early)
            .field("message", &self.message)
            .finish()
    }
}

/// Information passed to callback after each iteration.
pub struct Intermediate {
    /// Current best solution vector.
    pub x: Array1<f64>,
    /// Current best objective value.
    pub fun: f64,
    /// Completed iterations.
    pub iter: usize,
    /// Cost evaluations so far.
    pub nfev: usize,
}

/// Action returned by callback to control optimization flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue optimization.
    Continue,
    /// Stop optimization early.
    Stop,
}

/// Settings shared by every optimizer that do not change the algorithm.
pub struct RunOptions {
    /// Optional random seed for reproducibility.
    pub seed: Option<u64>,
    /// Parallel evaluation of independent candidates.
    pub parallel: ParallelConfig,
    /// Log progress every `print_interval` iterations (0 disables).
    pub print_interval: usize,
    /// Optional per-iteration callback (may stop early).
    pub callback: Option<CallbackFn>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: None,
            parallel: ParallelConfig::default(),
            print_interval: 100,
            callback: None,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("seed", &self.seed)
            .field("parallel", &self.parallel)
            .field("print_interval", &self.print_interval)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Common lifecycle of every optimizer family.
pub trait Optimizer {
    /// Algorithm-specific hyperparameters.
    type Parameters;

    /// Validates and stores the algorithm parameters.
    fn set_parameters(&mut self, parameters: Self::Parameters) -> Result<()>;

    /// Sets the variables to search over.
    fn define_variables(&mut self, space: SearchSpace);

    /// Sets the objective to minimize.
    fn set_cost_function(&mut self, cost: Arc<dyn CostFunction>);

    /// Run options (seed, parallelism, logging, callback).
    fn options_mut(&mut self) -> &mut RunOptions;

    /// Runs the search from scratch.
    ///
    /// # Errors
    ///
    /// A configuration error when parameters, variables or cost function are
    /// missing, `Divisibility` for unreachable checkpoints, and any error
    /// raised by the cost function.
    fn optimize(&mut self) -> Result<OptimizationReport>;

    /// Builds the search space from `(min, max)` ranges and bounded flags.
    fn define_ranges(&mut self, ranges: &[(f64, f64)], bounded: &[bool]) -> Result<()> {
        self.define_variables(SearchSpace::new(ranges, bounded)?);
        Ok(())
    }
}

/// State every optimizer keeps between setup calls.
pub(crate) struct Setup<P> {
    parameters: Option<P>,
    space: Option<SearchSpace>,
    cost: Option<Arc<dyn CostFunction>>,
    pub options: RunOptions,
}

impl<P> Default for Setup<P> {
    fn default() -> Self {
        Self {
            parameters: None,
            space: None,
            cost: None,
            options: RunOptions::default(),
        }
    }
}

impl<P: Clone> Setup<P> {
    pub(crate) fn set_parameters(&mut self, parameters: P) {
        self.parameters = Some(parameters);
    }

    pub(crate) fn set_space(&mut self, space: SearchSpace) {
        self.space = Some(space);
    }

    pub(crate) fn set_cost(&mut self, cost: Arc<dyn CostFunction>) {
        self.cost = Some(cost);
    }

    /// Everything `optimize()` needs, or the first missing piece.
    pub(crate) fn ready(&self) -> Result<(P, SearchSpace, Arc<dyn CostFunction>)> {
        let parameters = self
            .parameters
            .clone()
            .ok_or(MetaheuristicError::ParametersUndefined)?;
        let space = self
            .space
            .clone()
            .ok_or(MetaheuristicError::VariablesUndefined)?;
        let cost = self.cost.clone().ok_or(MetaheuristicError::CostUndefined)?;
        Ok((parameters, space, cost))
    }
}
