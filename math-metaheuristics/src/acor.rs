//! Ant Colony Optimization for continuous domains (ACOr).
//!
//! The colony keeps a solution archive of the `k` best candidates found so
//! far, sorted by cost. Each iteration, `m` ants pick a guide from the
//! archive with a probability that decays as a Gaussian of the guide's rank
//! (spread `q * k`), then sample every variable from a normal distribution
//! centred on the guide, whose deviation is `xi` times the mean distance of
//! the archive to the guide along that variable. New ants join the archive,
//! which is re-sorted and truncated back to `k` entries.
//!
//! The block-adaptive variant recomputes `q` and `xi` after every iteration
//! from the fraction of ants that improved on their guide.

use std::sync::Arc;

use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::cost::{CostFunction, EvalContext};
use crate::error::{MetaheuristicError, Result, positive};
use crate::parallel_eval::{evaluate_candidates, evaluate_population};
use crate::run_state::RunState;
use crate::search_space::SearchSpace;
use crate::{OptimizationReport, Optimizer, RunOptions, Setup, Solution, make_rng};

/// Shape of the success-rate response used by the block-adaptive variant.
///
/// Each shape maps a success rate in [0, 1] onto [0, 1], with 0 -> 0 and
/// 1 -> 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessMap {
    /// `f(s) = s`
    #[default]
    Linear,
    /// Logistic curve centred on 0.5, rescaled onto [0, 1].
    Sigmoid,
    /// Convex exponential curve, rescaled onto [0, 1].
    Exponential,
}

const SIGMOID_STEEPNESS: f64 = 10.0;
const EXPONENTIAL_RATE: f64 = 5.0;

impl SuccessMap {
    /// Applies the map to a success rate (clamped to [0, 1]).
    pub fn apply(self, rate: f64) -> f64 {
        let s = rate.clamp(0.0, 1.0);
        match self {
            SuccessMap::Linear => s,
            SuccessMap::Sigmoid => {
                let g = |x: f64| 1.0 / (1.0 + (-SIGMOID_STEEPNESS * (x - 0.5)).exp());
                (g(s) - g(0.0)) / (g(1.0) - g(0.0))
            }
            SuccessMap::Exponential => (EXPONENTIAL_RATE * s).exp_m1() / EXPONENTIAL_RATE.exp_m1(),
        }
    }
}

/// Control of `q` and `xi` during the run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcorAdaptation {
    /// `q` and `xi` stay fixed.
    #[default]
    None,
    /// `q` and `xi` shrink from their maximum toward their minimum as the
    /// success rate of the last iteration grows.
    BlockAdaptive {
        /// Smallest locality parameter.
        q_min: f64,
        /// Largest locality parameter.
        q_max: f64,
        /// Response shape for `q`.
        q_map: SuccessMap,
        /// Smallest convergence-speed parameter.
        xi_min: f64,
        /// Largest convergence-speed parameter.
        xi_max: f64,
        /// Response shape for `xi`.
        xi_map: SuccessMap,
    },
}

/// ACOr hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcorParameters {
    /// Ants sampled per iteration (`m`).
    pub pop_size: usize,
    /// Solution archive size (`k`).
    pub archive_size: usize,
    /// Locality of the search: smaller values favour top-ranked guides.
    pub q: f64,
    /// Convergence speed: larger values sample wider and converge slower.
    pub xi: f64,
    /// Run length and evaluation checkpoints.
    pub budget: Budget,
    /// Optional adaptation of `q` and `xi`.
    pub adaptation: AcorAdaptation,
}

impl Default for AcorParameters {
    fn default() -> Self {
        Self {
            pop_size: 10,
            archive_size: 50,
            q: 0.01,
            xi: 0.85,
            budget: Budget::default(),
            adaptation: AcorAdaptation::None,
        }
    }
}

impl AcorParameters {
    /// Block-adaptive preset: `q` in [0.01, 1], `xi` in [0.1, 0.93].
    pub fn block_adaptive() -> Self {
        Self {
            adaptation: AcorAdaptation::BlockAdaptive {
                q_min: 1e-2,
                q_max: 1.0,
                q_map: SuccessMap::Exponential,
                xi_min: 0.1,
                xi_max: 0.93,
                xi_map: SuccessMap::Sigmoid,
            },
            ..Self::default()
        }
    }

    /// Checks every hyperparameter and the reachability of the budget.
    pub fn validate(&self) -> Result<()> {
        if self.pop_size < 1 {
            return Err(MetaheuristicError::invalid(
                "pop_size",
                self.pop_size as f64,
                "must be >= 1",
            ));
        }
        if self.archive_size < 2 {
            return Err(MetaheuristicError::invalid(
                "archive_size",
                self.archive_size as f64,
                "must be >= 2",
            ));
        }
        positive("q", self.q)?;
        positive("xi", self.xi)?;
        if let AcorAdaptation::BlockAdaptive {
            q_min,
            q_max,
            xi_min,
            xi_max,
            ..
        } = self.adaptation
        {
            positive("q_min", q_min)?;
            positive("xi_min", xi_min)?;
            if q_max < q_min {
                return Err(MetaheuristicError::invalid("q_max", q_max, "must be >= q_min"));
            }
            if xi_max < xi_min {
                return Err(MetaheuristicError::invalid("xi_max", xi_max, "must be >= xi_min"));
            }
        }
        crate::budget::Schedule::new(&self.budget, self.archive_size, self.pop_size)?;
        Ok(())
    }

    /// Starts a builder from the default parameters.
    pub fn builder() -> AcorParametersBuilder {
        AcorParametersBuilder {
            params: Self::default(),
        }
    }
}

/// Fluent builder for [`AcorParameters`].
pub struct AcorParametersBuilder {
    params: AcorParameters,
}

impl AcorParametersBuilder {
    /// Sets the number of ants per iteration.
    pub fn pop_size(mut self, v: usize) -> Self {
        self.params.pop_size = v;
        self
    }
    /// Sets the archive size.
    pub fn archive_size(mut self, v: usize) -> Self {
        self.params.archive_size = v;
        self
    }
    /// Sets the locality parameter.
    pub fn q(mut self, v: f64) -> Self {
        self.params.q = v;
        self
    }
    /// Sets the convergence-speed parameter.
    pub fn xi(mut self, v: f64) -> Self {
        self.params.xi = v;
        self
    }
    /// Sets the budget.
    pub fn budget(mut self, v: Budget) -> Self {
        self.params.budget = v;
        self
    }
    /// Sets the adaptation scheme.
    pub fn adaptation(mut self, v: AcorAdaptation) -> Self {
        self.params.adaptation = v;
        self
    }
    /// Validates and returns the parameters.
    pub fn build(self) -> Result<AcorParameters> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// Selection probability of each archive rank: Gaussian of the rank with
/// mean at the best rank and deviation `q * k`, normalized.
pub(crate) fn rank_probabilities(k: usize, q: f64) -> Vec<f64> {
    let std = q * k as f64;
    let weights: Vec<f64> = (0..k)
        .map(|rank| {
            let r = rank as f64;
            (-(r * r) / (2.0 * std * std)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Roulette-wheel selection over `probabilities`.
pub(crate) fn roulette<R: Rng + ?Sized>(probabilities: &[f64], rng: &mut R) -> usize {
    let mut r: f64 = rng.random::<f64>();
    for (i, &p) in probabilities.iter().enumerate() {
        r -= p;
        if r <= 0.0 {
            return i;
        }
    }
    probabilities.len() - 1
}

fn sort_archive(archive: &mut [Solution]) {
    archive.sort_by(|a, b| a.cost.total_cmp(&b.cost));
}

/// Samples one ant around archive entry `guide`.
fn sample_ant<R: Rng + ?Sized>(
    archive: &[Solution],
    guide: usize,
    xi: f64,
    space: &SearchSpace,
    rng: &mut R,
) -> Array1<f64> {
    let k = archive.len();
    let centre = &archive[guide].variables;
    Array1::from_shape_fn(space.len(), |var| {
        let spread: f64 = archive
            .iter()
            .map(|s| (s.variables[var] - centre[var]).abs())
            .sum();
        let sigma = xi * spread / (k - 1) as f64;
        let z: f64 = rng.sample(StandardNormal);
        space.clamp_variable(var, centre[var] + sigma * z)
    })
}

/// ACOr optimizer.
#[derive(Default)]
pub struct Acor {
    setup: Setup<AcorParameters>,
    archive: Vec<Solution>,
}

impl Acor {
    /// Creates an optimizer with nothing defined yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Solution archive left by the last run, best first.
    pub fn archive(&self) -> &[Solution] {
        &self.archive
    }
}

impl Optimizer for Acor {
    type Parameters = AcorParameters;

    fn set_parameters(&mut self, parameters: AcorParameters) -> Result<()> {
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
        let k = params.archive_size;
        let m = params.pop_size;
        let name = match params.adaptation {
            AcorAdaptation::None => "ACOr",
            AcorAdaptation::BlockAdaptive { .. } => "BA-ACOr",
        };

        let mut rng = make_rng(self.setup.options.seed);
        let mut state = RunState::new(name, &params.budget, k, m, &mut self.setup.options)?;

        let initial = space.sample_population(k, &mut rng);
        let costs = evaluate_population(
            &initial,
            cost.as_ref(),
            &EvalContext::fresh(0.0),
            &state.options().parallel,
        )?;
        let mut archive: Vec<Solution> = initial
            .rows()
            .into_iter()
            .zip(costs.iter())
            .map(|(row, &c)| Solution::new(row.to_owned(), c))
            .collect();
        sort_archive(&mut archive);
        state.initialized(&archive[0]);

        let mut q = params.q;
        let mut xi = params.xi;
        let mut probabilities = rank_probabilities(k, q);

        for iteration in 0..state.iterations() {
            let context = EvalContext::fresh(state.progress(iteration));

            let mut guides = Vec::with_capacity(m);
            let mut ants = Vec::with_capacity(m);
            for _ in 0..m {
                let guide = roulette(&probabilities, &mut rng);
                ants.push(sample_ant(&archive, guide, xi, &space, &mut rng));
                guides.push(guide);
            }

            let costs = evaluate_candidates(&ants, cost.as_ref(), &context, &state.options().parallel)?;
            let successes = guides
                .iter()
                .zip(&costs)
                .filter(|&(&guide, &c)| c < archive[guide].cost)
                .count();

            if let AcorAdaptation::BlockAdaptive {
                q_min,
                q_max,
                q_map,
                xi_min,
                xi_max,
                xi_map,
            } = params.adaptation
            {
                let rate = successes as f64 / m as f64;
                q = q_max - (q_max - q_min) * q_map.apply(rate);
                xi = xi_max - (xi_max - xi_min) * xi_map.apply(rate);
                probabilities = rank_probabilities(k, q);
            }

            archive.extend(
                ants.into_iter()
                    .zip(costs)
                    .map(|(variables, c)| Solution::new(variables, c)),
            );
            sort_archive(&mut archive);
            archive.truncate(k);

            if !state.iteration_done(&archive[0]) {
                break;
            }
        }

        let best = archive[0].clone();
        self.archive = archive;
        Ok(state.finish(best))
    }
}
