//! Fits a network to recorded signals with one of the metaheuristics.

use std::sync::Arc;

use math_audio_metaheuristics::{
    Acor, CostFunction, OptimizationReport, Optimizer, ParticleSwarm, RunOptions, SearchSpace,
    SimulatedAnnealing,
};

use crate::config::{IdentificationConfig, OptimizerConfig, VariableRanges};
use crate::cost::{DynamicLvnCost, LvnCost, SolutionEncoding};
use crate::error::Result;
use crate::io::Signals;
use crate::metrics::nmse;
use crate::network::{Lvn, LvnParameters, LvnStructure};

/// Outcome of [`identify`].
#[derive(Debug, Clone)]
pub struct Identification {
    /// Fitted network dimensions.
    pub structure: LvnStructure,
    /// Layout of the optimizer's candidate vectors.
    pub encoding: SolutionEncoding,
    /// Optimizer report; costs are those seen by the optimizer.
    pub report: OptimizationReport,
    /// Best candidate decoded, with unit-norm weight rows.
    pub parameters: LvnParameters,
}

impl Identification {
    /// Decoded, normalized parameters of every recorded checkpoint.
    pub fn recorded_parameters(&self) -> Result<Vec<LvnParameters>> {
        self.report
            .recorded
            .iter()
            .map(|r| {
                self.encoding
                    .decode_array(&self.structure, &r.solution.variables)?
                    .normalized()
            })
            .collect()
    }
}

/// Variable bounds in candidate order for `encoding`.
pub fn search_space(
    ranges: &VariableRanges,
    structure: &LvnStructure,
    encoding: SolutionEncoding,
) -> Result<SearchSpace> {
    let h = structure.hidden_units;
    let mut groups = Vec::with_capacity(4);
    if encoding == SolutionEncoding::WithAlpha {
        groups.push((ranges.alpha, 1));
    }
    groups.push((ranges.weights, h * structure.filter_order));
    groups.push((ranges.coefficients, h * structure.polynomial_order));
    groups.push((ranges.offset, 1));

    let mut bounds = Vec::with_capacity(encoding.len(structure));
    let mut bounded = Vec::with_capacity(encoding.len(structure));
    for (range, count) in groups {
        bounds.extend(std::iter::repeat_n((range.min, range.max), count));
        bounded.extend(std::iter::repeat_n(range.bounded, count));
    }
    Ok(SearchSpace::new(&bounds, &bounded)?)
}

fn run<O: Optimizer>(
    mut optimizer: O,
    parameters: O::Parameters,
    space: SearchSpace,
    cost: Arc<dyn CostFunction>,
    options: RunOptions,
) -> Result<OptimizationReport> {
    optimizer.set_parameters(parameters)?;
    optimizer.define_variables(space);
    optimizer.set_cost_function(cost);
    *optimizer.options_mut() = options;
    Ok(optimizer.optimize()?)
}

/// Runs the experiment described by `config` on `train`.
pub fn identify(config: &IdentificationConfig, train: &Signals) -> Result<Identification> {
    identify_with_options(config, train, config.run_options())
}

/// [`identify`] with explicit run options, e.g. to install a callback.
pub fn identify_with_options(
    config: &IdentificationConfig,
    train: &Signals,
    options: RunOptions,
) -> Result<Identification> {
    config.validate()?;
    let structure = config.structure.structure()?;

    let (cost, encoding) = match config.dynamic_cost {
        Some(dynamic) => {
            let cost = DynamicLvnCost::new(
                structure,
                dynamic.alpha,
                train.input.clone(),
                train.output.clone(),
                dynamic.window_ratio,
            )?;
            let encoding = cost.encoding();
            (Arc::new(cost) as Arc<dyn CostFunction>, encoding)
        }
        None => {
            let cost = LvnCost::new(structure, train.input.clone(), train.output.clone())?;
            (Arc::new(cost) as Arc<dyn CostFunction>, SolutionEncoding::WithAlpha)
        }
    };
    let space = search_space(&config.ranges, &structure, encoding)?;

    log::info!(
        "identifying LVN L={} H={} Q={} on {} samples ({} variables)",
        structure.filter_order,
        structure.hidden_units,
        structure.polynomial_order,
        train.len(),
        space.len()
    );

    let report = match &config.optimizer {
        OptimizerConfig::Acor(p) => run(Acor::new(), p.clone(), space, cost, options)?,
        OptimizerConfig::SimulatedAnnealing(p) => {
            run(SimulatedAnnealing::new(), p.clone(), space, cost, options)?
        }
        OptimizerConfig::ParticleSwarm(p) => {
            run(ParticleSwarm::new(), p.clone(), space, cost, options)?
        }
    };
    log::info!(
        "best cost {:.6e} after {} evaluations ({})",
        report.best.cost,
        report.nfev,
        report.message
    );

    let parameters = encoding
        .decode_array(&structure, &report.best.variables)?
        .normalized()?;
    Ok(Identification {
        structure,
        encoding,
        report,
        parameters,
    })
}

/// NMSE of `params` on held-out signals, after the filter warm-up.
pub fn test_nmse(
    structure: &LvnStructure,
    params: &LvnParameters,
    signals: &Signals,
) -> Result<f64> {
    let prediction = Lvn::new(*structure).evaluate(signals.input.view(), params, false)?;
    nmse(signals.output.view(), prediction.view(), params.alpha)
}
