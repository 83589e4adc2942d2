//! JSON configuration of an identification experiment.
//!
//! Every field has a default, so a minimal file only names what differs:
//!
//! ```json
//! {
//!   "structure": { "filter_order": 5, "hidden_units": 1, "polynomial_order": 4 },
//!   "optimizer": {
//!     "family": "acor",
//!     "parameters": { "pop_size": 5, "archive_size": 50, "budget": { "iterations": 1000 } }
//!   },
//!   "seed": 7
//! }
//! ```

use std::path::Path;

use math_audio_metaheuristics::{
    AcorParameters, Budget, ParallelConfig, PsoParameters, RunOptions, SaParameters,
};
use serde::{Deserialize, Serialize};

use crate::error::{LvnError, Result};
use crate::network::LvnStructure;

/// Network dimensions and sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Number of Laguerre filters `L`.
    pub filter_order: usize,
    /// Number of hidden units `H`.
    pub hidden_units: usize,
    /// Polynomial degree `Q`.
    pub polynomial_order: usize,
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            filter_order: 5,
            hidden_units: 1,
            polynomial_order: 4,
            sampling_frequency: 25.0,
        }
    }
}

impl StructureConfig {
    /// Validated network structure.
    pub fn structure(&self) -> Result<LvnStructure> {
        LvnStructure::from_sampling_frequency(
            self.filter_order,
            self.hidden_units,
            self.polynomial_order,
            self.sampling_frequency,
        )
    }
}

/// Initialisation range of a group of variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableRange {
    /// Lower end.
    pub min: f64,
    /// Upper end.
    pub max: f64,
    /// Clamp into `[min, max]` during the search.
    pub bounded: bool,
}

impl VariableRange {
    /// Range with the given clamping behavior.
    pub const fn new(min: f64, max: f64, bounded: bool) -> Self {
        Self { min, max, bounded }
    }
}

/// Ranges for each group of LVN parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableRanges {
    /// Laguerre smoothing constant.
    pub alpha: VariableRange,
    /// Hidden-unit weights.
    pub weights: VariableRange,
    /// Polynomial coefficients.
    pub coefficients: VariableRange,
    /// Output offset.
    pub offset: VariableRange,
}

impl Default for VariableRanges {
    fn default() -> Self {
        Self {
            alpha: VariableRange::new(1e-5, 0.9, true),
            weights: VariableRange::new(-1.0, 1.0, false),
            coefficients: VariableRange::new(-1.0, 1.0, false),
            offset: VariableRange::new(-1.0, 1.0, false),
        }
    }
}

/// Optimizer family and its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "parameters", rename_all = "snake_case")]
pub enum OptimizerConfig {
    /// Ant colony optimization (plain or block-adaptive).
    Acor(AcorParameters),
    /// Simulated annealing (fixed step or crystallization).
    SimulatedAnnealing(SaParameters),
    /// Particle swarm (unit or adaptive inertia).
    ParticleSwarm(PsoParameters),
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Acor(AcorParameters::default())
    }
}

impl OptimizerConfig {
    /// Budget of the selected optimizer.
    pub fn budget(&self) -> &Budget {
        match self {
            OptimizerConfig::Acor(p) => &p.budget,
            OptimizerConfig::SimulatedAnnealing(p) => &p.budget,
            OptimizerConfig::ParticleSwarm(p) => &p.budget,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            OptimizerConfig::Acor(p) => p.validate()?,
            OptimizerConfig::SimulatedAnnealing(p) => p.validate()?,
            OptimizerConfig::ParticleSwarm(p) => p.validate()?,
        }
        Ok(())
    }
}

/// Windowed cost with a fixed alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicCostConfig {
    /// Alpha used for the whole run.
    pub alpha: f64,
    /// Signal length divided by window length.
    pub window_ratio: f64,
}

/// A complete identification experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentificationConfig {
    /// Network to fit.
    pub structure: StructureConfig,
    /// Search ranges.
    pub ranges: VariableRanges,
    /// Optimizer and hyperparameters.
    pub optimizer: OptimizerConfig,
    /// Fixed-alpha windowed cost instead of the full-signal cost.
    pub dynamic_cost: Option<DynamicCostConfig>,
    /// Random seed; entropy when absent.
    pub seed: Option<u64>,
    /// Parallel candidate evaluation.
    pub parallel: ParallelConfig,
    /// Progress log period in iterations (0 disables).
    pub print_interval: usize,
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            structure: StructureConfig::default(),
            ranges: VariableRanges::default(),
            optimizer: OptimizerConfig::default(),
            dynamic_cost: None,
            seed: None,
            parallel: ParallelConfig::default(),
            print_interval: 100,
        }
    }
}

impl IdentificationConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the structure, ranges and optimizer parameters.
    pub fn validate(&self) -> Result<()> {
        self.structure.structure()?;
        for (name, range) in [
            ("alpha range", self.ranges.alpha),
            ("weights range", self.ranges.weights),
            ("coefficients range", self.ranges.coefficients),
            ("offset range", self.ranges.offset),
        ] {
            if !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max) {
                return Err(LvnError::InvalidStructure {
                    reason: format!("{name} [{}, {}] is empty", range.min, range.max),
                });
            }
        }
        let alpha = self.ranges.alpha;
        if self.dynamic_cost.is_none() && !(alpha.bounded && alpha.min >= 0.0 && alpha.max < 1.0) {
            return Err(LvnError::InvalidStructure {
                reason: "alpha range must be bounded inside [0, 1)".into(),
            });
        }
        if let Some(dynamic) = self.dynamic_cost {
            if !(0.0..1.0).contains(&dynamic.alpha) {
                return Err(LvnError::invalid("alpha", dynamic.alpha, "must be in [0, 1)"));
            }
            if !(dynamic.window_ratio >= 1.0) {
                return Err(LvnError::invalid(
                    "window_ratio",
                    dynamic.window_ratio,
                    "must be >= 1",
                ));
            }
        }
        self.optimizer.validate()
    }

    /// Run options for the optimizer.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            seed: self.seed,
            parallel: self.parallel.clone(),
            print_interval: self.print_interval,
            callback: None,
        }
    }
}
