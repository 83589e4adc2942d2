//! Laguerre-Volterra network (LVN) models and their identification.
//!
//! An LVN expands its input on a bank of discrete Laguerre filters and
//! passes the filter outputs through hidden units with polynomial
//! activations. It is a compact parametrization of a Volterra series for
//! systems with exponentially decaying memory.
//!
//! # Features
//!
//! - **Forward model**: batched and sample-by-sample evaluation, weight
//!   normalization, equivalent first and second-order Volterra kernels
//! - **Cost functions**: warm-up aware NMSE over the whole signal, or raw
//!   NMSE over a window that follows the search progress
//! - **Identification**: ACOr, simulated annealing or particle swarm from
//!   `math-audio-metaheuristics`, configured from JSON
//! - **Data**: white-noise excitation, random ground-truth networks, a
//!   nonlinear cascade benchmark and plain-text model/signal files
//!
//! # Example
//!
//! ```rust
//! use ndarray::{Array1, array};
//! use math_audio_laguerre_volterra::{Lvn, LvnParameters, LvnStructure, nmse};
//!
//! let structure = LvnStructure::from_sampling_frequency(2, 1, 2, 25.0).unwrap();
//! let params = LvnParameters {
//!     alpha: 0.1,
//!     weights: array![[1.0, 0.5]],
//!     coefficients: array![[1.0, 0.2]],
//!     offset: 0.5,
//! };
//! let lvn = Lvn::new(structure);
//! let x = Array1::from_shape_fn(64, |n| (n as f64 * 0.3).sin());
//! let y = lvn.evaluate(x.view(), &params, false).unwrap();
//! assert_eq!(y.len(), 64);
//!
//! // normalization changes the parameters, not the prediction
//! let y_norm = lvn.evaluate(x.view(), &params, true).unwrap();
//! assert!(nmse(y.view(), y_norm.view(), params.alpha).unwrap() < 1e-20);
//! ```
#![warn(missing_docs)]

mod config;
mod cost;
mod error;
mod identify;
mod io;
mod kernels;
mod laguerre;
mod metrics;
mod network;
mod simulated;

pub use error::{LvnError, Result};

// Forward model
pub use kernels::{first_order_kernel, second_order_kernel};
pub use laguerre::{LaguerreFilterBank, LaguerreState, laguerre_filter_memory, laguerre_function};
pub use network::{
    Lvn, LvnParameters, LvnStructure, normalize_scale_parameters, polynomial_stage,
};

// Cost and metrics
pub use cost::{DynamicLvnCost, LvnCost, SolutionEncoding, make_cost_function};
pub use metrics::{nmse, raw_nmse};

// Identification
pub use config::{
    DynamicCostConfig, IdentificationConfig, OptimizerConfig, StructureConfig, VariableRange,
    VariableRanges,
};
pub use identify::{Identification, identify, identify_with_options, search_space, test_nmse};

// Data
pub use io::{
    Signals, load_model, load_signals, read_model, read_signals, save_model, save_recorded,
    save_signals, write_model, write_recorded, write_signals,
};
pub use simulated::{
    CascadeSystem, SimulatedSystem, add_noise, generate_dataset, random_lvn_parameters,
    simulate_lvn, white_noise,
};
