//! Error types for the metaheuristic optimizers.
//!
//! Every optimizer validates its setup before touching the cost function and
//! reports misuse through [`MetaheuristicError`]. Errors raised by a cost
//! function abort the run and are carried through unchanged.

use thiserror::Error;

/// Boxed error produced by a cost function.
pub type CostError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while configuring or running an optimizer.
#[derive(Debug, Error)]
pub enum MetaheuristicError {
    /// `optimize()` was called before the algorithm parameters were set.
    #[error("algorithm parameters must be set before optimization")]
    ParametersUndefined,

    /// `optimize()` was called before the search space was defined.
    #[error("variables and their ranges must be defined before optimization")]
    VariablesUndefined,

    /// `optimize()` was called before a cost function was provided.
    #[error("cost function must be defined before optimization")]
    CostUndefined,

    /// The search space has no variables.
    #[error("search space must contain at least one variable")]
    EmptySearchSpace,

    /// Range list and bounded-flag list have different lengths.
    #[error("range/flag mismatch: {ranges} ranges but {flags} bounded flags")]
    RangeFlagMismatch {
        /// Number of (min, max) ranges
        ranges: usize,
        /// Number of bounded flags
        flags: usize,
    },

    /// A variable range is reversed or not finite.
    #[error("invalid range for variable {index}: [{lower}, {upper}]")]
    InvalidRange {
        /// Index of the offending variable
        index: usize,
        /// Lower end of the range
        lower: f64,
        /// Upper end of the range
        upper: f64,
    },

    /// An algorithm hyperparameter is outside its valid domain.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
        /// What the parameter must satisfy
        reason: &'static str,
    },

    /// A requested evaluation checkpoint cannot be reached exactly.
    #[error(
        "checkpoint of {checkpoint} evaluations is unreachable: {initial} initial evaluations \
         plus a multiple of {per_iteration} per iteration"
    )]
    Divisibility {
        /// Requested cumulative evaluation count
        checkpoint: usize,
        /// Evaluations spent before the first iteration
        initial: usize,
        /// Evaluations spent by every iteration
        per_iteration: usize,
    },

    /// The cost function failed.
    #[error("cost function failed: {0}")]
    Cost(#[source] CostError),
}

/// A specialized `Result` type for optimizer operations.
pub type Result<T> = std::result::Result<T, MetaheuristicError>;

impl MetaheuristicError {
    /// Returns `true` if the optimizer was used before being fully set up.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MetaheuristicError::ParametersUndefined
                | MetaheuristicError::VariablesUndefined
                | MetaheuristicError::CostUndefined
        )
    }

    /// Returns `true` if the search space definition was rejected.
    pub fn is_search_space_error(&self) -> bool {
        matches!(
            self,
            MetaheuristicError::EmptySearchSpace
                | MetaheuristicError::RangeFlagMismatch { .. }
                | MetaheuristicError::InvalidRange { .. }
        )
    }

    /// Returns `true` if a hyperparameter or the budget was rejected.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            MetaheuristicError::InvalidParameter { .. } | MetaheuristicError::Divisibility { .. }
        )
    }

    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        MetaheuristicError::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

/// Fails with `InvalidParameter` unless `value` is finite and > 0.
pub(crate) fn positive(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(MetaheuristicError::invalid(
            name,
            value,
            "must be a positive number",
        ))
    }
}

impl From<CostError> for MetaheuristicError {
    fn from(err: CostError) -> Self {
        MetaheuristicError::Cost(err)
    }
}
