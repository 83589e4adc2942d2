//! Error types for Laguerre-Volterra network modelling and identification.

use math_audio_metaheuristics::MetaheuristicError;
use thiserror::Error;

/// Errors that can occur while building, evaluating or fitting an LVN.
#[derive(Debug, Error)]
pub enum LvnError {
    /// The network structure (L, H, Q, T) is not usable.
    #[error("invalid LVN structure: {reason}")]
    InvalidStructure {
        /// What is wrong with the structure
        reason: String,
    },

    /// A parameter array does not match the declared structure.
    #[error("{what} has shape {got:?}, expected {expected:?}")]
    Shape {
        /// Which parameter array
        what: &'static str,
        /// Shape required by the structure
        expected: (usize, usize),
        /// Shape provided
        got: (usize, usize),
    },

    /// A scalar parameter is outside its valid domain.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
        /// What the parameter must satisfy
        reason: &'static str,
    },

    /// Two sequences that must have equal lengths do not.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Required length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// A signal is too short for the requested computation.
    #[error("insufficient data: {len} samples, at least {required} required")]
    InsufficientData {
        /// Available samples
        len: usize,
        /// Minimum number of samples
        required: usize,
    },

    /// A model, signal or configuration file is malformed.
    #[error("parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What could not be parsed
        reason: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The optimizer rejected its setup or failed.
    #[error(transparent)]
    Optimizer(#[from] MetaheuristicError),
}

/// A specialized `Result` type for LVN operations.
pub type Result<T> = std::result::Result<T, LvnError>;

impl LvnError {
    /// Returns `true` if this is a structure or configuration error.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LvnError::InvalidStructure { .. } | LvnError::Config(_)
        )
    }

    /// Returns `true` if this is a parameter shape error.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, LvnError::Shape { .. })
    }

    /// Returns `true` if this is a signal length error.
    ///
    /// This includes `LengthMismatch` and `InsufficientData`.
    pub fn is_length_error(&self) -> bool {
        matches!(
            self,
            LvnError::LengthMismatch { .. } | LvnError::InsufficientData { .. }
        )
    }

    /// Returns `true` if a file could not be read or understood.
    pub fn is_io_error(&self) -> bool {
        matches!(self, LvnError::Io(_) | LvnError::Parse { .. })
    }

    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        LvnError::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        LvnError::Parse {
            line,
            reason: reason.into(),
        }
    }
}
