//! Normalized mean squared error.

use ndarray::{ArrayView1, s};

use crate::error::{LvnError, Result};
use crate::laguerre::laguerre_filter_memory;

fn error_ratio(y: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    let (residual, power) = y
        .iter()
        .zip(y_pred.iter())
        .fold((0.0, 0.0), |(r, p), (&a, &b)| (r + (a - b).powi(2), p + a * a));
    if power == 0.0 {
        if residual == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        residual / power
    }
}

fn check_lengths(y: &ArrayView1<f64>, y_pred: &ArrayView1<f64>) -> Result<()> {
    if y.len() != y_pred.len() {
        return Err(LvnError::LengthMismatch {
            expected: y.len(),
            got: y_pred.len(),
        });
    }
    Ok(())
}

/// NMSE after discarding the filter warm-up.
///
/// The first `M = laguerre_filter_memory(alpha)` samples of both signals are
/// dropped, then `sum((y - y_pred)^2) / sum(y^2)` is returned. An all-zero
/// reference gives 0 for an exact prediction and infinity otherwise.
///
/// # Errors
///
/// `LengthMismatch` if the signals differ in length, `InsufficientData` if
/// they are not longer than `M`, `InvalidParameter` for alpha outside
/// `[0, 1)`.
pub fn nmse(y: ArrayView1<f64>, y_pred: ArrayView1<f64>, alpha: f64) -> Result<f64> {
    check_lengths(&y, &y_pred)?;
    let memory = laguerre_filter_memory(alpha)?;
    if y.len() <= memory {
        return Err(LvnError::InsufficientData {
            len: y.len(),
            required: memory + 1,
        });
    }
    Ok(error_ratio(y.slice(s![memory..]), y_pred.slice(s![memory..])))
}

/// NMSE over the full signals, without warm-up discard.
///
/// # Errors
///
/// `LengthMismatch` if the signals differ in length, `InsufficientData` if
/// they are empty.
pub fn raw_nmse(y: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64> {
    check_lengths(&y, &y_pred)?;
    if y.is_empty() {
        return Err(LvnError::InsufficientData {
            len: 0,
            required: 1,
        });
    }
    Ok(error_ratio(y, y_pred))
}
