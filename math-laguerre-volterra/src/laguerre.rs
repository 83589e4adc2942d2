//! Discrete Laguerre filter bank.
//!
//! All filters share the smoothing constant `alpha` and start from a zero
//! state. With `s = sqrt(alpha)`:
//!
//! ```text
//! v_0[n] = s * v_0[n-1] + T * sqrt(1 - alpha) * x[n]
//! v_j[n] = s * (v_j[n-1] + v_{j-1}[n]) - v_{j-1}[n-1]      j = 1..L-1
//! ```
//!
//! The impulse response of filter `j` is `T * b_j(m)`, where `b_j` is the
//! discrete Laguerre function returned by [`laguerre_function`].

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{LvnError, Result};

fn check_alpha(alpha: f64) -> Result<()> {
    if (0.0..1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(LvnError::invalid("alpha", alpha, "must be in [0, 1)"))
    }
}

/// Number of samples after which the bank's response to past input is
/// negligible: `ceil((-30 - ln(1 - alpha)) / ln(alpha))`.
///
/// # Errors
///
/// `InvalidParameter` when `alpha` is outside `[0, 1)`.
pub fn laguerre_filter_memory(alpha: f64) -> Result<usize> {
    check_alpha(alpha)?;
    if alpha == 0.0 {
        return Ok(0);
    }
    let m = (-30.0 - (1.0 - alpha).ln()) / alpha.ln();
    Ok(m.ceil().max(0.0) as usize)
}

fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Discrete Laguerre function `b_j(m)` of order `j` at lag `m`.
///
/// ```text
/// b_j(m) = alpha^((m-j)/2) sqrt(1-alpha) sum_{k=0..j} (-1)^k C(m,k) C(j,k) alpha^(j-k) (1-alpha)^k
/// ```
///
/// For `alpha = 0` the functions reduce to signed unit delays
/// `b_j(m) = (-1)^j [m = j]`.
pub fn laguerre_function(j: usize, m: usize, alpha: f64) -> f64 {
    if alpha == 0.0 {
        return match (m == j, j % 2 == 0) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => -1.0,
        };
    }
    let sum: f64 = (0..=j)
        .map(|k| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            sign * binomial(m, k)
                * binomial(j, k)
                * alpha.powi((j - k) as i32)
                * (1.0 - alpha).powi(k as i32)
        })
        .sum();
    alpha.powf((m as f64 - j as f64) / 2.0) * (1.0 - alpha).sqrt() * sum
}

/// Bank of `order` cascaded Laguerre filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaguerreFilterBank {
    order: usize,
    alpha: f64,
    alpha_sqrt: f64,
    input_gain: f64,
}

impl LaguerreFilterBank {
    /// Creates a bank of `order` filters sharing `alpha`, for samples taken
    /// every `sampling_interval`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `alpha` is outside `[0, 1)` or the sampling
    /// interval is not positive; `InvalidStructure` when `order` is zero.
    pub fn new(order: usize, alpha: f64, sampling_interval: f64) -> Result<Self> {
        if order == 0 {
            return Err(LvnError::InvalidStructure {
                reason: "filter bank order must be >= 1".into(),
            });
        }
        check_alpha(alpha)?;
        if !(sampling_interval > 0.0 && sampling_interval.is_finite()) {
            return Err(LvnError::invalid(
                "sampling_interval",
                sampling_interval,
                "must be > 0",
            ));
        }
        Ok(Self {
            order,
            alpha,
            alpha_sqrt: alpha.sqrt(),
            input_gain: sampling_interval * (1.0 - alpha).sqrt(),
        })
    }

    /// Number of filters.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Shared smoothing constant.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Filters the whole signal. Row `j` of the result is the output of
    /// filter `j` (shape `order x len(x)`).
    pub fn propagate(&self, x: ArrayView1<f64>) -> Array2<f64> {
        let n = x.len();
        let s = self.alpha_sqrt;
        let mut v = Array2::<f64>::zeros((self.order, n));

        let mut prev = 0.0;
        for (i, &sample) in x.iter().enumerate() {
            prev = s * prev + self.input_gain * sample;
            v[[0, i]] = prev;
        }
        for j in 1..self.order {
            let mut prev = 0.0;
            let mut lower_prev = 0.0;
            for i in 0..n {
                let lower = v[[j - 1, i]];
                prev = s * (prev + lower) - lower_prev;
                v[[j, i]] = prev;
                lower_prev = lower;
            }
        }
        v
    }

    /// Streaming state starting from rest.
    pub fn state(&self) -> LaguerreState {
        LaguerreState {
            bank: *self,
            v: Array1::zeros(self.order),
        }
    }
}

/// Sample-by-sample filter bank with explicit recurrence state.
#[derive(Debug, Clone)]
pub struct LaguerreState {
    bank: LaguerreFilterBank,
    v: Array1<f64>,
}

impl LaguerreState {
    /// Feeds one input sample and returns the outputs of all filters.
    pub fn process(&mut self, x: f64) -> ArrayView1<'_, f64> {
        let s = self.bank.alpha_sqrt;
        let mut lower_prev = self.v[0];
        self.v[0] = s * self.v[0] + self.bank.input_gain * x;
        for j in 1..self.bank.order {
            let prev = self.v[j];
            self.v[j] = s * (prev + self.v[j - 1]) - lower_prev;
            lower_prev = prev;
        }
        self.v.view()
    }

    /// Returns the bank to rest.
    pub fn reset(&mut self) {
        self.v.fill(0.0);
    }
}
