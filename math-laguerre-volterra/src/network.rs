//! Laguerre-Volterra network forward model.
//!
//! The input is expanded by a Laguerre filter bank of order `L`; each of the
//! `H` hidden units projects the `L` filter outputs on its weight row and
//! feeds the projection to a polynomial of degree `Q` without constant term:
//!
//! ```text
//! y[n] = offset + sum_h sum_{q=1..=Q} C[h, q-1] * (W[h] . v[n])^q
//! ```

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{LvnError, Result};
use crate::laguerre::LaguerreFilterBank;

/// Fixed dimensions of a network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LvnStructure {
    /// Number of Laguerre filters `L`.
    pub filter_order: usize,
    /// Number of hidden units `H`.
    pub hidden_units: usize,
    /// Degree `Q` of the hidden-unit polynomials.
    pub polynomial_order: usize,
    /// Sampling interval `T` in seconds.
    pub sampling_interval: f64,
}

impl LvnStructure {
    /// Creates a structure, rejecting empty dimensions.
    pub fn new(
        filter_order: usize,
        hidden_units: usize,
        polynomial_order: usize,
        sampling_interval: f64,
    ) -> Result<Self> {
        for (name, value) in [
            ("filter order L", filter_order),
            ("hidden units H", hidden_units),
            ("polynomial order Q", polynomial_order),
        ] {
            if value == 0 {
                return Err(LvnError::InvalidStructure {
                    reason: format!("{name} must be >= 1"),
                });
            }
        }
        if !(sampling_interval > 0.0 && sampling_interval.is_finite()) {
            return Err(LvnError::InvalidStructure {
                reason: format!("sampling interval must be > 0, got {sampling_interval}"),
            });
        }
        Ok(Self {
            filter_order,
            hidden_units,
            polynomial_order,
            sampling_interval,
        })
    }

    /// Same as [`LvnStructure::new`] with `T = 1 / fs`.
    pub fn from_sampling_frequency(
        filter_order: usize,
        hidden_units: usize,
        polynomial_order: usize,
        sampling_frequency: f64,
    ) -> Result<Self> {
        if !(sampling_frequency > 0.0 && sampling_frequency.is_finite()) {
            return Err(LvnError::InvalidStructure {
                reason: format!("sampling frequency must be > 0, got {sampling_frequency}"),
            });
        }
        Self::new(
            filter_order,
            hidden_units,
            polynomial_order,
            1.0 / sampling_frequency,
        )
    }

    /// Shape of the weight matrix `(H, L)`.
    pub fn weights_shape(&self) -> (usize, usize) {
        (self.hidden_units, self.filter_order)
    }

    /// Shape of the coefficient matrix `(H, Q)`.
    pub fn coefficients_shape(&self) -> (usize, usize) {
        (self.hidden_units, self.polynomial_order)
    }
}

/// Trainable parameters of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LvnParameters {
    /// Laguerre smoothing constant in `[0, 1)`.
    pub alpha: f64,
    /// Hidden-unit input weights, `H x L`.
    pub weights: Array2<f64>,
    /// Polynomial coefficients, `H x Q`; column `q - 1` multiplies the
    /// `q`-th power.
    pub coefficients: Array2<f64>,
    /// Output offset.
    pub offset: f64,
}

impl LvnParameters {
    /// Builds parameters from row-major flat weights and coefficients.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if a slice does not hold exactly `H*L` (resp. `H*Q`)
    /// values.
    pub fn from_slices(
        structure: &LvnStructure,
        alpha: f64,
        weights: &[f64],
        coefficients: &[f64],
        offset: f64,
    ) -> Result<Self> {
        let to_matrix = |shape: (usize, usize), values: &[f64]| {
            Array2::from_shape_vec(shape, values.to_vec()).map_err(|_| LvnError::LengthMismatch {
                expected: shape.0 * shape.1,
                got: values.len(),
            })
        };
        Ok(Self {
            alpha,
            weights: to_matrix(structure.weights_shape(), weights)?,
            coefficients: to_matrix(structure.coefficients_shape(), coefficients)?,
            offset,
        })
    }

    /// Checks the parameter shapes against `structure` and the range of alpha.
    pub fn validate(&self, structure: &LvnStructure) -> Result<()> {
        if self.weights.dim() != structure.weights_shape() {
            return Err(LvnError::Shape {
                what: "weights",
                expected: structure.weights_shape(),
                got: self.weights.dim(),
            });
        }
        if self.coefficients.dim() != structure.coefficients_shape() {
            return Err(LvnError::Shape {
                what: "coefficients",
                expected: structure.coefficients_shape(),
                got: self.coefficients.dim(),
            });
        }
        if !(0.0..1.0).contains(&self.alpha) {
            return Err(LvnError::invalid("alpha", self.alpha, "must be in [0, 1)"));
        }
        Ok(())
    }

    /// Copy with unit-norm weight rows; see [`normalize_scale_parameters`].
    pub fn normalized(&self) -> Result<Self> {
        let (weights, coefficients) =
            normalize_scale_parameters(&self.weights, &self.coefficients)?;
        Ok(Self {
            weights,
            coefficients,
            ..self.clone()
        })
    }
}

/// Rescales every weight row to unit Euclidean norm and absorbs the norm
/// into the coefficients of the same unit: `C[h, q-1] *= |W[h]|^q`.
///
/// The network output is unchanged. A zero row cannot be normalized and is
/// returned as is.
///
/// # Errors
///
/// `Shape` if `weights` and `coefficients` disagree on the number of hidden
/// units.
pub fn normalize_scale_parameters(
    weights: &Array2<f64>,
    coefficients: &Array2<f64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    if weights.nrows() != coefficients.nrows() {
        return Err(LvnError::Shape {
            what: "coefficients",
            expected: (weights.nrows(), coefficients.ncols()),
            got: coefficients.dim(),
        });
    }
    let mut weights = weights.clone();
    let mut coefficients = coefficients.clone();
    for (h, (mut w, mut c)) in weights
        .axis_iter_mut(Axis(0))
        .zip(coefficients.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        let norm = w.dot(&w).sqrt();
        if norm == 0.0 || !norm.is_finite() {
            log::warn!("hidden unit {h} has weight norm {norm}, left unnormalized");
            continue;
        }
        w /= norm;
        let mut scale = 1.0;
        for cq in c.iter_mut() {
            scale *= norm;
            *cq *= scale;
        }
    }
    Ok((weights, coefficients))
}

/// `sum_{q=1..=Q} c[q-1] p^q` by Horner's rule.
#[inline]
fn unit_output(coefficients: ArrayView1<f64>, projection: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, &c| (acc + c) * projection)
}

/// Applies the hidden layer and output sum to precomputed filter outputs.
///
/// `bank` is `L x N` (one row per filter); the result has `N` samples. No
/// shape checks are done here.
pub fn polynomial_stage(
    bank: ArrayView2<f64>,
    weights: ArrayView2<f64>,
    coefficients: ArrayView2<f64>,
    offset: f64,
) -> Array1<f64> {
    let projections = weights.dot(&bank);
    projections
        .axis_iter(Axis(1))
        .map(|column| {
            offset
                + column
                    .iter()
                    .zip(coefficients.rows())
                    .map(|(&p, c)| unit_output(c, p))
                    .sum::<f64>()
        })
        .collect()
}

/// A network of fixed structure. Parameters are supplied per call, so one
/// instance can score many candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lvn {
    structure: LvnStructure,
}

impl Lvn {
    /// Network with the given dimensions.
    pub fn new(structure: LvnStructure) -> Self {
        Self { structure }
    }

    /// Dimensions of the network.
    pub fn structure(&self) -> &LvnStructure {
        &self.structure
    }

    /// Filter bank matching this structure for a given alpha.
    pub fn filter_bank(&self, alpha: f64) -> Result<LaguerreFilterBank> {
        LaguerreFilterBank::new(
            self.structure.filter_order,
            alpha,
            self.structure.sampling_interval,
        )
    }

    fn prepared(
        &self,
        params: &LvnParameters,
        normalize: bool,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        params.validate(&self.structure)?;
        if normalize {
            normalize_scale_parameters(&params.weights, &params.coefficients)
        } else {
            Ok((params.weights.clone(), params.coefficients.clone()))
        }
    }

    /// Predicted output for input `x`, one sample per input sample.
    ///
    /// The filter bank is run over the whole signal first, then the hidden
    /// layer is applied as a matrix product. With `normalize` the weights
    /// are rescaled before use; the caller's parameters are not modified.
    ///
    /// # Errors
    ///
    /// `Shape` or `InvalidParameter` if `params` does not fit the structure.
    pub fn evaluate(
        &self,
        x: ArrayView1<f64>,
        params: &LvnParameters,
        normalize: bool,
    ) -> Result<Array1<f64>> {
        let (weights, coefficients) = self.prepared(params, normalize)?;
        let bank = self.filter_bank(params.alpha)?.propagate(x);
        Ok(polynomial_stage(
            bank.view(),
            weights.view(),
            coefficients.view(),
            params.offset,
        ))
    }

    /// Same result as [`Lvn::evaluate`], computed one sample at a time with
    /// an explicit filter state.
    pub fn evaluate_sequential(
        &self,
        x: ArrayView1<f64>,
        params: &LvnParameters,
        normalize: bool,
    ) -> Result<Array1<f64>> {
        let (weights, coefficients) = self.prepared(params, normalize)?;
        let mut state = self.filter_bank(params.alpha)?.state();
        let y = x
            .iter()
            .map(|&sample| {
                let v = state.process(sample);
                params.offset
                    + weights
                        .rows()
                        .into_iter()
                        .zip(coefficients.rows())
                        .map(|(w, c)| unit_output(c, w.dot(&v)))
                        .sum::<f64>()
            })
            .collect();
        Ok(y)
    }

    /// Applies the hidden layer to filter outputs computed earlier with the
    /// same alpha as `params.alpha`.
    ///
    /// # Errors
    ///
    /// `Shape` if `bank` does not have `L` rows, or if `params` does not fit
    /// the structure.
    pub fn evaluate_bank(
        &self,
        bank: ArrayView2<f64>,
        params: &LvnParameters,
        normalize: bool,
    ) -> Result<Array1<f64>> {
        if bank.nrows() != self.structure.filter_order {
            return Err(LvnError::Shape {
                what: "filter bank outputs",
                expected: (self.structure.filter_order, bank.ncols()),
                got: bank.dim(),
            });
        }
        let (weights, coefficients) = self.prepared(params, normalize)?;
        Ok(polynomial_stage(
            bank,
            weights.view(),
            coefficients.view(),
            params.offset,
        ))
    }
}
