//! Synthetic systems and datasets for identification experiments.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{LvnError, Result};
use crate::io::Signals;
use crate::network::{Lvn, LvnParameters, LvnStructure};

/// Zero-mean, unit-variance Gaussian white noise.
pub fn white_noise<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Array1<f64> {
    Array1::from_shape_simple_fn(len, || rng.sample(StandardNormal))
}

/// Random ground-truth parameters: alpha in U(0, 0.5), weights in U(-1, 1),
/// coefficients in U(-2, 2) and offset in U(0, 1).
pub fn random_lvn_parameters<R: Rng + ?Sized>(
    structure: &LvnStructure,
    rng: &mut R,
) -> LvnParameters {
    LvnParameters {
        alpha: rng.random_range(0.0..0.5),
        weights: Array2::from_shape_simple_fn(structure.weights_shape(), || {
            rng.random_range(-1.0..1.0)
        }),
        coefficients: Array2::from_shape_simple_fn(structure.coefficients_shape(), || {
            rng.random_range(-2.0..2.0)
        }),
        offset: rng.random_range(0.0..1.0),
    }
}

/// Response of a known network to `input`.
pub fn simulate_lvn(
    structure: &LvnStructure,
    params: &LvnParameters,
    input: &Array1<f64>,
) -> Result<Array1<f64>> {
    Lvn::new(*structure).evaluate(input.view(), params, false)
}

/// Sum of first-order exponential smoothers followed by `exp(sin(.))`.
///
/// With `e_i[n] = (1 - a_i) x[n] + a_i e_i[n-1]`, the output is
/// `y[n] = exp(sin(sum_i e_i[n]))`. No finite LVN represents it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeSystem {
    /// Smoothing constant of each branch.
    pub alphas: Vec<f64>,
}

impl CascadeSystem {
    /// `branches` smoothers with constants drawn from U(0.2, 0.8).
    pub fn random<R: Rng + ?Sized>(branches: usize, rng: &mut R) -> Self {
        Self {
            alphas: (0..branches).map(|_| rng.random_range(0.2..0.8)).collect(),
        }
    }

    /// Response to `input`, starting from rest.
    pub fn simulate(&self, input: &Array1<f64>) -> Array1<f64> {
        let mut state = vec![0.0; self.alphas.len()];
        input
            .iter()
            .map(|&x| {
                let sum: f64 = state
                    .iter_mut()
                    .zip(&self.alphas)
                    .map(|(e, &a)| {
                        *e = (1.0 - a) * x + a * *e;
                        *e
                    })
                    .sum();
                sum.sin().exp()
            })
            .collect()
    }
}

/// Adds white Gaussian noise so that the signal-to-noise ratio is `snr_db`.
pub fn add_noise<R: Rng + ?Sized>(
    signal: &Array1<f64>,
    snr_db: f64,
    rng: &mut R,
) -> Result<Array1<f64>> {
    if signal.is_empty() {
        return Err(LvnError::InsufficientData {
            len: 0,
            required: 1,
        });
    }
    if !snr_db.is_finite() {
        return Err(LvnError::invalid("snr_db", snr_db, "must be finite"));
    }
    let power = signal.mapv(|v| v * v).mean().unwrap_or(0.0);
    let sigma = (power / 10f64.powf(snr_db / 10.0)).sqrt();
    Ok(signal.mapv(|v| v + sigma * rng.sample::<f64, _>(StandardNormal)))
}

/// A system to generate data from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulatedSystem {
    /// A network with known parameters.
    Lvn {
        /// Dimensions.
        structure: LvnStructure,
        /// Ground-truth parameters.
        parameters: LvnParameters,
    },
    /// Smoothers plus static nonlinearity.
    Cascade(CascadeSystem),
}

impl SimulatedSystem {
    /// Network with random parameters, see [`random_lvn_parameters`].
    pub fn random_lvn<R: Rng + ?Sized>(structure: LvnStructure, rng: &mut R) -> Self {
        let parameters = random_lvn_parameters(&structure, rng);
        SimulatedSystem::Lvn {
            structure,
            parameters,
        }
    }

    /// Noise-free response to `input`.
    pub fn respond(&self, input: &Array1<f64>) -> Result<Array1<f64>> {
        match self {
            SimulatedSystem::Lvn {
                structure,
                parameters,
            } => simulate_lvn(structure, parameters, input),
            SimulatedSystem::Cascade(cascade) => Ok(cascade.simulate(input)),
        }
    }
}

/// White-noise excitation of `system` over `len` samples, with optional
/// output noise at `snr_db`.
pub fn generate_dataset<R: Rng + ?Sized>(
    system: &SimulatedSystem,
    len: usize,
    snr_db: Option<f64>,
    rng: &mut R,
) -> Result<Signals> {
    let input = white_noise(len, rng);
    let mut output = system.respond(&input)?;
    if let Some(snr) = snr_db {
        output = add_noise(&output, snr, rng)?;
    }
    Signals::new(input, output)
}
