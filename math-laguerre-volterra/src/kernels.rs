//! Volterra kernels equivalent to a network.
//!
//! Writing `g_h(m) = sum_j W[h, j] b_j(m)` for the impulse response of
//! hidden unit `h`, the network expands into a Volterra series whose first
//! two kernels are
//!
//! ```text
//! k1(m)      = T   sum_h C[h, 0] g_h(m)
//! k2(m1, m2) = T^2 sum_h C[h, 1] g_h(m1) g_h(m2)
//! ```

use ndarray::{Array1, Array2, Axis};

use crate::error::Result;
use crate::laguerre::laguerre_function;
use crate::network::{LvnParameters, LvnStructure};

/// `g_h(m)` for every hidden unit, as an `H x memory` matrix.
fn unit_impulse_responses(
    structure: &LvnStructure,
    params: &LvnParameters,
    memory: usize,
) -> Result<Array2<f64>> {
    params.validate(structure)?;
    let basis = Array2::from_shape_fn((structure.filter_order, memory), |(j, m)| {
        laguerre_function(j, m, params.alpha)
    });
    Ok(params.weights.dot(&basis))
}

/// First-order kernel over lags `0..memory`.
pub fn first_order_kernel(
    structure: &LvnStructure,
    params: &LvnParameters,
    memory: usize,
) -> Result<Array1<f64>> {
    let g = unit_impulse_responses(structure, params, memory)?;
    let c1 = params.coefficients.column(0);
    Ok(c1.dot(&g) * structure.sampling_interval)
}

/// Second-order kernel over lags `0..memory` in both dimensions. Zero when
/// the polynomials are linear.
pub fn second_order_kernel(
    structure: &LvnStructure,
    params: &LvnParameters,
    memory: usize,
) -> Result<Array2<f64>> {
    let g = unit_impulse_responses(structure, params, memory)?;
    let mut k2 = Array2::zeros((memory, memory));
    if structure.polynomial_order < 2 {
        return Ok(k2);
    }
    let t2 = structure.sampling_interval.powi(2);
    for (gh, &c2) in g.axis_iter(Axis(0)).zip(params.coefficients.column(1)) {
        let column = gh.view().insert_axis(Axis(1));
        let row = gh.view().insert_axis(Axis(0));
        k2.scaled_add(t2 * c2, &column.dot(&row));
    }
    Ok(k2)
}
