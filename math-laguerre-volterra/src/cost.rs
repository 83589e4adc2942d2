//! Cost functions binding an LVN structure to a training dataset.
//!
//! A candidate is a flat vector laid out as described by
//! [`SolutionEncoding`]. [`LvnCost`] scores a candidate by the NMSE of the
//! network's prediction over the whole training signal. [`DynamicLvnCost`]
//! fixes alpha, runs the filter bank once, and scores only a window of the
//! signal that slides forward as the search progresses.

use std::ops::Range;
use std::sync::Arc;

use math_audio_metaheuristics::{CostError, CostFunction, EvalContext, Touched};
use ndarray::{Array1, Array2, s};
use serde::{Deserialize, Serialize};

use crate::error::{LvnError, Result};
use crate::metrics::{nmse, raw_nmse};
use crate::network::{Lvn, LvnParameters, LvnStructure};

/// Layout of a candidate vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolutionEncoding {
    /// `[alpha, W (row-major), C (row-major), offset]`.
    #[default]
    WithAlpha,
    /// `[W, C, offset]`; alpha is fixed.
    Alphaless {
        /// Smoothing constant used for every candidate.
        alpha: f64,
    },
}

impl SolutionEncoding {
    fn weights_start(&self) -> usize {
        match self {
            SolutionEncoding::WithAlpha => 1,
            SolutionEncoding::Alphaless { .. } => 0,
        }
    }

    /// Number of variables in a candidate.
    pub fn len(&self, structure: &LvnStructure) -> usize {
        let h = structure.hidden_units;
        self.weights_start() + h * structure.filter_order + h * structure.polynomial_order + 1
    }

    /// Indices of the weight variables.
    pub fn weight_range(&self, structure: &LvnStructure) -> Range<usize> {
        let start = self.weights_start();
        start..start + structure.hidden_units * structure.filter_order
    }

    /// Indices of the polynomial coefficients.
    pub fn coefficient_range(&self, structure: &LvnStructure) -> Range<usize> {
        let start = self.weight_range(structure).end;
        start..start + structure.hidden_units * structure.polynomial_order
    }

    /// Unpacks a candidate.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if the candidate does not have [`Self::len`]
    /// variables.
    pub fn decode(&self, structure: &LvnStructure, candidate: &[f64]) -> Result<LvnParameters> {
        let expected = self.len(structure);
        if candidate.len() != expected {
            return Err(LvnError::LengthMismatch {
                expected,
                got: candidate.len(),
            });
        }
        let alpha = match *self {
            SolutionEncoding::WithAlpha => candidate[0],
            SolutionEncoding::Alphaless { alpha } => alpha,
        };
        LvnParameters::from_slices(
            structure,
            alpha,
            &candidate[self.weight_range(structure)],
            &candidate[self.coefficient_range(structure)],
            candidate[expected - 1],
        )
    }

    /// [`Self::decode`] for an owned candidate vector.
    pub fn decode_array(
        &self,
        structure: &LvnStructure,
        candidate: &Array1<f64>,
    ) -> Result<LvnParameters> {
        match candidate.as_slice() {
            Some(values) => self.decode(structure, values),
            None => self.decode(structure, &candidate.to_vec()),
        }
    }

    /// Packs parameters into a candidate. Alpha is dropped by the alphaless
    /// layout.
    pub fn encode(&self, params: &LvnParameters) -> Array1<f64> {
        let mut values = Vec::with_capacity(params.weights.len() + params.coefficients.len() + 2);
        if let SolutionEncoding::WithAlpha = self {
            values.push(params.alpha);
        }
        values.extend(params.weights.iter());
        values.extend(params.coefficients.iter());
        values.push(params.offset);
        Array1::from(values)
    }

    /// Whether the weights must be renormalized after a move on `touched`.
    ///
    /// Renormalization only changes the weight scale, so a move confined to
    /// alpha, a coefficient or the offset can skip it.
    pub fn needs_normalization(&self, structure: &LvnStructure, touched: Touched) -> bool {
        match touched {
            Touched::All => true,
            Touched::Variable(index) => self.weight_range(structure).contains(&index),
        }
    }
}

/// NMSE of an LVN candidate on a training dataset.
#[derive(Debug, Clone)]
pub struct LvnCost {
    lvn: Lvn,
    encoding: SolutionEncoding,
    input: Array1<f64>,
    output: Array1<f64>,
}

impl LvnCost {
    /// Cost over `input`/`output` with the alpha-first encoding.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if the signals differ in length, `InsufficientData`
    /// if they are empty.
    pub fn new(structure: LvnStructure, input: Array1<f64>, output: Array1<f64>) -> Result<Self> {
        if input.len() != output.len() {
            return Err(LvnError::LengthMismatch {
                expected: input.len(),
                got: output.len(),
            });
        }
        if input.is_empty() {
            return Err(LvnError::InsufficientData {
                len: 0,
                required: 1,
            });
        }
        Ok(Self {
            lvn: Lvn::new(structure),
            encoding: SolutionEncoding::WithAlpha,
            input,
            output,
        })
    }

    /// Uses `encoding` to read candidates.
    pub fn with_encoding(mut self, encoding: SolutionEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Candidate layout.
    pub fn encoding(&self) -> SolutionEncoding {
        self.encoding
    }

    /// Network structure.
    pub fn structure(&self) -> &LvnStructure {
        self.lvn.structure()
    }

    /// Parameters encoded by `candidate`, as given.
    pub fn decode(&self, candidate: &Array1<f64>) -> Result<LvnParameters> {
        self.encoding.decode_array(self.lvn.structure(), candidate)
    }

    /// Parameters encoded by `candidate` with unit-norm weight rows.
    pub fn decode_normalized(&self, candidate: &Array1<f64>) -> Result<LvnParameters> {
        self.decode(candidate)?.normalized()
    }

    /// NMSE of the prediction for `candidate`, after the warm-up of its alpha.
    pub fn evaluate_candidate(&self, candidate: &Array1<f64>, touched: Touched) -> Result<f64> {
        let params = self.decode(candidate)?;
        let normalize = self
            .encoding
            .needs_normalization(self.lvn.structure(), touched);
        let prediction = self.lvn.evaluate(self.input.view(), &params, normalize)?;
        nmse(self.output.view(), prediction.view(), params.alpha)
    }
}

impl CostFunction for LvnCost {
    fn cost(&self, x: &Array1<f64>, context: &EvalContext) -> std::result::Result<f64, CostError> {
        Ok(self.evaluate_candidate(x, context.touched)?)
    }
}

/// Shared handle on an [`LvnCost`] with the alpha-first encoding.
pub fn make_cost_function(
    structure: LvnStructure,
    input: Array1<f64>,
    output: Array1<f64>,
) -> Result<Arc<dyn CostFunction>> {
    Ok(Arc::new(LvnCost::new(structure, input, output)?))
}

/// Windowed NMSE with a fixed alpha.
///
/// The signal is split into windows of `floor(N / ratio)` samples that
/// overlap by half. The window scored for a candidate is chosen from the
/// search progress carried by the evaluation context, so the objective moves
/// through the data as the optimizer advances.
#[derive(Debug, Clone)]
pub struct DynamicLvnCost {
    lvn: Lvn,
    alpha: f64,
    bank: Array2<f64>,
    output: Array1<f64>,
    window: usize,
    num_windows: f64,
    last_window: usize,
}

impl DynamicLvnCost {
    /// Precomputes the filter bank over `input` for `alpha`.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` for signals of different lengths, `InvalidParameter`
    /// for `window_ratio < 1` or alpha outside `[0, 1)`, and
    /// `InsufficientData` when a window would hold fewer than 2 samples.
    pub fn new(
        structure: LvnStructure,
        alpha: f64,
        input: Array1<f64>,
        output: Array1<f64>,
        window_ratio: f64,
    ) -> Result<Self> {
        if input.len() != output.len() {
            return Err(LvnError::LengthMismatch {
                expected: input.len(),
                got: output.len(),
            });
        }
        if !(window_ratio >= 1.0 && window_ratio.is_finite()) {
            return Err(LvnError::invalid("window_ratio", window_ratio, "must be >= 1"));
        }
        let n = input.len();
        let window = (n as f64 / window_ratio).floor() as usize;
        if window < 2 {
            return Err(LvnError::InsufficientData {
                len: n,
                required: (2.0 * window_ratio).ceil() as usize,
            });
        }
        let lvn = Lvn::new(structure);
        let bank = lvn.filter_bank(alpha)?.propagate(input.view());
        let half = window / 2;
        Ok(Self {
            lvn,
            alpha,
            bank,
            output,
            window,
            num_windows: 2.0 * n as f64 / window as f64 - 1.0,
            last_window: (n - window) / half,
        })
    }

    /// Candidate layout (always alphaless).
    pub fn encoding(&self) -> SolutionEncoding {
        SolutionEncoding::Alphaless { alpha: self.alpha }
    }

    /// Samples per window.
    pub fn window_len(&self) -> usize {
        self.window
    }

    /// Sample range scored at `progress` in `[0, 1]`.
    pub fn window_bounds(&self, progress: f64) -> Range<usize> {
        let index = (self.num_windows * progress.clamp(0.0, 1.0)).floor() as usize;
        let start = index.min(self.last_window) * (self.window / 2);
        start..start + self.window
    }

    /// Raw NMSE of `candidate` over the window selected by `context`.
    pub fn evaluate_candidate(
        &self,
        candidate: &Array1<f64>,
        context: &EvalContext,
    ) -> Result<f64> {
        let structure = self.lvn.structure();
        let encoding = self.encoding();
        let params = encoding.decode_array(structure, candidate)?;
        let normalize = encoding.needs_normalization(structure, context.touched);
        let bounds = self.window_bounds(context.progress);
        let bank = self.bank.slice(s![.., bounds.clone()]);
        let prediction = self.lvn.evaluate_bank(bank, &params, normalize)?;
        raw_nmse(self.output.slice(s![bounds]), prediction.view())
    }
}

impl CostFunction for DynamicLvnCost {
    fn cost(&self, x: &Array1<f64>, context: &EvalContext) -> std::result::Result<f64, CostError> {
        Ok(self.evaluate_candidate(x, context)?)
    }
}
