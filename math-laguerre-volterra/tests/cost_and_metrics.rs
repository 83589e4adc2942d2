use approx::assert_relative_eq;
use math_audio_laguerre_volterra::{
    DynamicLvnCost, Lvn, LvnCost, LvnError, LvnParameters, LvnStructure, SolutionEncoding,
    laguerre_filter_memory, make_cost_function, nmse, raw_nmse, white_noise,
};
use math_audio_metaheuristics::{CostFunction, EvalContext, Touched};
use ndarray::{Array1, array};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn ground_truth() -> (LvnStructure, LvnParameters) {
    let structure = LvnStructure::from_sampling_frequency(3, 2, 2, 25.0).unwrap();
    let params = LvnParameters {
        alpha: 0.2,
        weights: array![[0.6, -0.8, 0.1], [0.3, 0.3, 0.5]],
        coefficients: array![[2.0, -1.0], [0.5, 3.0]],
        offset: 0.4,
    };
    (structure, params)
}

fn dataset(len: usize, seed: u64) -> (LvnStructure, LvnParameters, Array1<f64>, Array1<f64>) {
    let (structure, params) = ground_truth();
    let mut rng = StdRng::seed_from_u64(seed);
    let input = white_noise(len, &mut rng);
    let output = Lvn::new(structure).evaluate(input.view(), &params, false).unwrap();
    (structure, params, input, output)
}

#[test]
fn nmse_is_zero_for_identical_and_positive_otherwise() {
    let mut rng = StdRng::seed_from_u64(2);
    let y = white_noise(100, &mut rng);
    for alpha in [0.0, 0.1, 0.5] {
        assert_eq!(nmse(y.view(), y.view(), alpha).unwrap(), 0.0);
    }
    let y_pred = y.mapv(|v| 0.9 * v);
    let e = nmse(y.view(), y_pred.view(), 0.1).unwrap();
    assert_relative_eq!(e, 0.01, max_relative = 1e-9);
    assert!(raw_nmse(y.view(), y_pred.view()).unwrap() > 0.0);
}

#[test]
fn nmse_needs_more_samples_than_the_filter_memory() {
    let alpha = 0.5;
    let memory = laguerre_filter_memory(alpha).unwrap();
    let y = Array1::ones(memory);
    match nmse(y.view(), y.view(), alpha).unwrap_err() {
        LvnError::InsufficientData { len, required } => {
            assert_eq!(len, memory);
            assert_eq!(required, memory + 1);
        }
        other => panic!("unexpected error {other}"),
    }
    let y = Array1::ones(memory + 1);
    assert_eq!(nmse(y.view(), y.view(), alpha).unwrap(), 0.0);
}

#[test]
fn true_parameters_cost_nothing() {
    let (structure, params, input, output) = dataset(400, 1);
    let cost = make_cost_function(structure, input, output).unwrap();
    let candidate = SolutionEncoding::WithAlpha.encode(&params);
    let c = cost.cost(&candidate, &EvalContext::default()).unwrap();
    assert!(c < 1e-20, "cost {c}");

    let mut perturbed = candidate.clone();
    perturbed[3] += 0.1;
    assert!(cost.cost(&perturbed, &EvalContext::default()).unwrap() > 1e-6);
}

#[test]
fn touched_variable_does_not_change_the_cost() {
    let (structure, params, input, output) = dataset(300, 2);
    let cost = LvnCost::new(structure, input, output).unwrap();
    let mut candidate = SolutionEncoding::WithAlpha.encode(&params);
    // unnormalized weights and a different offset
    for i in 1..7 {
        candidate[i] *= 2.5;
    }
    candidate[11] = -0.3;
    let reference = cost.evaluate_candidate(&candidate, Touched::All).unwrap();
    assert!(reference > 0.0);
    for index in 0..candidate.len() {
        let c = cost
            .cost(&candidate, &EvalContext::single(index, 0.5))
            .unwrap();
        assert_relative_eq!(c, reference, max_relative = 1e-9);
    }
}

#[test]
fn decoded_normalized_parameters_have_unit_rows() {
    let (structure, params, input, output) = dataset(100, 3);
    let cost = LvnCost::new(structure, input, output).unwrap();
    let candidate = SolutionEncoding::WithAlpha.encode(&params);
    assert_eq!(cost.decode(&candidate).unwrap(), params);
    let normalized = cost.decode_normalized(&candidate).unwrap();
    for row in normalized.weights.rows() {
        assert_relative_eq!(row.dot(&row), 1.0, max_relative = 1e-12);
    }
    assert_eq!(normalized.alpha, params.alpha);
}

#[test]
fn alphaless_encoding_uses_the_fixed_alpha() {
    let (structure, params, input, output) = dataset(200, 4);
    let encoding = SolutionEncoding::Alphaless { alpha: params.alpha };
    let cost = LvnCost::new(structure, input, output)
        .unwrap()
        .with_encoding(encoding);
    let candidate = encoding.encode(&params);
    assert_eq!(candidate.len(), 6 + 4 + 1);
    assert!(cost.evaluate_candidate(&candidate, Touched::All).unwrap() < 1e-20);

    let with_alpha = SolutionEncoding::WithAlpha.encode(&params);
    let err = cost.evaluate_candidate(&with_alpha, Touched::All).unwrap_err();
    assert!(err.is_length_error());
}

#[test]
fn forward_errors_surface_as_cost_errors() {
    let (structure, params, input, output) = dataset(20, 5);
    let cost = LvnCost::new(structure, input, output).unwrap();
    // alpha 0.9 needs 263 warm-up samples
    let candidate = SolutionEncoding::WithAlpha.encode(&LvnParameters {
        alpha: 0.9,
        ..params
    });
    let err = cost.cost(&candidate, &EvalContext::default()).unwrap_err();
    let lvn_err = err.downcast_ref::<LvnError>().unwrap();
    assert!(matches!(lvn_err, LvnError::InsufficientData { len: 20, .. }));
}

#[test]
fn windowed_cost_follows_progress() {
    let (structure, params, input, mut output) = dataset(200, 6);
    // corrupt only the second half of the output
    for n in 100..200 {
        output[n] += 1.0;
    }
    let cost = DynamicLvnCost::new(structure, params.alpha, input, output, 4.0).unwrap();
    assert_eq!(cost.window_len(), 50);
    let candidate = cost.encoding().encode(&params);

    let early = cost.cost(&candidate, &EvalContext::fresh(0.0)).unwrap();
    let late = cost.cost(&candidate, &EvalContext::fresh(1.0)).unwrap();
    assert!(early < 1e-20, "early window cost {early}");
    assert!(late > 0.1, "late window cost {late}");

    let mut previous = 0;
    for step in 0..=20 {
        let bounds = cost.window_bounds(step as f64 / 20.0);
        assert_eq!(bounds.len(), 50);
        assert!(bounds.start >= previous);
        assert!(bounds.end <= 200);
        previous = bounds.start;
    }
    assert_eq!(cost.window_bounds(1.0), 150..200);
}
