use approx::{assert_abs_diff_eq, assert_relative_eq};
use math_audio_laguerre_volterra::{
    LaguerreFilterBank, Lvn, LvnError, LvnParameters, LvnStructure, first_order_kernel,
    laguerre_function, random_lvn_parameters, second_order_kernel, white_noise,
};
use ndarray::{Array1, array};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn impulse(len: usize) -> Array1<f64> {
    let mut x = Array1::zeros(len);
    x[0] = 1.0;
    x
}

#[test]
fn impulse_response_is_scaled_laguerre_function() {
    let t = 0.04;
    for alpha in [0.05, 0.3, 0.7] {
        let bank = LaguerreFilterBank::new(5, alpha, t).unwrap();
        let v = bank.propagate(impulse(80).view());
        for j in 0..5 {
            for m in 0..80 {
                assert_abs_diff_eq!(
                    v[[j, m]],
                    t * laguerre_function(j, m, alpha),
                    epsilon = 1e-12
                );
            }
        }
    }
}

#[test]
fn laguerre_functions_are_orthonormal() {
    let alpha = 0.5;
    for i in 0..4 {
        for j in 0..4 {
            let dot: f64 = (0..400)
                .map(|m| laguerre_function(i, m, alpha) * laguerre_function(j, m, alpha))
                .sum();
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(dot, expected, epsilon = 1e-8);
        }
    }
}

#[test]
fn impulse_response_decays() {
    let bank = LaguerreFilterBank::new(3, 0.6, 1.0).unwrap();
    let v = bank.propagate(impulse(300).view());
    for j in 0..3 {
        assert!(v[[j, 299]].abs() < 1e-20);
    }
}

#[test]
fn zero_input_gives_zero_filter_output() {
    let bank = LaguerreFilterBank::new(4, 0.4, 0.1).unwrap();
    let v = bank.propagate(Array1::zeros(50).view());
    assert!(v.iter().all(|&x| x == 0.0));
}

#[test]
fn alpha_zero_first_filter_is_a_gain() {
    let bank = LaguerreFilterBank::new(2, 0.0, 0.25).unwrap();
    let x = array![1.0, 2.0, -4.0, 0.5];
    let v = bank.propagate(x.view());
    for n in 0..4 {
        assert_eq!(v[[0, n]], 0.25 * x[n]);
    }
}

#[test]
fn batched_and_sequential_paths_agree() {
    let mut rng = StdRng::seed_from_u64(21);
    for (l, h, q) in [(5, 1, 4), (5, 3, 4), (2, 2, 1), (8, 4, 3)] {
        let structure = LvnStructure::from_sampling_frequency(l, h, q, 25.0).unwrap();
        let params = random_lvn_parameters(&structure, &mut rng);
        let x = white_noise(512, &mut rng);
        let lvn = Lvn::new(structure);
        for normalize in [false, true] {
            let batched = lvn.evaluate(x.view(), &params, normalize).unwrap();
            let sequential = lvn.evaluate_sequential(x.view(), &params, normalize).unwrap();
            assert_eq!(batched.len(), x.len());
            for (a, b) in batched.iter().zip(sequential.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn normalization_leaves_output_unchanged() {
    let mut rng = StdRng::seed_from_u64(4);
    let structure = LvnStructure::from_sampling_frequency(5, 3, 4, 25.0).unwrap();
    let lvn = Lvn::new(structure);
    let x = white_noise(300, &mut rng);
    for _ in 0..5 {
        let mut params = random_lvn_parameters(&structure, &mut rng);
        params.weights *= 3.0;
        let plain = lvn.evaluate(x.view(), &params, false).unwrap();
        let normalized = lvn.evaluate(x.view(), &params, true).unwrap();
        let explicit = lvn.evaluate(x.view(), &params.normalized().unwrap(), false).unwrap();
        for n in 0..x.len() {
            assert_relative_eq!(plain[n], normalized[n], epsilon = 1e-12, max_relative = 1e-9);
            assert_relative_eq!(plain[n], explicit[n], epsilon = 1e-12, max_relative = 1e-9);
        }
    }
}

#[test]
fn evaluate_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(8);
    let structure = LvnStructure::from_sampling_frequency(4, 2, 3, 25.0).unwrap();
    let params = random_lvn_parameters(&structure, &mut rng);
    let x = white_noise(200, &mut rng);
    let lvn = Lvn::new(structure);
    let first = lvn.evaluate(x.view(), &params, true).unwrap();
    let second = lvn.evaluate(x.view(), &params, true).unwrap();
    assert_eq!(first, second);
    // the caller's parameters are not rescaled
    let before = params.clone();
    lvn.evaluate(x.view(), &params, true).unwrap();
    assert_eq!(params, before);
}

#[test]
fn highest_polynomial_coefficient_contributes() {
    let structure = LvnStructure::new(2, 1, 3, 0.5).unwrap();
    let params = LvnParameters {
        alpha: 0.2,
        weights: array![[0.8, -0.6]],
        coefficients: array![[0.0, 0.0, 2.0]],
        offset: 0.25,
    };
    let x = array![1.0, -1.0, 0.5, 2.0, 0.0, -0.5];
    let y = Lvn::new(structure).evaluate(x.view(), &params, false).unwrap();
    let v = LaguerreFilterBank::new(2, 0.2, 0.5).unwrap().propagate(x.view());
    for n in 0..x.len() {
        let p = 0.8 * v[[0, n]] - 0.6 * v[[1, n]];
        assert_abs_diff_eq!(y[n], 0.25 + 2.0 * p.powi(3), epsilon = 1e-12);
    }
}

#[test]
fn shape_and_alpha_errors() {
    let structure = LvnStructure::new(3, 2, 2, 0.1).unwrap();
    let lvn = Lvn::new(structure);
    let x = Array1::zeros(10);
    let good = LvnParameters {
        alpha: 0.2,
        weights: Array1::ones(6).into_shape_with_order((2, 3)).unwrap(),
        coefficients: Array1::ones(4).into_shape_with_order((2, 2)).unwrap(),
        offset: 0.0,
    };
    assert!(lvn.evaluate(x.view(), &good, true).is_ok());

    let wrong_weights = LvnParameters {
        weights: array![[1.0, 1.0], [1.0, 1.0]],
        ..good.clone()
    };
    match lvn.evaluate(x.view(), &wrong_weights, false).unwrap_err() {
        LvnError::Shape {
            what,
            expected,
            got,
        } => {
            assert_eq!(what, "weights");
            assert_eq!(expected, (2, 3));
            assert_eq!(got, (2, 2));
        }
        other => panic!("unexpected error {other}"),
    }

    let wrong_coefficients = LvnParameters {
        coefficients: array![[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
        ..good.clone()
    };
    assert!(
        lvn.evaluate_sequential(x.view(), &wrong_coefficients, false)
            .unwrap_err()
            .is_shape_error()
    );

    for alpha in [1.0, -0.1, f64::NAN] {
        let bad_alpha = LvnParameters {
            alpha,
            ..good.clone()
        };
        assert!(matches!(
            lvn.evaluate(x.view(), &bad_alpha, false).unwrap_err(),
            LvnError::InvalidParameter { name: "alpha", .. }
        ));
    }
}

#[test]
fn linear_network_is_a_convolution_with_its_first_kernel() {
    let mut rng = StdRng::seed_from_u64(12);
    let structure = LvnStructure::from_sampling_frequency(4, 2, 1, 25.0).unwrap();
    let params = random_lvn_parameters(&structure, &mut rng);
    let x = white_noise(60, &mut rng);
    let y = Lvn::new(structure).evaluate(x.view(), &params, false).unwrap();
    let k1 = first_order_kernel(&structure, &params, 60).unwrap();
    for n in 0..60 {
        let conv: f64 = (0..=n).map(|m| k1[m] * x[n - m]).sum();
        assert_abs_diff_eq!(y[n] - params.offset, conv, epsilon = 1e-9);
    }
}

#[test]
fn quadratic_network_matches_its_volterra_expansion() {
    let structure = LvnStructure::new(3, 2, 2, 0.2).unwrap();
    let params = LvnParameters {
        alpha: 0.35,
        weights: array![[0.5, -0.2, 0.9], [1.0, 0.4, -0.3]],
        coefficients: array![[1.5, -0.7], [0.2, 1.1]],
        offset: -0.1,
    };
    let mut rng = StdRng::seed_from_u64(30);
    let x = white_noise(30, &mut rng);
    let y = Lvn::new(structure).evaluate(x.view(), &params, false).unwrap();
    let k1 = first_order_kernel(&structure, &params, 30).unwrap();
    let k2 = second_order_kernel(&structure, &params, 30).unwrap();
    for n in 0..30 {
        let linear: f64 = (0..=n).map(|m| k1[m] * x[n - m]).sum();
        let mut quadratic = 0.0;
        for m1 in 0..=n {
            for m2 in 0..=n {
                quadratic += k2[[m1, m2]] * x[n - m1] * x[n - m2];
            }
        }
        assert_abs_diff_eq!(y[n] - params.offset, linear + quadratic, epsilon = 1e-9);
    }
}
