use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use approx::assert_relative_eq;
use math_audio_metaheuristics::{
    Acor, AcorParameters, Budget, CostFunction, EvalContext, Inertia, MetaheuristicError,
    Optimizer, ParticleSwarm, Perturbation, PsoParameters, SaParameters, SearchSpace,
    SimulatedAnnealing, Touched,
};
use ndarray::Array1;

/// Cost that counts evaluations and flags any bounded variable out of range.
struct Watchdog {
    space: SearchSpace,
    evaluations: AtomicUsize,
    violated: AtomicBool,
    single_variable_moves: AtomicUsize,
}

impl Watchdog {
    fn new(space: SearchSpace) -> Arc<Self> {
        Arc::new(Self {
            space,
            evaluations: AtomicUsize::new(0),
            violated: AtomicBool::new(false),
            single_variable_moves: AtomicUsize::new(0),
        })
    }
}

impl CostFunction for Watchdog {
    fn cost(
        &self,
        x: &Array1<f64>,
        context: &EvalContext,
    ) -> Result<f64, math_audio_metaheuristics::CostError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        if !self.space.contains(x) {
            self.violated.store(true, Ordering::Relaxed);
        }
        if let Touched::Variable(_) = context.touched {
            self.single_variable_moves.fetch_add(1, Ordering::Relaxed);
        }
        // optimum outside the box pushes every family against the bounds
        Ok(x.iter().map(|v| (v - 3.0).powi(2)).sum())
    }
}

fn bounded_space() -> SearchSpace {
    SearchSpace::new(&[(-1.0, 1.0), (-2.0, 2.0), (-10.0, 10.0)], &[true, true, false]).unwrap()
}

fn check_run<O: Optimizer>(mut optimizer: O, seed: u64) {
    let space = bounded_space();
    let watchdog = Watchdog::new(space.clone());
    optimizer.define_variables(space.clone());
    optimizer.set_cost_function(watchdog.clone());
    optimizer.options_mut().seed = Some(seed);

    let report = optimizer.optimize().unwrap();

    assert!(!watchdog.violated.load(Ordering::Relaxed));
    assert!(space.contains(&report.best.variables));
    for recorded in &report.recorded {
        assert!(space.contains(&recorded.solution.variables));
    }
    assert_eq!(watchdog.evaluations.load(Ordering::Relaxed), report.nfev);
}

#[test]
fn acor_respects_bounds() {
    let mut acor = Acor::new();
    acor.set_parameters(AcorParameters {
        budget: Budget::Iterations(100),
        ..AcorParameters::default()
    })
    .unwrap();
    check_run(acor, 1);
}

#[test]
fn block_adaptive_acor_respects_bounds() {
    let mut acor = Acor::new();
    acor.set_parameters(AcorParameters {
        budget: Budget::Iterations(100),
        ..AcorParameters::block_adaptive()
    })
    .unwrap();
    check_run(acor, 2);
}

#[test]
fn annealing_respects_bounds() {
    for perturbation in [
        Perturbation::FixedStep { step_size: 0.1 },
        Perturbation::Crystallization { base_step: 0.1 },
    ] {
        let mut sa = SimulatedAnnealing::new();
        sa.set_parameters(SaParameters {
            local_iterations: 20,
            budget: Budget::Iterations(50),
            perturbation,
            ..SaParameters::default()
        })
        .unwrap();
        check_run(sa, 3);
    }
}

#[test]
fn swarm_respects_bounds() {
    for inertia in [Inertia::Unit, Inertia::Adaptive { min: 0.3, max: 0.99 }] {
        let mut pso = ParticleSwarm::new();
        pso.set_parameters(PsoParameters {
            budget: Budget::Iterations(50),
            inertia,
            ..PsoParameters::default()
        })
        .unwrap();
        check_run(pso, 4);
    }
}

#[test]
fn annealing_reports_single_variable_moves() {
    let space = bounded_space();
    let watchdog = Watchdog::new(space.clone());
    let mut sa = SimulatedAnnealing::new();
    sa.set_parameters(SaParameters {
        local_iterations: 10,
        budget: Budget::Iterations(5),
        ..SaParameters::default()
    })
    .unwrap();
    sa.define_variables(space);
    sa.set_cost_function(watchdog.clone());
    sa.optimize().unwrap();
    // only the starting point is a fresh candidate
    assert_eq!(watchdog.single_variable_moves.load(Ordering::Relaxed), 50);
}

#[test]
fn optimize_requires_complete_setup() {
    let mut acor = Acor::new();
    assert!(matches!(
        acor.optimize(),
        Err(MetaheuristicError::ParametersUndefined)
    ));
    acor.set_parameters(AcorParameters::default()).unwrap();
    assert!(matches!(
        acor.optimize(),
        Err(MetaheuristicError::VariablesUndefined)
    ));
    acor.define_ranges(&[(0.0, 1.0)], &[true]).unwrap();
    let err = acor.optimize().unwrap_err();
    assert!(err.is_configuration_error());
    assert!(matches!(err, MetaheuristicError::CostUndefined));

    let mut sa = SimulatedAnnealing::new();
    assert!(sa.define_ranges(&[(0.0, 1.0)], &[true, true]).is_err());
    let mut pso = ParticleSwarm::new();
    assert!(
        pso.set_parameters(PsoParameters {
            population_size: 0,
            ..PsoParameters::default()
        })
        .unwrap_err()
        .is_parameter_error()
    );
}

#[test]
fn acor_records_requested_checkpoints() {
    let mut acor = Acor::new();
    acor.set_parameters(AcorParameters {
        pop_size: 5,
        archive_size: 50,
        q: 0.01,
        xi: 0.85,
        budget: Budget::Evaluations(vec![100, 200, 500]),
        ..AcorParameters::default()
    })
    .unwrap();
    acor.define_variables(SearchSpace::uniform(4, (-5.0, 5.0), false).unwrap());
    acor.set_cost_function(Arc::new(|x: &Array1<f64>| x.dot(x)));
    acor.options_mut().seed = Some(10);

    let report = acor.optimize().unwrap();

    assert_eq!(report.recorded.len(), 3);
    let evaluations: Vec<usize> = report.recorded.iter().map(|r| r.evaluations).collect();
    assert_eq!(evaluations, vec![100, 200, 500]);
    let iterations: Vec<usize> = report.recorded.iter().map(|r| r.iteration).collect();
    assert_eq!(iterations, vec![10, 30, 90]);
    assert_eq!(report.nfev, 500);
    assert!(
        report
            .recorded
            .windows(2)
            .all(|w| w[1].solution.cost <= w[0].solution.cost)
    );
    assert_relative_eq!(report.recorded[2].solution.cost, report.best.cost);
}

#[test]
fn acor_rejects_unreachable_checkpoints() {
    let mut acor = Acor::new();
    let err = acor
        .set_parameters(AcorParameters {
            pop_size: 5,
            archive_size: 50,
            budget: Budget::Evaluations(vec![100, 203]),
            ..AcorParameters::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        MetaheuristicError::Divisibility {
            checkpoint: 203,
            initial: 50,
            per_iteration: 5
        }
    ));
}

#[test]
fn cost_errors_abort_the_run() {
    struct Broken;
    impl CostFunction for Broken {
        fn cost(
            &self,
            _: &Array1<f64>,
            _: &EvalContext,
        ) -> Result<f64, math_audio_metaheuristics::CostError> {
            Err("model rejected candidate".into())
        }
    }

    let mut pso = ParticleSwarm::new();
    pso.set_parameters(PsoParameters::default()).unwrap();
    pso.define_ranges(&[(0.0, 1.0)], &[true]).unwrap();
    pso.set_cost_function(Arc::new(Broken));
    let err = pso.optimize().unwrap_err();
    assert!(matches!(err, MetaheuristicError::Cost(_)));
}
