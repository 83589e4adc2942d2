use criterion::{Criterion, black_box, criterion_group, criterion_main};
use math_audio_laguerre_volterra::{
    DynamicLvnCost, Lvn, LvnCost, LvnStructure, SimulatedSystem, SolutionEncoding,
    generate_dataset, random_lvn_parameters,
};
use math_audio_metaheuristics::{CostFunction, EvalContext};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_forward(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let structure = LvnStructure::from_sampling_frequency(5, 3, 4, 25.0).unwrap();
    let params = random_lvn_parameters(&structure, &mut rng);
    let system = SimulatedSystem::random_lvn(structure, &mut rng);
    let data = generate_dataset(&system, 4096, None, &mut rng).unwrap();
    let lvn = Lvn::new(structure);

    c.bench_function("lvn_evaluate_batched", |b| {
        b.iter(|| black_box(lvn.evaluate(data.input.view(), &params, true).unwrap()))
    });

    c.bench_function("lvn_evaluate_sequential", |b| {
        b.iter(|| black_box(lvn.evaluate_sequential(data.input.view(), &params, true).unwrap()))
    });
}

fn bench_cost(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let structure = LvnStructure::from_sampling_frequency(5, 1, 4, 25.0).unwrap();
    let system = SimulatedSystem::random_lvn(structure, &mut rng);
    let data = generate_dataset(&system, 1024, None, &mut rng).unwrap();
    let params = random_lvn_parameters(&structure, &mut rng);

    let cost = LvnCost::new(structure, data.input.clone(), data.output.clone()).unwrap();
    let candidate = SolutionEncoding::WithAlpha.encode(&params);
    c.bench_function("lvn_cost_full_signal", |b| {
        b.iter(|| black_box(cost.cost(&candidate, &EvalContext::fresh(0.5)).unwrap()))
    });

    let dynamic =
        DynamicLvnCost::new(structure, params.alpha, data.input, data.output, 4.0).unwrap();
    let candidate = dynamic.encoding().encode(&params);
    c.bench_function("lvn_cost_window", |b| {
        b.iter(|| black_box(dynamic.cost(&candidate, &EvalContext::fresh(0.5)).unwrap()))
    });
}

criterion_group!(benches, bench_forward, bench_cost);
criterion_main!(benches);
