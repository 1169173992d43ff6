use fairpomcp::domains::RockSample;
use fairpomcp::domains::TwoState;
use fairpomcp::search::Planner;
use fairpomcp::search::SearchConfig;
use fairpomcp::welfare::ggf;

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        scoring_gini_welfare,
        searching_twostate,
        searching_rocksample,
}

fn scoring_gini_welfare(c: &mut criterion::Criterion) {
    let utility: Vec<f64> = (0..16).map(|i| (i * 7 % 16) as f64).collect();
    c.bench_function("score a 16-objective vector with ggf", |b| {
        b.iter(|| ggf(std::hint::black_box(&utility)))
    });
}

fn searching_twostate(c: &mut criterion::Criterion) {
    let config = SearchConfig {
        num_simulations: 256,
        num_start_states: 64,
        max_depth: 10,
        ..SearchConfig::default()
    };
    c.bench_function("select an action on the synthetic domain", |b| {
        b.iter(|| {
            let mut planner = Planner::new(TwoState::new(), config.clone(), 1);
            planner.select_action(&[0.0, 0.0])
        })
    });
}

fn searching_rocksample(c: &mut criterion::Criterion) {
    let config = SearchConfig {
        num_simulations: 128,
        num_start_states: 64,
        max_depth: 30,
        ..SearchConfig::default()
    };
    c.bench_function("select an action on rocksample(7, 8)", |b| {
        b.iter(|| {
            let mut planner = Planner::new(RockSample::new(7, 8), config.clone(), 1);
            planner.select_action(&[0.0, 0.0])
        })
    });
}
