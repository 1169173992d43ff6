pub mod domains;
pub mod env;
pub mod experiment;
pub mod lp;
pub mod search;
pub mod stats;
pub mod welfare;

/// dimensional analysis types
pub type Utility = f64;
pub type Probability = f64;
pub type Action = usize;
pub type Observation = usize;

/// a vector of per-objective returns, length = num_objectives
pub type Reward = Vec<Utility>;

// prior seeding parameters. illegal actions are pinned far below any
// reachable value with a count large enough that UCB never revisits them.
const PRIOR_PIN_COUNT: f64 = 1e6;
const PRIOR_PIN_VALUE: Utility = -1e5;

/// initialize terminal logging at the given verbosity
pub fn init(level: log::LevelFilter) {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("initialize logger");
}
