use anyhow::Result;
use clap::Parser;
use fairpomcp::domains::Mlu;
use fairpomcp::domains::Mwa;
use fairpomcp::domains::RockSample;
use fairpomcp::domains::TwoState;
use fairpomcp::env::Environment;
use fairpomcp::env::Knowledge;
use fairpomcp::env::Level;
use fairpomcp::experiment::Experiment;
use fairpomcp::experiment::ExperimentConfig;
use fairpomcp::search::SearchConfig;
use fairpomcp::welfare::Criterion;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Problem {
    Rocksample,
    Mlu,
    Mwa,
    Twostate,
}

/// fair multi-objective POMCP experiments
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// problem to run
    #[arg(long, value_enum)]
    problem: Problem,
    /// summary output file, one TSV line per simulation budget
    #[arg(long, default_value = "output.txt")]
    outputfile: std::path::PathBuf,
    /// action selection strategy
    #[arg(long, value_enum, default_value_t = Criterion::Ggf)]
    strategy: Criterion,
    /// fold past episode reward into in-tree returns
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    considerpast: bool,
    /// grid size (problem specific)
    #[arg(long)]
    size: Option<usize>,
    /// number of elements in the problem (problem specific)
    #[arg(long)]
    number: Option<usize>,
    /// number of products in the mwa problem
    #[arg(long, default_value_t = 5)]
    numproducts: usize,
    /// wall-clock budget in seconds
    #[arg(long)]
    timeout: Option<f64>,
    /// minimum power of two simulations
    #[arg(long)]
    mindoubles: Option<u32>,
    /// maximum power of two simulations
    #[arg(long)]
    maxdoubles: Option<u32>,
    /// episodes per simulation budget
    #[arg(long)]
    runs: Option<usize>,
    /// accuracy level used to derive the horizon
    #[arg(long)]
    accuracy: Option<f64>,
    /// horizon to use when not discounting
    #[arg(long)]
    horizon: Option<usize>,
    /// planning tree depth, overrides the horizon-derived default
    #[arg(long)]
    maxdepth: Option<usize>,
    /// -v for debug, -vv for trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// assign the UCB exploration constant automatically
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    autoexploration: bool,
    /// manual UCB exploration constant
    #[arg(long)]
    exploration: Option<f64>,
    /// replenish beliefs with local transformations
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    usetransforms: bool,
    /// transforms per update as a power of two relative to simulations
    #[arg(long)]
    transformdoubles: Option<i32>,
    /// attempts granted per requested transform
    #[arg(long)]
    transformattempts: Option<usize>,
    /// one-ply rollout action selection instead of tree search
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    disabletree: bool,
    /// sample the executed action from the LP mix
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    uselp: bool,
    /// knowledge level used by tree priors
    #[arg(long, value_enum, default_value_t = Level::Legal)]
    treeknowledge: Level,
    /// knowledge level used by rollouts
    #[arg(long, value_enum, default_value_t = Level::Legal)]
    rolloutknowledge: Level,
    /// prior count for preferred actions during smart tree search
    #[arg(long, default_value_t = 10.0)]
    smarttreecount: f64,
    /// prior value for preferred actions during smart tree search
    #[arg(long, default_value_t = 1.0)]
    smarttreevalue: f64,
    /// rave is accepted but disabled in the active search path
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    userave: bool,
    #[arg(long, default_value_t = 1.0)]
    ravediscount: f64,
    #[arg(long, default_value_t = 0.01)]
    raveconstant: f64,
    /// base seed for the whole sweep
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    fairpomcp::init(match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });
    match args.problem {
        Problem::Rocksample => launch(
            RockSample::new(args.size.unwrap_or(7), args.number.unwrap_or(8)),
            &args,
        ),
        Problem::Mlu => launch(Mlu::new(), &args),
        Problem::Mwa => launch(Mwa::new(args.numproducts), &args),
        Problem::Twostate => launch(TwoState::new(), &args),
    }
}

fn launch<E: Environment + Clone>(env: E, args: &Args) -> Result<()> {
    let defaults = ExperimentConfig::default();
    let config = ExperimentConfig {
        runs: args.runs.unwrap_or(defaults.runs),
        timeout: args.timeout.unwrap_or(defaults.timeout),
        min_doubles: args.mindoubles.unwrap_or(defaults.min_doubles),
        max_doubles: args.maxdoubles.unwrap_or(defaults.max_doubles),
        transform_doubles: args.transformdoubles.unwrap_or(defaults.transform_doubles),
        transform_attempts: args.transformattempts.unwrap_or(defaults.transform_attempts),
        accuracy: args.accuracy.unwrap_or(defaults.accuracy),
        undiscounted_horizon: args.horizon.unwrap_or(defaults.undiscounted_horizon),
        max_depth: args.maxdepth,
        auto_exploration: args.autoexploration && args.exploration.is_none(),
        seed: args.seed,
        ..defaults
    };
    let search = SearchConfig {
        criterion: args.strategy,
        consider_past: args.considerpast,
        use_transforms: args.usetransforms,
        disable_tree: args.disabletree,
        use_lp: args.uselp,
        exploration_constant: args.exploration.unwrap_or(1.0),
        knowledge: Knowledge {
            tree: args.treeknowledge,
            rollout: args.rolloutknowledge,
            smart_count: args.smarttreecount,
            smart_value: args.smarttreevalue,
        },
        use_rave: args.userave,
        rave_discount: args.ravediscount,
        rave_constant: args.raveconstant,
        ..SearchConfig::default()
    };
    log::info!(
        "planning under {} with {} runs per budget",
        search.criterion,
        config.runs
    );
    let mut experiment = Experiment::new(env.clone(), env, config, search);
    experiment.sweep(&args.outputfile)
}
