use crate::env::Knowledge;
use crate::welfare::Criterion;
use crate::Probability;

/// planner configuration. defaults follow the reference parameter
/// block; the experiment driver overwrites the budget fields on every
/// doubling step.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// simulations per select_action call
    pub num_simulations: usize,
    /// initial root belief size
    pub num_start_states: usize,
    /// hard depth cutoff per simulation
    pub max_depth: usize,
    /// visits a Q node needs before it may grow a V child
    pub expand_count: usize,
    /// belief transformation on update
    pub use_transforms: bool,
    pub num_transforms: usize,
    pub max_attempts: usize,
    /// UCB exploration constant
    pub exploration_constant: f64,
    /// scalarization inside UCB and for the greedy choice
    pub criterion: Criterion,
    /// reference distribution for scoring episode returns with g3f;
    /// never consulted inside the tree
    pub importance_weight: Option<Vec<Probability>>,
    /// fold the episode's realized reward into Q returns so the
    /// welfare sort sees the total trajectory position
    pub consider_past: bool,
    /// one-ply rollout search instead of tree search
    pub disable_tree: bool,
    /// pick the executed action from the LP mix over root Q vectors
    pub use_lp: bool,
    /// knowledge levels for priors and rollouts
    pub knowledge: Knowledge,
    // accepted for compatibility; the active search path leaves rave
    // disabled and these untouched
    pub use_rave: bool,
    pub rave_discount: f64,
    pub rave_constant: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_simulations: 1000,
            num_start_states: 1000,
            max_depth: 100,
            expand_count: 1,
            use_transforms: true,
            num_transforms: 0,
            max_attempts: 0,
            exploration_constant: 1.0,
            criterion: Criterion::Ggf,
            importance_weight: None,
            consider_past: true,
            disable_tree: false,
            use_lp: false,
            knowledge: Knowledge::default(),
            use_rave: false,
            rave_discount: 1.0,
            rave_constant: 0.01,
        }
    }
}
