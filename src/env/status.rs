/// which half of a simulation we are in. rollout policies are allowed
/// to behave differently below the tree frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Tree,
    Rollout,
}

/// how much domain knowledge a policy is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, clap::ValueEnum)]
pub enum Level {
    /// uniform over the whole action space
    Pure,
    /// uniform over legal actions
    #[default]
    Legal,
    /// domain-preferred actions when the domain offers any
    Smart,
}

/// knowledge levels for tree priors and rollout policies, with the
/// prior count/value given to preferred actions at the smart level.
#[derive(Debug, Clone, Copy)]
pub struct Knowledge {
    pub tree: Level,
    pub rollout: Level,
    pub smart_count: f64,
    pub smart_value: f64,
}

impl Default for Knowledge {
    fn default() -> Self {
        Self {
            tree: Level::Legal,
            rollout: Level::Legal,
            smart_count: 10.0,
            smart_value: 1.0,
        }
    }
}

/// search status threaded through every environment call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Status {
    pub phase: Phase,
    pub knowledge: Knowledge,
}
