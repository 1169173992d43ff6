use super::arena::Arena;
use super::belief::Belief;
use super::config::SearchConfig;
use super::history::History;
use super::node::NodeId;
use super::ucb::UcbTable;
use crate::env::Environment;
use crate::env::Phase;
use crate::env::Status;
use crate::stats::Statistic;
use crate::stats::VectorStatistic;
use crate::Action;
use crate::Observation;
use crate::Reward;
use crate::Utility;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;

/// online planner for multi-objective POMDPs. grows a tree of belief
/// nodes and action branches by monte-carlo simulation through the
/// environment model, keeps vector-valued returns at every node, and
/// scalarizes them with the configured welfare criterion only at
/// selection time. owns its arena, history, rng and UCB table, so
/// planners in one process are fully independent.
pub struct Planner<E: Environment> {
    env: E,
    config: SearchConfig,
    arena: Arena<E::State>,
    root: NodeId,
    history: History,
    status: Status,
    ucb: UcbTable,
    rng: SmallRng,
    objectives: usize,
    tree_depth: usize,
    peak_tree_depth: usize,
    stat_tree_depth: Statistic,
    stat_rollout_depth: Statistic,
    stat_total_reward: VectorStatistic,
}

impl<E: Environment> Planner<E> {
    /// configuration mismatches are startup errors, not runtime ones
    pub fn new(env: E, config: SearchConfig, seed: u64) -> Self {
        assert!(env.num_objectives() >= 1, "at least one objective");
        assert!(env.num_actions() >= 1, "empty action space");
        assert!(env.num_observations() >= 1, "empty observation space");
        assert!(env.discount() > 0.0 && env.discount() <= 1.0, "discount in (0, 1]");
        assert!(config.num_start_states >= 1, "root belief must be seeded");
        if let Some(p) = &config.importance_weight {
            assert!(
                p.len() == env.num_objectives(),
                "importance weight length must match the objective count"
            );
        }
        let objectives = env.num_objectives();
        let mut planner = Self {
            arena: Arena::new(env.num_actions(), env.num_observations(), objectives),
            ucb: UcbTable::new(config.exploration_constant),
            rng: SmallRng::seed_from_u64(seed),
            history: History::new(),
            status: Status {
                phase: Phase::Tree,
                knowledge: config.knowledge,
            },
            stat_tree_depth: Statistic::new(),
            stat_rollout_depth: Statistic::new(),
            stat_total_reward: VectorStatistic::new(objectives),
            objectives,
            tree_depth: 0,
            peak_tree_depth: 0,
            root: 0,
            config,
            env,
        };
        let state = planner.env.start_state(&mut planner.rng);
        planner.root = planner.expand(&state);
        for _ in 0..planner.config.num_start_states {
            let sample = planner.env.start_state(&mut planner.rng);
            planner.arena.node_mut(planner.root).belief.add(sample);
        }
        planner
    }

    /// run a search budget and return the greedy action. `past` is the
    /// episode's realized cumulative reward vector, folded into
    /// Q returns when consider_past is on so the welfare sort reflects
    /// the total trajectory position.
    pub fn select_action(&mut self, past: &[Utility]) -> Action {
        assert!(past.len() == self.objectives);
        assert!(!self.arena.node(self.root).belief.is_empty(), "root belief is empty");
        if self.config.disable_tree {
            self.rollout_search();
        } else {
            self.uct_search(past);
        }
        if self.config.use_lp {
            if let Some(action) = self.lp_action() {
                return action;
            }
        }
        self.greedy_ucb(self.root, false)
    }

    /// advance the tree past a real environment step. returns false on
    /// particle starvation: neither the matched child nor local
    /// transformations produced a single plausible state, and the
    /// driver should fall back to the rollout policy.
    pub fn update(&mut self, action: Action, observation: Observation, reward: &[Utility]) -> bool {
        log::debug!(
            "update: {}, {}, reward {:?}",
            self.env.display_action(action),
            self.env.display_observation(observation),
            reward
        );
        self.history.add(action, observation);

        let mut beliefs: Belief<E::State> = Belief::new();
        let matched = self.arena.node(self.root).child(action).child(observation);
        match matched {
            Some(child) => {
                log::debug!("matched {} particles", self.arena.node(child).belief.len());
                beliefs.copy_from(&self.arena.node(child).belief);
            }
            None => log::debug!("no matching node found"),
        }

        if self.config.use_transforms {
            self.add_transforms(&mut beliefs);
        }

        let matched_empty = matched.is_none_or(|c| self.arena.node(c).belief.is_empty());
        if beliefs.is_empty() && matched_empty {
            return false;
        }

        // a fully observed state is enough to initialise the prior
        let prior_state = match matched {
            Some(child) if !self.arena.node(child).belief.is_empty() => {
                self.arena.node(child).belief.get(0).clone()
            }
            _ => beliefs.get(0).clone(),
        };

        self.arena.free(self.root);
        let root = self.expand(&prior_state);
        self.arena.node_mut(root).belief = beliefs;
        self.root = root;
        true
    }

    fn uct_search(&mut self, past: &[Utility]) {
        self.clear_statistics();
        let depth = self.history.len();
        for n in 0..self.config.num_simulations {
            let mut state = self.arena.node(self.root).belief.sample(&mut self.rng);
            self.status.phase = Phase::Tree;
            self.tree_depth = 0;
            self.peak_tree_depth = 0;
            log::trace!("simulation {} {}", n, self.env.display_state(&state));
            let total = self.simulate_v(&mut state, self.root, past.to_vec(), false);
            self.stat_total_reward.add(&total);
            self.stat_tree_depth.add(self.peak_tree_depth as f64);
            self.history.truncate(depth);
        }
        log::debug!("tree depth {}", self.stat_tree_depth);
        log::debug!("rollout depth {}", self.stat_rollout_depth);
        log::debug!("total reward {:?} over {} simulations", self.stat_total_reward.mean(), self.stat_total_reward.count());
    }

    fn simulate_v(
        &mut self,
        state: &mut E::State,
        node: NodeId,
        past: Vec<Utility>,
        stop: bool,
    ) -> Reward {
        self.peak_tree_depth = self.peak_tree_depth.max(self.tree_depth);
        if self.tree_depth >= self.config.max_depth {
            return vec![0.0; self.objectives];
        }
        // first-depth nodes keep growing their belief so the next
        // update has particles to match
        if self.tree_depth == 1 {
            let sample = state.clone();
            self.arena.node_mut(node).belief.add(sample);
        }
        if stop {
            return vec![0.0; self.objectives];
        }
        let action = self.greedy_ucb(node, true);
        let total = self.simulate_q(state, node, action, past);
        self.arena.node_mut(node).value.add(&total);
        total
    }

    fn simulate_q(
        &mut self,
        state: &mut E::State,
        node: NodeId,
        action: Action,
        mut past: Vec<Utility>,
    ) -> Reward {
        let past_before = past.clone();
        if self.env.has_alpha() {
            let qnode = self.arena.node_mut(node).child_mut(action);
            self.env.update_alpha(qnode, state);
        }
        let outcome = self.env.step(state, action, &mut self.rng);
        let stop = self.env.stop_on_reward(&outcome.reward);
        let discount = self.env.discount();
        for (p, r) in past.iter_mut().zip(&outcome.reward) {
            *p += discount * r;
        }
        assert!(outcome.observation < self.env.num_observations());
        self.history.add(action, outcome.observation);

        let expandable = {
            let qnode = self.arena.node(node).child(action);
            qnode.child(outcome.observation).is_none()
                && !outcome.terminal
                && qnode.value.count() >= self.config.expand_count as f64
        };
        if expandable {
            let child = self.expand(state);
            self.arena
                .node_mut(node)
                .child_mut(action)
                .set_child(outcome.observation, child);
        }

        let mut delayed = vec![0.0; self.objectives];
        if !outcome.terminal {
            self.tree_depth += 1;
            delayed = match self.arena.node(node).child(action).child(outcome.observation) {
                Some(child) => self.simulate_v(state, child, past, stop),
                None => self.rollout(state),
            };
            self.tree_depth -= 1;
        }

        let mut total: Reward = outcome
            .reward
            .iter()
            .zip(&delayed)
            .map(|(r, d)| r + discount * d)
            .collect();
        if self.config.consider_past {
            for (t, p) in total.iter_mut().zip(&past_before) {
                *t = p + discount * *t;
            }
        }
        self.arena.node_mut(node).child_mut(action).value.add(&total);
        total
    }

    fn rollout(&mut self, state: &mut E::State) -> Reward {
        self.status.phase = Phase::Rollout;
        let mut total = vec![0.0; self.objectives];
        let mut discount_acc = 1.0;
        let mut steps = 0;
        while steps + self.tree_depth < self.config.max_depth {
            let action = self
                .env
                .random_action(state, &self.history, &self.status, &mut self.rng);
            let outcome = self.env.step(state, action, &mut self.rng);
            self.history.add(action, outcome.observation);
            for (t, r) in total.iter_mut().zip(&outcome.reward) {
                *t += discount_acc * r;
            }
            steps += 1;
            if outcome.terminal || self.env.stop_on_reward(&outcome.reward) {
                break;
            }
            discount_acc *= self.env.discount();
        }
        self.stat_rollout_depth.add(steps as f64);
        total
    }

    /// one-ply search: round-robin over the shuffled legal actions,
    /// each budgeted simulation is a single step plus a rollout
    fn rollout_search(&mut self) {
        self.clear_statistics();
        let depth = self.history.len();
        let probe = self.arena.node(self.root).belief.get(0).clone();
        let mut legal = self.env.legal_actions(&probe, &self.history, &self.status);
        assert!(!legal.is_empty(), "one-ply search needs a legal action");
        legal.shuffle(&mut self.rng);
        for i in 0..self.config.num_simulations {
            let action = legal[i % legal.len()];
            let mut state = self.arena.node(self.root).belief.sample(&mut self.rng);
            self.tree_depth = 0;
            let outcome = self.env.step(&mut state, action, &mut self.rng);
            let missing = self
                .arena
                .node(self.root)
                .child(action)
                .child(outcome.observation)
                .is_none();
            if missing && !outcome.terminal {
                let child = self.expand(&state);
                self.arena.node_mut(child).belief.add(state.clone());
                self.arena
                    .node_mut(self.root)
                    .child_mut(action)
                    .set_child(outcome.observation, child);
            }
            self.history.add(action, outcome.observation);
            let delayed = match outcome.terminal {
                true => vec![0.0; self.objectives],
                false => self.rollout(&mut state),
            };
            let total: Reward = outcome
                .reward
                .iter()
                .zip(&delayed)
                .map(|(r, d)| r + self.env.discount() * d)
                .collect();
            self.arena
                .node_mut(self.root)
                .child_mut(action)
                .value
                .add(&total);
            self.history.truncate(depth);
        }
    }

    /// scalarized greedy choice over a node's Q vectors, with the UCB
    /// exploration bonus when planning. ties break uniformly.
    fn greedy_ucb(&mut self, node: NodeId, ucb: bool) -> Action {
        let mut best: Vec<Action> = vec![];
        let mut best_score = f64::NEG_INFINITY;
        let parent = self.arena.node(node).value.count() as usize;
        for action in 0..self.env.num_actions() {
            let qnode = self.arena.node(node).child(action);
            let mut score = self.config.criterion.score(&qnode.value.mean());
            if ucb {
                score += self.ucb.bonus(parent, qnode.value.count() as usize);
            }
            if score >= best_score {
                if score > best_score {
                    best.clear();
                }
                best_score = score;
                best.push(action);
            }
        }
        assert!(!best.is_empty());
        best[self.rng.random_range(0..best.len())]
    }

    /// randomized alternative to the greedy choice: sample from the
    /// LP mix over the root's Q vectors
    fn lp_action(&mut self) -> Option<Action> {
        let q: Vec<Reward> = self
            .arena
            .node(self.root)
            .children()
            .iter()
            .map(|qnode| qnode.value.mean())
            .collect();
        let p = self
            .config
            .importance_weight
            .clone()
            .unwrap_or_else(|| vec![1.0 / self.objectives as f64; self.objectives]);
        match crate::lp::mix(&q, &p) {
            Ok(pi) => {
                let draw: f64 = self.rng.random();
                let mut mass = 0.0;
                for (action, weight) in pi.iter().enumerate() {
                    mass += weight;
                    if draw < mass {
                        return Some(action);
                    }
                }
                Some(pi.len() - 1)
            }
            Err(error) => {
                log::warn!("lp mix failed, falling back to greedy: {}", error);
                None
            }
        }
    }

    fn expand(&mut self, state: &E::State) -> NodeId {
        let id = self.arena.alloc();
        let node = self.arena.node_mut(id);
        self.env.prior(state, &self.history, node, &self.status);
        id
    }

    /// replenish a depleted particle set with local perturbations that
    /// the environment vouches for
    fn add_transforms(&mut self, beliefs: &mut Belief<E::State>) {
        let mut attempts = 0;
        let mut added = 0;
        while added < self.config.num_transforms && attempts < self.config.max_attempts {
            if let Some(state) = self.create_transform() {
                beliefs.add(state);
                added += 1;
            }
            attempts += 1;
        }
        log::debug!("created {} local transformations out of {} attempts", added, attempts);
    }

    fn create_transform(&mut self) -> Option<E::State> {
        let step = *self.history.back().expect("update appends before transforming");
        let mut state = self.arena.node(self.root).belief.sample(&mut self.rng);
        let outcome = self.env.step(&mut state, step.action, &mut self.rng);
        self.env
            .local_move(&mut state, &self.history, outcome.observation, &mut self.rng)
            .then_some(state)
    }

    fn clear_statistics(&mut self) {
        self.stat_tree_depth.clear();
        self.stat_rollout_depth.clear();
        self.stat_total_reward.clear();
    }

    pub fn beliefs(&self) -> &Belief<E::State> {
        &self.arena.node(self.root).belief
    }
    pub fn history(&self) -> &History {
        &self.history
    }
    pub fn status(&self) -> &Status {
        &self.status
    }
    pub fn env(&self) -> &E {
        &self.env
    }
    pub fn root(&self) -> NodeId {
        self.root
    }
    pub fn arena(&self) -> &Arena<E::State> {
        &self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::twostate::TwoState;
    use crate::env::Outcome;

    /// deterministic probe environment: observation echoes the action,
    /// rewards are zero, never terminal. transforms succeed or fail
    /// wholesale depending on the flag.
    #[derive(Clone)]
    struct Echo {
        actions: usize,
        transformable: bool,
    }

    #[derive(Clone)]
    struct Tick(usize);

    impl Environment for Echo {
        type State = Tick;

        fn num_actions(&self) -> usize {
            self.actions
        }
        fn num_observations(&self) -> usize {
            self.actions
        }
        fn num_objectives(&self) -> usize {
            2
        }
        fn reward_range(&self) -> f64 {
            1.0
        }
        fn discount(&self) -> f64 {
            0.95
        }
        fn start_state(&self, _: &mut SmallRng) -> Tick {
            Tick(0)
        }
        fn step(&self, state: &mut Tick, action: Action, _: &mut SmallRng) -> Outcome {
            state.0 += 1;
            Outcome {
                observation: action,
                reward: vec![0.0, 0.0],
                terminal: false,
            }
        }
        fn legal_actions(&self, _: &Tick, _: &History, _: &Status) -> Vec<Action> {
            (0..self.actions).collect()
        }
        fn local_move(&self, _: &mut Tick, _: &History, _: Observation, _: &mut SmallRng) -> bool {
            self.transformable
        }
    }

    fn echo_planner(transformable: bool) -> Planner<Echo> {
        let config = SearchConfig {
            num_simulations: 64,
            num_start_states: 16,
            max_depth: 5,
            use_transforms: false,
            ..SearchConfig::default()
        };
        Planner::new(
            Echo {
                actions: 2,
                transformable,
            },
            config,
            7,
        )
    }

    #[test]
    fn history_length_is_restored() {
        let mut planner = echo_planner(false);
        assert_eq!(planner.history().len(), 0);
        planner.select_action(&[0.0, 0.0]);
        assert_eq!(planner.history().len(), 0);
        planner.update(0, 0, &[0.0, 0.0]);
        assert_eq!(planner.history().len(), 1);
        planner.select_action(&[0.0, 0.0]);
        assert_eq!(planner.history().len(), 1);
    }

    #[test]
    fn node_tables_stay_full_size() {
        let mut planner = echo_planner(false);
        planner.select_action(&[0.0, 0.0]);
        for id in planner.arena().live_ids() {
            let node = planner.arena().node(id);
            assert_eq!(node.children().len(), 2);
            for qnode in node.children() {
                assert_eq!(qnode.children().len(), 2);
            }
        }
    }

    #[test]
    fn arena_stays_balanced_with_the_tree() {
        let mut planner = echo_planner(false);
        planner.select_action(&[0.0, 0.0]);
        assert!(planner.update(0, 0, &[0.0, 0.0]));
        planner.select_action(&[0.0, 0.0]);
        // everything live must be reachable from the root
        let mut reachable = vec![planner.root()];
        let mut frontier = vec![planner.root()];
        while let Some(id) = frontier.pop() {
            for qnode in planner.arena().node(id).children() {
                for child in qnode.children().iter().flatten() {
                    reachable.push(*child);
                    frontier.push(*child);
                }
            }
        }
        reachable.sort();
        reachable.dedup();
        assert_eq!(reachable.len(), planner.arena().live());
    }

    #[test]
    fn update_reuses_the_matched_belief() {
        let mut planner = echo_planner(false);
        planner.select_action(&[0.0, 0.0]);
        // observation 0 always follows action 0, so its child was
        // expanded and populated during the search
        assert!(planner.update(0, 0, &[0.0, 0.0]));
        assert!(!planner.beliefs().is_empty());
    }

    #[test]
    fn starvation_is_signalled_once_per_update() {
        let mut planner = echo_planner(false);
        planner.select_action(&[0.0, 0.0]);
        // observation 1 can never follow action 0, and transforms are
        // disabled, so the matched child is missing and stays missing
        assert!(!planner.update(0, 1, &[0.0, 0.0]));
    }

    #[test]
    fn transforms_rescue_a_pruned_branch() {
        let mut planner = Planner::new(
            Echo {
                actions: 2,
                transformable: true,
            },
            SearchConfig {
                num_simulations: 64,
                num_start_states: 16,
                max_depth: 5,
                use_transforms: true,
                num_transforms: 16,
                max_attempts: 1024,
                ..SearchConfig::default()
            },
            7,
        );
        planner.select_action(&[0.0, 0.0]);
        assert!(planner.update(0, 1, &[0.0, 0.0]));
        assert!(planner.beliefs().len() >= 1);
    }

    #[test]
    fn every_action_is_tried_before_any_repeats() {
        let mut planner = Planner::new(
            Echo {
                actions: 4,
                transformable: false,
            },
            SearchConfig {
                num_simulations: 1,
                num_start_states: 4,
                ..SearchConfig::default()
            },
            3,
        );
        let root = planner.root();
        let mut seen = vec![];
        for _ in 0..4 {
            let action = planner.greedy_ucb(root, true);
            assert!(!seen.contains(&action), "repeat before the cold start finished");
            seen.push(action);
            planner.arena.node_mut(root).child_mut(action).value.add(&[0.0, 0.0]);
            planner.arena.node_mut(root).value.add(&[0.0, 0.0]);
        }
    }

    #[test]
    fn exact_ties_break_uniformly() {
        let mut planner = echo_planner(false);
        let root = planner.root();
        for action in 0..2 {
            planner.arena.node_mut(root).child_mut(action).value.add(&[1.0, 1.0]);
        }
        let trials = 10_000;
        let zeros = (0..trials)
            .filter(|_| planner.greedy_ucb(root, false) == 0)
            .count();
        let frequency = zeros as f64 / trials as f64;
        assert!((frequency - 0.5).abs() < 0.05, "frequency {}", frequency);
    }

    #[test]
    fn one_ply_search_still_answers() {
        let mut planner = Planner::new(
            TwoState::new(),
            SearchConfig {
                num_simulations: 128,
                num_start_states: 32,
                max_depth: 10,
                disable_tree: true,
                ..SearchConfig::default()
            },
            11,
        );
        let action = planner.select_action(&[0.0, 0.0]);
        assert!(action < 2);
        assert_eq!(planner.history().len(), 0);
    }

    #[test]
    fn alpha_accumulators_are_forwarded() {
        #[derive(Clone)]
        struct Flat;
        impl Environment for Flat {
            type State = ();
            fn num_actions(&self) -> usize {
                2
            }
            fn num_observations(&self) -> usize {
                1
            }
            fn num_objectives(&self) -> usize {
                1
            }
            fn reward_range(&self) -> f64 {
                1.0
            }
            fn start_state(&self, _: &mut SmallRng) {}
            fn step(&self, _: &mut (), _: Action, _: &mut SmallRng) -> Outcome {
                Outcome {
                    observation: 0,
                    reward: vec![0.0],
                    terminal: false,
                }
            }
            fn legal_actions(&self, _: &(), _: &History, _: &Status) -> Vec<Action> {
                vec![0, 1]
            }
            fn has_alpha(&self) -> bool {
                true
            }
            fn update_alpha(&self, qnode: &mut crate::search::QNode, _: &()) {
                qnode.alpha.max_value += 1.0;
            }
        }
        let mut planner = Planner::new(
            Flat,
            SearchConfig {
                num_simulations: 8,
                num_start_states: 2,
                max_depth: 2,
                ..SearchConfig::default()
            },
            5,
        );
        planner.select_action(&[0.0]);
        let touched = planner
            .arena()
            .node(planner.root())
            .children()
            .iter()
            .map(|qnode| qnode.alpha.max_value)
            .sum::<f64>();
        assert!(touched > 0.0);
    }
}
