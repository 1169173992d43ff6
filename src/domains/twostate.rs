use crate::env::Environment;
use crate::env::Outcome;
use crate::env::Status;
use crate::search::History;
use crate::Action;
use crate::Observation;
use rand::rngs::SmallRng;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct TwoStateState {
    pub index: usize,
}

/// synthetic 2-state, 2-action, 2-objective MDP with aliased
/// observations. small enough to reason about by hand: action 0 earns
/// the balanced returns ([3,7] and [5,5]), action 1 the lopsided ones
/// ([4,4] and [8,2]), so a fair criterion and a utilitarian one
/// disagree about what to do.
#[derive(Debug, Clone)]
pub struct TwoState {
    /// probability of landing in state 0, by [state][action]
    transition: [[f64; 2]; 2],
    /// probability of emitting observation 0, by [state][action]
    observation: [[f64; 2]; 2],
    reward: [[[f64; 2]; 2]; 2],
}

impl TwoState {
    pub fn new() -> Self {
        Self {
            transition: [[0.9, 0.4], [0.35, 0.8]],
            observation: [[0.8, 0.4], [0.3, 0.5]],
            reward: [[[3.0, 7.0], [4.0, 4.0]], [[5.0, 5.0], [8.0, 2.0]]],
        }
    }
}

impl Default for TwoState {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for TwoState {
    type State = TwoStateState;

    fn num_actions(&self) -> usize {
        2
    }
    fn num_observations(&self) -> usize {
        2
    }
    fn num_objectives(&self) -> usize {
        2
    }
    fn reward_range(&self) -> f64 {
        8.0
    }
    fn discount(&self) -> f64 {
        0.95
    }

    fn start_state(&self, rng: &mut SmallRng) -> TwoStateState {
        TwoStateState {
            index: rng.random_range(0..2),
        }
    }

    fn step(&self, state: &mut TwoStateState, action: Action, rng: &mut SmallRng) -> Outcome {
        let reward = self.reward[state.index][action].to_vec();
        state.index = match rng.random_bool(self.transition[state.index][action]) {
            true => 0,
            false => 1,
        };
        let observation = match rng.random_bool(self.observation[state.index][action]) {
            true => 0,
            false => 1,
        };
        Outcome {
            observation,
            reward,
            terminal: false,
        }
    }

    fn legal_actions(&self, _: &TwoStateState, _: &History, _: &Status) -> Vec<Action> {
        vec![0, 1]
    }

    fn local_move(
        &self,
        state: &mut TwoStateState,
        history: &History,
        _step_observation: Observation,
        rng: &mut SmallRng,
    ) -> bool {
        state.index = 1 - state.index;
        let back = history.back().expect("transforms follow a real step");
        let observation = match rng.random_bool(self.observation[state.index][back.action]) {
            true => 0,
            false => 1,
        };
        observation == back.observation
    }

    fn display_state(&self, state: &TwoStateState) -> String {
        format!("state {}", state.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Planner;
    use crate::search::SearchConfig;
    use crate::welfare::Criterion;
    use rand::SeedableRng;

    #[test]
    fn rewards_follow_the_table() {
        let env = TwoState::new();
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = TwoStateState { index: 0 };
        let outcome = env.step(&mut state, 0, &mut rng);
        assert_eq!(outcome.reward, vec![3.0, 7.0]);
        let mut state = TwoStateState { index: 1 };
        let outcome = env.step(&mut state, 1, &mut rng);
        assert_eq!(outcome.reward, vec![8.0, 2.0]);
    }

    #[test]
    fn transitions_respect_the_table() {
        let env = TwoState::new();
        let mut rng = SmallRng::seed_from_u64(9);
        let stays = (0..10_000)
            .filter(|_| {
                let mut state = TwoStateState { index: 0 };
                env.step(&mut state, 0, &mut rng);
                state.index == 0
            })
            .count();
        assert!((stays as f64 / 10_000.0 - 0.9).abs() < 0.02);
    }

    /// the planner-level sanity scenario: under the gini criterion the
    /// balanced action 0 should dominate across seeds
    #[test]
    fn ggf_prefers_the_balanced_action() {
        let config = SearchConfig {
            num_simulations: 1024,
            num_start_states: 128,
            max_depth: 10,
            criterion: Criterion::Ggf,
            consider_past: false,
            use_transforms: false,
            ..SearchConfig::default()
        };
        let preferred = (0..50)
            .filter(|seed| {
                let mut planner = Planner::new(TwoState::new(), config.clone(), *seed);
                planner.select_action(&[0.0, 0.0]) == 0
            })
            .count();
        assert!(preferred >= 35, "action 0 chosen in {}/50 runs", preferred);
    }
}
