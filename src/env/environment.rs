use super::status::Level;
use super::status::Status;
use crate::search::history::History;
use crate::search::node::QNode;
use crate::search::node::VNode;
use crate::Action;
use crate::Observation;
use crate::Reward;
use crate::Utility;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

/// the result of one environment transition. the reward vector is
/// filled to num_objectives even on terminal steps.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub observation: Observation,
    pub reward: Reward,
    pub terminal: bool,
}

/// the capability set the planner consumes from any model. states are
/// opaque to the planner; it only clones them, steps them, and asks
/// the model questions about them. all randomness flows through the
/// caller's rng so a fixed seed reproduces a run.
pub trait Environment {
    type State: Clone;

    fn num_actions(&self) -> usize;
    fn num_observations(&self) -> usize;
    fn num_objectives(&self) -> usize;
    fn reward_range(&self) -> f64;
    fn discount(&self) -> f64 {
        1.0
    }

    /// sample a start state from the initial belief
    fn start_state(&self, rng: &mut SmallRng) -> Self::State;

    /// advance the state in place by one action
    fn step(&self, state: &mut Self::State, action: Action, rng: &mut SmallRng) -> Outcome;

    /// actions applicable in this state. must be non-empty whenever
    /// the state is not terminal.
    fn legal_actions(&self, state: &Self::State, history: &History, status: &Status)
        -> Vec<Action>;

    /// domain-preferred actions for smart priors and rollouts.
    /// empty means the domain has no opinion.
    fn preferred_actions(&self, _state: &Self::State, _history: &History) -> Vec<Action> {
        vec![]
    }

    /// perturb a sampled state locally and report whether the result
    /// is still consistent with the observation at the back of the
    /// history. the return value is ground truth; the planner does not
    /// second-guess it. used to replenish depleted particle sets.
    fn local_move(
        &self,
        _state: &mut Self::State,
        _history: &History,
        _step_observation: Observation,
        _rng: &mut SmallRng,
    ) -> bool {
        false
    }

    /// rollout policy. defaults to uniform over legal actions, or over
    /// preferred actions at the smart knowledge level.
    fn random_action(
        &self,
        state: &Self::State,
        history: &History,
        status: &Status,
        rng: &mut SmallRng,
    ) -> Action {
        if status.knowledge.rollout >= Level::Smart {
            let preferred = self.preferred_actions(state, history);
            if let Some(action) = preferred.choose(rng) {
                return *action;
            }
        }
        let legal = self.legal_actions(state, history, status);
        *legal
            .choose(rng)
            .expect("non-terminal states have a legal action")
    }

    /// one reward event ends the sub-trajectory of interest in the
    /// domains this planner was built for (a rock collected, a load
    /// delivered, a purchase). both the tree recursion and rollouts
    /// stop as soon as this fires.
    fn stop_on_reward(&self, reward: &[Utility]) -> bool {
        reward.iter().sum::<Utility>() > 0.0
    }

    /// number of steps after which the remaining discounted reward is
    /// below the accuracy threshold
    fn horizon(&self, accuracy: f64, undiscounted_horizon: usize) -> usize {
        if self.discount() >= 1.0 {
            undiscounted_horizon
        } else {
            (accuracy.ln() / self.discount().ln()).ceil() as usize
        }
    }

    /// seed a freshly expanded decision node with prior counts and
    /// values. the default pins actions that are illegal after this
    /// history far below any reachable value and gives preferred
    /// actions a head start at the smart level.
    fn prior(
        &self,
        state: &Self::State,
        history: &History,
        node: &mut VNode<Self::State>,
        status: &Status,
    ) {
        let objectives = self.num_objectives();
        for action in 0..self.num_actions() {
            node.child_mut(action).value.set(0.0, 0.0, objectives);
        }
        if status.knowledge.tree >= Level::Legal {
            let legal = self.legal_actions(state, history, status);
            for action in 0..self.num_actions() {
                if !legal.contains(&action) {
                    node.child_mut(action).value.set(
                        crate::PRIOR_PIN_COUNT,
                        crate::PRIOR_PIN_VALUE,
                        objectives,
                    );
                }
            }
        }
        if status.knowledge.tree >= Level::Smart {
            for action in self.preferred_actions(state, history) {
                node.child_mut(action).value.set(
                    status.knowledge.smart_count,
                    status.knowledge.smart_value,
                    objectives,
                );
            }
        }
    }

    /// alpha-vector support for explicit-model environments. the
    /// planner calls update_alpha before stepping whenever has_alpha
    /// reports true; everything else ignores the accumulator.
    fn has_alpha(&self) -> bool {
        false
    }
    fn update_alpha(&self, _qnode: &mut QNode, _state: &Self::State) {}

    /// hooks for verbose logging
    fn display_state(&self, _state: &Self::State) -> String {
        String::new()
    }
    fn display_action(&self, action: Action) -> String {
        format!("action {}", action)
    }
    fn display_observation(&self, observation: Observation) -> String {
        format!("observation {}", observation)
    }
}
