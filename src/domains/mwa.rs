use super::sample_index;
use crate::env::Environment;
use crate::env::Outcome;
use crate::env::Status;
use crate::search::History;
use crate::Action;
use crate::Observation;
use rand::rngs::SmallRng;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct MwaState {
    pub index: usize,
}

/// multi-product web advertising MDP. one visitor state and one buy
/// state per product plus a leave state; one action per product plus a
/// generic ad. showing the matching ad keeps the visitor around and
/// sometimes converts, which pays 5 on that product's reward stream.
/// buy and leave states are fully observed, visitor states blur into
/// their neighbors exponentially.
#[derive(Debug, Clone)]
pub struct Mwa {
    products: usize,
    states: usize,
    transition: Vec<Vec<Vec<f64>>>,
    observation: Vec<Vec<f64>>,
    reward: Vec<Vec<Vec<Vec<f64>>>>,
}

impl Mwa {
    pub fn new(products: usize) -> Self {
        assert!(products >= 1);
        let states = 2 * products + 1;
        let actions = products + 1;
        let leave = states - 1;

        let mut transition = vec![vec![vec![0.0; states]; actions]; states];
        for s in 0..products {
            for a in 0..actions {
                if a == s {
                    transition[s][a][s] = 0.8;
                    transition[s][a][s + products] = 0.05;
                    transition[s][a][leave] = 0.15;
                } else if a == actions - 1 {
                    transition[s][a][s] = 2.0 / 3.0;
                    transition[s][a][leave] = 1.0 / 3.0;
                } else {
                    transition[s][a][s] = 0.5;
                    transition[s][a][leave] = 0.5;
                }
            }
        }
        for s in products..leave {
            for a in 0..actions {
                for next in 0..products {
                    transition[s][a][next] = 1.0 / products as f64;
                }
            }
        }
        for a in 0..actions {
            for next in 0..products {
                transition[leave][a][next] = 1.0 / products as f64;
            }
        }

        let mut observation = vec![vec![0.0; states]; states];
        for s in 0..products {
            let mut mass = 0.0;
            for o in 0..products {
                observation[s][o] = (-((s as f64) - (o as f64)).abs()).exp();
                mass += observation[s][o];
            }
            for o in 0..products {
                observation[s][o] /= mass;
            }
        }
        for s in products..leave {
            observation[s][s] = 1.0;
        }
        observation[leave][leave] = 1.0;

        let mut reward = vec![vec![vec![vec![0.0; products]; states]; actions]; states];
        for product in 0..products {
            for s in 0..products {
                for a in 0..actions - 1 {
                    if transition[s][a][product + products] > 0.0 {
                        reward[s][a][product + products][product] = 5.0;
                    }
                }
            }
        }

        Self {
            products,
            states,
            transition,
            observation,
            reward,
        }
    }

    fn observe(&self, state: &MwaState, rng: &mut SmallRng) -> Observation {
        sample_index(&self.observation[state.index], rng)
    }
}

impl Environment for Mwa {
    type State = MwaState;

    fn num_actions(&self) -> usize {
        self.products + 1
    }
    fn num_observations(&self) -> usize {
        self.states
    }
    fn num_objectives(&self) -> usize {
        self.products
    }
    fn reward_range(&self) -> f64 {
        5.0
    }
    fn discount(&self) -> f64 {
        0.95
    }

    fn start_state(&self, rng: &mut SmallRng) -> MwaState {
        MwaState {
            index: rng.random_range(0..self.states),
        }
    }

    fn step(&self, state: &mut MwaState, action: Action, rng: &mut SmallRng) -> Outcome {
        let next = sample_index(&self.transition[state.index][action], rng);
        let reward = self.reward[state.index][action][next].clone();
        state.index = next;
        Outcome {
            observation: self.observe(state, rng),
            reward,
            terminal: false,
        }
    }

    fn legal_actions(&self, _: &MwaState, _: &History, _: &Status) -> Vec<Action> {
        (0..self.num_actions()).collect()
    }

    fn local_move(
        &self,
        state: &mut MwaState,
        history: &History,
        _step_observation: Observation,
        rng: &mut SmallRng,
    ) -> bool {
        state.index = rng.random_range(0..self.states);
        let back = history.back().expect("transforms follow a real step");
        self.observe(state, rng) == back.observation
    }

    fn display_state(&self, state: &MwaState) -> String {
        match state.index {
            s if s < self.products => format!("visiting product {}", s),
            s if s < self.states - 1 => format!("buying product {}", s - self.products),
            _ => "left the site".to_string(),
        }
    }

    fn display_action(&self, action: Action) -> String {
        match action {
            a if a < self.products => format!("advertise product {}", a),
            _ => "advertise generically".to_string(),
        }
    }
}
