use super::grid::Coord;
use super::grid::Grid;
use super::grid::COMPASS;
use super::grid::EAST;
use super::grid::NORTH;
use super::grid::SOUTH;
use super::grid::WEST;
use crate::env::Environment;
use crate::env::Outcome;
use crate::env::Status;
use crate::search::History;
use crate::Action;
use crate::Observation;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;

const SAMPLE: Action = 4;

const OBS_NONE: Observation = 0;
const OBS_FIRST: Observation = 1;
const OBS_SECOND: Observation = 2;

/// per-rock belief bookkeeping carried in the state. the planner never
/// reads it; the smart rollout policy does.
#[derive(Debug, Clone)]
pub struct RockEntry {
    /// kind 0 pays [1, 9] on collection, kind 1 pays [9, 1]
    pub kind: usize,
    pub collected: bool,
    pub count: i32,
    pub measured: i32,
    pub likelihood_first: f64,
    pub likelihood_second: f64,
    pub prob_first: f64,
}

#[derive(Debug, Clone)]
pub struct RockState {
    pub position: Coord,
    pub rocks: Vec<RockEntry>,
}

/// grid-science POMDP with two reward streams, one per rock kind. the
/// agent moves on a square grid, noisily checks rocks from a distance
/// and collects them in place; leaving over the east edge ends the
/// episode. kinds are hidden, which is the whole point.
#[derive(Debug, Clone)]
pub struct RockSample {
    grid: Grid<i32>,
    rock_positions: Vec<Coord>,
    size: i32,
    num_rocks: usize,
    start: Coord,
    half_efficiency_distance: f64,
}

impl RockSample {
    pub fn new(size: usize, rocks: usize) -> Self {
        let positions = match (size, rocks) {
            (3, 3) => vec![Coord::new(1, 0), Coord::new(1, 2), Coord::new(2, 1)],
            (7, 8) => vec![
                Coord::new(2, 0),
                Coord::new(0, 1),
                Coord::new(3, 1),
                Coord::new(6, 3),
                Coord::new(2, 4),
                Coord::new(3, 4),
                Coord::new(5, 5),
                Coord::new(1, 6),
            ],
            (11, 11) => vec![
                Coord::new(0, 3),
                Coord::new(0, 7),
                Coord::new(1, 8),
                Coord::new(2, 4),
                Coord::new(3, 3),
                Coord::new(3, 8),
                Coord::new(4, 3),
                Coord::new(5, 8),
                Coord::new(6, 1),
                Coord::new(9, 3),
                Coord::new(9, 9),
            ],
            _ => Self::scatter(size, rocks),
        };
        let size = size as i32;
        let mut grid = Grid::new(size, size, -1);
        for (index, position) in positions.iter().enumerate() {
            grid.set(*position, index as i32);
        }
        Self {
            grid,
            start: Coord::new(0, size / 2),
            rock_positions: positions,
            size,
            num_rocks: rocks,
            half_efficiency_distance: 20.0,
        }
    }

    /// seeded layout for sizes without a canonical map
    fn scatter(size: usize, rocks: usize) -> Vec<Coord> {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut positions: Vec<Coord> = vec![];
        while positions.len() < rocks {
            let candidate = Coord::new(
                rng.random_range(0..size as i32),
                rng.random_range(0..size as i32),
            );
            if !positions.contains(&candidate) {
                positions.push(candidate);
            }
        }
        positions
    }

    fn rock_at(&self, position: Coord) -> Option<usize> {
        match *self.grid.get(position) {
            index if index >= 0 => Some(index as usize),
            _ => None,
        }
    }

    /// noisy sensor reading of one rock: accuracy decays with distance
    /// toward a coin flip
    fn check(&self, state: &RockState, rock: usize, rng: &mut SmallRng) -> Observation {
        let distance = state.position.euclidean(self.rock_positions[rock]);
        let efficiency = (1.0 + 2f64.powf(-distance / self.half_efficiency_distance)) * 0.5;
        let truthful = rng.random_bool(efficiency);
        match (state.rocks[rock].kind == 0) == truthful {
            true => OBS_FIRST,
            false => OBS_SECOND,
        }
    }

    /// net sensor evidence for one rock over the whole history
    fn evidence(&self, history: &History, rock: usize) -> i32 {
        history
            .iter()
            .filter(|step| step.action == rock + 1 + SAMPLE)
            .map(|step| match step.observation {
                OBS_FIRST => 1,
                OBS_SECOND => -1,
                _ => 0,
            })
            .sum()
    }
}

impl Environment for RockSample {
    type State = RockState;

    fn num_actions(&self) -> usize {
        self.num_rocks + 5
    }
    fn num_observations(&self) -> usize {
        3
    }
    fn num_objectives(&self) -> usize {
        2
    }
    fn reward_range(&self) -> f64 {
        10.0
    }

    fn start_state(&self, rng: &mut SmallRng) -> RockState {
        let mut rocks: Vec<RockEntry> = (0..self.num_rocks)
            .map(|_| RockEntry {
                kind: 0,
                collected: false,
                count: 0,
                measured: 0,
                likelihood_first: 1.0,
                likelihood_second: 1.0,
                prob_first: 0.5,
            })
            .collect();
        let mut indices: Vec<usize> = (0..self.num_rocks).collect();
        indices.shuffle(rng);
        for &index in indices.iter().take(self.num_rocks / 2) {
            rocks[index].kind = 1;
        }
        RockState {
            position: self.start,
            rocks,
        }
    }

    fn step(&self, state: &mut RockState, action: Action, rng: &mut SmallRng) -> Outcome {
        let mut reward = vec![0.0, 0.0];
        let mut observation = OBS_NONE;

        if action < SAMPLE {
            let target = state.position.step(action);
            match action {
                EAST if target.x >= self.size => {
                    // stepping off the east edge ends the episode
                    return Outcome {
                        observation,
                        reward,
                        terminal: true,
                    };
                }
                NORTH | EAST | SOUTH | WEST if self.grid.inside(target) => {
                    state.position = target;
                }
                _ => reward = vec![-100.0, -100.0],
            }
        }

        if action == SAMPLE {
            match self.rock_at(state.position) {
                Some(rock) if !state.rocks[rock].collected => {
                    state.rocks[rock].collected = true;
                    reward = match state.rocks[rock].kind {
                        0 => vec![1.0, 9.0],
                        _ => vec![9.0, 1.0],
                    };
                }
                _ => reward = vec![-100.0, -100.0],
            }
        }

        if action > SAMPLE {
            let rock = action - SAMPLE - 1;
            assert!(rock < self.num_rocks);
            observation = self.check(state, rock, rng);
            let entry = &mut state.rocks[rock];
            entry.measured += 1;
            let distance = state.position.euclidean(self.rock_positions[rock]);
            let efficiency = (1.0 + 2f64.powf(-distance / self.half_efficiency_distance)) * 0.5;
            if observation == OBS_FIRST {
                entry.count += 1;
                entry.likelihood_first *= efficiency;
                entry.likelihood_second *= 1.0 - efficiency;
            } else {
                entry.count -= 1;
                entry.likelihood_second *= efficiency;
                entry.likelihood_first *= 1.0 - efficiency;
            }
            let denominator =
                0.5 * entry.likelihood_first + 0.5 * entry.likelihood_second;
            entry.prob_first = 0.5 * entry.likelihood_first / denominator;
        }

        Outcome {
            observation,
            reward,
            terminal: false,
        }
    }

    fn legal_actions(&self, state: &RockState, _: &History, _: &Status) -> Vec<Action> {
        let mut legal = vec![];
        if state.position.y + 1 < self.size {
            legal.push(NORTH);
        }
        legal.push(EAST);
        if state.position.y > 0 {
            legal.push(SOUTH);
        }
        if state.position.x > 0 {
            legal.push(WEST);
        }
        if let Some(rock) = self.rock_at(state.position) {
            if !state.rocks[rock].collected {
                legal.push(SAMPLE);
            }
        }
        for rock in 0..self.num_rocks {
            if !state.rocks[rock].collected {
                legal.push(rock + 1 + SAMPLE);
            }
        }
        legal
    }

    /// sample when the evidence favors the rock under our feet, stop
    /// measuring rocks that are settled, never walk away from every
    /// interesting rock
    fn preferred_actions(&self, state: &RockState, history: &History) -> Vec<Action> {
        if let Some(rock) = self.rock_at(state.position) {
            if !state.rocks[rock].collected && self.evidence(history, rock) > 0 {
                return vec![SAMPLE];
            }
        }

        let mut all_bad = true;
        let mut interesting = [false; 4];
        for rock in 0..self.num_rocks {
            if !state.rocks[rock].collected && self.evidence(history, rock) >= 0 {
                all_bad = false;
                let position = self.rock_positions[rock];
                interesting[NORTH] |= position.y > state.position.y;
                interesting[EAST] |= position.x > state.position.x;
                interesting[SOUTH] |= position.y < state.position.y;
                interesting[WEST] |= position.x < state.position.x;
            }
        }
        if all_bad {
            return vec![EAST];
        }

        let mut actions = vec![];
        if state.position.y + 1 < self.size && interesting[NORTH] {
            actions.push(NORTH);
        }
        if interesting[EAST] {
            actions.push(EAST);
        }
        if state.position.y > 0 && interesting[SOUTH] {
            actions.push(SOUTH);
        }
        if state.position.x > 0 && interesting[WEST] {
            actions.push(WEST);
        }
        for rock in 0..self.num_rocks {
            let entry = &state.rocks[rock];
            if !entry.collected
                && entry.prob_first != 0.0
                && entry.prob_first != 1.0
                && entry.measured < 5
                && entry.count.abs() < 2
            {
                actions.push(rock + 1 + SAMPLE);
            }
        }
        actions
    }

    /// flip the kind of a random rock, then make sure a just-checked
    /// rock still reads the way the agent actually observed it
    fn local_move(
        &self,
        state: &mut RockState,
        history: &History,
        step_observation: Observation,
        rng: &mut SmallRng,
    ) -> bool {
        let rock = rng.random_range(0..self.num_rocks);
        state.rocks[rock].kind = 1 - state.rocks[rock].kind;

        let back = *history.back().expect("transforms follow a real step");
        if back.action > SAMPLE {
            let rock = back.action - SAMPLE - 1;
            let real = back.observation;
            if self.check(state, rock, rng) != real {
                return false;
            }
            // re-anchor the evidence counter on the real observation
            if real == OBS_FIRST && step_observation == OBS_SECOND {
                state.rocks[rock].count += 2;
            }
            if real == OBS_SECOND && step_observation == OBS_FIRST {
                state.rocks[rock].count -= 2;
            }
        }
        true
    }

    fn display_state(&self, state: &RockState) -> String {
        let mut out = String::new();
        for y in (0..self.size).rev() {
            for x in 0..self.size {
                let position = Coord::new(x, y);
                out.push(match self.rock_at(position) {
                    _ if state.position == position => '*',
                    Some(rock) if !state.rocks[rock].collected => {
                        if state.rocks[rock].kind == 0 {
                            'x'
                        } else {
                            '$'
                        }
                    }
                    _ => '.',
                });
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }

    fn display_action(&self, action: Action) -> String {
        match action {
            _ if action < SAMPLE => COMPASS[action].to_string(),
            SAMPLE => "sample".to_string(),
            _ => format!("check rock {}", action - SAMPLE - 1),
        }
    }

    fn display_observation(&self, observation: Observation) -> String {
        match observation {
            OBS_FIRST => "observed first kind".to_string(),
            OBS_SECOND => "observed second kind".to_string(),
            _ => "observed nothing".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn canonical_layout() {
        let env = RockSample::new(7, 8);
        assert_eq!(env.num_actions(), 13);
        assert_eq!(env.num_observations(), 3);
        assert_eq!(env.num_objectives(), 2);
        let state = env.start_state(&mut rng());
        assert_eq!(state.position, Coord::new(0, 3));
        assert_eq!(state.rocks.len(), 8);
        assert_eq!(state.rocks.iter().filter(|r| r.kind == 1).count(), 4);
    }

    #[test]
    fn east_edge_terminates() {
        let env = RockSample::new(3, 3);
        let mut state = env.start_state(&mut rng());
        state.position = Coord::new(2, 1);
        let outcome = env.step(&mut state, EAST, &mut rng());
        assert!(outcome.terminal);
        assert_eq!(outcome.reward, vec![0.0, 0.0]);
    }

    #[test]
    fn collection_pays_by_kind() {
        let env = RockSample::new(3, 3);
        let mut state = env.start_state(&mut rng());
        state.position = Coord::new(1, 0);
        let rock = env.rock_at(state.position).unwrap();
        state.rocks[rock].kind = 0;
        let outcome = env.step(&mut state, SAMPLE, &mut rng());
        assert_eq!(outcome.reward, vec![1.0, 9.0]);
        assert!(state.rocks[rock].collected);
        // sampling again is an error the reward signals loudly
        let outcome = env.step(&mut state, SAMPLE, &mut rng());
        assert_eq!(outcome.reward, vec![-100.0, -100.0]);
    }

    #[test]
    fn checks_observe_and_update_evidence() {
        let env = RockSample::new(3, 3);
        let mut state = env.start_state(&mut rng());
        let outcome = env.step(&mut state, SAMPLE + 1, &mut rng());
        assert!(outcome.observation == OBS_FIRST || outcome.observation == OBS_SECOND);
        assert_eq!(state.rocks[0].measured, 1);
        assert_ne!(state.rocks[0].prob_first, 0.5);
    }

    #[test]
    fn legal_actions_track_the_map() {
        let env = RockSample::new(3, 3);
        let mut state = env.start_state(&mut rng());
        // start is (0, 1): west is off the map
        let legal = env.legal_actions(&state, &History::new(), &Status::default());
        assert!(!legal.contains(&WEST));
        assert!(legal.contains(&EAST));
        assert!(!legal.contains(&SAMPLE));
        // standing on an uncollected rock allows sampling
        state.position = Coord::new(1, 0);
        let legal = env.legal_actions(&state, &History::new(), &Status::default());
        assert!(legal.contains(&SAMPLE));
    }

    #[test]
    fn local_moves_respect_observed_checks() {
        let env = RockSample::new(3, 3);
        let mut history = History::new();
        history.add(SAMPLE + 1, OBS_FIRST);
        let mut accepted = 0;
        for seed in 0..64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut state = env.start_state(&mut rng);
            if env.local_move(&mut state, &history, OBS_FIRST, &mut rng) {
                accepted += 1;
            }
        }
        // half-efficiency sensors accept roughly half the flips
        assert!(accepted > 0);
        assert!(accepted < 64);
    }

    #[test]
    fn smart_policy_samples_on_good_evidence() {
        let env = RockSample::new(3, 3);
        let mut rng = rng();
        let mut state = env.start_state(&mut rng);
        state.position = Coord::new(1, 0);
        let mut history = History::new();
        history.add(SAMPLE + 1, OBS_FIRST);
        assert_eq!(env.preferred_actions(&state, &history), vec![SAMPLE]);
    }
}
