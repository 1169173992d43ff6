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
use rand::Rng;

const LOAD: Action = 4;
const UNLOAD: Action = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Wall,
    Corridor,
    Load,
    Unload(usize),
}

#[derive(Debug, Clone)]
pub struct MluState {
    pub position: Coord,
    pub loaded: bool,
}

/// multi-load-unload maze. the agent picks up items at the load point
/// and delivers them to unload points, each of which pays 100 on its
/// own reward stream. it only senses the walls around it, never which
/// special cell it stands on, so positions stay aliased until the
/// corridor shape disambiguates them.
#[derive(Debug, Clone)]
pub struct Mlu {
    maze: Grid<Cell>,
    open: Vec<Coord>,
    unload_count: usize,
}

impl Mlu {
    /// standard 8x3 corridor with four stubs: load at the east end,
    /// five unload points at the west end and the stub tips
    pub fn new() -> Self {
        let mut maze = Grid::new(8, 3, Cell::Wall);
        for x in 0..8 {
            maze.set(Coord::new(x, 1), Cell::Corridor);
        }
        maze.set(Coord::new(0, 1), Cell::Unload(0));
        maze.set(Coord::new(1, 0), Cell::Unload(1));
        maze.set(Coord::new(1, 2), Cell::Unload(2));
        maze.set(Coord::new(4, 0), Cell::Unload(3));
        maze.set(Coord::new(4, 2), Cell::Unload(4));
        maze.set(Coord::new(7, 1), Cell::Load);
        let open = (0..8)
            .flat_map(|x| (0..3).map(move |y| Coord::new(x, y)))
            .filter(|c| *maze.get(*c) != Cell::Wall)
            .collect();
        Self {
            maze,
            open,
            unload_count: 5,
        }
    }

    fn is_open(&self, coord: Coord) -> bool {
        self.maze.inside(coord) && *self.maze.get(coord) != Cell::Wall
    }

    /// what the wall sensors report: one observation per corridor
    /// shape occurring in the maze, a catch-all for anything else
    fn observe(&self, position: Coord) -> Observation {
        let mask = [NORTH, EAST, SOUTH, WEST]
            .iter()
            .enumerate()
            .filter(|(_, d)| self.is_open(position.step(**d)))
            .fold(0usize, |mask, (bit, _)| mask | 1 << bit);
        match mask {
            0b0001 => 0, // dead end opening north
            0b0010 => 1, // dead end opening east
            0b0100 => 2, // dead end opening south
            0b1000 => 3, // dead end opening west
            0b1010 => 4, // straight corridor
            0b1111 => 5, // junction
            _ => 6,
        }
    }
}

impl Default for Mlu {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Mlu {
    type State = MluState;

    fn num_actions(&self) -> usize {
        6
    }
    fn num_observations(&self) -> usize {
        7
    }
    fn num_objectives(&self) -> usize {
        self.unload_count
    }
    fn reward_range(&self) -> f64 {
        100.0
    }
    fn discount(&self) -> f64 {
        0.95
    }

    fn start_state(&self, rng: &mut SmallRng) -> MluState {
        MluState {
            position: self.open[rng.random_range(0..self.open.len())],
            loaded: false,
        }
    }

    fn step(&self, state: &mut MluState, action: Action, _: &mut SmallRng) -> Outcome {
        let mut reward = vec![0.0; self.unload_count];
        match action {
            NORTH | EAST | SOUTH | WEST => {
                let target = state.position.step(action);
                if self.is_open(target) {
                    state.position = target;
                }
            }
            LOAD => {
                if *self.maze.get(state.position) == Cell::Load && !state.loaded {
                    state.loaded = true;
                }
            }
            UNLOAD => {
                if let Cell::Unload(point) = *self.maze.get(state.position) {
                    if state.loaded {
                        state.loaded = false;
                        reward[point] = 100.0;
                    }
                }
            }
            _ => unreachable!("unknown action"),
        }
        Outcome {
            observation: self.observe(state.position),
            reward,
            terminal: false,
        }
    }

    fn legal_actions(&self, state: &MluState, _: &History, _: &Status) -> Vec<Action> {
        let mut legal: Vec<Action> = [NORTH, EAST, SOUTH, WEST]
            .into_iter()
            .filter(|d| self.is_open(state.position.step(*d)))
            .collect();
        if *self.maze.get(state.position) == Cell::Load && !state.loaded {
            legal.push(LOAD);
        }
        if matches!(*self.maze.get(state.position), Cell::Unload(_)) && state.loaded {
            legal.push(UNLOAD);
        }
        legal
    }

    /// the load flag is unobservable, so flipping it is the natural
    /// local perturbation; the wall reading then decides consistency
    fn local_move(
        &self,
        state: &mut MluState,
        history: &History,
        _step_observation: Observation,
        _: &mut SmallRng,
    ) -> bool {
        state.loaded = !state.loaded;
        let back = history.back().expect("transforms follow a real step");
        self.observe(state.position) == back.observation
    }

    fn display_state(&self, state: &MluState) -> String {
        format!(
            "at {} {}",
            state.position,
            if state.loaded { "loaded" } else { "empty" }
        )
    }

    fn display_action(&self, action: Action) -> String {
        match action {
            LOAD => "load".to_string(),
            UNLOAD => "unload".to_string(),
            _ => COMPASS[action].to_string(),
        }
    }
}
