use super::results::bracketed;
use super::results::Results;
use crate::env::Environment;
use crate::search::Planner;
use crate::search::SearchConfig;
use crate::welfare::cv;
use crate::welfare::g3f;
use crate::welfare::ggf;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::Write;
use std::time::Instant;

/// episode-level knobs. the search budget fields of the planner config
/// are overwritten on every doubling step of the sweep.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub runs: usize,
    pub num_steps: usize,
    /// wall-clock budget in seconds, checked between steps and runs
    pub timeout: f64,
    pub min_doubles: u32,
    pub max_doubles: u32,
    /// transforms per update as a power of two relative to simulations
    pub transform_doubles: i32,
    /// attempts granted per requested transform
    pub transform_attempts: usize,
    pub accuracy: f64,
    pub undiscounted_horizon: usize,
    /// overrides the horizon-derived search depth when set
    pub max_depth: Option<usize>,
    /// set the UCB constant to the environment's reward range
    pub auto_exploration: bool,
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            runs: 1,
            num_steps: 100_000,
            timeout: 12.0 * 3600.0,
            min_doubles: 1,
            max_doubles: 16,
            transform_doubles: -4,
            transform_attempts: 1000,
            accuracy: 0.01,
            undiscounted_horizon: 1000,
            max_depth: None,
            auto_exploration: true,
            seed: 1,
        }
    }
}

/// runs episodes of the real environment against a planner that only
/// ever sees the simulator, sweeping the simulation budget in powers
/// of two and reporting one TSV line per budget.
pub struct Experiment<E: Environment + Clone> {
    real: E,
    simulator: E,
    config: ExperimentConfig,
    search: SearchConfig,
    results: Results,
}

impl<E: Environment + Clone> Experiment<E> {
    pub fn new(real: E, simulator: E, config: ExperimentConfig, search: SearchConfig) -> Self {
        assert!(
            real.num_objectives() == simulator.num_objectives()
                && real.num_actions() == simulator.num_actions()
                && real.num_observations() == simulator.num_observations(),
            "real and simulated models must agree on their spaces"
        );
        let mut search = search;
        if config.auto_exploration {
            search.exploration_constant = match search.use_rave {
                true => 0.0,
                false => simulator.reward_range(),
            };
        }
        let results = Results::new(real.num_objectives());
        Self {
            real,
            simulator,
            config,
            search,
            results,
        }
    }

    /// one episode. the planner plans on the simulator; actions are
    /// executed in the real environment and fed back through update.
    pub fn run(&mut self, seed: u64) {
        let clock = Instant::now();
        let objectives = self.real.num_objectives();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut planner = Planner::new(
            self.simulator.clone(),
            self.search.clone(),
            seed.wrapping_mul(0x9e37_79b9_7f4a_7c15).wrapping_add(1),
        );

        let mut undiscounted = vec![0.0; objectives];
        let mut discounted = vec![0.0; objectives];
        let mut cumulative = vec![0.0; objectives];
        let mut discount = 1.0;
        let mut out_of_particles = false;
        let mut steps = 0;
        let mut state = self.real.start_state(&mut rng);
        log::debug!("episode start {}", self.real.display_state(&state));

        while steps < self.config.num_steps {
            let action = planner.select_action(&cumulative);
            let outcome = self.real.step(&mut state, action, &mut rng);
            steps += 1;

            self.results.reward.add(&outcome.reward);
            for i in 0..objectives {
                undiscounted[i] += outcome.reward[i];
                discounted[i] += outcome.reward[i] * discount;
                cumulative[i] += outcome.reward[i];
            }
            discount *= self.real.discount();
            log::debug!(
                "{} -> {} {:?}",
                self.real.display_action(action),
                self.real.display_observation(outcome.observation),
                outcome.reward
            );

            if outcome.terminal {
                log::info!("terminated after {} steps", steps);
                break;
            }
            out_of_particles = !planner.update(action, outcome.observation, &outcome.reward);
            if out_of_particles {
                break;
            }
            if clock.elapsed().as_secs_f64() > self.config.timeout {
                log::warn!("episode timed out after {} steps", steps);
                break;
            }
        }

        if out_of_particles {
            // the tree is useless without particles; finish the
            // episode on the rollout policy against the real state
            log::info!("out of particles, finishing with the rollout policy");
            let mut history = planner.history().clone();
            while steps < self.config.num_steps {
                let action =
                    self.simulator
                        .random_action(&state, &history, planner.status(), &mut rng);
                let outcome = self.real.step(&mut state, action, &mut rng);
                steps += 1;
                self.results.reward.add(&outcome.reward);
                for i in 0..objectives {
                    undiscounted[i] += outcome.reward[i];
                    discounted[i] += outcome.reward[i] * discount;
                }
                discount *= self.real.discount();
                if outcome.terminal {
                    log::info!("terminated after {} steps", steps);
                    break;
                }
                history.add(action, outcome.observation);
            }
        }

        let welfare = match &self.search.importance_weight {
            Some(p) => g3f(&undiscounted, p),
            None => ggf(&undiscounted),
        };
        self.results.time.add(clock.elapsed().as_secs_f64());
        self.results.timestep.add(steps as f64);
        self.results.welfare.add(welfare);
        self.results.undiscounted_cv.add(cv(&undiscounted));
        self.results.discounted_cv.add(cv(&discounted));
        self.results.undiscounted_return.add(&undiscounted);
        self.results.discounted_return.add(&discounted);
        log::info!(
            "undiscounted {} discounted {} welfare {} in {} steps",
            bracketed(&undiscounted),
            bracketed(&discounted),
            welfare,
            steps
        );
    }

    pub fn multi_run(&mut self, seed: u64) {
        for n in 0..self.config.runs {
            log::info!(
                "starting run {} with {} simulations",
                n + 1,
                self.search.num_simulations
            );
            self.run(seed.wrapping_add(n as u64));
            if self.results.time.total() > self.config.timeout {
                log::warn!("timed out after {} runs", n + 1);
                break;
            }
        }
    }

    /// double the simulation budget from 2^min to 2^max, writing one
    /// tab-separated report line per budget
    pub fn sweep(&mut self, output: &std::path::Path) -> Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(output)?);
        writeln!(
            file,
            "Simulations\tRuns\tUndiscounted return\tUndiscounted error\t\
             Discounted return\tDiscounted error\tTime\tUndiscounted CV\t\
             Undiscounted CV error\tDiscounted CV\tDiscounted CV error\t\
             Timesteps\tTimesteps error\tWelfare score\tWelfare score error"
        )?;

        let horizon = self
            .simulator
            .horizon(self.config.accuracy, self.config.undiscounted_horizon);
        self.search.max_depth = self.config.max_depth.unwrap_or(horizon);
        self.config.num_steps = self
            .real
            .horizon(self.config.accuracy, self.config.undiscounted_horizon);

        for doubles in self.config.min_doubles..=self.config.max_doubles {
            self.search.num_simulations = 1 << doubles;
            self.search.num_start_states = 1 << doubles;
            let shifted = doubles as i32 + self.config.transform_doubles;
            self.search.num_transforms = match shifted >= 0 {
                true => 1 << shifted,
                false => 1,
            };
            self.search.max_attempts =
                self.search.num_transforms * self.config.transform_attempts;

            self.results.clear();
            self.multi_run(self.config.seed.wrapping_add((doubles as u64) << 32));

            writeln!(
                file,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                self.search.num_simulations,
                self.results.time.count(),
                bracketed(self.results.undiscounted_return.mean()),
                bracketed(&self.results.undiscounted_return.std_err()),
                bracketed(self.results.discounted_return.mean()),
                bracketed(&self.results.discounted_return.std_err()),
                self.results.time.mean(),
                self.results.undiscounted_cv.mean(),
                self.results.undiscounted_cv.std_err(),
                self.results.discounted_cv.mean(),
                self.results.discounted_cv.std_err(),
                self.results.timestep.mean(),
                self.results.timestep.std_err(),
                self.results.welfare.mean(),
                self.results.welfare.std_err(),
            )?;
            file.flush()?;
        }
        Ok(())
    }

    pub fn results(&self) -> &Results {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::TwoState;

    #[test]
    fn sweep_writes_one_line_per_budget() {
        let config = ExperimentConfig {
            runs: 1,
            min_doubles: 1,
            max_doubles: 2,
            undiscounted_horizon: 20,
            accuracy: 0.2,
            seed: 5,
            ..ExperimentConfig::default()
        };
        let search = SearchConfig::default();
        let env = TwoState::new();
        let mut experiment = Experiment::new(env.clone(), env, config, search);
        let path = std::env::temp_dir().join("fairpomcp-sweep-test.tsv");
        experiment.sweep(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Simulations\tRuns"));
        assert!(lines[1].starts_with("2\t1\t["));
        assert!(lines[2].starts_with("4\t1\t["));
        assert_eq!(experiment.results().timestep.count(), 1);
    }

    #[test]
    fn auto_exploration_uses_the_reward_range() {
        let env = TwoState::new();
        let experiment = Experiment::new(
            env.clone(),
            env,
            ExperimentConfig::default(),
            SearchConfig::default(),
        );
        assert_eq!(experiment.search.exploration_constant, 8.0);
    }

    #[test]
    fn episodes_accumulate_results() {
        let env = TwoState::new();
        let mut experiment = Experiment::new(
            env.clone(),
            env,
            ExperimentConfig {
                num_steps: 10,
                ..ExperimentConfig::default()
            },
            SearchConfig {
                num_simulations: 32,
                num_start_states: 16,
                max_depth: 5,
                ..SearchConfig::default()
            },
        );
        experiment.run(3);
        assert_eq!(experiment.results().timestep.count(), 1);
        assert!(experiment.results().timestep.mean() > 0.0);
        // rewards in this domain are strictly positive
        assert!(experiment.results().undiscounted_return.mean()[0] > 0.0);
    }
}
