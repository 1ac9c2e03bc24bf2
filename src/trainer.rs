use rand::Rng;
use tracing::{debug, info};

use crate::agent::QTable;
use crate::config::{AgentConfig, AppConfig, GridConfig};
use crate::game::{Game, StepOutcome};
use crate::state::encode;

/// Exploration rate that shrinks by a fixed factor at the start of every period.
/// The decay compounds for the lifetime of the schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct EpsilonSchedule {
    value: f32,
    decay: f32,
    interval: usize,
}

impl EpsilonSchedule {
    pub fn new(start: f32, decay: f32, interval: usize) -> Self {
        Self { value: start, decay, interval: interval.max(1) }
    }

    /// Never changes.
    pub fn fixed(value: f32) -> Self {
        Self::new(value, 1.0, 1)
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Epsilon for episode `index` (zero-based). Decays first when `index` opens a period,
    /// so episode 0 already runs at `start * decay`.
    pub fn begin_episode(&mut self, index: usize) -> f32 {
        if index % self.interval == 0 && self.decay != 1.0 {
            self.value *= self.decay;
            info!(episode = index, epsilon = self.value, "epsilon decayed");
        }
        self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpisodeSummary {
    /// Apples eaten.
    pub score: usize,
    pub steps: usize,
    pub length: usize,
    /// Stopped by the step limit rather than by dying.
    pub truncated: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStats {
    pub episodes: usize,
    pub best_score: usize,
    pub total_score: usize,
    pub epsilon: f32,
}

impl RunStats {
    pub fn record(&mut self, summary: &EpisodeSummary) {
        self.episodes += 1;
        self.total_score += summary.score;
        self.best_score = self.best_score.max(summary.score);
    }

    pub fn average(&self) -> f32 {
        if self.episodes == 0 {
            0.0
        } else {
            self.total_score as f32 / self.episodes as f32
        }
    }
}

/// One agent step: encode, choose, move, encode again, learn.
pub fn transition<R: Rng + ?Sized>(
    game: &mut Game,
    table: &mut QTable,
    params: &AgentConfig,
    epsilon: f32,
    rng: &mut R,
) -> StepOutcome {
    let s = encode(game);
    let a = table.choose_action(s, game.dir, epsilon, rng);
    let outcome = game.step(a, rng);
    let ns = encode(game);
    table.update(s, a, outcome.reward, ns, params);
    outcome
}

/// Runs episodes back to back against one in-memory table.
pub struct Trainer {
    grid: GridConfig,
    agent: AgentConfig,
    report_interval: usize,
    step_limit: Option<usize>,
    schedule: EpsilonSchedule,
    table: QTable,
    stats: RunStats,
}

impl Trainer {
    /// Training run: epsilon follows the configured decay schedule.
    pub fn new(config: &AppConfig, table: QTable) -> Self {
        let t = &config.training;
        let schedule = EpsilonSchedule::new(t.epsilon_start, t.epsilon_decay, t.decay_interval);
        Self::with_schedule(config, table, schedule)
    }

    /// Pure exploitation. The table is still updated in memory.
    pub fn for_play(config: &AppConfig, table: QTable) -> Self {
        Self::with_schedule(config, table, EpsilonSchedule::fixed(0.0))
    }

    pub fn with_schedule(config: &AppConfig, table: QTable, schedule: EpsilonSchedule) -> Self {
        Self {
            grid: config.grid.clone(),
            agent: config.agent.clone(),
            report_interval: config.training.report_interval.max(1),
            step_limit: config.training.step_limit,
            stats: RunStats { epsilon: schedule.value(), ..RunStats::default() },
            schedule,
            table,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Plays `episodes` more episodes. Episode numbering, epsilon decay and the
    /// running statistics carry over between calls.
    pub fn run<R: Rng + ?Sized>(&mut self, episodes: usize, rng: &mut R) -> RunStats {
        for _ in 0..episodes {
            let index = self.stats.episodes;
            let epsilon = self.schedule.begin_episode(index);
            let summary = self.run_episode(epsilon, rng);
            self.stats.record(&summary);
            self.stats.epsilon = epsilon;
            debug!(episode = index, score = summary.score, steps = summary.steps, "episode finished");

            if report_due(index, self.report_interval) {
                info!(
                    episode = index,
                    best = self.stats.best_score,
                    average = format_args!("{:.2}", self.stats.average()),
                    epsilon,
                    states = self.table.len(),
                    "training progress"
                );
            }
        }
        self.stats.clone()
    }

    /// Fresh game, then agent steps until a terminal transition. The terminal
    /// step is learned from like any other; nothing runs after it.
    pub fn run_episode<R: Rng + ?Sized>(&mut self, epsilon: f32, rng: &mut R) -> EpisodeSummary {
        let mut game = Game::new(&self.grid, rng);
        let mut steps = 0;
        let mut truncated = false;
        loop {
            let outcome = transition(&mut game, &mut self.table, &self.agent, epsilon, rng);
            steps += 1;
            if outcome.terminal {
                break;
            }
            if self.step_limit.is_some_and(|limit| steps >= limit) {
                truncated = true;
                break;
            }
        }
        EpisodeSummary { score: game.score, steps, length: game.size, truncated }
    }
}

/// Progress is logged every `interval` episodes, never for episode 0.
fn report_due(index: usize, interval: usize) -> bool {
    index > 0 && index % interval == 0
}
