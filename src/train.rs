use crate::adapter::{BattleEnv, StateEncoder, TinyState};
use crate::battle::{play_out, BattleEngine, Side};
use crate::config::{LearnerConfig, RunConfig};
use crate::error::{EnvError, IllegalActionError};
use crate::learner::{Algorithm, QRow, TabularAgent, Transition};
use crate::model::Roster;
use crate::policy::PolicyKind;
use anyhow::Context;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainSchedule {
    pub episodes: usize,
    pub seed: u64,
    pub log_every: usize,
    pub eval_every: usize,
    pub eval_episodes: usize,
}

impl TrainSchedule {
    pub fn new(episodes: usize, seed: u64) -> Self {
        TrainSchedule {
            episodes,
            seed,
            log_every: 0,
            eval_every: 0,
            eval_episodes: 0,
        }
    }
}

impl From<&RunConfig> for TrainSchedule {
    fn from(cfg: &RunConfig) -> Self {
        TrainSchedule {
            episodes: cfg.episodes,
            seed: cfg.seed,
            log_every: cfg.log_every,
            eval_every: cfg.eval_every,
            eval_episodes: cfg.eval_episodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub episode: usize,
    pub train_return: f64,
    pub steps: usize,
    pub epsilon: f64,
    pub q_rows: usize,
    pub eval_winrate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub returns: Vec<f64>,
    pub wins: usize,
    pub truncated: usize,
    pub evaluations: Vec<TrainingRecord>,
}

impl TrainingReport {
    pub fn episodes(&self) -> usize {
        self.returns.len()
    }

    pub fn win_rate(&self) -> f64 {
        ratio(self.wins, self.episodes())
    }

    pub fn recent_mean_return(&self, window: usize) -> f64 {
        let start = self.returns.len().saturating_sub(window);
        mean(&self.returns[start..])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalReport {
    pub episodes: usize,
    pub wins: usize,
    pub losses: usize,
    pub truncated: usize,
    pub mean_return: f64,
}

impl EvalReport {
    pub fn win_rate(&self) -> f64 {
        ratio(self.wins, self.episodes)
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn won(env: &BattleEnv) -> bool {
    env.engine().and_then(BattleEngine::winner) == Some(Side::A)
}

/// The first reset is seeded with `schedule.seed`, later ones continue the
/// environment's seed stream. In-training evaluations run on forks and leave
/// that stream untouched.
pub fn train(
    env: &mut BattleEnv,
    agent: &mut TabularAgent,
    schedule: TrainSchedule,
) -> Result<TrainingReport, EnvError> {
    let TrainSchedule {
        episodes,
        seed,
        log_every,
        eval_every,
        eval_episodes,
    } = schedule;
    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
    let mut report = TrainingReport::default();

    for episode in 0..episodes {
        let reset = env.reset((episode == 0).then_some(seed));
        let mut observation = reset.observation;
        let mut action = agent
            .act(observation, &reset.legal_actions, &mut rng)
            .ok_or(EnvError::NoLegalAction)?;
        let mut total = 0.0;
        let mut steps = 0;

        loop {
            let step = env.step(action)?;
            total += step.reward;
            steps += 1;
            let done = step.terminated || step.truncated;
            let next_action = if done {
                None
            } else {
                agent.act(step.observation, &step.legal_actions, &mut rng)
            };
            agent.update(&Transition {
                observation,
                action,
                reward: step.reward,
                next_observation: step.observation,
                next_action,
                // A truncated episode still bootstraps from the state it stopped in.
                done: step.terminated,
            });
            if done {
                if step.truncated {
                    report.truncated += 1;
                }
                break;
            }
            observation = step.observation;
            action = next_action.ok_or(EnvError::NoLegalAction)?;
        }

        if won(env) {
            report.wins += 1;
        }
        report.returns.push(total);

        if log_every > 0 && (episode + 1) % log_every == 0 {
            let window = &report.returns[report.returns.len() - log_every..];
            info!(
                episode = episode + 1,
                mean_return = mean(window),
                win_rate = report.win_rate(),
                epsilon = agent.epsilon(),
                states = env.encoder().len(),
                "training progress"
            );
        }

        if eval_every > 0 && eval_episodes > 0 && (episode + 1) % eval_every == 0 {
            let eval = evaluate(env, agent, eval_episodes, seed.wrapping_add(episode as u64 + 1))?;
            let record = TrainingRecord {
                episode: episode + 1,
                train_return: total,
                steps,
                epsilon: agent.epsilon(),
                q_rows: agent.table().len(),
                eval_winrate: eval.win_rate(),
            };
            info!(
                episode = record.episode,
                train_return = record.train_return,
                steps = record.steps,
                greedy_win_rate = record.eval_winrate,
                "evaluation"
            );
            report.evaluations.push(record);
        }
    }
    Ok(report)
}

pub fn write_training_log(path: &Path, records: &[TrainingRecord]) -> anyhow::Result<()> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    std::fs::write(path, out)
        .with_context(|| format!("Failed to write training log to {}", path.display()))?;
    Ok(())
}

pub fn read_training_log(path: &Path) -> anyhow::Result<Vec<TrainingRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read training log at {}", path.display()))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Bad training log row {} in {}", i + 1, path.display()))
        })
        .collect()
}

struct EpisodeResult {
    total: f64,
    won: bool,
    terminated: bool,
}

fn greedy_episode(mut env: BattleEnv, agent: &TabularAgent) -> Result<EpisodeResult, EnvError> {
    let reset = env.reset(None);
    let mut observation = reset.observation;
    let mut legal = reset.legal_actions;
    let mut total = 0.0;
    loop {
        let action = agent
            .greedy(observation, &legal)
            .ok_or(EnvError::NoLegalAction)?;
        let step = env.step(action)?;
        total += step.reward;
        if step.terminated || step.truncated {
            return Ok(EpisodeResult {
                total,
                won: won(&env),
                terminated: step.terminated,
            });
        }
        observation = step.observation;
        legal = step.legal_actions;
    }
}

pub fn evaluate(
    env: &BattleEnv,
    agent: &TabularAgent,
    episodes: usize,
    seed: u64,
) -> Result<EvalReport, EnvError> {
    let mut seeds = SmallRng::seed_from_u64(seed);
    let forks: Vec<BattleEnv> = (0..episodes).map(|_| env.fork(seeds.gen())).collect();
    let results: Vec<EpisodeResult> = forks
        .into_par_iter()
        .map(|fork| greedy_episode(fork, agent))
        .collect::<Result<Vec<_>, EnvError>>()?;

    let returns: Vec<f64> = results.iter().map(|r| r.total).collect();
    let report = EvalReport {
        episodes,
        wins: results.iter().filter(|r| r.won).count(),
        losses: results.iter().filter(|r| r.terminated && !r.won).count(),
        truncated: results.iter().filter(|r| !r.terminated).count(),
        mean_return: mean(&returns),
    };
    debug!(?report, "evaluation finished");
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub battles: usize,
    pub a_wins: usize,
    pub b_wins: usize,
    pub unfinished: usize,
}

pub fn simulate(
    roster_a: &Arc<Roster>,
    roster_b: &Arc<Roster>,
    policy_a: PolicyKind,
    policy_b: PolicyKind,
    battles: usize,
    seed: u64,
    max_turns: u32,
) -> anyhow::Result<SimulationReport> {
    let mut seeds = SmallRng::seed_from_u64(seed);
    let battle_seeds: Vec<[u64; 3]> = (0..battles)
        .map(|_| [seeds.gen(), seeds.gen(), seeds.gen()])
        .collect();
    let winners: Vec<Option<Side>> = battle_seeds
        .par_iter()
        .map(|[battle, a, b]| {
            let mut engine = BattleEngine::new(Arc::clone(roster_a), Arc::clone(roster_b), *battle)
                .with_opponent(policy_b.build(*b));
            let mut side_a = policy_a.build(*a);
            play_out(&mut engine, side_a.as_mut(), max_turns)
        })
        .collect::<Result<Vec<_>, IllegalActionError>>()
        .context("Side A policy produced an illegal action")?;

    Ok(SimulationReport {
        battles,
        a_wins: winners.iter().filter(|w| **w == Some(Side::A)).count(),
        b_wins: winners.iter().filter(|w| **w == Some(Side::B)).count(),
        unfinished: winners.iter().filter(|w| w.is_none()).count(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub algorithm: Algorithm,
    pub states: Vec<TinyState>,
    pub q: Vec<(usize, QRow)>,
}

impl Checkpoint {
    pub fn capture(agent: &TabularAgent, encoder: &StateEncoder) -> Self {
        let mut q: Vec<(usize, QRow)> = agent.table().iter().map(|(k, v)| (*k, *v)).collect();
        q.sort_by_key(|(id, _)| *id);
        Checkpoint {
            algorithm: agent.algorithm(),
            states: encoder.states().to_vec(),
            q,
        }
    }

    pub fn restore(self, config: LearnerConfig) -> anyhow::Result<(TabularAgent, StateEncoder)> {
        let mut table = HashMap::with_capacity(self.q.len());
        for (id, row) in self.q {
            if id >= self.states.len() {
                anyhow::bail!(
                    "Q row for observation {id} but only {} states are recorded",
                    self.states.len()
                );
            }
            table.insert(id, row);
        }
        let encoder = StateEncoder::from_states(self.states);
        Ok((TabularAgent::from_table(self.algorithm, config, table), encoder))
    }
}

pub fn save_checkpoint(path: &Path, agent: &TabularAgent, encoder: &StateEncoder) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&Checkpoint::capture(agent, encoder))?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write checkpoint to {}", path.display()))?;
    Ok(())
}

pub fn load_checkpoint(
    path: &Path,
    config: LearnerConfig,
) -> anyhow::Result<(TabularAgent, StateEncoder)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read checkpoint at {}", path.display()))?;
    let checkpoint: Checkpoint = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
    checkpoint
        .restore(config)
        .with_context(|| format!("Inconsistent checkpoint {}", path.display()))
}
