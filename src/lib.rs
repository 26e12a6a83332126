pub mod adapter;
pub mod battle;
pub mod battle_log;
pub mod config;
pub mod damage;
pub mod error;
pub mod interactive;
pub mod learner;
pub mod model;
pub mod policy;
pub mod reward;
pub mod train;
pub mod types;

use crate::adapter::BattleEnv;
use crate::battle::BattleEngine;
use crate::config::{EnvConfig, RunConfig};
use crate::interactive::play_interactive;
use crate::learner::{Algorithm, TabularAgent};
use crate::model::{parse_roster_book, Roster, RosterBook};
use crate::policy::PolicyKind;
use crate::reward::RewardShaper;
use crate::train::{
    evaluate, load_checkpoint, save_checkpoint, simulate, train, write_training_log, TrainSchedule,
};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Train,
    Eval,
    Simulate,
    Play,
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub command: Command,
    pub rosters_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub algorithm: Algorithm,
    pub episodes: Option<usize>,
    pub eval_episodes: Option<usize>,
    pub eval_every: Option<usize>,
    pub train_log: Option<PathBuf>,
    pub seed: Option<u64>,
    pub opponent: Option<PolicyKind>,
    pub agent_trainer: Option<String>,
    pub opponent_trainer: Option<String>,
    pub checkpoint_path: Option<PathBuf>,
    pub policy_a: PolicyKind,
    pub battles: usize,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CliOptions {
    fn default() -> Self {
        CliOptions {
            command: Command::Train,
            rosters_path: PathBuf::from("data/rosters.json"),
            config_path: None,
            algorithm: Algorithm::QLearning,
            episodes: None,
            eval_episodes: None,
            eval_every: None,
            train_log: None,
            seed: None,
            opponent: None,
            agent_trainer: None,
            opponent_trainer: None,
            checkpoint_path: None,
            policy_a: PolicyKind::Greedy,
            battles: 1000,
            snapshot_path: None,
        }
    }
}

pub fn load_roster_book(path: &Path) -> anyhow::Result<RosterBook> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster file at {}", path.display()))?;
    parse_roster_book(&raw).with_context(|| format!("Invalid roster book {}", path.display()))
}

pub fn select_rosters(book: &RosterBook, env: &EnvConfig) -> anyhow::Result<(Arc<Roster>, Arc<Roster>)> {
    let pick = |name: &Option<String>, fallback: usize| -> anyhow::Result<Arc<Roster>> {
        match name {
            Some(name) => Ok(book.trainer(name)?),
            None => book
                .trainers()
                .get(fallback)
                .or_else(|| book.trainers().first())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Roster book has no trainers")),
        }
    };
    Ok((pick(&env.agent_trainer, 0)?, pick(&env.opponent_trainer, 1)?))
}

fn resolve_config(opts: &CliOptions) -> anyhow::Result<RunConfig> {
    let mut cfg = match &opts.config_path {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(episodes) = opts.episodes {
        cfg.episodes = episodes;
    }
    if let Some(episodes) = opts.eval_episodes {
        cfg.eval_episodes = episodes;
    }
    if let Some(every) = opts.eval_every {
        cfg.eval_every = every;
    }
    if opts.train_log.is_some() {
        cfg.train_log = opts.train_log.clone();
    }
    if let Some(seed) = opts.seed {
        cfg.seed = seed;
    }
    if let Some(opponent) = opts.opponent {
        cfg.env.opponent = opponent;
    }
    if opts.agent_trainer.is_some() {
        cfg.env.agent_trainer = opts.agent_trainer.clone();
    }
    if opts.opponent_trainer.is_some() {
        cfg.env.opponent_trainer = opts.opponent_trainer.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn run(opts: CliOptions) -> anyhow::Result<()> {
    let cfg = resolve_config(&opts)?;
    let book = load_roster_book(&opts.rosters_path)?;
    let (agent_roster, opponent_roster) = select_rosters(&book, &cfg.env)?;
    info!(
        agent = agent_roster.name(),
        opponent = opponent_roster.name(),
        command = ?opts.command,
        seed = cfg.seed,
        "starting"
    );

    match opts.command {
        Command::Train => {
            if cfg.episodes == 0 {
                anyhow::bail!("--episodes must be > 0");
            }
            let mut env = BattleEnv::new(
                agent_roster,
                opponent_roster,
                cfg.env.clone(),
                cfg.reward.clone(),
                cfg.seed,
            );
            let mut agent = TabularAgent::new(opts.algorithm, cfg.learner.clone());
            let report = train(&mut env, &mut agent, TrainSchedule::from(&cfg))?;
            println!(
                "Trained {:?} for {} episodes: win rate {:.3}, mean return (last 100) {:.3}, {} states",
                opts.algorithm,
                report.episodes(),
                report.win_rate(),
                report.recent_mean_return(100),
                env.encoder().len()
            );
            if let Some(path) = &cfg.train_log {
                write_training_log(path, &report.evaluations)?;
                println!(
                    "Wrote {} evaluation rows to {}",
                    report.evaluations.len(),
                    path.display()
                );
            }
            if cfg.eval_episodes > 0 {
                let eval = evaluate(&env, &agent, cfg.eval_episodes, cfg.seed.wrapping_add(1))?;
                println!(
                    "Greedy evaluation over {} episodes: win rate {:.3}, mean return {:.3}",
                    eval.episodes,
                    eval.win_rate(),
                    eval.mean_return
                );
            }
            if let Some(path) = &opts.checkpoint_path {
                save_checkpoint(path, &agent, env.encoder())?;
                println!("Wrote checkpoint to {}", path.display());
            }
        }
        Command::Eval => {
            let path = opts
                .checkpoint_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("eval requires --checkpoint"))?;
            let (agent, encoder) = load_checkpoint(path, cfg.learner.clone())?;
            let env = BattleEnv::new(
                agent_roster,
                opponent_roster,
                cfg.env.clone(),
                cfg.reward.clone(),
                cfg.seed,
            )
            .with_encoder(encoder);
            let eval = evaluate(&env, &agent, cfg.eval_episodes, cfg.seed)?;
            println!(
                "{} episodes: {} wins, {} losses, {} truncated, win rate {:.3}, mean return {:.3}",
                eval.episodes,
                eval.wins,
                eval.losses,
                eval.truncated,
                eval.win_rate(),
                eval.mean_return
            );
        }
        Command::Simulate => {
            if opts.battles == 0 {
                anyhow::bail!("--battles must be > 0");
            }
            let report = simulate(
                &agent_roster,
                &opponent_roster,
                opts.policy_a,
                cfg.env.opponent,
                opts.battles,
                cfg.seed,
                cfg.env.max_steps as u32,
            )?;
            println!(
                "{} vs {} over {} battles: {} / {} wins, {} unfinished",
                agent_roster.name(),
                opponent_roster.name(),
                report.battles,
                report.a_wins,
                report.b_wins,
                report.unfinished
            );
        }
        Command::Play => {
            let mut engine = BattleEngine::new(agent_roster, opponent_roster, cfg.seed)
                .with_opponent(cfg.env.opponent.build(cfg.seed))
                .with_shaper(RewardShaper::new(cfg.reward.clone()));
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let winner = play_interactive(
                &mut engine,
                stdin.lock(),
                &mut stdout,
                opts.snapshot_path.as_deref(),
            )?;
            if winner.is_none() {
                println!("Battle abandoned after {} turns", engine.turn());
            }
        }
    }
    Ok(())
}
