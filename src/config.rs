use crate::error::ConfigError;
use crate::policy::PolicyKind;
use crate::reward::RewardWeights;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub n_buckets: u8,
    pub max_steps: usize,
    pub opponent: PolicyKind,
    pub agent_trainer: Option<String>,
    pub opponent_trainer: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            n_buckets: 5,
            max_steps: 200,
            opponent: PolicyKind::FirstAttack,
            agent_trainer: None,
            opponent_trainer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub eps_start: f64,
    pub eps_end: f64,
    pub eps_decay: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig {
            alpha: 0.3,
            gamma: 0.99,
            eps_start: 1.0,
            eps_end: 0.05,
            eps_decay: 3000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub env: EnvConfig,
    pub reward: RewardWeights,
    pub learner: LearnerConfig,
    pub seed: u64,
    pub episodes: usize,
    pub eval_episodes: usize,
    // Progress is logged every this many training episodes; 0 disables it.
    pub log_every: usize,
    // Greedy evaluation of `eval_episodes` runs every this many training
    // episodes; 0 in either disables it.
    pub eval_every: usize,
    pub train_log: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            env: EnvConfig::default(),
            reward: RewardWeights::default(),
            learner: LearnerConfig::default(),
            seed: 0,
            episodes: 5000,
            eval_episodes: 200,
            log_every: 500,
            eval_every: 250,
            train_log: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reward.validate()?;
        if self.env.n_buckets == 0 {
            return Err(ConfigError::Invalid("env.n_buckets must be > 0".into()));
        }
        if self.env.max_steps == 0 {
            return Err(ConfigError::Invalid("env.max_steps must be > 0".into()));
        }
        let l = &self.learner;
        if !(0.0..=1.0).contains(&l.alpha) || !(0.0..=1.0).contains(&l.gamma) {
            return Err(ConfigError::Invalid(
                "learner.alpha and learner.gamma must be within [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&l.eps_start) || !(0.0..=1.0).contains(&l.eps_end) {
            return Err(ConfigError::Invalid(
                "learner epsilons must be within [0, 1]".into(),
            ));
        }
        if l.eps_decay <= 0.0 {
            return Err(ConfigError::Invalid("learner.eps_decay must be > 0".into()));
        }
        if self.train_log.is_some() && (self.eval_every == 0 || self.eval_episodes == 0) {
            return Err(ConfigError::Invalid(
                "train_log needs eval_every and eval_episodes > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let parsed: RunConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
        parsed
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(parsed)
    }
}
