use crate::adapter::ACTION_SPACE;
use crate::config::LearnerConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    QLearning,
    Sarsa,
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "q" | "qlearning" | "q_learning" => Ok(Algorithm::QLearning),
            "sarsa" => Ok(Algorithm::Sarsa),
            other => Err(format!("unknown algorithm {other} (use q or sarsa)")),
        }
    }
}

pub type QRow = [f64; ACTION_SPACE];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub observation: usize,
    pub action: usize,
    pub reward: f64,
    pub next_observation: usize,
    pub next_action: Option<usize>,
    pub done: bool,
}

#[derive(Clone, Debug)]
pub struct TabularAgent {
    algorithm: Algorithm,
    config: LearnerConfig,
    q: HashMap<usize, QRow>,
    steps: u64,
}

impl TabularAgent {
    pub fn new(algorithm: Algorithm, config: LearnerConfig) -> Self {
        TabularAgent {
            algorithm,
            config,
            q: HashMap::new(),
            steps: 0,
        }
    }

    pub fn from_table(algorithm: Algorithm, config: LearnerConfig, q: HashMap<usize, QRow>) -> Self {
        TabularAgent {
            algorithm,
            config,
            q,
            steps: 0,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn table(&self) -> &HashMap<usize, QRow> {
        &self.q
    }

    pub fn q_values(&self, observation: usize) -> QRow {
        self.q.get(&observation).copied().unwrap_or([0.0; ACTION_SPACE])
    }

    pub fn epsilon(&self) -> f64 {
        let c = &self.config;
        c.eps_end + (c.eps_start - c.eps_end) * (-(self.steps as f64) / c.eps_decay).exp()
    }

    pub fn act<R: Rng + ?Sized>(
        &mut self,
        observation: usize,
        legal: &[usize],
        rng: &mut R,
    ) -> Option<usize> {
        let eps = self.epsilon();
        self.steps += 1;
        if rng.gen::<f64>() < eps {
            return legal.choose(rng).copied();
        }
        self.greedy(observation, legal)
    }

    /// Highest-valued legal action, first one on ties.
    pub fn greedy(&self, observation: usize, legal: &[usize]) -> Option<usize> {
        let row = self.q_values(observation);
        legal
            .iter()
            .copied()
            .filter(|a| *a < ACTION_SPACE)
            .fold(None, |best: Option<usize>, a| match best {
                Some(b) if row[b] >= row[a] => Some(b),
                _ => Some(a),
            })
    }

    pub fn update(&mut self, t: &Transition) {
        let target = if t.done {
            t.reward
        } else {
            let next = self.q_values(t.next_observation);
            let bootstrap = match (self.algorithm, t.next_action) {
                (Algorithm::Sarsa, Some(a2)) => next[a2],
                (Algorithm::Sarsa, None) | (Algorithm::QLearning, _) => {
                    next.iter().copied().fold(f64::MIN, f64::max)
                }
            };
            t.reward + self.config.gamma * bootstrap
        };
        let row = self.q.entry(t.observation).or_insert([0.0; ACTION_SPACE]);
        let current = row[t.action];
        row[t.action] = current + self.config.alpha * (target - current);
    }
}
