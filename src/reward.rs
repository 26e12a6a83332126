use crate::battle::Side;
use crate::error::ConfigError;
use crate::model::{Attack, Creature};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    pub damage_weight: f64,
    pub matchup_weight: f64,
    pub switch_weight: f64,
    pub ko_bonus: f64,
    pub ko_penalty: f64,
    pub turn_penalty: f64,
    pub clip: f64,
    pub terminal_reward: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        RewardWeights {
            damage_weight: 1.0,
            matchup_weight: 0.25,
            switch_weight: 0.25,
            ko_bonus: 0.5,
            ko_penalty: 0.5,
            turn_penalty: 0.01,
            clip: 2.0,
            terminal_reward: 10.0,
        }
    }
}

impl RewardWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("damage_weight", self.damage_weight),
            ("matchup_weight", self.matchup_weight),
            ("switch_weight", self.switch_weight),
            ("ko_bonus", self.ko_bonus),
            ("ko_penalty", self.ko_penalty),
            ("turn_penalty", self.turn_penalty),
            ("clip", self.clip),
            ("terminal_reward", self.terminal_reward),
        ];
        for (name, value) in named {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }
        if self.terminal_reward <= self.clip {
            return Err(ConfigError::TerminalBelowClip {
                terminal: self.terminal_reward,
                clip: self.clip,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ActionKind<'a> {
    Attack(&'a Attack),
    Switch { from: &'a Creature },
}

/// `agent` and `opponent` are the creatures that faced each other during the
/// attack phase, before any faint replacement.
#[derive(Debug, Clone, Copy)]
pub struct TurnSummary<'a> {
    pub dealt: f64,
    pub received: f64,
    pub agent: &'a Creature,
    pub opponent: &'a Creature,
    pub action: ActionKind<'a>,
    pub opponent_fainted: bool,
    pub agent_fainted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RewardShaper {
    weights: RewardWeights,
}

fn matchup_score(multiplier: f64) -> f64 {
    if multiplier <= 0.0 {
        return -1.0;
    }
    multiplier.log2().clamp(-2.0, 2.0) / 2.0
}

impl RewardShaper {
    pub fn new(weights: RewardWeights) -> Self {
        RewardShaper { weights }
    }

    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    pub fn shape(&self, turn: &TurnSummary<'_>) -> f64 {
        let w = &self.weights;
        let dealt_frac = turn.dealt / turn.opponent.max_hp();
        let received_frac = turn.received / turn.agent.max_hp();
        let mut reward = w.damage_weight * (dealt_frac - received_frac);

        reward += match turn.action {
            ActionKind::Attack(attack) => {
                w.matchup_weight
                    * matchup_score(turn.opponent.defensive_multiplier(attack.move_type()))
            }
            ActionKind::Switch { from } => {
                w.switch_weight * switch_gain(from, turn.agent, turn.opponent)
            }
        };

        if turn.opponent_fainted {
            reward += w.ko_bonus;
        }
        if turn.agent_fainted {
            reward -= w.ko_penalty;
        }
        reward -= w.turn_penalty;
        reward.clamp(-w.clip, w.clip)
    }

    pub fn terminal(&self, winner: Side) -> f64 {
        match winner {
            Side::A => self.weights.terminal_reward,
            Side::B => -self.weights.terminal_reward,
        }
    }
}

fn switch_gain(from: &Creature, to: &Creature, opponent: &Creature) -> f64 {
    let before = from.best_offense_against(opponent);
    let after = to.best_offense_against(opponent);
    if after > 1.0 && after > before {
        matchup_score(after)
    } else {
        0.0
    }
}
