use crate::battle::{Action, BattleEngine, Side};
use crate::config::EnvConfig;
use crate::error::{EnvError, IllegalActionError};
use crate::model::{Creature, Roster};
use crate::reward::{RewardShaper, RewardWeights};
use crate::types::dual_effectiveness;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub const ATTACK_SLOTS: usize = 4;
pub const SWITCH_OFFSET: usize = 10;
pub const ACTION_SPACE: usize = 16;

pub fn action_id(action: Action) -> usize {
    match action {
        Action::Attack(slot) => slot,
        Action::Switch(slot) => SWITCH_OFFSET + slot,
    }
}

pub fn action_from_id(id: usize) -> Result<Action, IllegalActionError> {
    match id {
        slot if slot < ATTACK_SLOTS => Ok(Action::Attack(slot)),
        id if (SWITCH_OFFSET..ACTION_SPACE).contains(&id) => Ok(Action::Switch(id - SWITCH_OFFSET)),
        other => Err(IllegalActionError::UnknownActionId(other)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Matchup {
    Unfavorable,
    Neutral,
    Favorable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TinyState {
    pub our_hp_bucket: u8,
    pub opp_hp_bucket: u8,
    pub matchup: Matchup,
    pub ours_left: u8,
    pub opps_left: u8,
}

pub fn hp_bucket(hp: f64, max_hp: f64, n_buckets: u8) -> u8 {
    if hp <= 0.0 {
        return 0;
    }
    let n = n_buckets.max(1);
    let width = (max_hp / n as f64).floor().max(1.0);
    let band = ((hp - 1.0) / width).floor().max(0.0) as u64 + 1;
    band.min(n as u64) as u8
}

pub fn coarse_matchup(ours: &Creature, theirs: &Creature) -> Matchup {
    let best = std::iter::once(ours.primary_type())
        .chain(ours.secondary_type())
        .map(|t| dual_effectiveness(t, theirs.primary_type(), theirs.secondary_type()))
        .fold(0.0, f64::max);
    if best > 1.01 {
        Matchup::Favorable
    } else if best < 0.99 {
        Matchup::Unfavorable
    } else {
        Matchup::Neutral
    }
}

pub fn tiny_state(engine: &BattleEngine, n_buckets: u8) -> TinyState {
    let ours = engine.active(Side::A);
    let theirs = engine.active(Side::B);
    TinyState {
        our_hp_bucket: hp_bucket(engine.active_hp(Side::A), ours.max_hp(), n_buckets),
        opp_hp_bucket: hp_bucket(engine.active_hp(Side::B), theirs.max_hp(), n_buckets),
        matchup: coarse_matchup(ours, theirs),
        ours_left: engine.remaining(Side::A) as u8,
        opps_left: engine.remaining(Side::B) as u8,
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateEncoder {
    to_id: HashMap<TinyState, usize>,
    from_id: Vec<TinyState>,
}

impl StateEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_states(states: Vec<TinyState>) -> Self {
        let mut encoder = Self::new();
        for state in states {
            encoder.encode(state);
        }
        encoder
    }

    pub fn encode(&mut self, state: TinyState) -> usize {
        if let Some(id) = self.to_id.get(&state) {
            return *id;
        }
        let id = self.from_id.len();
        self.to_id.insert(state, id);
        self.from_id.push(state);
        id
    }

    pub fn decode(&self, id: usize) -> Option<TinyState> {
        self.from_id.get(id).copied()
    }

    pub fn states(&self) -> &[TinyState] {
        &self.from_id
    }

    pub fn len(&self) -> usize {
        self.from_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_id.is_empty()
    }
}

pub fn legal_action_ids(engine: &BattleEngine) -> Vec<usize> {
    engine
        .legal_actions(Side::A)
        .into_iter()
        .map(action_id)
        .filter(|id| *id < ACTION_SPACE)
        .collect()
}

pub fn action_mask(engine: &BattleEngine) -> [bool; ACTION_SPACE] {
    let mut mask = [false; ACTION_SPACE];
    for id in legal_action_ids(engine) {
        mask[id] = true;
    }
    mask
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reset {
    pub observation: usize,
    pub legal_actions: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: usize,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub legal_actions: Vec<usize>,
    // The requested id was illegal and the first legal action ran instead.
    pub fallback_used: bool,
}

pub struct BattleEnv {
    agent: Arc<Roster>,
    opponent: Arc<Roster>,
    config: EnvConfig,
    weights: RewardWeights,
    encoder: StateEncoder,
    engine: Option<BattleEngine>,
    seed_rng: SmallRng,
    steps: usize,
    done: bool,
}

impl BattleEnv {
    pub fn new(
        agent: Arc<Roster>,
        opponent: Arc<Roster>,
        config: EnvConfig,
        weights: RewardWeights,
        seed: u64,
    ) -> Self {
        BattleEnv {
            agent,
            opponent,
            config,
            weights,
            encoder: StateEncoder::new(),
            engine: None,
            seed_rng: SmallRng::seed_from_u64(seed),
            steps: 0,
            done: false,
        }
    }

    pub fn fork(&self, seed: u64) -> Self {
        BattleEnv {
            agent: Arc::clone(&self.agent),
            opponent: Arc::clone(&self.opponent),
            config: self.config.clone(),
            weights: self.weights.clone(),
            encoder: self.encoder.clone(),
            engine: None,
            seed_rng: SmallRng::seed_from_u64(seed),
            steps: 0,
            done: false,
        }
    }

    pub fn with_encoder(mut self, encoder: StateEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn engine(&self) -> Option<&BattleEngine> {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn reset(&mut self, seed: Option<u64>) -> Reset {
        if let Some(seed) = seed {
            self.seed_rng = SmallRng::seed_from_u64(seed);
        }
        let battle_seed: u64 = self.seed_rng.gen();
        let policy_seed: u64 = self.seed_rng.gen();
        let engine = BattleEngine::new(Arc::clone(&self.agent), Arc::clone(&self.opponent), battle_seed)
            .with_opponent(self.config.opponent.build(policy_seed))
            .with_shaper(RewardShaper::new(self.weights.clone()));
        let observation = self.encoder.encode(tiny_state(&engine, self.config.n_buckets));
        let legal_actions = legal_action_ids(&engine);
        self.engine = Some(engine);
        self.steps = 0;
        self.done = false;
        Reset {
            observation,
            legal_actions,
        }
    }

    pub fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        if self.done {
            return Err(EnvError::EpisodeFinished);
        }
        let engine = self.engine.as_mut().ok_or(EnvError::NotReset)?;

        let legal = legal_action_ids(engine);
        let (chosen, fallback_used) = if legal.contains(&action) {
            (action, false)
        } else {
            let first = *legal.first().ok_or(EnvError::NoLegalAction)?;
            warn!(requested = action, fallback = first, "illegal action id, using first legal");
            (first, true)
        };

        let outcome = engine.apply_turn(action_from_id(chosen)?)?;
        self.steps += 1;
        let terminated = outcome.terminated();
        let truncated = !terminated && self.steps >= self.config.max_steps;
        self.done = terminated || truncated;

        let observation = self.encoder.encode(tiny_state(engine, self.config.n_buckets));
        Ok(Step {
            observation,
            reward: outcome.reward,
            terminated,
            truncated,
            legal_actions: legal_action_ids(engine),
            fallback_used,
        })
    }
}
