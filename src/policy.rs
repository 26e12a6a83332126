use crate::battle::{Action, SideView};
use crate::damage::resolve_with_roll;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Returned actions are validated by the engine: an illegal choice from
/// `choose_action` is reported as an error, an illegal replacement is a bug.
pub trait BattlePolicy: Send {
    fn choose_action(&mut self, own: &SideView<'_>, foe: &SideView<'_>) -> Action;

    fn choose_replacement(&mut self, own: &SideView<'_>, foe: &SideView<'_>) -> usize;
}

fn first_living(own: &SideView<'_>) -> usize {
    own.living_bench().next().unwrap_or(own.active_slot())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAttackPolicy;

impl BattlePolicy for FirstAttackPolicy {
    fn choose_action(&mut self, _own: &SideView<'_>, _foe: &SideView<'_>) -> Action {
        Action::Attack(0)
    }

    fn choose_replacement(&mut self, own: &SideView<'_>, _foe: &SideView<'_>) -> usize {
        first_living(own)
    }
}

#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: SmallRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl BattlePolicy for RandomPolicy {
    fn choose_action(&mut self, own: &SideView<'_>, _foe: &SideView<'_>) -> Action {
        let slots: Vec<usize> = (0..own.active().attacks().len()).collect();
        Action::Attack(*slots.choose(&mut self.rng).unwrap_or(&0))
    }

    fn choose_replacement(&mut self, own: &SideView<'_>, _foe: &SideView<'_>) -> usize {
        let living: Vec<usize> = own.living_bench().collect();
        *living.choose(&mut self.rng).unwrap_or(&own.active_slot())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPolicy;

impl BattlePolicy for GreedyPolicy {
    fn choose_action(&mut self, own: &SideView<'_>, foe: &SideView<'_>) -> Action {
        let attacker = own.active();
        let defender = foe.active();
        let best = attacker
            .attacks()
            .iter()
            .enumerate()
            .map(|(slot, attack)| {
                let sure_hit = resolve_with_roll(attacker, defender, attack, 1).amount;
                (slot, sure_hit * attack.accuracy() as f64 / 100.0)
            })
            .fold((0usize, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        Action::Attack(best.0)
    }

    fn choose_replacement(&mut self, own: &SideView<'_>, foe: &SideView<'_>) -> usize {
        let defender = foe.active();
        own.living_bench()
            .map(|slot| (slot, own.creature(slot).best_offense_against(defender)))
            .fold(None, |best: Option<(usize, f64)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            })
            .map(|(slot, _)| slot)
            .unwrap_or_else(|| first_living(own))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    FirstAttack,
    Random,
    Greedy,
}

impl PolicyKind {
    pub fn build(self, seed: u64) -> Box<dyn BattlePolicy> {
        match self {
            PolicyKind::FirstAttack => Box::new(FirstAttackPolicy),
            PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
            PolicyKind::Greedy => Box::new(GreedyPolicy),
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" | "first_attack" => Ok(PolicyKind::FirstAttack),
            "random" => Ok(PolicyKind::Random),
            "greedy" => Ok(PolicyKind::Greedy),
            other => Err(format!("unknown opponent {other} (use first, random or greedy)")),
        }
    }
}
