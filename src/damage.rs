use crate::model::{Attack, Creature, MoveCategory};
use rand::Rng;

pub const DAMAGE_SCALE: f64 = 0.2;
pub const STAB_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub amount: f64,
    pub effectiveness: f64,
    pub hit: bool,
}

impl DamageOutcome {
    pub fn miss() -> Self {
        DamageOutcome {
            amount: 0.0,
            effectiveness: 1.0,
            hit: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effectiveness {
    Immune,
    MostlyResisted,
    Resisted,
    Neutral,
    Super,
    Ultra,
}

impl Effectiveness {
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier == 0.0 {
            Effectiveness::Immune
        } else if multiplier <= 0.25 {
            Effectiveness::MostlyResisted
        } else if multiplier < 1.0 {
            Effectiveness::Resisted
        } else if multiplier >= 4.0 {
            Effectiveness::Ultra
        } else if multiplier > 1.0 {
            Effectiveness::Super
        } else {
            Effectiveness::Neutral
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            Effectiveness::Immune => Some("It had no effect..."),
            Effectiveness::MostlyResisted => Some("It's barely effective..."),
            Effectiveness::Resisted => Some("It's not very effective..."),
            Effectiveness::Neutral => None,
            Effectiveness::Super => Some("It's super effective!"),
            Effectiveness::Ultra => Some("It's extremely effective!!"),
        }
    }
}

/// Hit check for a roll in `1..=100`: higher accuracy hits more often,
/// accuracy 100 always hits and accuracy 0 never does.
pub fn accuracy_hits(accuracy: u8, roll: u8) -> bool {
    accuracy >= roll
}

pub fn stab(attacker: &Creature, attack: &Attack) -> f64 {
    if attacker.has_type(attack.move_type()) {
        STAB_MULTIPLIER
    } else {
        1.0
    }
}

fn stat_ratio(attacker: &Creature, defender: &Creature, attack: &Attack) -> f64 {
    let (atk, def) = match attack.category() {
        MoveCategory::Physical => (attacker.stats().atk, defender.stats().def),
        MoveCategory::Special => (attacker.stats().spa, defender.stats().spd),
    };
    // Creature construction rejects zero stats.
    atk as f64 / def as f64
}

pub fn resolve_with_roll(
    attacker: &Creature,
    defender: &Creature,
    attack: &Attack,
    roll: u8,
) -> DamageOutcome {
    if !accuracy_hits(attack.accuracy(), roll) {
        return DamageOutcome::miss();
    }
    let effectiveness = defender.defensive_multiplier(attack.move_type());
    let amount = attack.power() as f64
        * effectiveness
        * stab(attacker, attack)
        * stat_ratio(attacker, defender, attack)
        * DAMAGE_SCALE;
    DamageOutcome {
        amount: amount.max(0.0),
        effectiveness,
        hit: true,
    }
}

pub fn resolve<R: Rng + ?Sized>(
    attacker: &Creature,
    defender: &Creature,
    attack: &Attack,
    rng: &mut R,
) -> DamageOutcome {
    let roll: u8 = rng.gen_range(1..=100);
    resolve_with_roll(attacker, defender, attack, roll)
}
