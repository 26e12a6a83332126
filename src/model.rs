use crate::error::RosterError;
use crate::types::{dual_effectiveness, PokemonType};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

pub const MAX_ATTACKS: usize = 4;
pub const MAX_ROSTER: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveCategory {
    Physical,
    Special,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attack {
    id: u32,
    name: String,
    move_type: PokemonType,
    category: MoveCategory,
    power: u32,
    accuracy: u8,
}

impl Attack {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        move_type: PokemonType,
        category: MoveCategory,
        power: u32,
        accuracy: u8,
    ) -> Result<Self, RosterError> {
        let name = name.into();
        if accuracy > 100 {
            return Err(RosterError::Accuracy {
                attack: name,
                accuracy,
            });
        }
        Ok(Attack {
            id,
            name,
            move_type,
            category,
            power,
            accuracy,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn move_type(&self) -> PokemonType {
        self.move_type
    }

    pub fn category(&self) -> MoveCategory {
        self.category
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn accuracy(&self) -> u8 {
        self.accuracy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Stats {
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    pub spa: u32,
    pub spd: u32,
    pub spe: u32,
}

impl Stats {
    fn first_zero(&self) -> Option<&'static str> {
        [
            ("hp", self.hp),
            ("attack", self.atk),
            ("defense", self.def),
            ("special attack", self.spa),
            ("special defense", self.spd),
            ("speed", self.spe),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0)
        .map(|(stat, _)| stat)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    id: u32,
    name: String,
    primary: PokemonType,
    secondary: Option<PokemonType>,
    stats: Stats,
    attacks: Vec<Arc<Attack>>,
    image: String,
}

impl Creature {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        primary: PokemonType,
        secondary: Option<PokemonType>,
        stats: Stats,
        attacks: Vec<Arc<Attack>>,
        image: impl Into<String>,
    ) -> Result<Self, RosterError> {
        let name = name.into();
        if attacks.len() > MAX_ATTACKS {
            return Err(RosterError::TooManyAttacks {
                creature: name,
                count: attacks.len(),
                max: MAX_ATTACKS,
            });
        }
        if attacks.is_empty() {
            return Err(RosterError::NoAttacks(name));
        }
        if let Some(stat) = stats.first_zero() {
            return Err(RosterError::ZeroStat {
                creature: name,
                stat,
            });
        }
        Ok(Creature {
            id,
            name,
            primary,
            secondary: secondary.filter(|t| *t != primary),
            stats,
            attacks,
            image: image.into(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_type(&self) -> PokemonType {
        self.primary
    }

    pub fn secondary_type(&self) -> Option<PokemonType> {
        self.secondary
    }

    pub fn has_type(&self, t: PokemonType) -> bool {
        self.primary == t || self.secondary == Some(t)
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn max_hp(&self) -> f64 {
        self.stats.hp as f64
    }

    pub fn speed(&self) -> u32 {
        self.stats.spe
    }

    pub fn attacks(&self) -> &[Arc<Attack>] {
        &self.attacks
    }

    pub fn attack(&self, slot: usize) -> Option<&Attack> {
        self.attacks.get(slot).map(|a| a.as_ref())
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn defensive_multiplier(&self, attacking: PokemonType) -> f64 {
        dual_effectiveness(attacking, self.primary, self.secondary)
    }

    pub fn best_offense_against(&self, defender: &Creature) -> f64 {
        self.attacks
            .iter()
            .map(|a| defender.defensive_multiplier(a.move_type()))
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    id: u32,
    name: String,
    image: String,
    creatures: Vec<Creature>,
}

impl Roster {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        image: impl Into<String>,
        creatures: Vec<Creature>,
    ) -> Result<Self, RosterError> {
        let name = name.into();
        if creatures.is_empty() || creatures.len() > MAX_ROSTER {
            return Err(RosterError::RosterSize {
                trainer: name,
                count: creatures.len(),
                max: MAX_ROSTER,
            });
        }
        Ok(Roster {
            id,
            name,
            image: image.into(),
            creatures,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn creature(&self, slot: usize) -> Option<&Creature> {
        self.creatures.get(slot)
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttackRecord {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    move_type: PokemonType,
    category: MoveCategory,
    power: u32,
    accuracy: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreatureRecord {
    id: u32,
    name: String,
    types: Vec<PokemonType>,
    stats: Stats,
    attacks: Vec<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrainerRecord {
    id: u32,
    name: String,
    #[serde(default)]
    image: Option<String>,
    creatures: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterBookFile {
    attacks: Vec<AttackRecord>,
    creatures: Vec<CreatureRecord>,
    trainers: Vec<TrainerRecord>,
}

#[derive(Debug, Clone)]
pub struct RosterBook {
    trainers: Vec<Arc<Roster>>,
}

impl RosterBook {
    pub fn trainers(&self) -> &[Arc<Roster>] {
        &self.trainers
    }

    pub fn trainer(&self, name: &str) -> Result<Arc<Roster>, RosterError> {
        self.trainers
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| RosterError::UnknownTrainer(name.to_string()))
    }
}

impl TryFrom<RosterBookFile> for RosterBook {
    type Error = RosterError;

    fn try_from(file: RosterBookFile) -> Result<Self, Self::Error> {
        let mut attacks: HashMap<String, Arc<Attack>> = HashMap::new();
        for rec in file.attacks {
            let key = rec.name.to_lowercase();
            let attack = Attack::new(
                rec.id,
                rec.name,
                rec.move_type,
                rec.category,
                rec.power,
                rec.accuracy,
            )?;
            if attacks.insert(key, Arc::new(attack.clone())).is_some() {
                return Err(RosterError::Duplicate {
                    kind: "attack",
                    name: attack.name,
                });
            }
        }

        let mut creatures: HashMap<String, Creature> = HashMap::new();
        for rec in file.creatures {
            let (primary, secondary) = match rec.types.as_slice() {
                [one] => (*one, None),
                [one, two] => (*one, Some(*two)),
                other => {
                    return Err(RosterError::TypeCount {
                        creature: rec.name,
                        count: other.len(),
                    })
                }
            };
            let mut known = Vec::with_capacity(rec.attacks.len());
            for attack_name in &rec.attacks {
                let attack = attacks.get(&attack_name.to_lowercase()).ok_or_else(|| {
                    RosterError::MissingReference {
                        owner: rec.name.clone(),
                        kind: "attack",
                        name: attack_name.clone(),
                    }
                })?;
                known.push(Arc::clone(attack));
            }
            let image = rec
                .image
                .unwrap_or_else(|| format!("assets/images/pokemon/{}.png", rec.name));
            let key = rec.name.to_lowercase();
            let creature = Creature::new(
                rec.id, rec.name, primary, secondary, rec.stats, known, image,
            )?;
            if creatures.contains_key(&key) {
                return Err(RosterError::Duplicate {
                    kind: "creature",
                    name: creature.name,
                });
            }
            creatures.insert(key, creature);
        }

        let mut trainers = Vec::with_capacity(file.trainers.len());
        for rec in file.trainers {
            let mut team = Vec::with_capacity(rec.creatures.len());
            for creature_name in &rec.creatures {
                let creature = creatures.get(&creature_name.to_lowercase()).ok_or_else(|| {
                    RosterError::MissingReference {
                        owner: rec.name.clone(),
                        kind: "creature",
                        name: creature_name.clone(),
                    }
                })?;
                team.push(creature.clone());
            }
            if trainers
                .iter()
                .any(|t: &Arc<Roster>| t.name().eq_ignore_ascii_case(&rec.name))
            {
                return Err(RosterError::Duplicate {
                    kind: "trainer",
                    name: rec.name,
                });
            }
            let image = rec
                .image
                .unwrap_or_else(|| format!("assets/images/trainers/{}.png", rec.name));
            trainers.push(Arc::new(Roster::new(rec.id, rec.name, image, team)?));
        }

        Ok(RosterBook { trainers })
    }
}

pub fn parse_roster_book(raw: &str) -> anyhow::Result<RosterBook> {
    let file: RosterBookFile = serde_json::from_str(raw)?;
    Ok(RosterBook::try_from(file)?)
}
