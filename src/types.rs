use crate::error::RosterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Grass,
    Electric,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

pub const TYPE_COUNT: usize = 18;

impl PokemonType {
    pub const ALL: [PokemonType; TYPE_COUNT] = [
        PokemonType::Normal,
        PokemonType::Fire,
        PokemonType::Water,
        PokemonType::Grass,
        PokemonType::Electric,
        PokemonType::Ice,
        PokemonType::Fighting,
        PokemonType::Poison,
        PokemonType::Ground,
        PokemonType::Flying,
        PokemonType::Psychic,
        PokemonType::Bug,
        PokemonType::Rock,
        PokemonType::Ghost,
        PokemonType::Dragon,
        PokemonType::Dark,
        PokemonType::Steel,
        PokemonType::Fairy,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PokemonType::Normal => "normal",
            PokemonType::Fire => "fire",
            PokemonType::Water => "water",
            PokemonType::Grass => "grass",
            PokemonType::Electric => "electric",
            PokemonType::Ice => "ice",
            PokemonType::Fighting => "fighting",
            PokemonType::Poison => "poison",
            PokemonType::Ground => "ground",
            PokemonType::Flying => "flying",
            PokemonType::Psychic => "psychic",
            PokemonType::Bug => "bug",
            PokemonType::Rock => "rock",
            PokemonType::Ghost => "ghost",
            PokemonType::Dragon => "dragon",
            PokemonType::Dark => "dark",
            PokemonType::Steel => "steel",
            PokemonType::Fairy => "fairy",
        }
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Roster sheets were authored with both English and Spanish type names.
static TYPE_NAMES: phf::Map<&'static str, PokemonType> = phf::phf_map! {
    "normal" => PokemonType::Normal,
    "fire" => PokemonType::Fire,
    "fuego" => PokemonType::Fire,
    "water" => PokemonType::Water,
    "agua" => PokemonType::Water,
    "grass" => PokemonType::Grass,
    "planta" => PokemonType::Grass,
    "electric" => PokemonType::Electric,
    "electrico" => PokemonType::Electric,
    "eléctrico" => PokemonType::Electric,
    "ice" => PokemonType::Ice,
    "hielo" => PokemonType::Ice,
    "fighting" => PokemonType::Fighting,
    "lucha" => PokemonType::Fighting,
    "poison" => PokemonType::Poison,
    "veneno" => PokemonType::Poison,
    "ground" => PokemonType::Ground,
    "tierra" => PokemonType::Ground,
    "flying" => PokemonType::Flying,
    "volador" => PokemonType::Flying,
    "psychic" => PokemonType::Psychic,
    "psiquico" => PokemonType::Psychic,
    "psíquico" => PokemonType::Psychic,
    "bug" => PokemonType::Bug,
    "bicho" => PokemonType::Bug,
    "rock" => PokemonType::Rock,
    "roca" => PokemonType::Rock,
    "ghost" => PokemonType::Ghost,
    "fantasma" => PokemonType::Ghost,
    "dragon" => PokemonType::Dragon,
    "dragón" => PokemonType::Dragon,
    "dark" => PokemonType::Dark,
    "siniestro" => PokemonType::Dark,
    "steel" => PokemonType::Steel,
    "acero" => PokemonType::Steel,
    "fairy" => PokemonType::Fairy,
    "hada" => PokemonType::Fairy,
};

impl FromStr for PokemonType {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        TYPE_NAMES
            .get(key.as_str())
            .copied()
            .ok_or_else(|| RosterError::UnknownType(s.to_string()))
    }
}

impl TryFrom<String> for PokemonType {
    type Error = RosterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

const X: f64 = 0.0;
const H: f64 = 0.5;
const N: f64 = 1.0;
const S: f64 = 2.0;

// Rows: attacking type. Columns: defending type. Same order as `PokemonType::ALL`.
#[rustfmt::skip]
static TYPE_CHART: [[f64; TYPE_COUNT]; TYPE_COUNT] = [
    //  Nor Fir Wat Gra Ele Ice Fig Poi Gro Fly Psy Bug Roc Gho Dra Dar Ste Fai
    [   N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  H,  X,  N,  N,  H,  N ], // Normal
    [   N,  H,  H,  S,  N,  S,  N,  N,  N,  N,  N,  S,  H,  N,  H,  N,  S,  N ], // Fire
    [   N,  S,  H,  H,  N,  N,  N,  N,  S,  N,  N,  N,  S,  N,  H,  N,  N,  N ], // Water
    [   N,  H,  S,  H,  N,  N,  N,  H,  S,  H,  N,  H,  S,  N,  H,  N,  H,  N ], // Grass
    [   N,  N,  S,  H,  H,  N,  N,  N,  X,  S,  N,  N,  N,  N,  H,  N,  N,  N ], // Electric
    [   N,  H,  H,  S,  N,  H,  N,  N,  S,  S,  N,  N,  N,  N,  S,  N,  H,  N ], // Ice
    [   S,  N,  N,  N,  N,  S,  N,  H,  N,  H,  H,  H,  S,  X,  N,  S,  S,  H ], // Fighting
    [   N,  N,  N,  S,  N,  N,  N,  H,  H,  N,  N,  N,  H,  H,  N,  N,  X,  S ], // Poison
    [   N,  S,  N,  H,  S,  N,  N,  S,  N,  X,  N,  H,  S,  N,  N,  N,  S,  N ], // Ground
    [   N,  N,  N,  S,  H,  N,  S,  N,  N,  N,  N,  S,  H,  N,  N,  N,  H,  N ], // Flying
    [   N,  N,  N,  N,  N,  N,  S,  S,  N,  N,  H,  N,  N,  N,  N,  X,  H,  N ], // Psychic
    [   N,  H,  N,  S,  N,  N,  H,  H,  N,  H,  S,  N,  N,  H,  N,  S,  H,  H ], // Bug
    [   N,  S,  N,  N,  N,  S,  H,  N,  H,  S,  N,  S,  N,  N,  N,  N,  H,  N ], // Rock
    [   X,  N,  N,  N,  N,  N,  N,  N,  N,  N,  S,  N,  N,  S,  N,  H,  N,  N ], // Ghost
    [   N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  N,  S,  N,  H,  X ], // Dragon
    [   N,  N,  N,  N,  N,  N,  H,  N,  N,  N,  S,  N,  N,  S,  N,  H,  N,  H ], // Dark
    [   N,  H,  H,  N,  H,  S,  N,  N,  N,  N,  N,  N,  S,  N,  N,  N,  H,  S ], // Steel
    [   N,  H,  N,  N,  N,  N,  S,  H,  N,  N,  N,  N,  N,  N,  S,  S,  H,  N ], // Fairy
];

pub fn effectiveness(attacking: PokemonType, defending: PokemonType) -> f64 {
    TYPE_CHART[attacking.index()][defending.index()]
}

pub fn dual_effectiveness(
    attacking: PokemonType,
    primary: PokemonType,
    secondary: Option<PokemonType>,
) -> f64 {
    let second = secondary.map_or(1.0, |t| effectiveness(attacking, t));
    effectiveness(attacking, primary) * second
}
