use crate::battle::Side;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("{creature} knows {count} attacks, at most {max} are allowed")]
    TooManyAttacks {
        creature: String,
        count: usize,
        max: usize,
    },
    #[error("{0} must know at least one attack")]
    NoAttacks(String),
    #[error("trainer {trainer} has {count} creatures, expected 1 to {max}")]
    RosterSize {
        trainer: String,
        count: usize,
        max: usize,
    },
    #[error("{creature} has a zero {stat} stat")]
    ZeroStat {
        creature: String,
        stat: &'static str,
    },
    #[error("attack {attack} has accuracy {accuracy}, must be within 0..=100")]
    Accuracy { attack: String, accuracy: u8 },
    #[error("{creature} declares {count} types, expected 1 or 2")]
    TypeCount { creature: String, count: usize },
    #[error("unknown type {0:?}")]
    UnknownType(String),
    #[error("{owner} references unknown {kind} {name:?}")]
    MissingReference {
        owner: String,
        kind: &'static str,
        name: String,
    },
    #[error("duplicate {kind} name {name:?}")]
    Duplicate { kind: &'static str, name: String },
    #[error("trainer {0:?} not found")]
    UnknownTrainer(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalActionError {
    #[error("side {side:?}: active creature has no attack in slot {slot}")]
    UnknownAttack { side: Side, slot: usize },
    #[error("side {side:?}: roster has no slot {slot}")]
    UnknownSlot { side: Side, slot: usize },
    #[error("side {side:?}: creature in slot {slot} has fainted")]
    Fainted { side: Side, slot: usize },
    #[error("side {side:?}: creature in slot {slot} is already active")]
    AlreadyActive { side: Side, slot: usize },
    #[error("side {side:?}: a fainted creature must be replaced before attacking")]
    ReplacementPending { side: Side },
    #[error("action id {0} is outside the action space")]
    UnknownActionId(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("step called before reset")]
    NotReset,
    #[error("step called after the episode finished")]
    EpisodeFinished,
    #[error("no legal action available")]
    NoLegalAction,
    #[error(transparent)]
    Illegal(#[from] IllegalActionError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("reward weight {name} must be non-negative, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },
    #[error("terminal reward {terminal} must exceed the per-turn clip {clip}")]
    TerminalBelowClip { terminal: f64, clip: f64 },
    #[error("{0}")]
    Invalid(String),
}
