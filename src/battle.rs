use crate::battle_log::BattleLog;
use crate::damage::resolve;
use crate::error::IllegalActionError;
use crate::model::{Creature, Roster};
use crate::policy::{BattlePolicy, FirstAttackPolicy};
use crate::reward::{ActionKind, RewardShaper, TurnSummary};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Action {
    Attack(usize),
    Switch(usize),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum BattleStatus {
    InProgress,
    Terminal { winner: Side },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TurnEvent {
    Switched {
        side: Side,
        from: usize,
        to: usize,
    },
    Attacked {
        side: Side,
        attack: String,
        hit: bool,
        damage: f64,
        effectiveness: f64,
    },
    Fainted {
        side: Side,
        slot: usize,
    },
    Replaced {
        side: Side,
        slot: usize,
    },
    ReplacementRequired {
        side: Side,
    },
    BattleEnded {
        winner: Side,
    },
}

#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub turn: u32,
    pub events: Vec<TurnEvent>,
    pub shaped_reward: f64,
    pub terminal_reward: f64,
    pub reward: f64,
    pub status: BattleStatus,
    pub log: Vec<String>,
}

impl TurnOutcome {
    pub fn terminated(&self) -> bool {
        matches!(self.status, BattleStatus::Terminal { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MenuEntry {
    pub action: Action,
    pub label: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SideSnapshot {
    pub trainer: String,
    pub trainer_image: String,
    pub active: String,
    pub active_image: String,
    pub hp: f64,
    pub max_hp: f64,
    pub remaining: usize,
    pub needs_replacement: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct BattleSnapshot {
    pub turn: u32,
    pub status: BattleStatus,
    pub sides: [SideSnapshot; 2],
    pub log: String,
}

struct SideState {
    roster: Arc<Roster>,
    hp: Vec<f64>,
    active: usize,
    remaining: usize,
    pending_replacement: bool,
}

impl SideState {
    fn new(roster: Arc<Roster>) -> Self {
        let hp: Vec<f64> = roster.creatures().iter().map(|c| c.max_hp()).collect();
        let remaining = hp.len();
        SideState {
            roster,
            hp,
            active: 0,
            remaining,
            pending_replacement: false,
        }
    }

    fn active_creature(&self) -> &Creature {
        &self.roster.creatures()[self.active]
    }

    fn is_alive(&self, slot: usize) -> bool {
        self.hp.get(slot).is_some_and(|hp| *hp > 0.0)
    }

    fn view(&self) -> SideView<'_> {
        SideView {
            roster: &self.roster,
            hp: &self.hp,
            active: self.active,
            remaining: self.remaining,
        }
    }
}

#[derive(Clone, Copy)]
pub struct SideView<'a> {
    roster: &'a Roster,
    hp: &'a [f64],
    active: usize,
    remaining: usize,
}

impl<'a> SideView<'a> {
    pub fn roster(&self) -> &'a Roster {
        self.roster
    }

    pub fn creature(&self, slot: usize) -> &'a Creature {
        &self.roster.creatures()[slot]
    }

    pub fn active(&self) -> &'a Creature {
        self.creature(self.active)
    }

    pub fn active_slot(&self) -> usize {
        self.active
    }

    pub fn hp(&self, slot: usize) -> f64 {
        self.hp[slot]
    }

    pub fn active_hp(&self) -> f64 {
        self.hp[self.active]
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn living_bench(&self) -> impl Iterator<Item = usize> + 'a {
        let hp = self.hp;
        let active = self.active;
        (0..hp.len()).filter(move |&slot| slot != active && hp[slot] > 0.0)
    }
}

#[derive(Default)]
struct PhaseReport {
    dealt: f64,
    received: f64,
    opponent_fainted: bool,
    agent_fainted: bool,
}

pub struct BattleEngine {
    sides: [SideState; 2],
    turn: u32,
    status: BattleStatus,
    rng: SmallRng,
    opponent: Box<dyn BattlePolicy>,
    shaper: RewardShaper,
    log: BattleLog,
    last_turn_log: Vec<String>,
}

impl BattleEngine {
    pub fn new(roster_a: Arc<Roster>, roster_b: Arc<Roster>, seed: u64) -> Self {
        let mut log = BattleLog::new();
        log.log_start(roster_a.name(), roster_b.name());
        BattleEngine {
            sides: [SideState::new(roster_a), SideState::new(roster_b)],
            turn: 0,
            status: BattleStatus::InProgress,
            rng: SmallRng::seed_from_u64(seed),
            opponent: Box::new(FirstAttackPolicy),
            shaper: RewardShaper::default(),
            last_turn_log: log.lines().to_vec(),
            log,
        }
    }

    pub fn with_opponent(mut self, opponent: Box<dyn BattlePolicy>) -> Self {
        self.opponent = opponent;
        self
    }

    pub fn with_shaper(mut self, shaper: RewardShaper) -> Self {
        self.shaper = shaper;
        self
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, BattleStatus::Terminal { .. })
    }

    pub fn winner(&self) -> Option<Side> {
        match self.status {
            BattleStatus::Terminal { winner } => Some(winner),
            BattleStatus::InProgress => None,
        }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn view(&self, side: Side) -> SideView<'_> {
        self.sides[side.index()].view()
    }

    pub fn roster(&self, side: Side) -> &Roster {
        &self.sides[side.index()].roster
    }

    pub fn active(&self, side: Side) -> &Creature {
        self.sides[side.index()].active_creature()
    }

    pub fn active_slot(&self, side: Side) -> usize {
        self.sides[side.index()].active
    }

    pub fn current_hp(&self, side: Side, slot: usize) -> Option<f64> {
        self.sides[side.index()].hp.get(slot).copied()
    }

    pub fn active_hp(&self, side: Side) -> f64 {
        let state = &self.sides[side.index()];
        state.hp[state.active]
    }

    pub fn remaining(&self, side: Side) -> usize {
        self.sides[side.index()].remaining
    }

    pub fn needs_replacement(&self, side: Side) -> bool {
        self.sides[side.index()].pending_replacement
    }

    pub fn log(&self) -> &BattleLog {
        &self.log
    }

    pub fn shaper(&self) -> &RewardShaper {
        &self.shaper
    }

    pub fn legal_actions(&self, side: Side) -> Vec<Action> {
        if self.is_terminal() {
            return Vec::new();
        }
        let state = &self.sides[side.index()];
        let mut actions = Vec::new();
        if !state.pending_replacement {
            actions.extend((0..state.active_creature().attacks().len()).map(Action::Attack));
        }
        actions.extend(state.view().living_bench().map(Action::Switch));
        actions
    }

    pub fn validate(&self, side: Side, action: Action) -> Result<(), IllegalActionError> {
        let state = &self.sides[side.index()];
        match action {
            Action::Attack(slot) => {
                if state.pending_replacement {
                    return Err(IllegalActionError::ReplacementPending { side });
                }
                if state.active_creature().attack(slot).is_none() {
                    return Err(IllegalActionError::UnknownAttack { side, slot });
                }
            }
            Action::Switch(slot) => {
                if slot >= state.roster.len() {
                    return Err(IllegalActionError::UnknownSlot { side, slot });
                }
                if !state.is_alive(slot) {
                    return Err(IllegalActionError::Fainted { side, slot });
                }
                if slot == state.active {
                    return Err(IllegalActionError::AlreadyActive { side, slot });
                }
            }
        }
        Ok(())
    }

    pub fn menu(&self, side: Side) -> Vec<MenuEntry> {
        let state = &self.sides[side.index()];
        self.legal_actions(side)
            .into_iter()
            .map(|action| {
                let label = match action {
                    Action::Attack(slot) => {
                        let attack = &state.active_creature().attacks()[slot];
                        format!(
                            "{} ({}, {:?}, power {}, accuracy {})",
                            attack.name(),
                            attack.move_type(),
                            attack.category(),
                            attack.power(),
                            attack.accuracy()
                        )
                    }
                    Action::Switch(slot) => {
                        let creature = &state.roster.creatures()[slot];
                        format!(
                            "Switch to {} ({:.0}/{:.0} HP)",
                            creature.name(),
                            state.hp[slot],
                            creature.max_hp()
                        )
                    }
                };
                MenuEntry { action, label }
            })
            .collect()
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        let side = |state: &SideState| {
            let active = state.active_creature();
            SideSnapshot {
                trainer: state.roster.name().to_string(),
                trainer_image: state.roster.image().to_string(),
                active: active.name().to_string(),
                active_image: active.image().to_string(),
                hp: state.hp[state.active],
                max_hp: active.max_hp(),
                remaining: state.remaining,
                needs_replacement: state.pending_replacement,
            }
        };
        BattleSnapshot {
            turn: self.turn,
            status: self.status,
            sides: [side(&self.sides[0]), side(&self.sides[1])],
            log: self.last_turn_log.join("\n"),
        }
    }

    /// While side A owes a forced replacement the only legal actions are
    /// switches, and that turn consists of the replacement alone.
    ///
    /// # Panics
    /// If the battle already ended.
    pub fn apply_turn(&mut self, action_a: Action) -> Result<TurnOutcome, IllegalActionError> {
        assert!(!self.is_terminal(), "apply_turn called on a finished battle");
        self.validate(Side::A, action_a)?;

        let forced = self.sides[0].pending_replacement;
        let action_b = if forced {
            None
        } else {
            let choice = self
                .opponent
                .choose_action(&self.sides[1].view(), &self.sides[0].view());
            self.validate(Side::B, choice)?;
            Some(choice)
        };

        let mark = self.log.mark();
        let turn = self.turn + 1;
        self.log.log_turn(turn);
        let agent_start = self.sides[0].active;
        let mut events = Vec::new();

        let report = match action_b {
            None => {
                if let Action::Switch(slot) = action_a {
                    self.bring_in(Side::A, slot, &mut events);
                }
                PhaseReport::default()
            }
            Some(action_b) => self.resolve_actions(action_a, action_b, &mut events),
        };
        let agent_slot = match action_a {
            Action::Switch(slot) => slot,
            Action::Attack(_) => agent_start,
        };
        let opponent_slot = match events.iter().find_map(|e| match e {
            TurnEvent::Fainted {
                side: Side::B,
                slot,
            } => Some(*slot),
            _ => None,
        }) {
            Some(fainted) => fainted,
            None => self.sides[1].active,
        };

        let roster_a = Arc::clone(&self.sides[0].roster);
        let roster_b = Arc::clone(&self.sides[1].roster);
        let agent = &roster_a.creatures()[agent_slot];
        let action = match action_a {
            Action::Attack(slot) => ActionKind::Attack(&agent.attacks()[slot]),
            Action::Switch(_) => ActionKind::Switch {
                from: &roster_a.creatures()[agent_start],
            },
        };
        let summary = TurnSummary {
            dealt: report.dealt,
            received: report.received,
            agent,
            opponent: &roster_b.creatures()[opponent_slot],
            action,
            opponent_fainted: report.opponent_fainted,
            agent_fainted: report.agent_fainted,
        };
        let shaped_reward = self.shaper.shape(&summary);
        let terminal_reward = self.winner().map_or(0.0, |w| self.shaper.terminal(w));
        let reward = shaped_reward + terminal_reward;

        for state in &self.sides {
            let active = state.active_creature();
            self.log.log_status(
                state.roster.name(),
                active.name(),
                state.hp[state.active],
                active.max_hp(),
            );
        }
        self.log.log_reward(reward);
        self.turn = turn;
        self.check_invariants();
        self.last_turn_log = self.log.lines_since(mark).to_vec();

        Ok(TurnOutcome {
            turn,
            events,
            shaped_reward,
            terminal_reward,
            reward,
            status: self.status,
            log: self.last_turn_log.clone(),
        })
    }

    fn resolve_actions(
        &mut self,
        action_a: Action,
        action_b: Action,
        events: &mut Vec<TurnEvent>,
    ) -> PhaseReport {
        let planned = [(Side::A, action_a), (Side::B, action_b)];
        for (side, action) in planned {
            if let Action::Switch(slot) = action {
                self.bring_in(side, slot, events);
            }
        }

        let mut attackers: Vec<(Side, usize)> = planned
            .iter()
            .filter_map(|(side, action)| match action {
                Action::Attack(slot) => Some((*side, *slot)),
                Action::Switch(_) => None,
            })
            .collect();
        // Stable sort: equal speed keeps side A first.
        attackers.sort_by(|lhs, rhs| {
            self.active(rhs.0)
                .speed()
                .cmp(&self.active(lhs.0).speed())
        });

        let mut report = PhaseReport::default();
        for (side, slot) in attackers {
            let (applied, fainted) = self.execute_attack(side, slot, events);
            match side {
                Side::A => report.dealt = applied,
                Side::B => report.received = applied,
            }
            if fainted {
                match side {
                    Side::A => report.opponent_fainted = true,
                    Side::B => report.agent_fainted = true,
                }
                // The fainted creature was the only one left to act.
                self.handle_faint(side.opponent(), events);
                break;
            }
        }
        report
    }

    fn execute_attack(
        &mut self,
        side: Side,
        slot: usize,
        events: &mut Vec<TurnEvent>,
    ) -> (f64, bool) {
        let defender_side = side.opponent();
        let attacker = self.sides[side.index()].active_creature();
        let defender = self.sides[defender_side.index()].active_creature();
        let attack = &attacker.attacks()[slot];
        let outcome = resolve(attacker, defender, attack, &mut self.rng);

        let percent = outcome.amount / defender.max_hp() * 100.0;
        self.log.log_attack(
            attacker.name(),
            attack.name(),
            defender.name(),
            &outcome,
            percent,
        );
        debug!(
            ?side,
            attacker = attacker.name(),
            attack = attack.name(),
            defender = defender.name(),
            hit = outcome.hit,
            damage = outcome.amount,
            effectiveness = outcome.effectiveness,
            "attack resolved"
        );
        events.push(TurnEvent::Attacked {
            side,
            attack: attack.name().to_string(),
            hit: outcome.hit,
            damage: outcome.amount,
            effectiveness: outcome.effectiveness,
        });

        let state = &mut self.sides[defender_side.index()];
        let before = state.hp[state.active];
        let after = (before - outcome.amount).max(0.0);
        state.hp[state.active] = after;
        (before - after, before > 0.0 && after <= 0.0)
    }

    fn handle_faint(&mut self, side: Side, events: &mut Vec<TurnEvent>) {
        let state = &mut self.sides[side.index()];
        assert!(state.remaining > 0, "faint on a side with nothing left");
        let slot = state.active;
        state.remaining -= 1;
        let remaining = state.remaining;
        let name = state.active_creature().name().to_string();
        self.log.log_faint(&name);
        events.push(TurnEvent::Fainted { side, slot });
        debug!(?side, creature = %name, remaining, "creature fainted");

        if remaining == 0 {
            let winner = side.opponent();
            self.status = BattleStatus::Terminal { winner };
            let winner_name = self.sides[winner.index()].roster.name().to_string();
            self.log.log_win(&winner_name);
            events.push(TurnEvent::BattleEnded { winner });
            info!(?winner, trainer = %winner_name, turn = self.turn + 1, "battle ended");
            return;
        }

        match side {
            Side::A => {
                self.sides[0].pending_replacement = true;
                let trainer = self.sides[0].roster.name().to_string();
                self.log.log_replacement_required(&trainer);
                events.push(TurnEvent::ReplacementRequired { side });
            }
            Side::B => {
                let choice = self
                    .opponent
                    .choose_replacement(&self.sides[1].view(), &self.sides[0].view());
                assert!(
                    self.sides[1].is_alive(choice),
                    "opponent policy picked fainted or missing slot {choice}"
                );
                self.bring_in(Side::B, choice, events);
            }
        }
    }

    fn bring_in(&mut self, side: Side, slot: usize, events: &mut Vec<TurnEvent>) {
        let state = &mut self.sides[side.index()];
        let from = state.active;
        let forced = state.pending_replacement || !state.is_alive(from);
        state.active = slot;
        state.pending_replacement = false;
        let trainer = state.roster.name().to_string();
        let incoming = state.roster.creatures()[slot].name().to_string();
        if forced {
            self.log.log_replacement(&trainer, &incoming);
            events.push(TurnEvent::Replaced { side, slot });
        } else {
            let outgoing = state.roster.creatures()[from].name().to_string();
            self.log.log_switch(&trainer, &outgoing, &incoming);
            events.push(TurnEvent::Switched {
                side,
                from,
                to: slot,
            });
        }
        debug!(?side, from, to = slot, forced, "active creature changed");
    }

    fn check_invariants(&self) {
        for state in &self.sides {
            for (creature, hp) in state.roster.creatures().iter().zip(&state.hp) {
                assert!(
                    *hp >= 0.0 && *hp <= creature.max_hp(),
                    "{} has {hp} HP outside [0, {}]",
                    creature.name(),
                    creature.max_hp()
                );
            }
            let alive = state.hp.iter().filter(|hp| **hp > 0.0).count();
            assert_eq!(state.remaining, alive, "remaining count out of sync");
        }
        let someone_out = self.sides.iter().any(|s| s.remaining == 0);
        assert_eq!(someone_out, self.is_terminal(), "terminal status out of sync");
    }
}

pub fn play_out(
    engine: &mut BattleEngine,
    side_a: &mut dyn BattlePolicy,
    max_turns: u32,
) -> Result<Option<Side>, IllegalActionError> {
    while !engine.is_terminal() && engine.turn() < max_turns {
        let own = engine.view(Side::A);
        let foe = engine.view(Side::B);
        let action = if engine.needs_replacement(Side::A) {
            Action::Switch(side_a.choose_replacement(&own, &foe))
        } else {
            side_a.choose_action(&own, &foe)
        };
        engine.apply_turn(action)?;
    }
    Ok(engine.winner())
}
