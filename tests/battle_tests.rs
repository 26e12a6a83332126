use pokemon_battle_rl::battle::{
    play_out, Action, BattleEngine, BattleStatus, Side, SideView, TurnEvent,
};
use pokemon_battle_rl::damage::{accuracy_hits, resolve, resolve_with_roll};
use pokemon_battle_rl::error::IllegalActionError;
use pokemon_battle_rl::model::{Attack, Creature, MoveCategory, Roster, Stats};
use pokemon_battle_rl::policy::{BattlePolicy, GreedyPolicy, RandomPolicy};
use pokemon_battle_rl::types::PokemonType;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

fn make_attack(
    name: &str,
    move_type: PokemonType,
    category: MoveCategory,
    power: u32,
    accuracy: u8,
) -> Arc<Attack> {
    Arc::new(Attack::new(1, name, move_type, category, power, accuracy).unwrap())
}

fn make_creature(
    name: &str,
    types: &[PokemonType],
    hp: u32,
    speed: u32,
    attacks: Vec<Arc<Attack>>,
) -> Creature {
    Creature::new(
        1,
        name,
        types[0],
        types.get(1).copied(),
        Stats {
            hp,
            atk: 50,
            def: 50,
            spa: 50,
            spd: 50,
            spe: speed,
        },
        attacks,
        format!("{name}.png"),
    )
    .unwrap()
}

fn make_roster(name: &str, creatures: Vec<Creature>) -> Arc<Roster> {
    Arc::new(Roster::new(1, name, format!("{name}.png"), creatures).unwrap())
}

fn tackle(power: u32) -> Arc<Attack> {
    make_attack("Tackle", PokemonType::Normal, MoveCategory::Physical, power, 100)
}

fn normal_mon(name: &str, hp: u32, speed: u32, power: u32) -> Creature {
    make_creature(name, &[PokemonType::Normal], hp, speed, vec![tackle(power)])
}

/// Switches to the first living bench slot whenever it can.
struct SwitchingPolicy;

impl BattlePolicy for SwitchingPolicy {
    fn choose_action(&mut self, own: &SideView<'_>, _foe: &SideView<'_>) -> Action {
        own.living_bench()
            .next()
            .map_or(Action::Attack(0), Action::Switch)
    }

    fn choose_replacement(&mut self, own: &SideView<'_>, _foe: &SideView<'_>) -> usize {
        own.living_bench().next().unwrap_or(own.active_slot())
    }
}

#[test]
fn faster_fire_attacker_hits_grass_first() {
    let flame = make_attack("Flame", PokemonType::Fire, MoveCategory::Special, 60, 100);
    let fire = make_creature("Blaze", &[PokemonType::Fire], 200, 100, vec![flame]);
    let grass = make_creature("Leafy", &[PokemonType::Grass], 200, 50, vec![tackle(40)]);
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![fire]),
        make_roster("Green", vec![grass]),
        1,
    );

    let outcome = engine.apply_turn(Action::Attack(0)).unwrap();
    assert_eq!(outcome.turn, 1);
    assert_eq!(engine.turn(), 1);
    match &outcome.events[..] {
        [TurnEvent::Attacked {
            side: Side::A,
            effectiveness,
            damage,
            ..
        }, TurnEvent::Attacked { side: Side::B, .. }] => {
            assert_eq!(*effectiveness, 2.0);
            // 60 * 2 (super effective) * 1.5 (STAB) * 0.2
            assert!((damage - 36.0).abs() < 1e-9);
        }
        other => panic!("unexpected events {other:?}"),
    }
    assert!((engine.current_hp(Side::B, 0).unwrap() - 164.0).abs() < 1e-9);
    assert!((engine.current_hp(Side::A, 0).unwrap() - 192.0).abs() < 1e-9);
    assert!(outcome.log.iter().any(|l| l.contains("super effective")));
}

#[test]
fn accuracy_extremes_hold_for_every_roll() {
    for roll in 1..=100u8 {
        assert!(accuracy_hits(100, roll));
        assert!(!accuracy_hits(0, roll));
    }
    let never = make_attack("Never", PokemonType::Normal, MoveCategory::Physical, 80, 0);
    let a = normal_mon("A", 100, 10, 10);
    let b = normal_mon("B", 100, 10, 10);
    for seed in 0..200 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let outcome = resolve(&a, &b, &never, &mut rng);
        assert!(!outcome.hit);
        assert_eq!(outcome.amount, 0.0);
        assert_eq!(outcome.effectiveness, 1.0);
    }
}

#[test]
fn stab_and_type_effectiveness_affect_damage() {
    let fire_move = make_attack("Flame", PokemonType::Fire, MoveCategory::Special, 90, 100);
    let neutral_move = make_attack("Neutral", PokemonType::Normal, MoveCategory::Special, 90, 100);
    let attacker = make_creature("Blaze", &[PokemonType::Fire], 80, 80, vec![fire_move.clone()]);
    let grass = make_creature("Leafy", &[PokemonType::Grass], 80, 80, vec![neutral_move.clone()]);
    let water = make_creature("Splash", &[PokemonType::Water], 80, 80, vec![neutral_move.clone()]);
    let ghost = make_creature("Boo", &[PokemonType::Ghost], 80, 80, vec![neutral_move.clone()]);

    let fire_grass = resolve_with_roll(&attacker, &grass, &fire_move, 1);
    let fire_water = resolve_with_roll(&attacker, &water, &fire_move, 1);
    let neutral_grass = resolve_with_roll(&attacker, &grass, &neutral_move, 1);
    let neutral_ghost = resolve_with_roll(&attacker, &ghost, &neutral_move, 1);

    assert!(fire_grass.amount > fire_water.amount);
    assert!(fire_grass.amount > neutral_grass.amount);
    assert!(neutral_ghost.hit);
    assert_eq!(neutral_ghost.amount, 0.0);
    assert_eq!(neutral_ghost.effectiveness, 0.0);
}

#[test]
fn both_sides_switching_deals_no_damage() {
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![normal_mon("A1", 100, 50, 40), normal_mon("A2", 100, 50, 40)]),
        make_roster("Blue", vec![normal_mon("B1", 100, 60, 40), normal_mon("B2", 100, 60, 40)]),
        3,
    )
    .with_opponent(Box::new(SwitchingPolicy));

    let outcome = engine.apply_turn(Action::Switch(1)).unwrap();
    assert!(outcome
        .events
        .iter()
        .all(|e| matches!(e, TurnEvent::Switched { .. })));
    assert_eq!(outcome.events.len(), 2);
    assert_eq!(engine.active_slot(Side::A), 1);
    assert_eq!(engine.active_slot(Side::B), 1);
    for side in [Side::A, Side::B] {
        for slot in 0..2 {
            assert_eq!(engine.current_hp(side, slot), Some(100.0));
        }
    }
    assert_eq!(engine.turn(), 1);
}

#[test]
fn exact_knockout_ends_the_battle() {
    // 100 power * 1.5 STAB * 0.2 = 30, the defender's exact HP.
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![normal_mon("Hitter", 100, 90, 100)]),
        make_roster("Blue", vec![normal_mon("Target", 30, 10, 10)]),
        5,
    );
    let outcome = engine.apply_turn(Action::Attack(0)).unwrap();

    assert!(outcome.terminated());
    assert_eq!(outcome.status, BattleStatus::Terminal { winner: Side::A });
    assert_eq!(engine.winner(), Some(Side::A));
    assert_eq!(engine.current_hp(Side::B, 0), Some(0.0));
    assert_eq!(engine.remaining(Side::B), 0);
    assert!(engine.legal_actions(Side::A).is_empty());
    assert_eq!(outcome.terminal_reward, 10.0);
    assert!((outcome.reward - outcome.shaped_reward - 10.0).abs() < 1e-12);
    // The fainted defender never attacked.
    let attacks = outcome
        .events
        .iter()
        .filter(|e| matches!(e, TurnEvent::Attacked { .. }))
        .count();
    assert_eq!(attacks, 1);
    assert!(matches!(
        outcome.events.last(),
        Some(TurnEvent::BattleEnded { winner: Side::A })
    ));
}

#[test]
fn speed_ties_favour_side_a() {
    for seed in 0..20 {
        let mut engine = BattleEngine::new(
            make_roster("Red", vec![normal_mon("MonoA", 30, 80, 200)]),
            make_roster("Blue", vec![normal_mon("MonoB", 30, 80, 200)]),
            seed,
        );
        engine.apply_turn(Action::Attack(0)).unwrap();
        assert_eq!(engine.winner(), Some(Side::A), "seed {seed}");
    }
}

#[test]
fn faster_side_b_strikes_first() {
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![normal_mon("Slow", 30, 20, 200)]),
        make_roster("Blue", vec![normal_mon("Fast", 30, 120, 200)]),
        9,
    );
    let outcome = engine.apply_turn(Action::Attack(0)).unwrap();
    assert_eq!(engine.winner(), Some(Side::B));
    assert_eq!(outcome.terminal_reward, -10.0);
}

#[test]
fn opponent_faint_brings_in_replacement_and_skips_its_attack() {
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![normal_mon("Hitter", 100, 90, 200)]),
        make_roster("Blue", vec![normal_mon("B1", 30, 10, 50), normal_mon("B2", 80, 10, 50)]),
        11,
    );
    let outcome = engine.apply_turn(Action::Attack(0)).unwrap();

    assert!(!outcome.terminated());
    assert_eq!(engine.remaining(Side::B), 1);
    assert_eq!(engine.active_slot(Side::B), 1);
    assert!(outcome
        .events
        .contains(&TurnEvent::Fainted { side: Side::B, slot: 0 }));
    assert!(outcome
        .events
        .contains(&TurnEvent::Replaced { side: Side::B, slot: 1 }));
    assert_eq!(engine.current_hp(Side::A, 0), Some(100.0));
    assert!(!engine.needs_replacement(Side::B));
}

#[test]
fn agent_faint_forces_a_replacement_turn() {
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![normal_mon("A1", 30, 10, 10), normal_mon("A2", 100, 10, 10)]),
        make_roster("Blue", vec![normal_mon("Crusher", 300, 90, 200)]),
        13,
    );
    let first = engine.apply_turn(Action::Attack(0)).unwrap();
    assert!(first
        .events
        .contains(&TurnEvent::ReplacementRequired { side: Side::A }));
    assert!(engine.needs_replacement(Side::A));
    assert_eq!(engine.legal_actions(Side::A), vec![Action::Switch(1)]);
    assert_eq!(
        engine.apply_turn(Action::Attack(0)).unwrap_err(),
        IllegalActionError::ReplacementPending { side: Side::A }
    );
    assert_eq!(engine.turn(), 1);

    let replacement = engine.apply_turn(Action::Switch(1)).unwrap();
    assert_eq!(engine.turn(), 2);
    assert_eq!(
        replacement.events,
        vec![TurnEvent::Replaced { side: Side::A, slot: 1 }]
    );
    assert!(!engine.needs_replacement(Side::A));
    assert_eq!(engine.current_hp(Side::A, 1), Some(100.0));
}

#[test]
fn illegal_actions_are_rejected_without_mutation() {
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![normal_mon("A1", 30, 10, 10), normal_mon("A2", 100, 10, 10)]),
        make_roster("Blue", vec![normal_mon("Crusher", 300, 90, 200)]),
        17,
    );
    assert_eq!(
        engine.apply_turn(Action::Attack(3)).unwrap_err(),
        IllegalActionError::UnknownAttack { side: Side::A, slot: 3 }
    );
    assert_eq!(
        engine.apply_turn(Action::Switch(0)).unwrap_err(),
        IllegalActionError::AlreadyActive { side: Side::A, slot: 0 }
    );
    assert_eq!(
        engine.apply_turn(Action::Switch(5)).unwrap_err(),
        IllegalActionError::UnknownSlot { side: Side::A, slot: 5 }
    );
    assert_eq!(engine.turn(), 0);
    assert_eq!(engine.current_hp(Side::A, 0), Some(30.0));

    // A1 faints, then switching back to it is illegal.
    engine.apply_turn(Action::Attack(0)).unwrap();
    engine.apply_turn(Action::Switch(1)).unwrap();
    assert_eq!(
        engine.apply_turn(Action::Switch(0)).unwrap_err(),
        IllegalActionError::Fainted { side: Side::A, slot: 0 }
    );
}

#[test]
#[should_panic(expected = "finished battle")]
fn turn_after_the_end_panics() {
    let mut engine = BattleEngine::new(
        make_roster("Red", vec![normal_mon("Hitter", 100, 90, 200)]),
        make_roster("Blue", vec![normal_mon("Target", 30, 10, 10)]),
        19,
    );
    engine.apply_turn(Action::Attack(0)).unwrap();
    let _ = engine.apply_turn(Action::Attack(0));
}

fn mixed_rosters() -> (Arc<Roster>, Arc<Roster>) {
    let flame = make_attack("Flame", PokemonType::Fire, MoveCategory::Special, 70, 90);
    let surf = make_attack("Surf", PokemonType::Water, MoveCategory::Special, 70, 100);
    let leaf = make_attack("Leaf", PokemonType::Grass, MoveCategory::Physical, 60, 95);
    let bolt = make_attack("Bolt", PokemonType::Electric, MoveCategory::Special, 80, 70);
    let a = make_roster(
        "Red",
        vec![
            make_creature("Blaze", &[PokemonType::Fire], 90, 70, vec![flame.clone(), tackle(40)]),
            make_creature("Splash", &[PokemonType::Water], 110, 50, vec![surf.clone()]),
            make_creature("Spark", &[PokemonType::Electric], 70, 110, vec![bolt.clone(), tackle(40)]),
        ],
    );
    let b = make_roster(
        "Blue",
        vec![
            make_creature("Leafy", &[PokemonType::Grass, PokemonType::Poison], 100, 60, vec![leaf]),
            make_creature("Rocky", &[PokemonType::Rock], 120, 30, vec![tackle(50), surf]),
            make_creature("Ember", &[PokemonType::Fire], 80, 90, vec![flame, bolt]),
        ],
    );
    (a, b)
}

#[test]
fn random_play_keeps_invariants() {
    let (a, b) = mixed_rosters();
    for seed in 0..60 {
        let mut engine = BattleEngine::new(Arc::clone(&a), Arc::clone(&b), seed)
            .with_opponent(Box::new(RandomPolicy::new(seed + 1000)));
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut last = [engine.remaining(Side::A), engine.remaining(Side::B)];
        while !engine.is_terminal() && engine.turn() < 500 {
            let legal = engine.legal_actions(Side::A);
            if engine.needs_replacement(Side::A) {
                assert!(legal.iter().all(|a| matches!(a, Action::Switch(_))));
            }
            assert_eq!(engine.menu(Side::A).len(), legal.len());
            let action = *legal.choose(&mut rng).unwrap();
            let turn_before = engine.turn();
            let outcome = engine.apply_turn(action).unwrap();
            assert_eq!(engine.turn(), turn_before + 1);

            let clip = engine.shaper().weights().clip;
            assert!(outcome.shaped_reward.abs() <= clip + 1e-12);
            assert_eq!(outcome.terminal_reward != 0.0, outcome.terminated());

            let now = [engine.remaining(Side::A), engine.remaining(Side::B)];
            assert!(now[0] <= last[0] && now[1] <= last[1], "seed {seed}");
            last = now;
            for side in [Side::A, Side::B] {
                let view = engine.view(side);
                for slot in 0..view.roster().len() {
                    let hp = view.hp(slot);
                    assert!(hp >= 0.0 && hp <= view.creature(slot).max_hp());
                }
            }
        }
        assert!(engine.is_terminal(), "seed {seed} did not finish");
    }
}

#[test]
fn same_seed_replays_identically() {
    let (a, b) = mixed_rosters();
    let run = |seed| {
        let mut engine = BattleEngine::new(Arc::clone(&a), Arc::clone(&b), seed)
            .with_opponent(Box::new(RandomPolicy::new(seed)));
        let mut side_a = RandomPolicy::new(seed + 1);
        let winner = play_out(&mut engine, &mut side_a, 500).unwrap();
        (winner, engine.log().text())
    };
    for seed in 0..10 {
        assert_eq!(run(seed), run(seed));
    }
}

#[test]
fn greedy_play_out_finishes() {
    let (a, b) = mixed_rosters();
    for seed in 0..10 {
        let mut engine = BattleEngine::new(Arc::clone(&a), Arc::clone(&b), seed)
            .with_opponent(Box::new(GreedyPolicy));
        let winner = play_out(&mut engine, &mut GreedyPolicy, 500).unwrap();
        assert!(winner.is_some());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.turn, engine.turn());
        assert!(snapshot.sides.iter().any(|s| s.remaining == 0));
        assert!(serde_json::to_string(&snapshot).unwrap().contains("Terminal"));
    }
}

#[test]
fn snapshot_log_holds_only_the_latest_turn() {
    let a = make_roster("Red", vec![normal_mon("A1", 200, 50, 10)]);
    let b = make_roster("Blue", vec![normal_mon("B1", 200, 40, 10)]);
    let mut engine = BattleEngine::new(a, b, 9);
    assert_eq!(engine.snapshot().log, "Battle start: Red vs Blue!");

    for turn in 1..=3 {
        let outcome = engine.apply_turn(Action::Attack(0)).unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.log, outcome.log.join("\n"));
        assert!(snapshot.log.starts_with(&format!("==== TURN {turn} ====")));
        assert!(!snapshot.log.contains("Battle start"));
        assert!(engine.log().lines().len() > outcome.log.len());
    }
}
