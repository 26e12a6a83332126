use pokemon_battle_rl::config::EnvConfig;
use pokemon_battle_rl::error::RosterError;
use pokemon_battle_rl::model::parse_roster_book;
use pokemon_battle_rl::types::PokemonType;
use pokemon_battle_rl::{load_roster_book, select_rosters};
use std::path::Path;

fn book_json(attacks: &str, creature_attacks: &str, trainer_creatures: &str) -> String {
    format!(
        r#"{{
  "attacks": [{attacks}],
  "creatures": [
    {{ "id": 1, "name": "Blaze", "types": ["fire"],
      "stats": {{ "hp": 50, "atk": 50, "def": 50, "spa": 50, "spd": 50, "spe": 50 }},
      "attacks": [{creature_attacks}] }}
  ],
  "trainers": [{{ "id": 1, "name": "Red", "creatures": [{trainer_creatures}] }}]
}}"#
    )
}

const EMBER: &str =
    r#"{ "id": 1, "name": "Ember", "type": "fire", "category": "special", "power": 40, "accuracy": 100 }"#;

fn roster_error(raw: &str) -> RosterError {
    let err = parse_roster_book(raw).unwrap_err();
    err.downcast_ref::<RosterError>()
        .cloned()
        .unwrap_or_else(|| panic!("expected a roster error, got {err:#}"))
}

#[test]
fn sample_book_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/rosters.json");
    let book = load_roster_book(&path).unwrap();
    assert_eq!(book.trainers().len(), 4);

    let red = book.trainer("red").unwrap();
    assert_eq!(red.len(), 3);
    assert_eq!(red.creatures()[0].name(), "Pikachu");
    let lapras = &red.creatures()[2];
    assert_eq!(lapras.primary_type(), PokemonType::Water);
    assert_eq!(lapras.secondary_type(), Some(PokemonType::Ice));
    assert_eq!(lapras.max_hp(), 130.0);
    assert!(lapras.image().ends_with("Lapras.png"));

    let (agent, opponent) = select_rosters(&book, &EnvConfig::default()).unwrap();
    assert_eq!(agent.name(), "Red");
    assert_eq!(opponent.name(), "Brock");
    let named = EnvConfig {
        agent_trainer: Some("Lance".into()),
        opponent_trainer: Some("Misty".into()),
        ..EnvConfig::default()
    };
    let (agent, opponent) = select_rosters(&book, &named).unwrap();
    assert_eq!(agent.name(), "Lance");
    assert_eq!(opponent.name(), "Misty");
}

#[test]
fn attacks_are_shared_between_creatures() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/rosters.json");
    let book = load_roster_book(&path).unwrap();
    let lance = book.trainer("Lance").unwrap();
    let dragonite_wing = &lance.creatures()[0].attacks()[1];
    let aerodactyl_wing = &lance.creatures()[2].attacks()[0];
    assert!(std::sync::Arc::ptr_eq(dragonite_wing, aerodactyl_wing));
}

#[test]
fn unknown_trainer_and_missing_file_fail() {
    let raw = book_json(EMBER, r#""Ember""#, r#""Blaze""#);
    let book = parse_roster_book(&raw).unwrap();
    assert_eq!(
        book.trainer("Blue").unwrap_err(),
        RosterError::UnknownTrainer("Blue".into())
    );
    assert!(load_roster_book(Path::new("does/not/exist.json")).is_err());
}

#[test]
fn spanish_type_names_are_accepted() {
    let attack = r#"{ "id": 1, "name": "Ascuas", "type": "Fuego", "category": "special", "power": 40, "accuracy": 100 }"#;
    let book = parse_roster_book(&book_json(attack, r#""Ascuas""#, r#""Blaze""#)).unwrap();
    let red = book.trainer("Red").unwrap();
    assert_eq!(red.creatures()[0].attacks()[0].move_type(), PokemonType::Fire);
}

#[test]
fn unknown_type_fails_to_parse() {
    let attack = r#"{ "id": 1, "name": "Zap", "type": "plasma", "category": "special", "power": 40, "accuracy": 100 }"#;
    let err = parse_roster_book(&book_json(attack, r#""Zap""#, r#""Blaze""#)).unwrap_err();
    assert!(format!("{err:#}").contains("plasma"));
}

#[test]
fn missing_attack_reference_is_rejected() {
    let raw = book_json(EMBER, r#""Ember", "Surf""#, r#""Blaze""#);
    assert_eq!(
        roster_error(&raw),
        RosterError::MissingReference {
            owner: "Blaze".into(),
            kind: "attack",
            name: "Surf".into(),
        }
    );
}

#[test]
fn five_attacks_are_rejected() {
    let raw = book_json(
        EMBER,
        r#""Ember", "Ember", "Ember", "Ember", "Ember""#,
        r#""Blaze""#,
    );
    assert!(matches!(
        roster_error(&raw),
        RosterError::TooManyAttacks { count: 5, .. }
    ));
}

#[test]
fn accuracy_over_100_is_rejected() {
    let attack = r#"{ "id": 1, "name": "Ember", "type": "fire", "category": "special", "power": 40, "accuracy": 101 }"#;
    let raw = book_json(attack, r#""Ember""#, r#""Blaze""#);
    assert!(matches!(
        roster_error(&raw),
        RosterError::Accuracy { accuracy: 101, .. }
    ));
}

#[test]
fn oversized_roster_is_rejected() {
    let raw = book_json(EMBER, r#""Ember""#, r#""Blaze", "Blaze", "Blaze", "Blaze""#);
    assert!(matches!(
        roster_error(&raw),
        RosterError::RosterSize { count: 4, max: 3, .. }
    ));
}

#[test]
fn unknown_fields_are_rejected() {
    let raw = book_json(EMBER, r#""Ember""#, r#""Blaze""#)
        .replace(r#""name": "Red""#, r#""name": "Red", "badge": 8"#);
    assert!(parse_roster_book(&raw).is_err());
}
