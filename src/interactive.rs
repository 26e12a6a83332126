use crate::battle::{BattleEngine, MenuEntry, Side};
use anyhow::Context;
use std::io::{BufRead, Write};
use std::path::Path;

fn write_snapshot(engine: &BattleEngine, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&engine.snapshot())?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))
}

fn print_menu<W: Write>(output: &mut W, engine: &BattleEngine, menu: &[MenuEntry]) -> anyhow::Result<()> {
    for side in [Side::A, Side::B] {
        let view = engine.view(side);
        let active = view.active();
        writeln!(
            output,
            "{}: {} {:.0}/{:.0} HP, {} left",
            view.roster().name(),
            active.name(),
            view.active_hp(),
            active.max_hp(),
            view.remaining()
        )?;
    }
    if engine.needs_replacement(Side::A) {
        writeln!(output, "Your creature fainted. Choose a replacement:")?;
    } else {
        writeln!(output, "Choose an action:")?;
    }
    for (idx, entry) in menu.iter().enumerate() {
        writeln!(output, "  {}. {}", idx + 1, entry.label)?;
    }
    write!(output, "> ")?;
    output.flush()?;
    Ok(())
}

/// Returns the winner, or `None` when the player quits (`q` or end of input).
pub fn play_interactive<R: BufRead, W: Write>(
    engine: &mut BattleEngine,
    mut input: R,
    output: &mut W,
    snapshot_path: Option<&Path>,
) -> anyhow::Result<Option<Side>> {
    for line in engine.log().lines() {
        writeln!(output, "{line}")?;
    }
    if let Some(path) = snapshot_path {
        write_snapshot(engine, path)?;
    }

    while !engine.is_terminal() {
        let menu = engine.menu(Side::A);
        print_menu(output, engine, &menu)?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(None);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        let entry = match line.parse::<usize>() {
            Ok(n) if (1..=menu.len()).contains(&n) => &menu[n - 1],
            _ => {
                writeln!(output, "Invalid choice {line:?}, enter 1-{}.", menu.len())?;
                continue;
            }
        };

        let outcome = engine
            .apply_turn(entry.action)
            .context("Battle rejected a turn")?;
        for line in &outcome.log {
            writeln!(output, "{line}")?;
        }
        if let Some(path) = snapshot_path {
            write_snapshot(engine, path)?;
        }
    }
    Ok(engine.winner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attack, Creature, MoveCategory, Roster, Stats};
    use crate::types::PokemonType;
    use std::io::Cursor;
    use std::sync::Arc;

    fn roster(name: &str, power: u32, speed: u32) -> Arc<Roster> {
        let attack = Arc::new(
            Attack::new(1, "Tackle", PokemonType::Normal, MoveCategory::Physical, power, 100)
                .unwrap(),
        );
        let stats = Stats {
            hp: 50,
            atk: 10,
            def: 10,
            spa: 10,
            spd: 10,
            spe: speed,
        };
        let creature =
            Creature::new(1, format!("{name}mon"), PokemonType::Normal, None, stats, vec![attack], "")
                .unwrap();
        Arc::new(Roster::new(1, name, "", vec![creature]).unwrap())
    }

    #[test]
    fn reprompts_then_finishes() {
        // 500 power with STAB deals 150, one hit ends it.
        let mut engine = BattleEngine::new(roster("Red", 500, 20), roster("Blue", 1, 10), 7);
        let mut out = Vec::new();
        let winner =
            play_interactive(&mut engine, Cursor::new("abc\n9\n1\n"), &mut out, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(winner, Some(Side::A));
        assert_eq!(text.matches("Invalid choice").count(), 2);
        assert!(text.contains("The winner is Red!"));
    }

    #[test]
    fn end_of_input_quits() {
        let mut engine = BattleEngine::new(roster("Red", 1, 20), roster("Blue", 1, 10), 7);
        let mut out = Vec::new();
        let winner = play_interactive(&mut engine, Cursor::new(""), &mut out, None).unwrap();
        assert_eq!(winner, None);
        assert_eq!(engine.turn(), 0);
    }
}
