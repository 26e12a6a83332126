use crate::damage::{DamageOutcome, Effectiveness};

#[derive(Clone, Debug, Default)]
pub struct BattleLog {
    lines: Vec<String>,
}

impl BattleLog {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn mark(&self) -> usize {
        self.lines.len()
    }

    pub fn lines_since(&self, mark: usize) -> &[String] {
        &self.lines[mark.min(self.lines.len())..]
    }

    pub fn log_start(&mut self, trainer_a: &str, trainer_b: &str) {
        self.lines
            .push(format!("Battle start: {trainer_a} vs {trainer_b}!"));
    }

    pub fn log_turn(&mut self, turn: u32) {
        self.lines.push(format!("==== TURN {turn} ===="));
    }

    pub fn log_attack(
        &mut self,
        attacker: &str,
        attack: &str,
        defender: &str,
        outcome: &DamageOutcome,
        percent: f64,
    ) {
        self.lines.push(format!("{attacker} used {attack} on {defender}..."));
        if !outcome.hit {
            self.lines.push("The attack missed!".to_string());
            return;
        }
        if let Some(msg) = Effectiveness::from_multiplier(outcome.effectiveness).message() {
            self.lines.push(msg.to_string());
        }
        if percent > 0.0 {
            self.lines.push(format!("...it dealt {percent:.2}% damage."));
        }
    }

    pub fn log_switch(&mut self, trainer: &str, from: &str, to: &str) {
        self.lines
            .push(format!("{trainer} withdrew {from} and sent out {to}!"));
    }

    pub fn log_replacement(&mut self, trainer: &str, creature: &str) {
        self.lines.push(format!("{trainer} sent out {creature}!"));
    }

    pub fn log_faint(&mut self, creature: &str) {
        self.lines.push(format!("{creature} fainted!"));
    }

    pub fn log_replacement_required(&mut self, trainer: &str) {
        self.lines
            .push(format!("{trainer} must choose a new creature."));
    }

    pub fn log_status(&mut self, trainer: &str, creature: &str, hp: f64, max_hp: f64) {
        let pct = if max_hp > 0.0 { hp / max_hp * 100.0 } else { 0.0 };
        self.lines.push(format!(
            "-> {trainer}: {creature} {hp:.0}/{max_hp:.0} HP ({pct:.1}%)"
        ));
    }

    pub fn log_reward(&mut self, reward: f64) {
        self.lines.push(format!("reward: {reward:.2}"));
    }

    pub fn log_win(&mut self, winner: &str) {
        self.lines.push(format!("The winner is {winner}!"));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}
