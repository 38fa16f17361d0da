// League-average team strength, used to turn one opponent's rating into a
// relative multiplier.

use crate::catalog::{Team, TeamStrength};

/// Which of the four strength ratings to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthField {
    AttackHome,
    AttackAway,
    DefenceHome,
    DefenceAway,
}

impl StrengthField {
    /// The opponent rating that matters for a player.
    ///
    /// Attackers face the opponent's defence, defenders and keepers face the
    /// opponent's attack. The opponent plays away when the player is at home.
    pub fn opposing(player_is_attacker: bool, player_at_home: bool) -> Self {
        match (player_is_attacker, player_at_home) {
            (true, true) => StrengthField::DefenceAway,
            (true, false) => StrengthField::DefenceHome,
            (false, true) => StrengthField::AttackAway,
            (false, false) => StrengthField::AttackHome,
        }
    }
}

impl TeamStrength {
    pub fn get(&self, field: StrengthField) -> f64 {
        match field {
            StrengthField::AttackHome => self.attack_home,
            StrengthField::AttackAway => self.attack_away,
            StrengthField::DefenceHome => self.defence_home,
            StrengthField::DefenceAway => self.defence_away,
        }
    }
}

/// Arithmetic mean of each strength field across every team.
///
/// Computed once per run and never mutated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeagueStrengthMeans(TeamStrength);

impl LeagueStrengthMeans {
    pub fn compute(teams: &[Team]) -> Self {
        if teams.is_empty() {
            return Self::default();
        }
        let n = teams.len() as f64;
        let sum = |f: StrengthField| teams.iter().map(|t| t.strength.get(f)).sum::<f64>() / n;
        LeagueStrengthMeans(TeamStrength {
            attack_home: sum(StrengthField::AttackHome),
            attack_away: sum(StrengthField::AttackAway),
            defence_home: sum(StrengthField::DefenceHome),
            defence_away: sum(StrengthField::DefenceAway),
        })
    }

    pub fn get(&self, field: StrengthField) -> f64 {
        self.0.get(field)
    }

    /// `mean / opponent` for the given field, unclamped.
    ///
    /// A zero or missing rating on either side resolves to 1.0 so an empty
    /// league or a team without ratings is neutral.
    pub fn relative_ratio(&self, field: StrengthField, opponent: &TeamStrength) -> f64 {
        let mean = self.get(field);
        let opp = opponent.get(field);
        if opp <= 0.0 || mean <= 0.0 {
            1.0
        } else {
            mean / opp
        }
    }
}
