// Per-fixture expected-points projection.
//
// For each (player, gameweek):
//   base    = (1 - R) * recent_rate + R * positional_baseline
//   per fix = max(floor, base * minutes_confidence * fixture_multiplier)
//   gw xPts = sum over the team's fixtures that gameweek (0.0 when blank)
//
// The fixture multiplier is the pluggable part: either a clamped
// opponent-strength ratio or a difficulty-rating lookup, times a home/away
// edge. Regression, clamping and the floor together keep a single noisy
// match or an extreme team rating from producing outliers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::catalog::{Player, TeamStrength};
use crate::config::ProjectionConfig;
use crate::fixtures::{Fixture, FixtureIndex, Side};
use crate::scorer::{self, AppearanceRecord};
use crate::strength::{LeagueStrengthMeans, StrengthField};

/// Expected points keyed by gameweek id.
pub type GameweekPoints = BTreeMap<u32, f64>;

/// How a single fixture's difficulty turns into a multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureScoring {
    /// Opponent strength relative to the league mean, clamped.
    #[default]
    StrengthNormalized,
    /// Fixture difficulty rating bands only.
    SimpleDifficulty,
}

const EASY_FIXTURE_MULTIPLIER: f64 = 1.12;
const HARD_FIXTURE_MULTIPLIER: f64 = 0.90;

/// Difficulty band multiplier: 1-2 easy, 3 neutral, 4-5 hard.
fn difficulty_multiplier(difficulty: u8) -> f64 {
    match difficulty {
        0..=2 => EASY_FIXTURE_MULTIPLIER,
        3 => 1.0,
        _ => HARD_FIXTURE_MULTIPLIER,
    }
}

/// Projects expected points for any player over any gameweeks.
///
/// Holds only read-only references and the precomputed league means, so
/// projecting the same inputs twice yields identical output.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    config: &'a ProjectionConfig,
    index: &'a FixtureIndex,
    teams: &'a HashMap<u32, TeamStrength>,
    means: LeagueStrengthMeans,
}

impl<'a> Projector<'a> {
    pub fn new(
        config: &'a ProjectionConfig,
        index: &'a FixtureIndex,
        teams: &'a HashMap<u32, TeamStrength>,
        means: LeagueStrengthMeans,
    ) -> Self {
        Self {
            config,
            index,
            teams,
            means,
        }
    }

    /// Regressed per-appearance rate before fixture adjustments.
    ///
    /// Without any minutes in the recent window the player's form stands in
    /// for the recent rate, and the positional baseline when form is absent.
    pub fn base_rate(&self, player: &Player, history: &[AppearanceRecord]) -> f64 {
        let baseline = self.config.baselines.for_position(player.position);
        let recent = scorer::recent_points_rate(
            history,
            self.config.recent_window,
            self.config.recent_decay,
        )
        .unwrap_or_else(|| match player.form {
            Some(form) if form > 0.0 => form,
            _ => baseline,
        });
        let r = self.config.regression_factor;
        (1.0 - r) * recent + r * baseline
    }

    /// Opponent-strength ratio for one fixture, clamped to the configured range.
    ///
    /// 1.0 when the player's team is not in the fixture or the opponent has
    /// no ratings.
    pub fn strength_ratio(&self, fixture: &Fixture, player: &Player) -> f64 {
        let (Some(side), Some(opponent)) =
            (fixture.side_of(player.team), fixture.opponent_of(player.team))
        else {
            return 1.0;
        };
        let Some(opp) = self.teams.get(&opponent) else {
            return 1.0;
        };
        let field = StrengthField::opposing(player.position.is_attacker(), side == Side::Home);
        self.means
            .relative_ratio(field, opp)
            .clamp(self.config.ratio_min, self.config.ratio_max)
    }

    /// Full fixture multiplier: strategy scalar times home/away edge.
    pub fn fixture_multiplier(&self, fixture: &Fixture, player: &Player) -> f64 {
        let edge = match fixture.side_of(player.team) {
            Some(Side::Home) => self.config.home_edge,
            Some(Side::Away) => self.config.away_edge,
            None => 1.0,
        };
        let scalar = match self.config.scoring {
            FixtureScoring::StrengthNormalized => self.strength_ratio(fixture, player),
            FixtureScoring::SimpleDifficulty => fixture
                .difficulty_for(player.team)
                .map(difficulty_multiplier)
                .unwrap_or(1.0),
        };
        scalar * edge
    }

    /// Expected points per gameweek in `horizon`.
    pub fn project(
        &self,
        player: &Player,
        history: &[AppearanceRecord],
        horizon: &[u32],
    ) -> GameweekPoints {
        let base = self.base_rate(player, history);
        let ms = scorer::minutes_confidence(player, history, self.config);

        horizon
            .iter()
            .map(|&gw| {
                let xpts: f64 = self
                    .index
                    .fixtures_for(player.team, gw)
                    .iter()
                    .map(|f| {
                        (base * ms * self.fixture_multiplier(f, player))
                            .max(self.config.fixture_floor)
                    })
                    .sum();
                (gw, xpts)
            })
            .collect()
    }
}

/// Sum of expected points across the horizon.
pub fn horizon_total(points: &GameweekPoints) -> f64 {
    points.values().sum()
}
