// Fixture list parsing and per-team, per-gameweek lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixture {
    pub id: u32,
    /// `None` for blank or postponed fixtures that have no gameweek yet.
    pub gameweek: Option<u32>,
    pub home_team: u32,
    pub away_team: u32,
    /// 1 = easiest .. 5 = hardest, from the home side's point of view.
    pub home_difficulty: u8,
    pub away_difficulty: u8,
}

/// Which side of a fixture a team is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl Fixture {
    pub fn side_of(&self, team: u32) -> Option<Side> {
        if self.home_team == team {
            Some(Side::Home)
        } else if self.away_team == team {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, team: u32) -> Option<u32> {
        match self.side_of(team)? {
            Side::Home => Some(self.away_team),
            Side::Away => Some(self.home_team),
        }
    }

    pub fn difficulty_for(&self, team: u32) -> Option<u8> {
        match self.side_of(team)? {
            Side::Home => Some(self.home_difficulty),
            Side::Away => Some(self.away_difficulty),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    event: Option<u32>,
    team_h: u32,
    team_a: u32,
    #[serde(default)]
    team_h_difficulty: Option<u8>,
    #[serde(default)]
    team_a_difficulty: Option<u8>,
}

const DEFAULT_DIFFICULTY: u8 = 3;

/// Parse the fixtures document, skipping rows without both team ids.
pub fn parse_fixtures(value: Value) -> Result<Vec<Fixture>, serde_json::Error> {
    let rows: Vec<Value> = serde_json::from_value(value)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<RawFixture>(row) {
            Ok(raw) => Some(Fixture {
                id: raw.id,
                gameweek: raw.event,
                home_team: raw.team_h,
                away_team: raw.team_a,
                home_difficulty: raw.team_h_difficulty.unwrap_or(DEFAULT_DIFFICULTY),
                away_difficulty: raw.team_a_difficulty.unwrap_or(DEFAULT_DIFFICULTY),
            }),
            Err(e) => {
                warn!("skipping malformed fixture row: {}", e);
                None
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// FixtureIndex
// ---------------------------------------------------------------------------

/// team id -> gameweek -> fixtures in input order.
///
/// Fixtures without a gameweek are left out of the index.
#[derive(Debug, Clone, Default)]
pub struct FixtureIndex {
    by_team: HashMap<u32, BTreeMap<u32, Vec<Fixture>>>,
}

impl FixtureIndex {
    pub fn build(fixtures: &[Fixture]) -> Self {
        let mut by_team: HashMap<u32, BTreeMap<u32, Vec<Fixture>>> = HashMap::new();
        for f in fixtures {
            let Some(gw) = f.gameweek else {
                continue;
            };
            for team in [f.home_team, f.away_team] {
                by_team
                    .entry(team)
                    .or_default()
                    .entry(gw)
                    .or_default()
                    .push(f.clone());
            }
        }
        FixtureIndex { by_team }
    }

    /// Fixtures for a team in one gameweek. Empty for a blank gameweek.
    pub fn fixtures_for(&self, team: u32, gameweek: u32) -> &[Fixture] {
        self.by_team
            .get(&team)
            .and_then(|gws| gws.get(&gameweek))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Teams with more than one fixture in `gameweek`, with their fixture count.
///
/// Counted straight from the raw list rather than the index.
pub fn double_gameweek_teams(fixtures: &[Fixture], gameweek: u32) -> HashMap<u32, usize> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for f in fixtures.iter().filter(|f| f.gameweek == Some(gameweek)) {
        *counts.entry(f.home_team).or_insert(0) += 1;
        *counts.entry(f.away_team).or_insert(0) += 1;
    }
    counts.retain(|_, &mut c| c > 1);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture(id: u32, gw: Option<u32>, home: u32, away: u32) -> Fixture {
        Fixture {
            id,
            gameweek: gw,
            home_team: home,
            away_team: away,
            home_difficulty: 3,
            away_difficulty: 3,
        }
    }

    #[test]
    fn index_groups_by_team_and_gameweek() {
        let fixtures = vec![
            fixture(1, Some(2), 1, 2),
            fixture(2, Some(2), 3, 1),
            fixture(3, Some(3), 2, 3),
            fixture(4, None, 1, 3),
        ];
        let idx = FixtureIndex::build(&fixtures);

        let team1_gw2: Vec<u32> = idx.fixtures_for(1, 2).iter().map(|f| f.id).collect();
        assert_eq!(team1_gw2, vec![1, 2]);
        assert_eq!(idx.fixtures_for(2, 3).len(), 1);
        assert!(idx.fixtures_for(1, 3).is_empty());
        assert!(idx.fixtures_for(99, 2).is_empty());
    }

    #[test]
    fn unscheduled_fixtures_are_not_indexed() {
        let idx = FixtureIndex::build(&[fixture(4, None, 1, 3)]);
        assert!(idx.by_team.is_empty());
    }

    #[test]
    fn double_gameweeks_come_from_raw_list() {
        let fixtures = vec![
            fixture(1, Some(2), 1, 2),
            fixture(2, Some(2), 1, 3),
            fixture(3, Some(3), 2, 3),
            fixture(4, None, 1, 2),
        ];
        let dgw = double_gameweek_teams(&fixtures, 2);
        assert_eq!(dgw.len(), 1);
        assert_eq!(dgw[&1], 2);
        assert!(double_gameweek_teams(&fixtures, 3).is_empty());
    }

    #[test]
    fn side_and_difficulty_lookup() {
        let f = Fixture {
            home_difficulty: 2,
            away_difficulty: 4,
            ..fixture(1, Some(1), 10, 20)
        };
        assert_eq!(f.side_of(10), Some(Side::Home));
        assert_eq!(f.side_of(20), Some(Side::Away));
        assert_eq!(f.side_of(30), None);
        assert_eq!(f.opponent_of(20), Some(10));
        assert_eq!(f.difficulty_for(10), Some(2));
        assert_eq!(f.difficulty_for(20), Some(4));
    }

    #[test]
    fn parse_fixtures_defaults_missing_difficulty() {
        let value = json!([
            {"id": 9001, "event": 2, "team_h": 1, "team_a": 2,
             "team_h_difficulty": 2, "team_a_difficulty": 4},
            {"id": 9002, "event": null, "team_h": 1, "team_a": 2},
            {"id": 9003, "event": 3}
        ]);
        let fixtures = parse_fixtures(value).unwrap();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].home_difficulty, 2);
        assert_eq!(fixtures[1].gameweek, None);
        assert_eq!(fixtures[1].away_difficulty, 3);
    }
}
