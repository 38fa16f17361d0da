// Advisory chip signals. Nothing here blocks or changes a plan.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::config::ChipConfig;
use crate::fixtures::{double_gameweek_teams, Fixture};
use crate::squad::{bench, ProjectedPlayer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chip", rename_all = "snake_case")]
pub enum ChipSignal {
    /// The bench projects well enough to be worth playing.
    BenchBoost { bench_points: f64 },
    /// The captain's team plays more than once this gameweek.
    TripleCaptain {
        player_id: u32,
        name: String,
        fixtures: usize,
    },
}

impl fmt::Display for ChipSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipSignal::BenchBoost { bench_points } => {
                write!(f, "Bench Boost looks viable (bench xPts ~ {bench_points:.1})")
            }
            ChipSignal::TripleCaptain { name, fixtures, .. } => {
                write!(f, "Triple Captain candidate: {name} ({fixtures} fixtures this gameweek)")
            }
        }
    }
}

/// Bench boost when bench expected points reach the threshold; triple
/// captain when the captain's team has a double gameweek.
pub fn chip_signals(
    squad: &[ProjectedPlayer],
    captain: Option<&ProjectedPlayer>,
    gameweek: u32,
    fixtures: &[Fixture],
    config: &ChipConfig,
) -> Vec<ChipSignal> {
    let mut out = Vec::new();

    let bench_points: f64 = bench(squad).map(|p| p.xpts(gameweek)).sum();
    debug!(gameweek, bench_points, "bench boost check");
    if bench_points >= config.bench_boost_threshold {
        out.push(ChipSignal::BenchBoost { bench_points });
    }

    if let Some(cap) = captain {
        let doubles = double_gameweek_teams(fixtures, gameweek);
        if let Some(&count) = doubles.get(&cap.team) {
            if count >= config.double_gameweek_fixtures {
                out.push(ChipSignal::TripleCaptain {
                    player_id: cap.id,
                    name: cap.name.clone(),
                    fixtures: count,
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Position;
    use crate::squad::tests::projected;

    fn fixture(id: u32, gw: u32, home: u32, away: u32) -> Fixture {
        Fixture {
            id,
            gameweek: Some(gw),
            home_team: home,
            away_team: away,
            home_difficulty: 3,
            away_difficulty: 3,
        }
    }

    fn squad(bench_each: f64) -> Vec<ProjectedPlayer> {
        vec![
            projected(1, Position::Forward, 1, 9.0, &[(10, 8.0)], true),
            projected(2, Position::Midfielder, 2, 7.0, &[(10, 5.0)], true),
            projected(12, Position::Goalkeeper, 3, 4.0, &[(10, bench_each)], false),
            projected(13, Position::Defender, 4, 4.0, &[(10, bench_each)], false),
            projected(14, Position::Midfielder, 5, 4.5, &[(10, bench_each)], false),
            projected(15, Position::Forward, 6, 4.5, &[(10, bench_each)], false),
        ]
    }

    #[test]
    fn bench_boost_at_threshold() {
        let s = squad(3.0);
        let signals = chip_signals(&s, None, 10, &[], &ChipConfig::default());
        assert_eq!(signals, vec![ChipSignal::BenchBoost { bench_points: 12.0 }]);

        let s = squad(2.9);
        assert!(chip_signals(&s, None, 10, &[], &ChipConfig::default()).is_empty());
    }

    #[test]
    fn triple_captain_needs_double_gameweek() {
        let s = squad(0.0);
        let captain = &s[0];
        let single = vec![fixture(1, 10, 1, 2)];
        assert!(chip_signals(&s, Some(captain), 10, &single, &ChipConfig::default()).is_empty());

        let double = vec![fixture(1, 10, 1, 2), fixture(2, 10, 3, 1)];
        let signals = chip_signals(&s, Some(captain), 10, &double, &ChipConfig::default());
        assert_eq!(signals.len(), 1);
        match &signals[0] {
            ChipSignal::TripleCaptain { player_id, fixtures, .. } => {
                assert_eq!(*player_id, 1);
                assert_eq!(*fixtures, 2);
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[test]
    fn double_in_another_gameweek_does_not_count() {
        let s = squad(0.0);
        let fixtures = vec![fixture(1, 11, 1, 2), fixture(2, 11, 3, 1)];
        assert!(chip_signals(&s, Some(&s[0]), 10, &fixtures, &ChipConfig::default()).is_empty());
    }

    #[test]
    fn signals_render_readably() {
        let bb = ChipSignal::BenchBoost { bench_points: 13.46 };
        assert_eq!(bb.to_string(), "Bench Boost looks viable (bench xPts ~ 13.5)");
        let tc = ChipSignal::TripleCaptain {
            player_id: 1,
            name: "Haaland".into(),
            fixtures: 2,
        };
        assert!(tc.to_string().contains("Haaland"));
    }
}
