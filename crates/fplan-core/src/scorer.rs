// Per-player scoring inputs derived from recent appearances.
//
// Two numbers come out of a player's history: a decayed recent-points rate
// and a minutes/availability confidence scalar. Both are pure functions of
// the history and the catalog entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Player;
use crate::config::ProjectionConfig;

/// Minutes threshold for an appearance to count toward "nailed" status.
const NAILED_MINUTES: u32 = 30;
/// How many of the most recent appearances the nailed check looks at.
const NAILED_LOOKBACK: usize = 3;
/// Appearances in the lookback that must reach `NAILED_MINUTES`.
const NAILED_REQUIRED: usize = 2;

/// One past fixture for a player. Histories are ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceRecord {
    #[serde(default)]
    pub minutes: u32,
    #[serde(default, rename = "total_points")]
    pub points: i32,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    #[serde(default)]
    history: Vec<AppearanceRecord>,
}

/// Parse an element-summary document into its appearance history.
pub fn parse_history(value: Value) -> Result<Vec<AppearanceRecord>, serde_json::Error> {
    let raw: RawSummary = serde_json::from_value(value)?;
    Ok(raw.history)
}

fn tail(history: &[AppearanceRecord], n: usize) -> &[AppearanceRecord] {
    &history[history.len().saturating_sub(n)..]
}

/// Exponentially decayed mean of points over the last `window` appearances
/// that had minutes, newest weighted highest (`decay^0`).
///
/// `None` when no appearance in the window had minutes; callers substitute a
/// baseline in that case.
pub fn recent_points_rate(history: &[AppearanceRecord], window: usize, decay: f64) -> Option<f64> {
    let mut weight = 1.0;
    let mut num = 0.0;
    let mut den = 0.0;
    for app in tail(history, window).iter().rev().filter(|a| a.minutes > 0) {
        num += app.points as f64 * weight;
        den += weight;
        weight *= decay;
    }
    if den > 0.0 {
        Some(num / den)
    } else {
        None
    }
}

/// Mean minutes over the last `window` appearances with minutes, / 90, capped at 1.
pub fn minutes_rate(history: &[AppearanceRecord], window: usize) -> f64 {
    let played: Vec<u32> = tail(history, window)
        .iter()
        .map(|a| a.minutes)
        .filter(|&m| m > 0)
        .collect();
    if played.is_empty() {
        return 0.0;
    }
    let mean = played.iter().sum::<u32>() as f64 / played.len() as f64;
    (mean / 90.0).min(1.0)
}

/// Explicit chance-of-playing if present, otherwise derived from status.
pub fn availability_confidence(player: &Player) -> f64 {
    match player.chance_of_playing {
        Some(pct) => (pct / 100.0).clamp(0.0, 1.0),
        None => player.availability.confidence(),
    }
}

/// Fewer than two of the last three appearances reached 30 minutes.
pub fn is_not_nailed(history: &[AppearanceRecord]) -> bool {
    let nailed = tail(history, NAILED_LOOKBACK)
        .iter()
        .filter(|a| a.minutes >= NAILED_MINUTES)
        .count();
    nailed < NAILED_REQUIRED
}

/// `0.6 * availability + 0.4 * minutes_rate`, then the not-nailed penalty.
pub fn minutes_confidence(
    player: &Player,
    history: &[AppearanceRecord],
    config: &ProjectionConfig,
) -> f64 {
    let c = availability_confidence(player);
    let m_rate = minutes_rate(history, config.minutes_window);
    let blended = 0.6 * c + 0.4 * m_rate;
    if is_not_nailed(history) {
        blended * config.not_nailed_penalty
    } else {
        blended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Availability, Position};

    fn apps(rows: &[(u32, i32)]) -> Vec<AppearanceRecord> {
        rows.iter()
            .map(|&(minutes, points)| AppearanceRecord { minutes, points })
            .collect()
    }

    fn player(availability: Availability, chance: Option<f64>) -> Player {
        Player {
            id: 1,
            name: "Test".into(),
            position: Position::Midfielder,
            team: 1,
            cost: 5.0,
            availability,
            chance_of_playing: chance,
            form: None,
        }
    }

    #[test]
    fn recent_rate_weights_newest_highest() {
        let history = apps(&[(90, 2), (90, 6), (90, 2), (90, 1)]);
        let rate = recent_points_rate(&history, 8, 0.88).unwrap();
        let weights = [1.0, 0.88, 0.88 * 0.88, 0.88 * 0.88 * 0.88];
        let points = [1.0, 2.0, 6.0, 2.0];
        let expected: f64 = weights.iter().zip(points).map(|(w, p)| w * p).sum::<f64>()
            / weights.iter().sum::<f64>();
        assert!((rate - expected).abs() < 1e-12);
    }

    #[test]
    fn recent_rate_ignores_zero_minute_entries_and_old_games() {
        let mut history = apps(&[(90, 20)]);
        history.extend(apps(&[(90, 4); 8]));
        history.push(AppearanceRecord { minutes: 0, points: 0 });
        // The 20-pointer is outside the last 8 entries.
        let rate = recent_points_rate(&history, 8, 0.88).unwrap();
        assert!((rate - 4.0).abs() < 1e-12);
    }

    #[test]
    fn recent_rate_is_none_without_minutes() {
        assert!(recent_points_rate(&[], 8, 0.88).is_none());
        let history = apps(&[(0, 0); 6]);
        assert!(recent_points_rate(&history, 8, 0.88).is_none());
    }

    #[test]
    fn minutes_rate_caps_at_one() {
        assert_eq!(minutes_rate(&apps(&[(90, 0), (90, 0)]), 6), 1.0);
        let rate = minutes_rate(&apps(&[(0, 0), (45, 0), (90, 0)]), 6);
        assert!((rate - 67.5 / 90.0).abs() < 1e-12);
        assert_eq!(minutes_rate(&[], 6), 0.0);
    }

    #[test]
    fn chance_of_playing_overrides_status() {
        assert_eq!(availability_confidence(&player(Availability::Injured, Some(75.0))), 0.75);
        assert_eq!(availability_confidence(&player(Availability::Available, Some(150.0))), 1.0);
        assert_eq!(availability_confidence(&player(Availability::Available, Some(-5.0))), 0.0);
        assert_eq!(availability_confidence(&player(Availability::Doubtful, None)), 0.75);
    }

    #[test]
    fn nailed_check_uses_last_three_appearances() {
        assert!(!is_not_nailed(&apps(&[(0, 0), (90, 0), (30, 0), (10, 0)])));
        assert!(is_not_nailed(&apps(&[(90, 0), (90, 0), (29, 0), (10, 0)])));
        assert!(is_not_nailed(&apps(&[(90, 0)])));
        assert!(is_not_nailed(&[]));
    }

    #[test]
    fn zero_minutes_history_keeps_only_availability_share() {
        let cfg = ProjectionConfig::default();
        let history = apps(&[(0, 0); 6]);
        let ms = minutes_confidence(&player(Availability::Available, None), &history, &cfg);
        assert!((ms - 0.6 * 0.7).abs() < 1e-12);
    }

    #[test]
    fn nailed_starter_gets_full_confidence() {
        let cfg = ProjectionConfig::default();
        let history = apps(&[(90, 2); 6]);
        let ms = minutes_confidence(&player(Availability::Available, None), &history, &cfg);
        assert!((ms - 1.0).abs() < 1e-12);
    }

    #[test]
    fn parse_history_reads_minutes_and_points() {
        let value = serde_json::json!({
            "history": [
                {"minutes": 90, "total_points": 6, "round": 1},
                {"minutes": 12, "total_points": -1, "round": 2}
            ],
            "fixtures": []
        });
        let history = parse_history(value).unwrap();
        assert_eq!(history, apps(&[(90, 6), (12, -1)]));
        assert!(parse_history(serde_json::json!({})).unwrap().is_empty());
    }
}
