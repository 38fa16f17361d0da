// Squad aggregation and captain/bench selection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

use crate::catalog::{Catalog, Player, Position};
use crate::projection::{horizon_total, GameweekPoints, Projector};
use crate::scorer::AppearanceRecord;

/// Squad slots 1..=11 start; 12..=15 are the bench.
pub const STARTING_SLOTS: u8 = 11;

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

/// One squad member as delivered by the picks endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    #[serde(rename = "element")]
    pub player_id: u32,
    /// 1-based squad order.
    #[serde(rename = "position")]
    pub squad_position: u8,
}

/// The user's current squad and, when the endpoint reports it, the bank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SquadPicks {
    pub picks: Vec<Pick>,
    pub bank: Option<f64>,
}

// ---------------------------------------------------------------------------
// ProjectedPlayer
// ---------------------------------------------------------------------------

/// A player with per-gameweek expected points for this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPlayer {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub team: u32,
    pub cost: f64,
    pub xpts_by_gw: GameweekPoints,
    pub xpts_total: f64,
    pub starter: bool,
}

impl ProjectedPlayer {
    pub fn new(player: &Player, xpts_by_gw: GameweekPoints, starter: bool) -> Self {
        let xpts_total = horizon_total(&xpts_by_gw);
        Self {
            id: player.id,
            name: player.name.clone(),
            position: player.position,
            team: player.team,
            cost: player.cost,
            xpts_by_gw,
            xpts_total,
            starter,
        }
    }

    /// Expected points in one gameweek; 0.0 outside the horizon.
    pub fn xpts(&self, gameweek: u32) -> f64 {
        self.xpts_by_gw.get(&gameweek).copied().unwrap_or(0.0)
    }
}

/// Project every pick that exists in the catalog, in squad order.
///
/// `history` is called once per squad member. Picks referencing unknown
/// players are skipped with a warning.
pub fn project_squad<F>(
    picks: &[Pick],
    catalog: &Catalog,
    projector: &Projector<'_>,
    horizon: &[u32],
    mut history: F,
) -> Vec<ProjectedPlayer>
where
    F: FnMut(&Player) -> Vec<AppearanceRecord>,
{
    let mut ordered = picks.to_vec();
    ordered.sort_by_key(|p| p.squad_position);

    let by_id = catalog.players_by_id();
    ordered
        .iter()
        .filter_map(|pick| {
            let Some(&player) = by_id.get(&pick.player_id) else {
                warn!("pick references unknown player {}, skipping", pick.player_id);
                return None;
            };
            let hist = history(player);
            let points = projector.project(player, &hist, horizon);
            Some(ProjectedPlayer::new(
                player,
                points,
                pick.squad_position <= STARTING_SLOTS,
            ))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

pub fn starters(squad: &[ProjectedPlayer]) -> impl Iterator<Item = &ProjectedPlayer> {
    squad.iter().filter(|p| p.starter)
}

pub fn bench(squad: &[ProjectedPlayer]) -> impl Iterator<Item = &ProjectedPlayer> {
    squad.iter().filter(|p| !p.starter)
}

/// Starter with the most expected points in `gameweek`. The first maximum
/// in squad order wins ties.
pub fn select_captain(squad: &[ProjectedPlayer], gameweek: u32) -> Option<&ProjectedPlayer> {
    starters(squad).fold(None, |best: Option<&ProjectedPlayer>, p| match best {
        Some(b) if p.xpts(gameweek) <= b.xpts(gameweek) => Some(b),
        _ => Some(p),
    })
}

/// Bench players by ascending expected points; at equal points goalkeepers
/// sort after outfield players.
pub fn bench_order(squad: &[ProjectedPlayer], gameweek: u32) -> Vec<&ProjectedPlayer> {
    let mut out: Vec<&ProjectedPlayer> = bench(squad).collect();
    out.sort_by(|a, b| {
        a.xpts(gameweek)
            .partial_cmp(&b.xpts(gameweek))
            .unwrap_or(Ordering::Equal)
            .then(a.position.is_goalkeeper().cmp(&b.position.is_goalkeeper()))
    });
    out
}

/// Starters by descending expected points in `gameweek`, for display.
pub fn starters_by_points(squad: &[ProjectedPlayer], gameweek: u32) -> Vec<&ProjectedPlayer> {
    let mut out: Vec<&ProjectedPlayer> = starters(squad).collect();
    out.sort_by(|a, b| {
        b.xpts(gameweek)
            .partial_cmp(&a.xpts(gameweek))
            .unwrap_or(Ordering::Equal)
    });
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    pub(crate) fn projected(
        id: u32,
        position: Position,
        team: u32,
        cost: f64,
        gw_points: &[(u32, f64)],
        starter: bool,
    ) -> ProjectedPlayer {
        let xpts_by_gw: BTreeMap<u32, f64> = gw_points.iter().copied().collect();
        let xpts_total = xpts_by_gw.values().sum();
        ProjectedPlayer {
            id,
            name: format!("P{id}"),
            position,
            team,
            cost,
            xpts_by_gw,
            xpts_total,
            starter,
        }
    }

    #[test]
    fn captain_is_best_starter_first_max_wins() {
        let squad = vec![
            projected(1, Position::Midfielder, 1, 8.0, &[(5, 6.0)], true),
            projected(2, Position::Forward, 2, 9.0, &[(5, 7.5)], true),
            projected(3, Position::Forward, 3, 9.0, &[(5, 7.5)], true),
            projected(4, Position::Midfielder, 4, 5.0, &[(5, 12.0)], false),
        ];
        let captain = select_captain(&squad, 5).unwrap();
        assert_eq!(captain.id, 2);
    }

    #[test]
    fn no_starters_means_no_captain() {
        let squad = vec![projected(4, Position::Midfielder, 4, 5.0, &[(5, 2.0)], false)];
        assert!(select_captain(&squad, 5).is_none());
    }

    #[test]
    fn bench_sorts_ascending_with_keeper_last_on_ties() {
        let squad = vec![
            projected(12, Position::Goalkeeper, 1, 4.0, &[(5, 2.0)], false),
            projected(13, Position::Defender, 2, 4.0, &[(5, 2.0)], false),
            projected(14, Position::Midfielder, 3, 4.5, &[(5, 1.5)], false),
            projected(15, Position::Forward, 4, 4.5, &[(5, 3.0)], false),
            projected(1, Position::Forward, 4, 4.5, &[(5, 0.1)], true),
        ];
        let order: Vec<u32> = bench_order(&squad, 5).iter().map(|p| p.id).collect();
        assert_eq!(order, vec![14, 13, 12, 15]);
    }

    #[test]
    fn xpts_outside_horizon_is_zero() {
        let p = projected(1, Position::Forward, 1, 7.0, &[(5, 4.0)], true);
        assert_eq!(p.xpts(6), 0.0);
        assert_eq!(p.xpts(5), 4.0);
    }

    #[test]
    fn starters_by_points_is_descending() {
        let squad = vec![
            projected(1, Position::Defender, 1, 4.0, &[(5, 2.0)], true),
            projected(2, Position::Forward, 2, 4.0, &[(5, 5.0)], true),
            projected(3, Position::Midfielder, 3, 4.0, &[(5, 3.0)], true),
        ];
        let order: Vec<u32> = starters_by_points(&squad, 5).iter().map(|p| p.id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }
}
