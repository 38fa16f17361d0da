// One planning run: fetch, project, select, propose.
//
// Run order:
// 1. Catalog and fixtures
// 2. Current gameweek and horizon
// 3. Squad through the fallback chain, then the bank
// 4. League means, fixture index, squad projections
// 5. Captain, bench order, chip signals
// 6. Candidate pool projections and transfer proposals

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Availability, Catalog, Player};
use crate::chips::{chip_signals, ChipSignal};
use crate::config::{Config, ConfigError};
use crate::fixtures::FixtureIndex;
use crate::projection::Projector;
use crate::scorer::AppearanceRecord;
use crate::source::{
    DataSource, EntrySummary, FallbackChain, SourceError, SquadStrategy, SquadUnavailable,
};
use crate::squad::{bench_order, project_squad, select_captain, starters_by_points, ProjectedPlayer};
use crate::strength::LeagueStrengthMeans;
use crate::transfers::{propose_transfers, TransferProposal};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("the catalog lists no gameweeks")]
    NoGameweeks,

    #[error(transparent)]
    SquadUnavailable(#[from] SquadUnavailable),
}

/// Everything a presentation layer needs from one run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub team_id: u32,
    /// Team name from the entry summary, when the lookup succeeded.
    pub entry_name: Option<String>,
    pub gameweek: u32,
    pub deadline: Option<DateTime<Utc>>,
    pub horizon: Vec<u32>,
    pub picks_source: SquadStrategy,
    pub picks_gameweek: Option<u32>,
    pub bank: f64,
    pub free_transfers: usize,
    pub hit_penalty: f64,
    /// Whole squad in squad order.
    pub squad: Vec<ProjectedPlayer>,
    pub captain: Option<ProjectedPlayer>,
    pub transfers: Vec<TransferProposal>,
    pub chips: Vec<ChipSignal>,
    pub team_names: BTreeMap<u32, String>,
}

impl PlanReport {
    /// Starters by current-gameweek expected points, highest first.
    pub fn starters(&self) -> Vec<&ProjectedPlayer> {
        starters_by_points(&self.squad, self.gameweek)
    }

    /// Bench in suggested order for the current gameweek.
    pub fn bench(&self) -> Vec<&ProjectedPlayer> {
        bench_order(&self.squad, self.gameweek)
    }

    pub fn team_name(&self, team: u32) -> &str {
        self.team_names.get(&team).map(String::as_str).unwrap_or("?")
    }
}

pub struct Planner<'a, S: DataSource + ?Sized> {
    config: &'a Config,
    source: &'a S,
}

impl<'a, S: DataSource + ?Sized> Planner<'a, S> {
    pub fn new(config: &'a Config, source: &'a S) -> Self {
        Self { config, source }
    }

    pub fn run(&self) -> Result<PlanReport, PlanError> {
        let team_id = self.config.team_id()?;

        let catalog = self.source.catalog()?;
        let fixtures = self.source.fixtures()?;
        info!(
            players = catalog.players.len(),
            teams = catalog.teams.len(),
            fixtures = fixtures.len(),
            "catalog loaded"
        );

        let gameweek = catalog.current_gameweek().ok_or(PlanError::NoGameweeks)?;
        let horizon = catalog.horizon(gameweek, self.config.planner.horizon);
        let deadline = catalog.event(gameweek).and_then(|e| e.deadline);
        info!(gameweek, ?horizon, "planning window resolved");

        let resolved = FallbackChain::standard().resolve(
            self.source,
            team_id,
            gameweek,
            catalog.previous_gameweek(),
        )?;
        let entry = self.entry_or_default(team_id);
        let bank = resolved.picks.bank.or(entry.bank).unwrap_or(0.0);
        debug!(bank, from_picks = resolved.picks.bank.is_some(), "bank resolved");

        let index = FixtureIndex::build(&fixtures);
        let strengths = catalog.team_strengths();
        let means = LeagueStrengthMeans::compute(&catalog.teams);
        let projector = Projector::new(&self.config.projection, &index, &strengths, means);

        let squad = project_squad(&resolved.picks.picks, &catalog, &projector, &horizon, |p| {
            self.history_or_empty(p)
        });
        let captain = select_captain(&squad, gameweek).cloned();
        let chips = chip_signals(
            &squad,
            captain.as_ref(),
            gameweek,
            &fixtures,
            &self.config.chips,
        );

        let candidates = self.project_candidates(&catalog, &squad, &projector, &horizon);
        let transfers = propose_transfers(&squad, &candidates, bank, &self.config.transfers);

        let team_names = catalog
            .teams
            .iter()
            .map(|t| (t.id, t.short_name.clone()))
            .collect();

        Ok(PlanReport {
            team_id,
            entry_name: entry.name,
            gameweek,
            deadline,
            horizon,
            picks_source: resolved.strategy,
            picks_gameweek: resolved.gameweek,
            bank,
            free_transfers: self.config.transfers.free_transfers,
            hit_penalty: self.config.transfers.hit_penalty,
            squad,
            captain,
            transfers,
            chips,
            team_names,
        })
    }

    /// The bank falls back to the entry summary when the picks carry none.
    fn entry_or_default(&self, team_id: u32) -> EntrySummary {
        self.source.entry(team_id).unwrap_or_else(|e| {
            warn!("entry lookup failed, continuing without name or bank: {}", e);
            EntrySummary::default()
        })
    }

    fn history_or_empty(&self, player: &Player) -> Vec<AppearanceRecord> {
        self.source.player_history(player.id).unwrap_or_else(|e| {
            warn!(
                "history for {} ({}) unavailable, projecting from baseline: {}",
                player.name, player.id, e
            );
            Vec::new()
        })
    }

    fn project_candidates(
        &self,
        catalog: &Catalog,
        squad: &[ProjectedPlayer],
        projector: &Projector<'_>,
        horizon: &[u32],
    ) -> Vec<ProjectedPlayer> {
        let owned: HashSet<u32> = squad.iter().map(|p| p.id).collect();
        let pool = candidate_pool(catalog, &owned, self.config.transfers.candidate_pool);
        info!(pool = pool.len(), "projecting transfer candidates");

        pool.into_iter()
            .filter_map(|player| match self.source.player_history(player.id) {
                Ok(history) => {
                    let points = projector.project(player, &history, horizon);
                    Some(ProjectedPlayer::new(player, points, false))
                }
                Err(e) => {
                    warn!("dropping candidate {} ({}): {}", player.name, player.id, e);
                    None
                }
            })
            .collect()
    }
}

/// Available players outside the squad, best form first, at most `size`.
pub fn candidate_pool<'c>(
    catalog: &'c Catalog,
    owned: &HashSet<u32>,
    size: usize,
) -> Vec<&'c Player> {
    let mut pool: Vec<&Player> = catalog
        .players
        .iter()
        .filter(|p| p.availability == Availability::Available && !owned.contains(&p.id))
        .collect();
    pool.sort_by(|a, b| {
        let fa = a.form.unwrap_or(0.0);
        let fb = b.form.unwrap_or(0.0);
        fb.partial_cmp(&fa).unwrap_or(Ordering::Equal)
    });
    pool.truncate(size);
    debug!(size = pool.len(), "candidate pool built");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Position;

    fn player(id: u32, availability: Availability, form: Option<f64>) -> Player {
        Player {
            id,
            name: format!("P{id}"),
            position: Position::Midfielder,
            team: 1,
            cost: 5.0,
            availability,
            chance_of_playing: None,
            form,
        }
    }

    #[test]
    fn candidate_pool_filters_and_orders_by_form() {
        let catalog = Catalog {
            players: vec![
                player(1, Availability::Available, Some(3.0)),
                player(2, Availability::Doubtful, Some(9.0)),
                player(3, Availability::Available, None),
                player(4, Availability::Available, Some(7.5)),
                player(5, Availability::Available, Some(8.0)),
            ],
            ..Default::default()
        };
        let owned: HashSet<u32> = [5].into_iter().collect();
        let ids: Vec<u32> = candidate_pool(&catalog, &owned, 10)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![4, 1, 3]);

        let top: Vec<u32> = candidate_pool(&catalog, &owned, 1)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(top, vec![4]);
    }
}
