// Squad lookup with ordered fallbacks.
//
// The picks for the gameweek being planned do not exist until its deadline
// has passed, so the chain falls back to the last finished gameweek and then
// to the authenticated my-team view. Each strategy either yields picks or a
// reason; the first success wins.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use super::{DataSource, SourceError};
use crate::squad::SquadPicks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SquadStrategy {
    /// Picks submitted for the gameweek being planned.
    RequestedGameweek,
    /// Picks from the most recent gameweek flagged previous.
    PreviousGameweek,
    /// The private my-team endpoint.
    MyTeam,
}

impl fmt::Display for SquadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SquadStrategy::RequestedGameweek => "requested gameweek",
            SquadStrategy::PreviousGameweek => "previous gameweek",
            SquadStrategy::MyTeam => "my-team",
        };
        f.write_str(s)
    }
}

/// Picks plus where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSquad {
    pub picks: SquadPicks,
    pub strategy: SquadStrategy,
    /// Gameweek the picks belong to; `None` for my-team.
    pub gameweek: Option<u32>,
}

#[derive(Debug, Error)]
#[error("no squad available for team {team_id}: {}", .attempts.join("; "))]
pub struct SquadUnavailable {
    pub team_id: u32,
    /// One line per strategy tried.
    pub attempts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FallbackChain {
    strategies: Vec<SquadStrategy>,
}

impl FallbackChain {
    /// Requested gameweek, then previous gameweek, then my-team.
    pub fn standard() -> Self {
        Self::new(vec![
            SquadStrategy::RequestedGameweek,
            SquadStrategy::PreviousGameweek,
            SquadStrategy::MyTeam,
        ])
    }

    pub fn new(strategies: Vec<SquadStrategy>) -> Self {
        Self { strategies }
    }

    /// Try each strategy in order. An empty pick list counts as a failure.
    pub fn resolve<S: DataSource + ?Sized>(
        &self,
        source: &S,
        team_id: u32,
        requested: u32,
        previous: Option<u32>,
    ) -> Result<ResolvedSquad, SquadUnavailable> {
        let mut attempts = Vec::new();

        for &strategy in &self.strategies {
            let (gameweek, result) = match strategy {
                SquadStrategy::RequestedGameweek => {
                    (Some(requested), source.entry_picks(team_id, requested))
                }
                SquadStrategy::PreviousGameweek => match previous {
                    Some(gw) if gw != requested => (Some(gw), source.entry_picks(team_id, gw)),
                    Some(_) => {
                        attempts.push(format!("{strategy}: same as requested gameweek"));
                        continue;
                    }
                    None => {
                        attempts.push(format!("{strategy}: no finished gameweek"));
                        continue;
                    }
                },
                SquadStrategy::MyTeam => (None, source.my_team(team_id)),
            };

            match result {
                Ok(picks) if !picks.picks.is_empty() => {
                    info!(
                        %strategy,
                        gameweek = ?gameweek,
                        picks = picks.picks.len(),
                        "squad resolved"
                    );
                    return Ok(ResolvedSquad {
                        picks,
                        strategy,
                        gameweek,
                    });
                }
                Ok(_) => {
                    warn!(%strategy, "squad lookup returned no picks");
                    attempts.push(format!("{strategy}: no picks returned"));
                }
                Err(e) => {
                    warn!(%strategy, "squad lookup failed: {}", e);
                    attempts.push(describe(strategy, gameweek, &e));
                }
            }
        }

        Err(SquadUnavailable { team_id, attempts })
    }
}

fn describe(strategy: SquadStrategy, gameweek: Option<u32>, err: &SourceError) -> String {
    match gameweek {
        Some(gw) => format!("{strategy} (GW{gw}): {err}"),
        None => format!("{strategy}: {err}"),
    }
}
