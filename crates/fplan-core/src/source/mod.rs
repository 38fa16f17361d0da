// Data sources for one planning run.
//
// The planner only talks to the `DataSource` trait. Implementations fetch the
// public game JSON over HTTP or read a saved snapshot from disk; both hand the
// raw documents to the same parsers, so the rest of the crate never sees the
// wire format.

pub mod fallback;
pub mod http;
pub mod snapshot;

use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{lenient_f64, tenths_to_units, Catalog};
use crate::fixtures::{parse_fixtures, Fixture};
use crate::scorer::{parse_history, AppearanceRecord};
use crate::squad::{Pick, SquadPicks};

pub use fallback::{FallbackChain, ResolvedSquad, SquadStrategy, SquadUnavailable};
pub use http::HttpSource;
pub use snapshot::SnapshotSource;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {what}: {source}")]
    Json {
        what: String,
        source: serde_json::Error,
    },

    #[error("{0} is not available from this source")]
    Unsupported(String),
}

impl SourceError {
    pub(crate) fn json(what: impl Into<String>, source: serde_json::Error) -> Self {
        SourceError::Json {
            what: what.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// DataSource trait
// ---------------------------------------------------------------------------

/// Summary of a fantasy entry (the user's team).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrySummary {
    pub name: Option<String>,
    /// Money in the bank after the last deadline, in currency units.
    pub bank: Option<f64>,
}

/// Everything a planning run reads from the outside world.
///
/// Calls are blocking and made in sequence.
pub trait DataSource {
    fn catalog(&self) -> Result<Catalog, SourceError>;

    fn fixtures(&self) -> Result<Vec<Fixture>, SourceError>;

    /// Appearance history for one player, oldest first.
    fn player_history(&self, player_id: u32) -> Result<Vec<AppearanceRecord>, SourceError>;

    fn entry(&self, team_id: u32) -> Result<EntrySummary, SourceError>;

    /// The squad as submitted for `gameweek`.
    fn entry_picks(&self, team_id: u32, gameweek: u32) -> Result<SquadPicks, SourceError>;

    /// The squad as it stands right now. Needs an authenticated session.
    fn my_team(&self, _team_id: u32) -> Result<SquadPicks, SourceError> {
        Err(SourceError::Unsupported("my-team".into()))
    }
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn catalog(&self) -> Result<Catalog, SourceError> {
        (**self).catalog()
    }

    fn fixtures(&self) -> Result<Vec<Fixture>, SourceError> {
        (**self).fixtures()
    }

    fn player_history(&self, player_id: u32) -> Result<Vec<AppearanceRecord>, SourceError> {
        (**self).player_history(player_id)
    }

    fn entry(&self, team_id: u32) -> Result<EntrySummary, SourceError> {
        (**self).entry(team_id)
    }

    fn entry_picks(&self, team_id: u32, gameweek: u32) -> Result<SquadPicks, SourceError> {
        (**self).entry_picks(team_id, gameweek)
    }

    fn my_team(&self, team_id: u32) -> Result<SquadPicks, SourceError> {
        (**self).my_team(team_id)
    }
}

// ---------------------------------------------------------------------------
// CachedSource
// ---------------------------------------------------------------------------

/// Memoizes per-player history for the lifetime of one run.
///
/// Only successful lookups are kept; a failed lookup is retried next time.
pub struct CachedSource<S> {
    inner: S,
    histories: RefCell<HashMap<u32, Vec<AppearanceRecord>>>,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            histories: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached_histories(&self) -> usize {
        self.histories.borrow().len()
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn catalog(&self) -> Result<Catalog, SourceError> {
        self.inner.catalog()
    }

    fn fixtures(&self) -> Result<Vec<Fixture>, SourceError> {
        self.inner.fixtures()
    }

    fn player_history(&self, player_id: u32) -> Result<Vec<AppearanceRecord>, SourceError> {
        if let Some(hit) = self.histories.borrow().get(&player_id) {
            debug!(player_id, "history cache hit");
            return Ok(hit.clone());
        }
        let history = self.inner.player_history(player_id)?;
        self.histories
            .borrow_mut()
            .insert(player_id, history.clone());
        Ok(history)
    }

    fn entry(&self, team_id: u32) -> Result<EntrySummary, SourceError> {
        self.inner.entry(team_id)
    }

    fn entry_picks(&self, team_id: u32, gameweek: u32) -> Result<SquadPicks, SourceError> {
        self.inner.entry_picks(team_id, gameweek)
    }

    fn my_team(&self, team_id: u32) -> Result<SquadPicks, SourceError> {
        self.inner.my_team(team_id)
    }
}

// ---------------------------------------------------------------------------
// Document parsers shared by every source
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    last_deadline_bank: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBank {
    #[serde(default, deserialize_with = "lenient_f64")]
    bank: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPicks {
    #[serde(default)]
    picks: Vec<Pick>,
    #[serde(default)]
    entry_history: Option<RawBank>,
}

#[derive(Debug, Deserialize)]
struct RawMyTeam {
    #[serde(default)]
    picks: Vec<Pick>,
    #[serde(default)]
    transfers: Option<RawBank>,
}

pub(crate) fn decode_catalog(value: Value) -> Result<Catalog, SourceError> {
    Catalog::from_value(value).map_err(|e| SourceError::json("bootstrap-static", e))
}

pub(crate) fn decode_fixtures(value: Value) -> Result<Vec<Fixture>, SourceError> {
    parse_fixtures(value).map_err(|e| SourceError::json("fixtures", e))
}

pub(crate) fn decode_history(
    player_id: u32,
    value: Value,
) -> Result<Vec<AppearanceRecord>, SourceError> {
    parse_history(value).map_err(|e| SourceError::json(format!("element-summary {player_id}"), e))
}

pub(crate) fn decode_entry(value: Value) -> Result<EntrySummary, SourceError> {
    let raw: RawEntry = serde_json::from_value(value).map_err(|e| SourceError::json("entry", e))?;
    Ok(EntrySummary {
        name: raw.name,
        bank: raw.last_deadline_bank.map(tenths_to_units),
    })
}

/// Picks plus `entry_history.bank` when present.
pub(crate) fn decode_picks(value: Value) -> Result<SquadPicks, SourceError> {
    let raw: RawPicks = serde_json::from_value(value).map_err(|e| SourceError::json("picks", e))?;
    Ok(SquadPicks {
        picks: raw.picks,
        bank: raw.entry_history.and_then(|h| h.bank).map(tenths_to_units),
    })
}

/// Picks plus `transfers.bank` when present.
pub(crate) fn decode_my_team(value: Value) -> Result<SquadPicks, SourceError> {
    let raw: RawMyTeam =
        serde_json::from_value(value).map_err(|e| SourceError::json("my-team", e))?;
    Ok(SquadPicks {
        picks: raw.picks,
        bank: raw.transfers.and_then(|t| t.bank).map(tenths_to_units),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn picks_decode_bank_in_units() {
        let value = json!({
            "picks": [
                {"element": 10, "position": 1, "multiplier": 1, "is_captain": false},
                {"element": 11, "position": 12, "multiplier": 0}
            ],
            "entry_history": {"event": 7, "bank": 15}
        });
        let squad = decode_picks(value).unwrap();
        assert_eq!(squad.picks.len(), 2);
        assert_eq!(squad.picks[1].player_id, 11);
        assert_eq!(squad.picks[1].squad_position, 12);
        assert_eq!(squad.bank, Some(1.5));
    }

    #[test]
    fn picks_without_history_have_no_bank() {
        let squad = decode_picks(json!({"picks": []})).unwrap();
        assert!(squad.picks.is_empty());
        assert_eq!(squad.bank, None);
    }

    #[test]
    fn my_team_reads_transfer_bank() {
        let value = json!({
            "picks": [{"element": 3, "position": 1}],
            "transfers": {"bank": 7, "limit": 1}
        });
        let squad = decode_my_team(value).unwrap();
        assert_eq!(squad.bank, Some(0.7));
    }

    #[test]
    fn entry_reads_last_deadline_bank() {
        let entry = decode_entry(json!({"id": 42, "name": "Tinkerers", "last_deadline_bank": 23}))
            .unwrap();
        assert_eq!(entry.name.as_deref(), Some("Tinkerers"));
        assert_eq!(entry.bank, Some(2.3));
    }

    #[test]
    fn malformed_picks_are_a_json_error() {
        let err = decode_picks(json!({"picks": "nope"})).unwrap_err();
        assert!(matches!(err, SourceError::Json { .. }));
    }

    struct Counting {
        calls: Cell<usize>,
    }

    impl DataSource for Counting {
        fn catalog(&self) -> Result<Catalog, SourceError> {
            Ok(Catalog::default())
        }
        fn fixtures(&self) -> Result<Vec<Fixture>, SourceError> {
            Ok(vec![])
        }
        fn player_history(&self, player_id: u32) -> Result<Vec<AppearanceRecord>, SourceError> {
            self.calls.set(self.calls.get() + 1);
            if player_id == 0 {
                return Err(SourceError::Unsupported("player 0".into()));
            }
            Ok(vec![AppearanceRecord {
                minutes: 90,
                points: player_id as i32,
            }])
        }
        fn entry(&self, _team_id: u32) -> Result<EntrySummary, SourceError> {
            Ok(EntrySummary::default())
        }
        fn entry_picks(&self, _team_id: u32, _gameweek: u32) -> Result<SquadPicks, SourceError> {
            Ok(SquadPicks::default())
        }
    }

    #[test]
    fn cached_source_fetches_each_history_once() {
        let cached = CachedSource::new(Counting {
            calls: Cell::new(0),
        });
        assert_eq!(cached.player_history(5).unwrap()[0].points, 5);
        assert_eq!(cached.player_history(5).unwrap()[0].points, 5);
        assert_eq!(cached.player_history(6).unwrap()[0].points, 6);
        assert_eq!(cached.inner.calls.get(), 2);
        assert_eq!(cached.cached_histories(), 2);
    }

    #[test]
    fn cached_source_does_not_cache_failures() {
        let cached = CachedSource::new(Counting {
            calls: Cell::new(0),
        });
        assert!(cached.player_history(0).is_err());
        assert!(cached.player_history(0).is_err());
        assert_eq!(cached.inner.calls.get(), 2);
        assert_eq!(cached.cached_histories(), 0);
    }

    #[test]
    fn my_team_is_unsupported_by_default() {
        let source = Counting {
            calls: Cell::new(0),
        };
        assert!(matches!(
            source.my_team(1),
            Err(SourceError::Unsupported(_))
        ));
    }
}
