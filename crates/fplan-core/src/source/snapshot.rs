// Offline source reading a saved set of API responses from one directory:
//
//   bootstrap-static.json
//   fixtures.json
//   entry.json
//   picks.json
//   element_summaries/<id>.json   (optional per player)

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{
    decode_catalog, decode_entry, decode_fixtures, decode_history, decode_picks, DataSource,
    EntrySummary, SourceError,
};
use crate::catalog::Catalog;
use crate::fixtures::Fixture;
use crate::scorer::AppearanceRecord;
use crate::squad::SquadPicks;

/// History used for players without a saved summary: a regular starter
/// with middling returns.
const PLACEHOLDER_HISTORY: [(u32, i32); 4] = [(90, 6), (90, 2), (75, 5), (30, 1)];

pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load(&self, relative: &Path) -> Result<Value, SourceError> {
        let path = self.dir.join(relative);
        let text = std::fs::read_to_string(&path).map_err(|e| SourceError::Io {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&text)
            .map_err(|e| SourceError::json(path.display().to_string(), e))
    }
}

fn placeholder_history() -> Vec<AppearanceRecord> {
    PLACEHOLDER_HISTORY
        .iter()
        .map(|&(minutes, points)| AppearanceRecord { minutes, points })
        .collect()
}

impl DataSource for SnapshotSource {
    fn catalog(&self) -> Result<Catalog, SourceError> {
        decode_catalog(self.load(Path::new("bootstrap-static.json"))?)
    }

    fn fixtures(&self) -> Result<Vec<Fixture>, SourceError> {
        decode_fixtures(self.load(Path::new("fixtures.json"))?)
    }

    fn player_history(&self, player_id: u32) -> Result<Vec<AppearanceRecord>, SourceError> {
        let relative = Path::new("element_summaries").join(format!("{player_id}.json"));
        if !self.dir.join(&relative).exists() {
            debug!(player_id, "no saved summary, using placeholder history");
            return Ok(placeholder_history());
        }
        decode_history(player_id, self.load(&relative)?)
    }

    fn entry(&self, _team_id: u32) -> Result<EntrySummary, SourceError> {
        decode_entry(self.load(Path::new("entry.json"))?)
    }

    /// A snapshot holds one picks file regardless of gameweek.
    fn entry_picks(&self, _team_id: u32, _gameweek: u32) -> Result<SquadPicks, SourceError> {
        decode_picks(self.load(Path::new("picks.json"))?)
    }
}
