// Configuration loading and parsing (planner.toml, credentials.toml).
//
// One `Config` value is built at process start and passed by reference into
// every component. Nothing in the crate reads configuration from anywhere else.

use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::Position;
use crate::projection::FixtureScoring;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub planner: PlannerConfig,
    pub projection: ProjectionConfig,
    pub transfers: TransferConfig,
    pub chips: ChipConfig,
    pub source: SourceConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// The team to plan for. Required either in planner.toml or as an override.
    pub fn team_id(&self) -> Result<u32, ConfigError> {
        self.planner.team_id.ok_or_else(|| ConfigError::ValidationError {
            field: "planner.team_id".into(),
            message: "no team id configured; set it in planner.toml or pass --team-id".into(),
        })
    }

    /// Apply command-line overrides on top of file values and re-validate.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(team_id) = overrides.team_id {
            self.planner.team_id = Some(team_id);
        }
        if let Some(horizon) = overrides.horizon {
            self.planner.horizon = horizon;
        }
        if let Some(free) = overrides.free_transfers {
            self.transfers.free_transfers = free;
        }
        if let Some(hit) = overrides.hit_penalty {
            self.transfers.hit_penalty = hit;
        }
        if let Some(shortlist) = overrides.shortlist {
            self.transfers.shortlist = shortlist;
        }
        if let Some(dir) = &overrides.snapshot_dir {
            self.source.snapshot_dir = Some(dir.clone());
        }
        validate(self)
    }
}

/// Values supplied on the command line. `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub team_id: Option<u32>,
    pub horizon: Option<usize>,
    pub free_transfers: Option<usize>,
    pub hit_penalty: Option<f64>,
    pub shortlist: Option<usize>,
    pub snapshot_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// planner.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire planner.toml file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct PlannerFile {
    planner: PlannerConfig,
    projection: ProjectionConfig,
    transfers: TransferConfig,
    chips: ChipConfig,
    source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub team_id: Option<u32>,
    /// Number of gameweeks projected, starting at the current one.
    pub horizon: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            team_id: None,
            horizon: 3,
        }
    }
}

/// Position-indexed prior that every recent-points rate regresses toward.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PositionBaselines {
    pub gk: f64,
    pub def: f64,
    pub mid: f64,
    pub fwd: f64,
}

impl PositionBaselines {
    pub fn for_position(&self, position: Position) -> f64 {
        match position {
            Position::Goalkeeper => self.gk,
            Position::Defender => self.def,
            Position::Midfielder => self.mid,
            Position::Forward => self.fwd,
        }
    }
}

impl Default for PositionBaselines {
    fn default() -> Self {
        Self {
            gk: 3.5,
            def: 3.0,
            mid: 4.8,
            fwd: 5.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub scoring: FixtureScoring,
    /// Weight of the positional baseline in the base rate (0 = pure recent form).
    pub regression_factor: f64,
    /// Minimum expected points per scheduled fixture.
    pub fixture_floor: f64,
    pub recent_window: usize,
    pub recent_decay: f64,
    pub minutes_window: usize,
    pub ratio_min: f64,
    pub ratio_max: f64,
    pub home_edge: f64,
    pub away_edge: f64,
    pub not_nailed_penalty: f64,
    pub baselines: PositionBaselines,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            scoring: FixtureScoring::StrengthNormalized,
            regression_factor: 0.5,
            fixture_floor: 2.0,
            recent_window: 8,
            recent_decay: 0.88,
            minutes_window: 6,
            ratio_min: 0.6,
            ratio_max: 1.4,
            home_edge: 1.05,
            away_edge: 0.95,
            not_nailed_penalty: 0.7,
            baselines: PositionBaselines::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub free_transfers: usize,
    pub hit_penalty: f64,
    /// Buy candidates kept after ranking by projected horizon total.
    pub shortlist: usize,
    /// Catalog players projected before ranking (bounds history lookups).
    pub candidate_pool: usize,
    pub max_swaps: usize,
    pub improvement_epsilon: f64,
    pub min_gain: f64,
    pub bench_gk_min_gain: f64,
    pub min_raw_gain: f64,
    pub min_buy_xpts: f64,
    pub require_starter_upgrade: bool,
    pub min_net_gain: f64,
    pub require_no_hit: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            free_transfers: 1,
            hit_penalty: 4.0,
            shortlist: 80,
            candidate_pool: 160,
            max_swaps: 2,
            improvement_epsilon: 0.01,
            min_gain: 0.2,
            bench_gk_min_gain: 8.0,
            min_raw_gain: 2.0,
            min_buy_xpts: 6.0,
            require_starter_upgrade: true,
            min_net_gain: 0.5,
            require_no_hit: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    pub bench_boost_threshold: f64,
    pub double_gameweek_fixtures: usize,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            bench_boost_threshold: 12.0,
            double_gameweek_fixtures: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// When set, data is read from JSON files in this directory instead of HTTP.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fantasy.premierleague.com/api".into(),
            timeout_secs: 20,
            user_agent: concat!("fplan/", env!("CARGO_PKG_VERSION")).into(),
            snapshot_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Bearer token for the private my-team endpoint.
    pub access_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/planner.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let planner_path = config_dir.join("planner.toml");
    let planner_text = read_file(&planner_path)?;
    let file: PlannerFile = toml::from_str(&planner_text).map_err(|e| ConfigError::ParseError {
        path: planner_path.clone(),
        source: e,
    })?;

    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        planner: file.planner,
        projection: file.projection,
        transfers: file.transfers,
        chips: file.chips,
        source: file.source,
        credentials,
    };

    validate(&config)?;
    Ok(config)
}

/// Copy every shipped default into `config/` unless a file of that name is
/// already there. Returns the files written. `.example` templates stay put.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    match (defaults_dir.is_dir(), config_dir.is_dir()) {
        (false, false) => {
            return Err(copy_error(format!(
                "neither defaults/ nor config/ directory found in {}",
                base_dir.display()
            )))
        }
        (false, true) => return Ok(vec![]),
        _ => {}
    }

    fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut written = Vec::new();
    for shipped in shipped_defaults(&defaults_dir)? {
        let Some(name) = shipped.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        if !reserve(&target)? {
            continue;
        }
        fs::copy(&shipped, &target).map_err(|e| {
            copy_error(format!(
                "cannot copy {} to {}: {e}",
                shipped.display(),
                target.display()
            ))
        })?;
        written.push(target);
    }
    Ok(written)
}

/// Regular files under `dir`, sorted by name, without `.example` templates.
fn shipped_defaults(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let list_error = |e: io::Error| copy_error(format!("cannot list {}: {e}", dir.display()));
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_error)? {
        let path = entry.map_err(list_error)?.path();
        let template = path.extension().is_some_and(|ext| ext == "example");
        if path.is_file() && !template {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Atomically create an empty `target`. `false` if it already exists.
fn reserve(target: &Path) -> Result<bool, ConfigError> {
    match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(copy_error(format!("cannot create {}: {e}", target.display()))),
    }
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Copy missing defaults into `base_dir/config`, then load from there.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.planner.horizon == 0 {
        return Err(invalid("planner.horizon", "must be greater than 0".into()));
    }

    let p = &config.projection;
    if !(0.0..=1.0).contains(&p.regression_factor) {
        return Err(invalid(
            "projection.regression_factor",
            format!("must be between 0.0 and 1.0 inclusive, got {}", p.regression_factor),
        ));
    }
    if !(p.recent_decay > 0.0 && p.recent_decay <= 1.0) {
        return Err(invalid(
            "projection.recent_decay",
            format!("must be in (0.0, 1.0], got {}", p.recent_decay),
        ));
    }
    if p.ratio_min <= 0.0 || p.ratio_min > p.ratio_max {
        return Err(invalid(
            "projection.ratio_min",
            format!(
                "must be > 0 and <= ratio_max ({}), got {}",
                p.ratio_max, p.ratio_min
            ),
        ));
    }

    let windows: &[(&str, usize)] = &[
        ("projection.recent_window", p.recent_window),
        ("projection.minutes_window", p.minutes_window),
        ("transfers.shortlist", config.transfers.shortlist),
        ("transfers.candidate_pool", config.transfers.candidate_pool),
        ("transfers.max_swaps", config.transfers.max_swaps),
    ];
    for (name, val) in windows {
        if *val == 0 {
            return Err(invalid(name, "must be > 0".into()));
        }
    }

    let t = &config.transfers;
    let non_negative: &[(&str, f64)] = &[
        ("projection.fixture_floor", p.fixture_floor),
        ("projection.home_edge", p.home_edge),
        ("projection.away_edge", p.away_edge),
        ("projection.not_nailed_penalty", p.not_nailed_penalty),
        ("projection.baselines.gk", p.baselines.gk),
        ("projection.baselines.def", p.baselines.def),
        ("projection.baselines.mid", p.baselines.mid),
        ("projection.baselines.fwd", p.baselines.fwd),
        ("transfers.hit_penalty", t.hit_penalty),
        ("transfers.improvement_epsilon", t.improvement_epsilon),
        ("transfers.min_gain", t.min_gain),
        ("transfers.bench_gk_min_gain", t.bench_gk_min_gain),
        ("transfers.min_raw_gain", t.min_raw_gain),
        ("transfers.min_buy_xpts", t.min_buy_xpts),
        ("transfers.min_net_gain", t.min_net_gain),
        ("chips.bench_boost_threshold", config.chips.bench_boost_threshold),
    ];
    for (name, val) in non_negative {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be a finite value >= 0, got {val}")));
        }
    }

    if config.chips.double_gameweek_fixtures < 2 {
        return Err(invalid(
            "chips.double_gameweek_fixtures",
            format!("must be >= 2, got {}", config.chips.double_gameweek_fixtures),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
