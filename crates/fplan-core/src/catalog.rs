// League catalog: players, teams and gameweeks from the bootstrap document.
//
// Raw rows are deserialized one at a time so a single malformed element
// never sinks the whole catalog; bad rows are skipped with a warning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Squad position. The wire format encodes these as `element_type` 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub fn from_element_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Midfielders and forwards are scored against opponent defence;
    /// goalkeepers and defenders against opponent attack.
    pub fn is_attacker(&self) -> bool {
        matches!(self, Position::Midfielder | Position::Forward)
    }

    pub fn is_goalkeeper(&self) -> bool {
        *self == Position::Goalkeeper
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display_str())
    }
}

/// Availability flag from the catalog `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Available,
    Doubtful,
    Injured,
    Unavailable,
}

impl Availability {
    /// Unknown codes (suspended, left the club, ...) count as unavailable.
    /// A missing status is treated as available.
    pub fn from_status(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            None | Some("") | Some("a") => Availability::Available,
            Some("d") => Availability::Doubtful,
            Some("i") | Some("f") => Availability::Injured,
            Some(_) => Availability::Unavailable,
        }
    }

    /// Confidence the player features, used when no explicit percentage exists.
    pub fn confidence(&self) -> f64 {
        match self {
            Availability::Available => 1.0,
            Availability::Doubtful => 0.75,
            Availability::Injured => 0.25,
            Availability::Unavailable => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub team: u32,
    /// Price in currency units with one decimal of precision.
    pub cost: f64,
    pub availability: Availability,
    /// Explicit chance of playing next round, 0..=100.
    pub chance_of_playing: Option<f64>,
    pub form: Option<f64>,
}

/// Four strength ratings per team. Missing ratings are 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamStrength {
    pub attack_home: f64,
    pub attack_away: f64,
    pub defence_home: f64,
    pub defence_away: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub strength: TeamStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: u32,
    pub is_current: bool,
    pub is_next: bool,
    pub is_previous: bool,
    pub is_finished: bool,
    pub deadline: Option<DateTime<Utc>>,
}

/// League-wide static data for one run.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub events: Vec<Event>,
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
}

// ---------------------------------------------------------------------------
// Raw wire rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBootstrap {
    #[serde(default)]
    events: Vec<Value>,
    #[serde(default)]
    teams: Vec<Value>,
    #[serde(default)]
    elements: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: u32,
    #[serde(default)]
    is_current: Option<bool>,
    #[serde(default)]
    is_next: Option<bool>,
    #[serde(default)]
    is_previous: Option<bool>,
    #[serde(default)]
    is_finished: Option<bool>,
    #[serde(default)]
    deadline_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    strength_attack_home: Option<f64>,
    #[serde(default)]
    strength_attack_away: Option<f64>,
    #[serde(default)]
    strength_defence_home: Option<f64>,
    #[serde(default)]
    strength_defence_away: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    id: u32,
    #[serde(default)]
    web_name: Option<String>,
    element_type: u8,
    team: u32,
    /// Tenths of a currency unit.
    #[serde(default)]
    now_cost: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    chance_of_playing_next_round: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    form: Option<f64>,
}

/// Accepts a number, a numeric string, or null. Anything else is `None`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Convert a tenths-encoded price to currency units, rounded to one decimal.
pub(crate) fn tenths_to_units(tenths: f64) -> f64 {
    (tenths.round()) / 10.0
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        let deadline = raw.deadline_time.as_deref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
        });
        Event {
            id: raw.id,
            is_current: raw.is_current.unwrap_or(false),
            is_next: raw.is_next.unwrap_or(false),
            is_previous: raw.is_previous.unwrap_or(false),
            is_finished: raw.is_finished.unwrap_or(false),
            deadline,
        }
    }
}

impl From<RawTeam> for Team {
    fn from(raw: RawTeam) -> Self {
        let name = raw.name.unwrap_or_default();
        let short_name = raw.short_name.unwrap_or_else(|| name.clone());
        Team {
            id: raw.id,
            name,
            short_name,
            strength: TeamStrength {
                attack_home: raw.strength_attack_home.unwrap_or(0.0),
                attack_away: raw.strength_attack_away.unwrap_or(0.0),
                defence_home: raw.strength_defence_home.unwrap_or(0.0),
                defence_away: raw.strength_defence_away.unwrap_or(0.0),
            },
        }
    }
}

fn player_from_raw(raw: RawElement) -> Option<Player> {
    let Some(position) = Position::from_element_type(raw.element_type) else {
        warn!(
            "skipping element {}: unknown element_type {}",
            raw.id, raw.element_type
        );
        return None;
    };
    Some(Player {
        id: raw.id,
        name: raw.web_name.unwrap_or_else(|| format!("#{}", raw.id)),
        position,
        team: raw.team,
        cost: tenths_to_units(raw.now_cost.unwrap_or(0.0)),
        availability: Availability::from_status(raw.status.as_deref()),
        chance_of_playing: raw.chance_of_playing_next_round,
        form: raw.form,
    })
}

fn parse_rows<T, R>(rows: Vec<Value>, kind: &str, convert: impl Fn(R) -> Option<T>) -> Vec<T>
where
    R: for<'de> Deserialize<'de>,
{
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<R>(row) {
            Ok(raw) => convert(raw),
            Err(e) => {
                warn!("skipping malformed {} row: {}", kind, e);
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

impl Catalog {
    /// Build a catalog from a decoded bootstrap document.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let raw: RawBootstrap = serde_json::from_value(value)?;
        let events = parse_rows(raw.events, "event", |r: RawEvent| Some(Event::from(r)));
        let teams = parse_rows(raw.teams, "team", |r: RawTeam| Some(Team::from(r)));
        let players = parse_rows(raw.elements, "element", player_from_raw);
        Ok(Catalog {
            events,
            teams,
            players,
        })
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn players_by_id(&self) -> HashMap<u32, &Player> {
        self.players.iter().map(|p| (p.id, p)).collect()
    }

    pub fn team_strengths(&self) -> HashMap<u32, TeamStrength> {
        self.teams.iter().map(|t| (t.id, t.strength)).collect()
    }

    pub fn event(&self, id: u32) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// The gameweek being planned for.
    ///
    /// First event flagged current; otherwise the first event that is neither
    /// finished nor previous; otherwise the highest id. `None` without events.
    pub fn current_gameweek(&self) -> Option<u32> {
        if let Some(e) = self.events.iter().find(|e| e.is_current) {
            return Some(e.id);
        }
        if let Some(e) = self
            .events
            .iter()
            .find(|e| !e.is_finished && !e.is_previous)
        {
            return Some(e.id);
        }
        self.events.iter().map(|e| e.id).max()
    }

    /// Most recent gameweek flagged previous.
    pub fn previous_gameweek(&self) -> Option<u32> {
        self.events
            .iter()
            .filter(|e| e.is_previous)
            .map(|e| e.id)
            .max()
    }

    /// Up to `length` consecutive gameweek ids starting at `start`.
    pub fn horizon(&self, start: u32, length: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = self.events.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        match ids.iter().position(|&id| id == start) {
            Some(idx) => ids[idx..].iter().take(length).copied().collect(),
            None => vec![],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
