//! Core domain types for the session ledger.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LedgerError;

// ---------------------------------------------------------------------------
// Scenario catalog
// ---------------------------------------------------------------------------

/// One entry of a bundled scenario file (`scenarios/*.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRecord {
    /// Organized-play season.
    pub season: i64,
    /// Scenario number within the season.
    pub scenario: i64,
    /// Part marker for multi-part scenarios; empty when the file has none.
    #[serde(default, deserialize_with = "subscenario_text")]
    pub subscenario: String,
    /// Published title.
    pub name: String,
    /// Lowest character level the scenario supports.
    pub min_level: i64,
    /// Highest character level the scenario supports.
    pub max_level: i64,
    /// Evergreen scenarios may be replayed for credit.
    #[serde(default)]
    pub evergreen: bool,
}

/// Scenario files are not consistent about `subscenario`: it shows up as a
/// string, a number, `null`, or not at all. Normalize all of them to text so
/// the `(season, scenario, subscenario)` key always compares equal.
fn subscenario_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "subscenario must be a string or number, got {other}"
        ))),
    }
}

/// A scenario as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub id: String,
    pub season: i64,
    pub scenario: i64,
    pub subscenario: String,
    pub name: String,
    pub min_level: i64,
    pub max_level: i64,
    pub evergreen: bool,
}

impl Scenario {
    /// `1-01` style code used in search listings and character histories.
    pub fn code(&self) -> String {
        format!("{}-{:02}", self.season, self.scenario)
    }

    /// Suffix appended to titles of evergreen scenarios.
    pub fn evergreen_suffix(&self) -> &'static str {
        if self.evergreen { " (Evergreen)" } else { "" }
    }
}

// ---------------------------------------------------------------------------
// People
// ---------------------------------------------------------------------------

/// A player, identified by their org-play number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub number: i64,
    pub name: Option<String>,
}

/// A character together with its owning player's number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub id: String,
    pub player_id: String,
    pub player_number: i64,
    pub number: i64,
    pub name: Option<String>,
}

impl Character {
    /// Org-play style identifier, e.g. `123456-2001`.
    pub fn org_play_id(&self) -> String {
        format!("{}-{}", self.player_number, self.number)
    }

    /// Label shown in selection prompts: `Name (123456-2001)`.
    pub fn label(&self) -> String {
        format!(
            "{} ({})",
            self.name.as_deref().unwrap_or("?"),
            self.org_play_id()
        )
    }
}

// ---------------------------------------------------------------------------
// Session history rows
// ---------------------------------------------------------------------------

/// A recorded session of one scenario, with its non-GM participants.
#[derive(Debug, Clone)]
pub struct ScenarioSession {
    pub session_id: String,
    pub date: NaiveDate,
    pub gm_number: i64,
    pub signups: Vec<Character>,
}

/// One entry of a character's play history.
#[derive(Debug, Clone)]
pub struct CharacterSignup {
    pub session_id: String,
    pub date: NaiveDate,
    pub scenario: Scenario,
}

// ---------------------------------------------------------------------------
// Session import payload
// ---------------------------------------------------------------------------

/// Decoded session export as produced by RPG Chronicles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    /// Scenario title, e.g. `PFS2E 5-08`.
    pub scenario: String,
    /// Date the game was played (ISO date or RFC 3339 timestamp).
    pub game_date: String,
    /// Org-play number of the GM.
    pub gm_org_play_number: i64,
    #[serde(default)]
    pub sign_ups: Vec<SignupPayload>,
}

/// A seat at the table in a session export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    #[serde(rename = "isGM", default)]
    pub is_gm: bool,
    pub org_play_number: i64,
    pub character_number: i64,
    #[serde(default)]
    pub character_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Level range a scenario must fully cover to show up in a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    OneToFour,
    ThreeToSix,
    FiveToEight,
}

impl Tier {
    /// All tiers, in menu order.
    pub const ALL: [Tier; 3] = [Tier::OneToFour, Tier::ThreeToSix, Tier::FiveToEight];

    /// Lowest level of the tier; a match needs `min_level <= low`.
    pub fn low(self) -> i64 {
        match self {
            Self::OneToFour => 1,
            Self::ThreeToSix => 3,
            Self::FiveToEight => 5,
        }
    }

    /// Highest level of the tier; a match needs `max_level >= high`.
    pub fn high(self) -> i64 {
        match self {
            Self::OneToFour => 4,
            Self::ThreeToSix => 6,
            Self::FiveToEight => 8,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low(), self.high())
    }
}

impl FromStr for Tier {
    type Err = LedgerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.to_string() == s.trim())
            .ok_or_else(|| LedgerError::parse(format!("unknown tier '{s}'")))
    }
}
