//! Parsers for the free-text inputs the ledger accepts: scenario titles from
//! session exports, game dates, and comma-separated player numbers.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{LedgerError, Result};

/// Season and scenario number extracted from a title like `PFS2E 5-08`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioCode {
    pub season: i64,
    pub scenario: i64,
}

impl std::fmt::Display for ScenarioCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.season, self.scenario)
    }
}

/// Parse a `PFS2E <season>-<scenario>` title. Leading zeros are ignored.
pub fn parse_scenario_title(title: &str) -> Result<ScenarioCode> {
    static TITLE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^PFS2E ([0-9]+)-([0-9]+)$").expect("valid regex"));

    let bad_title = || LedgerError::parse(format!("Cannot parse scenario title: {title}"));

    let caps = TITLE_RE.captures(title).ok_or_else(bad_title)?;
    let season = caps[1].parse::<i64>().map_err(|_| bad_title())?;
    let scenario = caps[2].parse::<i64>().map_err(|_| bad_title())?;
    Ok(ScenarioCode { season, scenario })
}

/// Parse the `gameDate` of a session export down to a calendar date.
///
/// Accepts RFC 3339 timestamps (the day in the timestamp's own offset), naive `YYYY-MM-DDTHH:MM:SS`
/// timestamps, and bare `YYYY-MM-DD` dates.
pub fn parse_game_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| LedgerError::parse(format!("invalid game date '{raw}': {e}")))
}

/// Parse `"123456, 234567"` into org-play numbers. Blank input yields an empty list.
pub fn parse_player_numbers(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| LedgerError::parse(format!("'{part}' is not a player number")))
        })
        .collect()
}
