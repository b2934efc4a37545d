//! Read-only lookups and the text reports printed for them.

use std::fmt;

use tracing::debug;

use pfsledger_shared::{
    Character, CharacterSignup, LedgerError, Result, Scenario, ScenarioSession, Tier,
};
use pfsledger_storage::Storage;

// ---------------------------------------------------------------------------
// Scenario check
// ---------------------------------------------------------------------------

/// A scenario with every recorded session and who played it.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub sessions: Vec<ScenarioSession>,
}

/// Load a scenario's play history. A missing scenario is a not-found error.
pub async fn check_scenario(storage: &Storage, season: i64, number: i64) -> Result<ScenarioReport> {
    let scenario = storage
        .find_scenario(season, number)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("scenario {season}-{number:02}")))?;
    let sessions = storage.scenario_sessions(&scenario.id).await?;
    debug!(scenario = %scenario.code(), sessions = sessions.len(), "scenario checked");
    Ok(ScenarioReport { scenario, sessions })
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.scenario;
        writeln!(
            f,
            "{}:{:02} - {}{}",
            s.season,
            s.scenario,
            s.name,
            s.evergreen_suffix()
        )?;
        if self.sessions.is_empty() {
            writeln!(f, "Not played yet")?;
        }
        for session in &self.sessions {
            writeln!(f, "Played On: {}", session.date.format("%d %b %Y"))?;
            for character in &session.signups {
                writeln!(
                    f,
                    "{}: {}",
                    character.org_play_id(),
                    character.name.as_deref().unwrap_or("Name not found")
                )?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Character lookup
// ---------------------------------------------------------------------------

/// Characters matching a name fragment or, when `query` is a number, a player's
/// org-play number. Characters in `exclude_ids` are left out. A blank query
/// matches nothing.
pub async fn find_characters(
    storage: &Storage,
    query: &str,
    exclude_ids: &[String],
) -> Result<Vec<Character>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let player_number = query.parse::<i64>().ok();

    let mut characters = storage.search_characters(query, player_number).await?;
    characters.retain(|c| !exclude_ids.contains(&c.id));
    debug!(query, matches = characters.len(), "character search");
    Ok(characters)
}

/// A character with every session it signed up for.
#[derive(Debug, Clone)]
pub struct CharacterReport {
    pub character: Character,
    pub signups: Vec<CharacterSignup>,
}

/// Load a character's play history.
pub async fn character_history(storage: &Storage, character: Character) -> Result<CharacterReport> {
    let signups = storage.character_signups(&character.id).await?;
    Ok(CharacterReport { character, signups })
}

impl fmt::Display for CharacterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.character;
        writeln!(
            f,
            "{}: {}",
            c.org_play_id(),
            c.name.as_deref().unwrap_or("Name not found")
        )?;
        for signup in &self.signups {
            let s = &signup.scenario;
            writeln!(
                f,
                " - {} - {}{} ({})",
                s.code(),
                s.name,
                s.evergreen_suffix(),
                signup.date.format("%d %B %Y")
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scenario search
// ---------------------------------------------------------------------------

/// Scenarios that fit a tier and that none of `excluded_players` has played.
#[derive(Debug, Clone)]
pub struct ScenarioSearch {
    pub tier: Tier,
    pub excluded_players: Vec<i64>,
    pub scenarios: Vec<Scenario>,
}

/// Find scenarios with `min_level <= tier.low()` and `max_level >= tier.high()`,
/// dropping any scenario with a session one of `excluded_players` signed up for.
pub async fn search_scenarios(
    storage: &Storage,
    tier: Tier,
    excluded_players: &[i64],
) -> Result<ScenarioSearch> {
    let scenarios = storage
        .search_scenarios(tier.low(), tier.high(), excluded_players)
        .await?;
    debug!(%tier, excluded = excluded_players.len(), matches = scenarios.len(), "scenario search");
    Ok(ScenarioSearch {
        tier,
        excluded_players: excluded_players.to_vec(),
        scenarios,
    })
}

impl fmt::Display for ScenarioSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scenarios.is_empty() {
            return writeln!(f, "No scenarios found for levels {}", self.tier);
        }
        for s in &self.scenarios {
            writeln!(f, "{} {}", s.code(), s.name)?;
        }
        Ok(())
    }
}
