//! Session import from an RPG Chronicles export.
//!
//! The export is a base64 string wrapping UTF-16LE JSON. Importing resolves
//! the scenario from the title, skips sessions already recorded for that
//! scenario and date, and otherwise records the session, its GM, and one
//! signup per non-GM seat (creating players and characters on first sight).

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, general_purpose};
use chrono::NaiveDate;
use encoding_rs::UTF_16LE;
use tracing::{debug, info, instrument};

use pfsledger_shared::{
    LedgerError, Result, Scenario, SessionPayload, parse_game_date, parse_scenario_title,
};
use pfsledger_storage::Storage;

/// Standard alphabet, padding optional: pasted exports sometimes lose the trailing `=`.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// What an import did.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    /// A session for this scenario and date was already in the ledger.
    AlreadyRecorded { scenario: Scenario, session_id: String },
    /// A new session was recorded.
    Imported {
        scenario: Scenario,
        session_id: String,
        date: NaiveDate,
        /// Signup rows created (one per non-GM seat).
        signups: usize,
        /// Characters seen for the first time.
        new_characters: usize,
    },
}

impl ImportOutcome {
    /// The scenario the session belongs to.
    pub fn scenario(&self) -> &Scenario {
        match self {
            Self::AlreadyRecorded { scenario, .. } | Self::Imported { scenario, .. } => scenario,
        }
    }

    /// ID of the recorded session, new or existing.
    pub fn session_id(&self) -> &str {
        match self {
            Self::AlreadyRecorded { session_id, .. } | Self::Imported { session_id, .. } => {
                session_id
            }
        }
    }
}

/// Decode pasted export text into a [`SessionPayload`].
///
/// Whitespace (line breaks from the editor, stray indentation) is ignored.
pub fn decode_payload(text: &str) -> Result<SessionPayload> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(LedgerError::parse("session data is empty"));
    }

    let bytes = PAYLOAD_ENGINE
        .decode(compact.as_bytes())
        .map_err(|e| LedgerError::parse(format!("session data is not base64: {e}")))?;

    let (json, had_errors) = UTF_16LE.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(LedgerError::parse("session data is not UTF-16 text"));
    }

    serde_json::from_str(&json)
        .map_err(|e| LedgerError::parse(format!("session data is not a session export: {e}")))
}

/// Decode and import pasted export text in one step.
pub async fn import_session_text(storage: &Storage, text: &str) -> Result<ImportOutcome> {
    let payload = decode_payload(text)?;
    import_session(storage, &payload).await
}

/// Record a decoded session unless it is already in the ledger.
///
/// The title and date are validated before anything is written, so a bad
/// export leaves the database untouched. Later failures are not rolled back.
#[instrument(skip_all, fields(scenario = %payload.scenario))]
pub async fn import_session(storage: &Storage, payload: &SessionPayload) -> Result<ImportOutcome> {
    let code = parse_scenario_title(&payload.scenario)?;
    let date = parse_game_date(&payload.game_date)?;
    info!(%code, %date, "importing session");

    let scenario = storage
        .find_scenario(code.season, code.scenario)
        .await?
        .ok_or_else(|| {
            LedgerError::not_found(format!(
                "scenario {code} is not in the catalog (try reloading scenarios)"
            ))
        })?;

    if let Some(session_id) = storage.find_session(&scenario.id, date).await? {
        info!(%session_id, "session already recorded");
        return Ok(ImportOutcome::AlreadyRecorded {
            scenario,
            session_id,
        });
    }

    let gm_id = storage.get_or_create_gm(payload.gm_org_play_number).await?;
    let session_id = storage.insert_session(&scenario.id, date, &gm_id).await?;

    let mut signups = 0;
    let mut new_characters = 0;
    for seat in payload.sign_ups.iter().filter(|s| !s.is_gm) {
        let character = match storage
            .find_character(seat.org_play_number, seat.character_number)
            .await?
        {
            Some(character) => character,
            None => {
                let player_id = storage.get_or_create_player(seat.org_play_number).await?;
                new_characters += 1;
                storage
                    .insert_character(
                        &player_id,
                        seat.character_number,
                        seat.character_name.as_deref(),
                    )
                    .await?
            }
        };
        debug!(character = %character.org_play_id(), "adding signup");
        storage.insert_signup(&session_id, &character.id).await?;
        signups += 1;
    }

    info!(%session_id, signups, new_characters, "session recorded");
    Ok(ImportOutcome::Imported {
        scenario,
        session_id,
        date,
        signups,
        new_characters,
    })
}
