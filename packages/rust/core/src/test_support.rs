//! Fixtures shared by the core test modules.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pfsledger_shared::{ScenarioRecord, SessionPayload, SignupPayload};
use pfsledger_storage::Storage;
use uuid::Uuid;

/// Create a temp file storage for testing.
pub(crate) async fn test_storage() -> Storage {
    let tmp = std::env::temp_dir().join(format!("pfsledger_core_{}.db", Uuid::now_v7()));
    Storage::open(&tmp).await.expect("open test db")
}

pub(crate) fn scenario(season: i64, number: i64, name: &str, min: i64, max: i64) -> ScenarioRecord {
    ScenarioRecord {
        season,
        scenario: number,
        subscenario: String::new(),
        name: name.into(),
        min_level: min,
        max_level: max,
        evergreen: false,
    }
}

/// Small catalog spanning all three tiers.
pub(crate) async fn seed_catalog(storage: &Storage) {
    for record in [
        scenario(1, 1, "The Absalom Initiation", 1, 4),
        scenario(1, 7, "Flooded King's Court", 1, 4),
        scenario(1, 13, "Escaping the Grave", 3, 6),
        scenario(2, 3, "Catastrophe's Spark", 1, 4),
        scenario(2, 10, "Pathfinder's Pledge", 5, 8),
        scenario(5, 8, "Ruined Rooms", 1, 8),
    ] {
        storage.upsert_scenario(&record).await.expect("seed scenario");
    }
}

pub(crate) fn signup(player: i64, character: i64, name: &str) -> SignupPayload {
    SignupPayload {
        is_gm: false,
        org_play_number: player,
        character_number: character,
        character_name: Some(name.into()),
    }
}

pub(crate) fn payload(title: &str, date: &str, signups: Vec<SignupPayload>) -> SessionPayload {
    let mut sign_ups = vec![SignupPayload {
        is_gm: true,
        org_play_number: 999_001,
        character_number: 2001,
        character_name: Some("Gamemaster".into()),
    }];
    sign_ups.extend(signups);
    SessionPayload {
        scenario: title.into(),
        game_date: date.into(),
        gm_org_play_number: 999_001,
        sign_ups,
    }
}

/// Encode a payload the way RPG Chronicles exports it: JSON, UTF-16LE, base64.
pub(crate) fn encode_payload(payload: &SessionPayload) -> String {
    let json = serde_json::to_string(payload).expect("serialize payload");
    let bytes: Vec<u8> = json.encode_utf16().flat_map(u16::to_le_bytes).collect();
    STANDARD.encode(bytes)
}
