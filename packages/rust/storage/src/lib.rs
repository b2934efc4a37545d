//! Turso Embedded / libSQL storage layer for the session ledger.
//!
//! The [`Storage`] struct wraps a libSQL database holding the scenario
//! catalog, recorded sessions and their signups, and the players, characters,
//! and GMs they reference. All SQL lives in this crate.

mod migrations;

use std::path::Path;

use chrono::{NaiveDate, Utc};
use libsql::{Connection, Database, params};
use pfsledger_shared::{
    Character, CharacterSignup, LedgerError, Player, Result, Scenario, ScenarioRecord,
    ScenarioSession,
};
use uuid::Uuid;

/// Calendar dates are stored as ISO text so they sort and compare as strings.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// Row counts per table, for summaries and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub scenarios: u64,
    pub sessions: u64,
    pub signups: u64,
    pub players: u64,
    pub characters: u64,
    pub gms: u64,
}

fn storage_err(e: libsql::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

impl Storage {
    /// Open or create a database at `path` and bring its schema up to date.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await?;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LedgerError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    ///
    /// Only a missing `schema_migrations` table means version 0; any other
    /// failure is returned so a broken database is not migrated from scratch.
    async fn get_schema_version(&self) -> Result<u32> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'schema_migrations'",
                params![],
            )
            .await
            .map_err(storage_err)?;
        let exists = match rows.next().await.map_err(storage_err)? {
            Some(row) => row.get::<i64>(0).map_err(storage_err)? > 0,
            None => false,
        };
        if !exists {
            return Ok(0);
        }

        let mut rows = self
            .conn
            .query(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                params![],
            )
            .await
            .map_err(|e| LedgerError::Storage(format!("cannot read schema version: {e}")))?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => {
                let version = row.get::<i64>(0).map_err(storage_err)?;
                u32::try_from(version)
                    .map_err(|_| LedgerError::Storage(format!("invalid schema version {version}")))
            }
            None => Ok(0),
        }
    }

    /// Row counts for every entity table.
    pub async fn counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            scenarios: self.count("SELECT COUNT(*) FROM scenarios").await?,
            sessions: self.count("SELECT COUNT(*) FROM sessions").await?,
            signups: self.count("SELECT COUNT(*) FROM signups").await?,
            players: self.count("SELECT COUNT(*) FROM players").await?,
            characters: self.count("SELECT COUNT(*) FROM characters").await?,
            gms: self.count("SELECT COUNT(*) FROM gms").await?,
        })
    }

    async fn count(&self, sql: &'static str) -> Result<u64> {
        let mut rows = self.conn.query(sql, params![]).await.map_err(storage_err)?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => {
                let n = row.get::<i64>(0).map_err(storage_err)?;
                Ok(u64::try_from(n).unwrap_or_default())
            }
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario operations
    // -----------------------------------------------------------------------

    /// Upsert a scenario by `(season, scenario, subscenario)`, overwriting
    /// every other field on conflict.
    pub async fn upsert_scenario(&self, record: &ScenarioRecord) -> Result<()> {
        let id = new_id();
        self.conn
            .execute(
                "INSERT INTO scenarios (id, season, scenario, subscenario, name, min_level, max_level, evergreen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(season, scenario, subscenario) DO UPDATE SET
                   name = excluded.name,
                   min_level = excluded.min_level,
                   max_level = excluded.max_level,
                   evergreen = excluded.evergreen",
                params![
                    id.as_str(),
                    record.season,
                    record.scenario,
                    record.subscenario.as_str(),
                    record.name.as_str(),
                    record.min_level,
                    record.max_level,
                    i64::from(record.evergreen),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Find a scenario by season and number. Multi-part scenarios resolve to
    /// their first part.
    pub async fn find_scenario(&self, season: i64, scenario: i64) -> Result<Option<Scenario>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, season, scenario, subscenario, name, min_level, max_level, evergreen
                 FROM scenarios WHERE season = ?1 AND scenario = ?2
                 ORDER BY subscenario LIMIT 1",
                params![season, scenario],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_scenario(&row, 0)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// List every scenario covering `low..=high`, skipping scenarios with a
    /// recorded session that any of `excluded_players` took part in.
    pub async fn search_scenarios(
        &self,
        low: i64,
        high: i64,
        excluded_players: &[i64],
    ) -> Result<Vec<Scenario>> {
        let mut sql = String::from(
            "SELECT s.id, s.season, s.scenario, s.subscenario, s.name, s.min_level, s.max_level, s.evergreen
             FROM scenarios s
             WHERE s.min_level <= ?1 AND s.max_level >= ?2",
        );
        if !excluded_players.is_empty() {
            // Player numbers are integers, so inlining them cannot inject SQL.
            let numbers = excluded_players
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(
                "
               AND NOT EXISTS (
                 SELECT 1 FROM sessions se
                 JOIN signups su ON su.session_id = se.id
                 JOIN characters c ON c.id = su.character_id
                 JOIN players p ON p.id = c.player_id
                 WHERE se.scenario_id = s.id AND p.number IN ({numbers}))"
            ));
        }
        sql.push_str(" ORDER BY s.season, s.scenario, s.subscenario");

        let mut rows = self
            .conn
            .query(&sql, params![low, high])
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_scenario(&row, 0)?);
        }
        Ok(results)
    }

    /// All sessions of a scenario in date order, each with its signups.
    pub async fn scenario_sessions(&self, scenario_id: &str) -> Result<Vec<ScenarioSession>> {
        let mut rows = self
            .conn
            .query(
                "SELECT se.id, se.date, g.number, c.id, c.player_id, p.number, c.number, c.name
                 FROM sessions se
                 JOIN gms g ON g.id = se.gm_id
                 LEFT JOIN signups su ON su.session_id = se.id
                 LEFT JOIN characters c ON c.id = su.character_id
                 LEFT JOIN players p ON p.id = c.player_id
                 WHERE se.scenario_id = ?1
                 ORDER BY se.date, se.id, p.number, c.number",
                params![scenario_id],
            )
            .await
            .map_err(storage_err)?;

        let mut sessions: Vec<ScenarioSession> = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let session_id: String = row.get(0).map_err(storage_err)?;
            if sessions.last().map(|s| s.session_id.as_str()) != Some(session_id.as_str()) {
                sessions.push(ScenarioSession {
                    session_id,
                    date: parse_date(&row.get::<String>(1).map_err(storage_err)?)?,
                    gm_number: row.get(2).map_err(storage_err)?,
                    signups: Vec::new(),
                });
            }

            // Sessions without signups come back with NULL character columns.
            if let Ok(character_id) = row.get::<String>(3) {
                let character = Character {
                    id: character_id,
                    player_id: row.get(4).map_err(storage_err)?,
                    player_number: row.get(5).map_err(storage_err)?,
                    number: row.get(6).map_err(storage_err)?,
                    name: row.get::<String>(7).ok(),
                };
                if let Some(session) = sessions.last_mut() {
                    session.signups.push(character);
                }
            }
        }
        Ok(sessions)
    }

    // -----------------------------------------------------------------------
    // Session operations
    // -----------------------------------------------------------------------

    /// Find the session recorded for a scenario on a date. Returns its ID.
    pub async fn find_session(&self, scenario_id: &str, date: NaiveDate) -> Result<Option<String>> {
        let date = date.format(DATE_FORMAT).to_string();
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM sessions WHERE scenario_id = ?1 AND date = ?2 LIMIT 1",
                params![scenario_id, date.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row.get::<String>(0).map_err(storage_err)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Insert a session. Returns the generated session ID.
    pub async fn insert_session(
        &self,
        scenario_id: &str,
        date: NaiveDate,
        gm_id: &str,
    ) -> Result<String> {
        let id = new_id();
        let date = date.format(DATE_FORMAT).to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sessions (id, scenario_id, date, gm_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.as_str(), scenario_id, date.as_str(), gm_id, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Return the ID of the GM with this org-play number, creating the GM if needed.
    pub async fn get_or_create_gm(&self, number: i64) -> Result<String> {
        let id = new_id();
        self.conn
            .execute(
                "INSERT INTO gms (id, number) VALUES (?1, ?2) ON CONFLICT(number) DO NOTHING",
                params![id.as_str(), number],
            )
            .await
            .map_err(storage_err)?;
        self.id_by_number("SELECT id FROM gms WHERE number = ?1", number)
            .await
    }

    /// Insert a signup linking a session and a character. Returns the signup ID.
    pub async fn insert_signup(&self, session_id: &str, character_id: &str) -> Result<String> {
        let id = new_id();
        self.conn
            .execute(
                "INSERT INTO signups (id, session_id, character_id) VALUES (?1, ?2, ?3)",
                params![id.as_str(), session_id, character_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Player operations
    // -----------------------------------------------------------------------

    /// Return the ID of the player with this org-play number, creating the player if needed.
    pub async fn get_or_create_player(&self, number: i64) -> Result<String> {
        let id = new_id();
        self.conn
            .execute(
                "INSERT INTO players (id, number) VALUES (?1, ?2) ON CONFLICT(number) DO NOTHING",
                params![id.as_str(), number],
            )
            .await
            .map_err(storage_err)?;
        self.id_by_number("SELECT id FROM players WHERE number = ?1", number)
            .await
    }

    async fn id_by_number(&self, sql: &'static str, number: i64) -> Result<String> {
        let mut rows = self
            .conn
            .query(sql, params![number])
            .await
            .map_err(storage_err)?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => row.get::<String>(0).map_err(storage_err),
            None => Err(LedgerError::Storage(format!(
                "row for number {number} vanished after insert"
            ))),
        }
    }

    /// Get a player by org-play number.
    pub async fn get_player(&self, number: i64) -> Result<Option<Player>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, number, name FROM players WHERE number = ?1",
                params![number],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(Player {
                id: row.get(0).map_err(storage_err)?,
                number: row.get(1).map_err(storage_err)?,
                name: row.get::<String>(2).ok(),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Set a player's display name. Returns the number of rows updated.
    pub async fn rename_player(&self, number: i64, name: &str) -> Result<u64> {
        self.conn
            .execute(
                "UPDATE players SET name = ?1 WHERE number = ?2",
                params![name, number],
            )
            .await
            .map_err(storage_err)
    }

    /// Delete a player if it owns no characters. Returns the deleted player's number.
    pub async fn delete_player_if_empty(&self, player_id: &str) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT p.number FROM players p
                 WHERE p.id = ?1
                   AND NOT EXISTS (SELECT 1 FROM characters c WHERE c.player_id = p.id)",
                params![player_id],
            )
            .await
            .map_err(storage_err)?;

        let number = match rows.next().await.map_err(storage_err)? {
            Some(row) => row.get::<i64>(0).map_err(storage_err)?,
            None => return Ok(None),
        };

        self.conn
            .execute("DELETE FROM players WHERE id = ?1", params![player_id])
            .await
            .map_err(storage_err)?;
        Ok(Some(number))
    }

    // -----------------------------------------------------------------------
    // Character operations
    // -----------------------------------------------------------------------

    /// Find a character by its owner's org-play number and its character number.
    pub async fn find_character(
        &self,
        player_number: i64,
        character_number: i64,
    ) -> Result<Option<Character>> {
        let mut rows = self
            .conn
            .query(
                "SELECT c.id, c.player_id, p.number, c.number, c.name
                 FROM characters c JOIN players p ON p.id = c.player_id
                 WHERE p.number = ?1 AND c.number = ?2
                 LIMIT 1",
                params![player_number, character_number],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_character(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Get a character by ID.
    pub async fn get_character(&self, id: &str) -> Result<Option<Character>> {
        let mut rows = self
            .conn
            .query(
                "SELECT c.id, c.player_id, p.number, c.number, c.name
                 FROM characters c JOIN players p ON p.id = c.player_id
                 WHERE c.id = ?1",
                params![id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_character(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Insert a character for a player. Returns the stored character.
    pub async fn insert_character(
        &self,
        player_id: &str,
        number: i64,
        name: Option<&str>,
    ) -> Result<Character> {
        let id = new_id();
        self.conn
            .execute(
                "INSERT INTO characters (id, player_id, number, name) VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), player_id, number, name],
            )
            .await
            .map_err(storage_err)?;

        self.get_character(&id)
            .await?
            .ok_or_else(|| LedgerError::Storage(format!("character {id} vanished after insert")))
    }

    /// Characters whose name contains `needle`, or whose player has
    /// `player_number`. Ordered by name, then org-play ID.
    pub async fn search_characters(
        &self,
        needle: &str,
        player_number: Option<i64>,
    ) -> Result<Vec<Character>> {
        let pattern = format!("%{}%", escape_like(needle));
        let mut rows = self
            .conn
            .query(
                "SELECT c.id, c.player_id, p.number, c.number, c.name
                 FROM characters c JOIN players p ON p.id = c.player_id
                 WHERE c.name LIKE ?1 ESCAPE '\\'
                    OR (?2 IS NOT NULL AND p.number = ?2)
                 ORDER BY c.name, p.number, c.number",
                params![pattern.as_str(), player_number],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_character(&row)?);
        }
        Ok(results)
    }

    /// Every session a character signed up for, in date order.
    pub async fn character_signups(&self, character_id: &str) -> Result<Vec<CharacterSignup>> {
        let mut rows = self
            .conn
            .query(
                "SELECT s.id, s.season, s.scenario, s.subscenario, s.name, s.min_level, s.max_level, s.evergreen,
                        se.id, se.date
                 FROM signups su
                 JOIN sessions se ON se.id = su.session_id
                 JOIN scenarios s ON s.id = se.scenario_id
                 WHERE su.character_id = ?1
                 ORDER BY se.date, s.season, s.scenario",
                params![character_id],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(CharacterSignup {
                scenario: row_to_scenario(&row, 0)?,
                session_id: row.get(8).map_err(storage_err)?,
                date: parse_date(&row.get::<String>(9).map_err(storage_err)?)?,
            });
        }
        Ok(results)
    }

    /// Set a character's name. Returns the number of rows updated.
    pub async fn rename_character(&self, id: &str, name: &str) -> Result<u64> {
        self.conn
            .execute(
                "UPDATE characters SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .await
            .map_err(storage_err)
    }

    /// Point every signup of `from_character` at `to_character`. Returns the number moved.
    pub async fn reassign_signups(&self, from_character: &str, to_character: &str) -> Result<u64> {
        self.conn
            .execute(
                "UPDATE signups SET character_id = ?1 WHERE character_id = ?2",
                params![to_character, from_character],
            )
            .await
            .map_err(storage_err)
    }

    /// Delete a character by ID.
    pub async fn delete_character(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM characters WHERE id = ?1", params![id])
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

/// Escape `%`, `_`, and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| LedgerError::Storage(format!("invalid date '{raw}': {e}")))
}

/// Convert the eight scenario columns starting at `offset` into a [`Scenario`].
fn row_to_scenario(row: &libsql::Row, offset: i32) -> Result<Scenario> {
    Ok(Scenario {
        id: row.get(offset).map_err(storage_err)?,
        season: row.get(offset + 1).map_err(storage_err)?,
        scenario: row.get(offset + 2).map_err(storage_err)?,
        subscenario: row.get::<String>(offset + 3).unwrap_or_default(),
        name: row.get(offset + 4).map_err(storage_err)?,
        min_level: row.get(offset + 5).map_err(storage_err)?,
        max_level: row.get(offset + 6).map_err(storage_err)?,
        evergreen: row.get::<i64>(offset + 7).map_err(storage_err)? != 0,
    })
}

/// Convert `(id, player_id, player number, number, name)` into a [`Character`].
fn row_to_character(row: &libsql::Row) -> Result<Character> {
    Ok(Character {
        id: row.get(0).map_err(storage_err)?,
        player_id: row.get(1).map_err(storage_err)?,
        player_number: row.get(2).map_err(storage_err)?,
        number: row.get(3).map_err(storage_err)?,
        name: row.get::<String>(4).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("pfsledger_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn record(season: i64, scenario: i64, name: &str, min: i64, max: i64) -> ScenarioRecord {
        ScenarioRecord {
            season,
            scenario,
            subscenario: String::new(),
            name: name.into(),
            min_level: min,
            max_level: max,
            evergreen: false,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await.unwrap();
        assert_eq!(version, 2);
        assert_eq!(storage.counts().await.unwrap(), TableCounts::default());
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("pfsledger_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unreadable_migration_table_fails_open() {
        let tmp = std::env::temp_dir().join(format!("pfsledger_test_{}.db", Uuid::now_v7()));
        {
            let db = libsql::Builder::new_local(&tmp).build().await.expect("raw db");
            let conn = db.connect().expect("raw conn");
            conn.execute_batch("CREATE VIEW schema_migrations AS SELECT 1 AS applied_at;")
                .await
                .expect("create view");
        }

        let err = match Storage::open(&tmp).await {
            Ok(_) => panic!("open should fail on an unreadable schema_migrations"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("cannot read schema version"), "{err}");
        assert!(!err.contains("migration v"), "{err}");
    }

    #[tokio::test]
    async fn scenario_upsert_overwrites_fields() {
        let storage = test_storage().await;
        storage
            .upsert_scenario(&record(1, 1, "The Absalom Initiation", 1, 4))
            .await
            .expect("insert");

        let first = storage.find_scenario(1, 1).await.unwrap().unwrap();
        assert_eq!(first.name, "The Absalom Initiation");
        assert!(!first.evergreen);

        let mut updated = record(1, 1, "The Absalom Initiation (revised)", 1, 5);
        updated.evergreen = true;
        storage.upsert_scenario(&updated).await.expect("update");

        let second = storage.find_scenario(1, 1).await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "The Absalom Initiation (revised)");
        assert_eq!(second.max_level, 5);
        assert!(second.evergreen);
        assert_eq!(storage.counts().await.unwrap().scenarios, 1);
    }

    #[tokio::test]
    async fn subscenarios_are_distinct_rows() {
        let storage = test_storage().await;
        let mut part_a = record(3, 99, "Part A", 1, 4);
        part_a.subscenario = "A".into();
        let mut part_b = record(3, 99, "Part B", 1, 4);
        part_b.subscenario = "B".into();
        storage.upsert_scenario(&part_b).await.unwrap();
        storage.upsert_scenario(&part_a).await.unwrap();

        assert_eq!(storage.counts().await.unwrap().scenarios, 2);
        let found = storage.find_scenario(3, 99).await.unwrap().unwrap();
        assert_eq!(found.subscenario, "A");
    }

    #[tokio::test]
    async fn gm_and_player_get_or_create() {
        let storage = test_storage().await;
        let gm1 = storage.get_or_create_gm(111).await.unwrap();
        let gm2 = storage.get_or_create_gm(111).await.unwrap();
        assert_eq!(gm1, gm2);

        let p1 = storage.get_or_create_player(222).await.unwrap();
        let p2 = storage.get_or_create_player(222).await.unwrap();
        assert_eq!(p1, p2);

        let counts = storage.counts().await.unwrap();
        assert_eq!((counts.gms, counts.players), (1, 1));
    }

    #[tokio::test]
    async fn session_lookup_by_scenario_and_date() {
        let storage = test_storage().await;
        storage.upsert_scenario(&record(1, 1, "A", 1, 4)).await.unwrap();
        let scenario = storage.find_scenario(1, 1).await.unwrap().unwrap();
        let gm = storage.get_or_create_gm(111).await.unwrap();

        assert!(storage.find_session(&scenario.id, day(5)).await.unwrap().is_none());
        let session_id = storage.insert_session(&scenario.id, day(5), &gm).await.unwrap();
        assert_eq!(
            storage.find_session(&scenario.id, day(5)).await.unwrap(),
            Some(session_id)
        );
        assert!(storage.find_session(&scenario.id, day(6)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scenario_sessions_group_signups() {
        let storage = test_storage().await;
        storage.upsert_scenario(&record(1, 1, "A", 1, 4)).await.unwrap();
        let scenario = storage.find_scenario(1, 1).await.unwrap().unwrap();
        let gm = storage.get_or_create_gm(111).await.unwrap();
        let player = storage.get_or_create_player(222).await.unwrap();
        let c1 = storage.insert_character(&player, 2001, Some("Ezren")).await.unwrap();
        let c2 = storage.insert_character(&player, 2002, None).await.unwrap();

        let s1 = storage.insert_session(&scenario.id, day(5), &gm).await.unwrap();
        storage.insert_signup(&s1, &c1.id).await.unwrap();
        storage.insert_signup(&s1, &c2.id).await.unwrap();
        // A session nobody signed up for still shows up.
        storage.insert_session(&scenario.id, day(9), &gm).await.unwrap();

        let sessions = storage.scenario_sessions(&scenario.id).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].date, day(5));
        assert_eq!(sessions[0].gm_number, 111);
        assert_eq!(sessions[0].signups.len(), 2);
        assert_eq!(sessions[0].signups[1].name, None);
        assert!(sessions[1].signups.is_empty());
    }

    #[tokio::test]
    async fn character_search_by_name_or_player() {
        let storage = test_storage().await;
        let p1 = storage.get_or_create_player(123456).await.unwrap();
        let p2 = storage.get_or_create_player(654321).await.unwrap();
        storage.insert_character(&p1, 2001, Some("Valeros")).await.unwrap();
        storage.insert_character(&p1, 2002, Some("Seoni")).await.unwrap();
        storage.insert_character(&p2, 2001, Some("Valeria")).await.unwrap();
        storage.insert_character(&p2, 2002, Some("100%_Real")).await.unwrap();

        let by_name = storage.search_characters("Valer", None).await.unwrap();
        assert_eq!(by_name.len(), 2);

        let by_player = storage.search_characters("123456", Some(123456)).await.unwrap();
        assert_eq!(by_player.len(), 2);
        assert!(by_player.iter().all(|c| c.player_number == 123456));

        // LIKE wildcards in the query are literal.
        let literal = storage.search_characters("%_", None).await.unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].name.as_deref(), Some("100%_Real"));

        let found = storage.find_character(654321, 2001).await.unwrap().unwrap();
        assert_eq!(found.name.as_deref(), Some("Valeria"));
        assert!(storage.find_character(654321, 2003).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reassign_and_cleanup() {
        let storage = test_storage().await;
        storage.upsert_scenario(&record(1, 1, "A", 1, 4)).await.unwrap();
        let scenario = storage.find_scenario(1, 1).await.unwrap().unwrap();
        let gm = storage.get_or_create_gm(111).await.unwrap();
        let keep_player = storage.get_or_create_player(1).await.unwrap();
        let drop_player = storage.get_or_create_player(2).await.unwrap();
        let keep = storage.insert_character(&keep_player, 2001, Some("Kyra")).await.unwrap();
        let dupe = storage.insert_character(&drop_player, 2001, Some("Kyra")).await.unwrap();
        let session = storage.insert_session(&scenario.id, day(5), &gm).await.unwrap();
        storage.insert_signup(&session, &dupe.id).await.unwrap();

        // Still owns a character: not deleted.
        assert_eq!(storage.delete_player_if_empty(&drop_player).await.unwrap(), None);

        assert_eq!(storage.reassign_signups(&dupe.id, &keep.id).await.unwrap(), 1);
        storage.delete_character(&dupe.id).await.unwrap();
        assert_eq!(
            storage.delete_player_if_empty(&drop_player).await.unwrap(),
            Some(2)
        );
        assert!(storage.get_player(2).await.unwrap().is_none());

        let history = storage.character_signups(&keep.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].scenario.id, scenario.id);
    }

    #[tokio::test]
    async fn rename_player_and_character() {
        let storage = test_storage().await;
        let player = storage.get_or_create_player(42).await.unwrap();
        let character = storage.insert_character(&player, 2001, None).await.unwrap();

        assert_eq!(storage.rename_character(&character.id, "Merisiel").await.unwrap(), 1);
        let renamed = storage.get_character(&character.id).await.unwrap().unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Merisiel"));

        assert_eq!(storage.rename_player(42, "Sam").await.unwrap(), 1);
        assert_eq!(storage.rename_player(43, "Nobody").await.unwrap(), 0);
        let p = storage.get_player(42).await.unwrap().unwrap();
        assert_eq!(p.name.as_deref(), Some("Sam"));
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
