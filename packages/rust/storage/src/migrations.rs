//! SQL migration definitions for the ledger database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: scenarios, gms, players, characters, sessions, signups",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Scenario catalog, loaded from the bundled JSON files
CREATE TABLE IF NOT EXISTS scenarios (
    id          TEXT PRIMARY KEY,
    season      INTEGER NOT NULL,
    scenario    INTEGER NOT NULL,
    subscenario TEXT NOT NULL DEFAULT '',
    name        TEXT NOT NULL,
    min_level   INTEGER NOT NULL,
    max_level   INTEGER NOT NULL,
    evergreen   INTEGER NOT NULL DEFAULT 0,
    UNIQUE(season, scenario, subscenario)
);

CREATE INDEX IF NOT EXISTS idx_scenarios_levels ON scenarios(min_level, max_level);

-- Game masters, by org-play number
CREATE TABLE IF NOT EXISTS gms (
    id     TEXT PRIMARY KEY,
    number INTEGER NOT NULL UNIQUE
);

-- Players, by org-play number
CREATE TABLE IF NOT EXISTS players (
    id     TEXT PRIMARY KEY,
    number INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS characters (
    id        TEXT PRIMARY KEY,
    player_id TEXT NOT NULL REFERENCES players(id),
    number    INTEGER NOT NULL,
    name      TEXT
);

CREATE INDEX IF NOT EXISTS idx_characters_player ON characters(player_id, number);

-- One playing of a scenario
CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY,
    scenario_id TEXT NOT NULL REFERENCES scenarios(id),
    date        TEXT NOT NULL,
    gm_id       TEXT NOT NULL REFERENCES gms(id),
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_scenario_date ON sessions(scenario_id, date);

-- Non-GM seats at a session
CREATE TABLE IF NOT EXISTS signups (
    id           TEXT PRIMARY KEY,
    session_id   TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    character_id TEXT NOT NULL REFERENCES characters(id)
);

CREATE INDEX IF NOT EXISTS idx_signups_session ON signups(session_id);
CREATE INDEX IF NOT EXISTS idx_signups_character ON signups(character_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Player display names",
            sql: r#"
ALTER TABLE players ADD COLUMN name TEXT;

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
