//! Shared types, error model, and configuration for pfsledger.
//!
//! This crate is the foundation depended on by all other pfsledger crates.
//! It provides:
//! - [`LedgerError`]: the unified error type
//! - Domain types ([`Scenario`], [`Character`], [`SessionPayload`], [`Tier`])
//! - Input parsers ([`parse_scenario_title`], [`parse_game_date`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod parse;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, ScenariosConfig, config_dir, config_file_path, expand_home,
    init_config, load_config, load_config_from,
};
pub use error::{LedgerError, Result};
pub use parse::{ScenarioCode, parse_game_date, parse_player_numbers, parse_scenario_title};
pub use types::{
    Character, CharacterSignup, Player, Scenario, ScenarioRecord, ScenarioSession,
    SessionPayload, SignupPayload, Tier,
};
