//! Application configuration for pfsledger.
//!
//! User config lives at `~/.pfsledger/pfsledger.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pfsledger.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pfsledger";

// ---------------------------------------------------------------------------
// Config structs (matching pfsledger.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Bundled scenario catalog location.
    #[serde(default)]
    pub scenarios: ScenariosConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file. A leading `~/` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    format!("~/{CONFIG_DIR_NAME}/pfsledger.db")
}

/// `[scenarios]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenariosConfig {
    /// Directory holding the scenario JSON files.
    #[serde(default = "default_scenarios_dir")]
    pub dir: String,

    /// Name of the JSON file (inside `dir`) listing the files to import.
    #[serde(default = "default_file_list")]
    pub file_list: String,
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            dir: default_scenarios_dir(),
            file_list: default_file_list(),
        }
    }
}

fn default_scenarios_dir() -> String {
    "scenarios".into()
}
fn default_file_list() -> String {
    "filelist.json".into()
}

impl AppConfig {
    /// Resolved database path with `~` expanded.
    pub fn db_path(&self) -> Result<PathBuf> {
        expand_home(&self.database.path)
    }

    /// Resolved scenario directory with `~` expanded.
    pub fn scenarios_dir(&self) -> Result<PathBuf> {
        expand_home(&self.scenarios.dir)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(raw: &str) -> Result<PathBuf> {
    match raw.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| LedgerError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(raw)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pfsledger/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LedgerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pfsledger/pfsledger.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LedgerError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LedgerError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LedgerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LedgerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LedgerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("pfsledger.db"));
        assert!(toml_str.contains("filelist.json"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[database]
path = "/tmp/ledger.db"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.database.path, "/tmp/ledger.db");
        assert_eq!(config.scenarios.dir, "scenarios");
        assert_eq!(config.scenarios.file_list, "filelist.json");
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/ledger.db"));
    }

    #[test]
    fn home_prefix_expands() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let expanded = expand_home("~/.pfsledger/x.db").expect("expand");
        assert_eq!(expanded, home.join(".pfsledger/x.db"));
        assert_eq!(expand_home("relative/x.db").unwrap(), PathBuf::from("relative/x.db"));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "pfsledger_cfg_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[scenarios]\ndir = \"/data/pfs\"\n").unwrap();
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.scenarios.dir, "/data/pfs");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_config_is_config_error() {
        let path = std::env::temp_dir().join(format!(
            "pfsledger_bad_cfg_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[database\npath = 3").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, LedgerError::Config { .. }));
        let _ = std::fs::remove_file(&path);
    }
}
