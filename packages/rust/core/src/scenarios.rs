//! Scenario catalog import from the bundled JSON files.
//!
//! The catalog directory holds a file list (`filelist.json`, a JSON array of
//! file names) and one JSON array of scenario records per listed file.
//! Records are upserted by `(season, scenario, subscenario)`, so reloading an
//! unchanged catalog leaves the database unchanged.

use std::path::Path;

use tracing::{info, instrument, warn};

use pfsledger_shared::{LedgerError, Result, ScenarioRecord};
use pfsledger_storage::Storage;

/// Counts reported after a catalog import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Files read successfully.
    pub files: usize,
    /// Records upserted.
    pub upserted: usize,
    /// Records (or whole files) skipped because of an error.
    pub failed: usize,
}

/// Progress callback for reporting catalog import status.
pub trait ProgressReporter: Send + Sync {
    /// Called before each listed file is read.
    fn file_started(&self, name: &str, current: usize, total: usize);
    /// Called when the import completes.
    fn done(&self, summary: &ImportSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn file_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &ImportSummary) {}
}

/// Read the list of scenario files to import.
pub fn load_file_list(dir: &Path, list_name: &str) -> Result<Vec<String>> {
    let path = dir.join(list_name);
    let content = std::fs::read_to_string(&path).map_err(|e| LedgerError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| LedgerError::parse(format!("invalid file list {}: {e}", path.display())))
}

/// Import every file named in the catalog's file list.
///
/// Only a missing or malformed file list is fatal. Unreadable files and bad
/// records are logged and counted in [`ImportSummary::failed`].
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn import_scenarios(
    storage: &Storage,
    dir: &Path,
    list_name: &str,
    progress: &dyn ProgressReporter,
) -> Result<ImportSummary> {
    let files = load_file_list(dir, list_name)?;
    let mut summary = ImportSummary::default();

    for (i, file) in files.iter().enumerate() {
        progress.file_started(file, i + 1, files.len());

        let records = match read_scenario_file(&dir.join(file)) {
            Ok(records) => records,
            Err(e) => {
                warn!(file, error = %e, "Error loading scenarios");
                summary.failed += 1;
                continue;
            }
        };
        summary.files += 1;

        for (index, value) in records.into_iter().enumerate() {
            let record = match serde_json::from_value::<ScenarioRecord>(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(file, index, error = %e, "Error loading scenarios");
                    summary.failed += 1;
                    continue;
                }
            };
            match storage.upsert_scenario(&record).await {
                Ok(()) => summary.upserted += 1,
                Err(e) => {
                    warn!(
                        file,
                        season = record.season,
                        scenario = record.scenario,
                        error = %e,
                        "Error loading scenarios"
                    );
                    summary.failed += 1;
                }
            }
        }
    }

    info!(
        files = summary.files,
        upserted = summary.upserted,
        failed = summary.failed,
        "scenario import finished"
    );
    progress.done(&summary);
    Ok(summary)
}

/// Read one catalog file as raw JSON values so a bad record only costs itself.
fn read_scenario_file(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| LedgerError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| LedgerError::parse(format!("{} is not a JSON array: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;
    use crate::test_support::test_storage;

    fn catalog_dir(files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pfsledger_catalog_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let names: Vec<&str> = files.iter().map(|(name, _)| *name).collect();
        std::fs::write(dir.join("filelist.json"), serde_json::to_string(&names).unwrap())
            .unwrap();
        for (name, body) in files {
            std::fs::write(dir.join(name), body).unwrap();
        }
        dir
    }

    const SEASON_1: &str = r#"[
        {"season": 1, "scenario": 0, "subscenario": "", "name": "The Absalom Initiation", "minLevel": 1, "maxLevel": 4, "evergreen": true},
        {"season": 1, "scenario": 1, "subscenario": "", "name": "The Absalom Initiation", "minLevel": 1, "maxLevel": 4, "evergreen": false},
        {"season": 1, "scenario": 13, "name": "Escaping the Grave", "minLevel": 3, "maxLevel": 6}
    ]"#;

    #[tokio::test]
    async fn reimport_is_idempotent() {
        let storage = test_storage().await;
        let dir = catalog_dir(&[("season1.json", SEASON_1)]);

        let first = import_scenarios(&storage, &dir, "filelist.json", &SilentProgress)
            .await
            .expect("first import");
        assert_eq!(first, ImportSummary { files: 1, upserted: 3, failed: 0 });
        let before = storage.find_scenario(1, 13).await.unwrap().unwrap();
        let counts_before = storage.counts().await.unwrap();

        import_scenarios(&storage, &dir, "filelist.json", &SilentProgress)
            .await
            .expect("second import");
        let after = storage.find_scenario(1, 13).await.unwrap().unwrap();

        assert_eq!(before, after);
        assert_eq!(counts_before, storage.counts().await.unwrap());
    }

    #[tokio::test]
    async fn bad_records_and_files_do_not_abort_batch() {
        let storage = test_storage().await;
        let mixed = r#"[
            {"season": 2, "scenario": 1, "name": "Citadel of Corruption", "minLevel": 1, "maxLevel": 4},
            {"season": 2, "scenario": "two", "name": "Broken", "minLevel": 1, "maxLevel": 4},
            {"season": 2, "scenario": 3, "name": "Catastrophe's Spark", "minLevel": 1, "maxLevel": 4}
        ]"#;
        let dir = catalog_dir(&[("season2.json", mixed), ("broken.json", "{not json")]);
        // Listed but never written.
        std::fs::write(
            dir.join("filelist.json"),
            r#"["season2.json", "broken.json", "missing.json"]"#,
        )
        .unwrap();

        let summary = import_scenarios(&storage, &dir, "filelist.json", &SilentProgress)
            .await
            .expect("import");
        assert_eq!(summary, ImportSummary { files: 1, upserted: 2, failed: 3 });
        assert!(storage.find_scenario(2, 3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_file_list_is_fatal() {
        let storage = test_storage().await;
        let dir = std::env::temp_dir().join(format!("pfsledger_empty_{}", Uuid::now_v7()));
        let err = import_scenarios(&storage, &dir, "filelist.json", &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Io { .. }));
    }

    #[test]
    fn bundled_catalog_parses() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../scenarios");
        let files = load_file_list(&dir, "filelist.json").expect("bundled file list");
        assert!(!files.is_empty());
        for file in files {
            let values = read_scenario_file(&dir.join(&file)).expect("bundled file");
            for value in values {
                serde_json::from_value::<ScenarioRecord>(value)
                    .unwrap_or_else(|e| panic!("bad record in {file}: {e}"));
            }
        }
    }
}
