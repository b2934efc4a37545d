//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use pfsledger_core::scenarios::{ImportSummary, ProgressReporter, import_scenarios};
use pfsledger_core::session_import::{ImportOutcome, import_session_text};
use pfsledger_shared::{AppConfig, init_config, load_config, load_config_from};
use pfsledger_storage::Storage;
use tracing::info;

use crate::menu::Menu;
use crate::prompt::TerminalPrompter;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pfsledger: keep track of who played which Pathfinder Society scenario.
#[derive(Parser)]
#[command(
    name = "pfsledger",
    version,
    about = "Record Pathfinder Society sessions and look up who has played what.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.pfsledger/pfsledger.toml).
    #[arg(long, global = true, env = "PFSLEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config file.
    #[arg(long, global = true, env = "PFSLEDGER_DB")]
    pub db: Option<PathBuf>,

    /// Scenario catalog directory, overriding the config file.
    #[arg(long, global = true)]
    pub scenarios_dir: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to the interactive menu.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Open the interactive menu.
    Menu,

    /// Load (or reload) the scenario catalog.
    LoadScenarios,

    /// Import one session export.
    ImportSession {
        /// File holding the pasted export; reads stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Paths resolved from the config file and CLI overrides.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub db_path: PathBuf,
    pub scenarios_dir: PathBuf,
    pub file_list: String,
}

impl Settings {
    fn resolve(cli: &Cli, config: &AppConfig) -> Result<Self> {
        let db_path = match &cli.db {
            Some(path) => path.clone(),
            None => config.db_path()?,
        };
        let scenarios_dir = match &cli.scenarios_dir {
            Some(dir) => dir.clone(),
            None => config.scenarios_dir()?,
        };
        Ok(Self {
            db_path,
            scenarios_dir,
            file_list: config.scenarios.file_list.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; reports own stdout.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pfsledger=info",
        1 => "pfsledger=debug",
        _ => "pfsledger=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match &cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
        Some(Command::LoadScenarios) => {
            let settings = Settings::resolve(&cli, &config)?;
            cmd_load_scenarios(&settings).await
        }
        Some(Command::ImportSession { file }) => {
            let settings = Settings::resolve(&cli, &config)?;
            cmd_import_session(&settings, file.as_deref()).await
        }
        Some(Command::Menu) | None => {
            let settings = Settings::resolve(&cli, &config)?;
            cmd_menu(&settings).await
        }
    }
}

async fn open_storage(settings: &Settings) -> Result<Storage> {
    info!(db = %settings.db_path.display(), "opening database");
    let storage = Storage::open(&settings.db_path).await?;
    let counts = storage.counts().await?;
    tracing::debug!(
        scenarios = counts.scenarios,
        sessions = counts.sessions,
        characters = counts.characters,
        "database ready"
    );
    Ok(storage)
}

async fn cmd_menu(settings: &Settings) -> Result<()> {
    let storage = open_storage(settings).await?;
    let progress = CliProgress::new();
    let mut menu = Menu::new(
        &storage,
        settings,
        &progress,
        TerminalPrompter::new(),
        std::io::stdout(),
    );
    menu.run().await
}

async fn cmd_load_scenarios(settings: &Settings) -> Result<()> {
    let storage = open_storage(settings).await?;
    let progress = CliProgress::new();
    let summary = import_scenarios(
        &storage,
        &settings.scenarios_dir,
        &settings.file_list,
        &progress,
    )
    .await?;

    println!("{}", describe_summary(&summary));
    Ok(())
}

async fn cmd_import_session(settings: &Settings, file: Option<&std::path::Path>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let storage = open_storage(settings).await?;
    let outcome = import_session_text(&storage, &text).await?;
    println!("{}", describe_outcome(&outcome));
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared wording
// ---------------------------------------------------------------------------

pub(crate) fn describe_summary(summary: &ImportSummary) -> String {
    let mut line = format!(
        "Loaded {} scenario(s) from {} file(s)",
        summary.upserted, summary.files
    );
    if summary.failed > 0 {
        line.push_str(&format!(" ({} failed, see log)", summary.failed));
    }
    line
}

pub(crate) fn describe_outcome(outcome: &ImportOutcome) -> String {
    let scenario = outcome.scenario();
    let header = format!("Scenario: {} - {}", scenario.code(), scenario.name);
    match outcome {
        ImportOutcome::AlreadyRecorded { session_id, .. } => {
            format!("{header}\nSession already recorded - Session ID: {session_id}")
        }
        ImportOutcome::Imported {
            session_id,
            date,
            signups,
            new_characters,
            ..
        } => format!(
            "{header}\nSession recorded for {} - Session ID: {session_id}\n\
             {signups} signup(s), {new_characters} new character(s)",
            date.format("%d %b %Y")
        ),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner. A fresh spinner is
/// started for each import so the menu can reload the catalog repeatedly.
pub(crate) struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    pub(crate) fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn start_spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    }
}

impl ProgressReporter for CliProgress {
    fn file_started(&self, name: &str, current: usize, total: usize) {
        if let Ok(mut slot) = self.spinner.lock() {
            slot.get_or_insert_with(Self::start_spinner)
                .set_message(format!("Loading [{current}/{total}] {name}"));
        }
    }

    fn done(&self, _summary: &ImportSummary) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }
}
