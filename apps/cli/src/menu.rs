//! The interactive menu: one top-level choice, dispatch, repeat.

use std::io::Write;

use color_eyre::eyre::Result;
use pfsledger_core::characters::{merge_characters, rename_character, rename_player};
use pfsledger_core::reports::{check_scenario, character_history, find_characters, search_scenarios};
use pfsledger_core::scenarios::{ProgressReporter, import_scenarios};
use pfsledger_core::session_import::import_session_text;
use pfsledger_shared::{Character, Tier, parse_player_numbers};
use pfsledger_storage::Storage;
use tracing::{error, warn};

use crate::commands::{Settings, describe_outcome, describe_summary};
use crate::prompt::Prompter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    LoadSession,
    CheckScenario,
    FindScenarios,
    FindCharacter,
    MergeCharacters,
    ReloadScenarios,
    NamePlayer,
    NameCharacter,
    Exit,
}

impl MenuAction {
    const ALL: [MenuAction; 9] = [
        Self::LoadSession,
        Self::CheckScenario,
        Self::FindScenarios,
        Self::FindCharacter,
        Self::MergeCharacters,
        Self::ReloadScenarios,
        Self::NamePlayer,
        Self::NameCharacter,
        Self::Exit,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::LoadSession => "Load session",
            Self::CheckScenario => "Check scenario",
            Self::FindScenarios => "Find scenarios",
            Self::FindCharacter => "Find character",
            Self::MergeCharacters => "Merge characters",
            Self::ReloadScenarios => "Reload scenarios",
            Self::NamePlayer => "Name player",
            Self::NameCharacter => "Name character",
            Self::Exit => "Exit",
        }
    }
}

pub(crate) struct Menu<'a, P: Prompter, W: Write> {
    storage: &'a Storage,
    settings: &'a Settings,
    progress: &'a dyn ProgressReporter,
    prompter: P,
    out: W,
}

impl<'a, P: Prompter, W: Write> Menu<'a, P, W> {
    pub(crate) fn new(
        storage: &'a Storage,
        settings: &'a Settings,
        progress: &'a dyn ProgressReporter,
        prompter: P,
        out: W,
    ) -> Self {
        Self {
            storage,
            settings,
            progress,
            prompter,
            out,
        }
    }

    /// Loop until Exit is chosen or the prompt is closed. Errors from a
    /// single action are reported and the menu carries on.
    pub(crate) async fn run(&mut self) -> Result<()> {
        let labels: Vec<String> = MenuAction::ALL
            .iter()
            .map(|a| a.label().to_string())
            .collect();

        loop {
            let Some(index) = self.prompter.select("What would you like to do?", &labels)? else {
                break;
            };
            let action = MenuAction::ALL[index];
            if action == MenuAction::Exit {
                break;
            }

            if let Err(e) = self.dispatch(action).await {
                error!(action = action.label(), error = %e, "menu action failed");
                writeln!(self.out, "Error: {e}")?;
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, action: MenuAction) -> Result<()> {
        match action {
            MenuAction::LoadSession => self.load_session().await,
            MenuAction::CheckScenario => self.check_scenario().await,
            MenuAction::FindScenarios => self.find_scenarios().await,
            MenuAction::FindCharacter => self.find_character().await.map(|_| ()),
            MenuAction::MergeCharacters => self.merge_characters().await,
            MenuAction::ReloadScenarios => self.reload_scenarios().await,
            MenuAction::NamePlayer => self.name_player().await,
            MenuAction::NameCharacter => self.name_character().await,
            MenuAction::Exit => Ok(()),
        }
    }

    async fn load_session(&mut self) -> Result<()> {
        let Some(text) = self.prompter.editor("Paste the session data")? else {
            return Ok(());
        };
        if text.trim().is_empty() {
            return Ok(());
        }

        match import_session_text(self.storage, &text).await {
            Ok(outcome) => writeln!(self.out, "{}", describe_outcome(&outcome))?,
            Err(e) if e.is_parse() => {
                warn!(error = %e, "session paste rejected");
                writeln!(
                    self.out,
                    "Error loading data - perhaps this was not a valid session? {e}"
                )?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn check_scenario(&mut self) -> Result<()> {
        let Some(season) = self.prompter.numeral("Season #")? else {
            return Ok(());
        };
        let Some(number) = self.prompter.numeral("Scenario #")? else {
            return Ok(());
        };

        let report = check_scenario(self.storage, season, number).await?;
        write!(self.out, "{report}")?;
        Ok(())
    }

    async fn find_scenarios(&mut self) -> Result<()> {
        let tiers: Vec<String> = Tier::ALL.iter().map(Tier::to_string).collect();
        let Some(index) = self.prompter.select("Tier", &tiers)? else {
            return Ok(());
        };
        let tier = Tier::ALL[index];

        let raw = self
            .prompter
            .text("Player # (Or multiple with commas)")?
            .unwrap_or_default();
        let players = parse_player_numbers(&raw)?;

        let search = search_scenarios(self.storage, tier, &players).await?;
        write!(self.out, "{search}")?;
        Ok(())
    }

    /// Ask for a character by name or player number, excluding `exclude`.
    /// `None` when nothing matched or the user cancelled.
    async fn pick_character(
        &mut self,
        message: &str,
        exclude: &[String],
    ) -> Result<Option<Character>> {
        let Some(query) = self
            .prompter
            .text(&format!("{message} (Name or Player Number)"))?
        else {
            return Ok(None);
        };
        if query.trim().is_empty() {
            return Ok(None);
        }

        let mut matches = find_characters(self.storage, &query, exclude).await?;
        if matches.is_empty() {
            writeln!(self.out, "No character found")?;
            return Ok(None);
        }

        let mut choices: Vec<String> = matches.iter().map(Character::label).collect();
        choices.push("Cancel".to_string());
        let prompt = format!("{} match(es) - please select one:", matches.len());

        match self.prompter.select(&prompt, &choices)? {
            Some(i) if i < matches.len() => Ok(Some(matches.swap_remove(i))),
            _ => Ok(None),
        }
    }

    async fn find_character(&mut self) -> Result<Option<Character>> {
        let Some(character) = self.pick_character("Character", &[]).await? else {
            return Ok(None);
        };

        let report = character_history(self.storage, character.clone()).await?;
        write!(self.out, "{report}")?;
        Ok(Some(character))
    }

    async fn merge_characters(&mut self) -> Result<()> {
        let Some(keep) = self.pick_character("Character to merge into", &[]).await? else {
            return Ok(());
        };
        writeln!(
            self.out,
            "{} selected",
            keep.name.as_deref().unwrap_or("Unnamed character")
        )?;

        let exclude = [keep.id.clone()];
        let Some(remove) = self.pick_character("Character to delete", &exclude).await? else {
            return Ok(());
        };

        let outcome = merge_characters(self.storage, &keep, &remove).await?;
        writeln!(
            self.out,
            "Moved {} signup(s) from {} to {}",
            outcome.moved_signups,
            remove.org_play_id(),
            keep.org_play_id()
        )?;
        if let Some(player) = outcome.deleted_player {
            writeln!(self.out, "Player {player} has no characters left - deleting.")?;
        }
        Ok(())
    }

    async fn reload_scenarios(&mut self) -> Result<()> {
        writeln!(self.out, "loading... this may take a moment")?;
        let summary = import_scenarios(
            self.storage,
            &self.settings.scenarios_dir,
            &self.settings.file_list,
            self.progress,
        )
        .await?;
        writeln!(self.out, "{}", describe_summary(&summary))?;
        Ok(())
    }

    async fn name_player(&mut self) -> Result<()> {
        let Some(number) = self.prompter.numeral("Player #")? else {
            return Ok(());
        };
        let name = match self.prompter.text("New name")? {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Ok(()),
        };

        rename_player(self.storage, number, &name).await?;
        writeln!(self.out, "Name updated")?;
        Ok(())
    }

    async fn name_character(&mut self) -> Result<()> {
        let Some(character) = self.find_character().await? else {
            return Ok(());
        };
        let name = match self.prompter.text("New name")? {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Ok(()),
        };

        rename_character(self.storage, &character.id, &name).await?;
        writeln!(self.out, "Name updated")?;
        Ok(())
    }
}
