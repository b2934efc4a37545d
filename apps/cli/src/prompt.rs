//! Interactive prompts: select lists, single-line text, numbers, and a
//! multi-line editor for pasted session exports.
//!
//! [`Prompter`] is the seam the menu talks to; [`TerminalPrompter`] drives a
//! real terminal with `crossterm`, and tests substitute a scripted one.

use std::env;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::Command;

use color_eyre::eyre::{Result, eyre};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue};
use uuid::Uuid;

/// Questions the menu can ask. `None` means the user cancelled or input ended.
pub(crate) trait Prompter {
    /// Pick one of `choices`, returning its index.
    fn select(&mut self, message: &str, choices: &[String]) -> Result<Option<usize>>;

    /// Read one line of text (trimmed). An empty answer is `Some("")`.
    fn text(&mut self, message: &str) -> Result<Option<String>>;

    /// Read a whole number. A blank answer cancels.
    fn numeral(&mut self, message: &str) -> Result<Option<i64>>;

    /// Read multi-line text, e.g. a pasted export.
    fn editor(&mut self, message: &str) -> Result<Option<String>>;
}

/// Prompter for a real terminal on stdin/stdout.
pub(crate) struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    pub(crate) fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal() && io::stdout().is_terminal(),
        }
    }

    fn read_line(&self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Arrow-key list in raw mode. Raw mode is always switched back off.
    fn select_raw(&self, choices: &[String]) -> Result<Option<usize>> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        let picked = select_loop(&mut stdout, choices);
        let cleared = clear_lines(&mut stdout, choices.len());
        terminal::disable_raw_mode()?;
        cleared?;
        picked
    }

    /// Numbered list for piped input.
    fn select_numbered(&self, choices: &[String]) -> Result<Option<usize>> {
        let mut stdout = io::stdout();
        for (i, choice) in choices.iter().enumerate() {
            writeln!(stdout, "  {}) {choice}", i + 1)?;
        }
        loop {
            write!(stdout, "  > ")?;
            stdout.flush()?;
            let Some(answer) = self.read_line()? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => writeln!(stdout, "  Enter a number from 1 to {}", choices.len())?,
            }
        }
    }
}

impl Prompter for TerminalPrompter {
    fn select(&mut self, message: &str, choices: &[String]) -> Result<Option<usize>> {
        if choices.is_empty() {
            return Ok(None);
        }
        println!("{} {}", "?".green(), message.bold());

        let picked = if self.interactive {
            self.select_raw(choices)?
        } else {
            self.select_numbered(choices)?
        };
        if let Some(i) = picked {
            println!("  {} {}", "›".cyan(), choices[i]);
        }
        Ok(picked)
    }

    fn text(&mut self, message: &str) -> Result<Option<String>> {
        print!("{} {}: ", "?".green(), message.bold());
        io::stdout().flush()?;
        self.read_line()
    }

    fn numeral(&mut self, message: &str) -> Result<Option<i64>> {
        loop {
            let Some(answer) = self.text(message)? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<i64>() {
                Ok(n) => return Ok(Some(n)),
                Err(_) => println!("  '{answer}' is not a number"),
            }
        }
    }

    fn editor(&mut self, message: &str) -> Result<Option<String>> {
        println!("{} {}", "?".green(), message.bold());
        match get_editor() {
            Some(editor) if self.interactive => edit_in(&editor).map(Some),
            _ => {
                println!("  (paste, then finish with an empty line)");
                let mut lines = Vec::new();
                while let Some(line) = self.read_line()? {
                    if line.is_empty() {
                        break;
                    }
                    lines.push(line);
                }
                if lines.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(lines.join("\n")))
                }
            }
        }
    }
}

fn select_loop(stdout: &mut io::Stdout, choices: &[String]) -> Result<Option<usize>> {
    let mut selected = 0usize;
    draw_choices(stdout, choices, selected)?;

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                selected = selected.checked_sub(1).unwrap_or(choices.len() - 1);
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                selected = (selected + 1) % choices.len();
            }
            KeyCode::Enter => return Ok(Some(selected)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            _ => continue,
        }
        queue!(stdout, cursor::MoveToPreviousLine(line_count(choices.len())))?;
        draw_choices(stdout, choices, selected)?;
    }
}

fn draw_choices(stdout: &mut io::Stdout, choices: &[String], selected: usize) -> Result<()> {
    for (i, choice) in choices.iter().enumerate() {
        queue!(stdout, terminal::Clear(ClearType::CurrentLine))?;
        if i == selected {
            queue!(stdout, Print(format!("{} {}", "❯".cyan(), choice.as_str().cyan())))?;
        } else {
            queue!(stdout, Print(format!("  {choice}")))?;
        }
        // Raw mode: newline does not return the carriage.
        queue!(stdout, Print("\r\n"))?;
    }
    stdout.flush()?;
    Ok(())
}

fn clear_lines(stdout: &mut io::Stdout, count: usize) -> Result<()> {
    queue!(
        stdout,
        cursor::MoveToPreviousLine(line_count(count)),
        terminal::Clear(ClearType::FromCursorDown)
    )?;
    stdout.flush()?;
    Ok(())
}

fn line_count(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Editor command from `$EDITOR`, then `$VISUAL`, then common fallbacks.
fn get_editor() -> Option<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.trim().is_empty() {
                return Some(editor);
            }
        }
    }

    ["nano", "vim", "vi"]
        .into_iter()
        .find(|fallback| {
            Command::new("which")
                .arg(fallback)
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .map(str::to_string)
}

/// Open an empty temp file in `editor` and return what was saved.
fn edit_in(editor: &str) -> Result<String> {
    let path = env::temp_dir().join(format!("pfsledger_paste_{}.txt", Uuid::now_v7()));
    fs::write(&path, "")?;

    // `$EDITOR` may carry flags, e.g. "code --wait".
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| eyre!("editor command is empty"))?;
    let status = Command::new(program)
        .args(parts)
        .arg(&path)
        .status()
        .map_err(|e| eyre!("failed to launch editor '{editor}': {e}"));

    let content = fs::read_to_string(&path);
    let _ = fs::remove_file(&path);

    let status = status?;
    if !status.success() {
        return Err(eyre!("editor '{editor}' exited with non-zero status"));
    }
    Ok(content?)
}
