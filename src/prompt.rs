//! Confirmation and selection prompts.
//!
//! The parsing rules live here as pure functions; terminal I/O is behind the
//! [`Prompt`] port so drivers can be exercised with scripted answers. Retry
//! loops are bounded; an exhausted budget surfaces as `UserCancelled`.

use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

/// Retry budget for invalid answers before giving up.
pub const DEFAULT_PROMPT_RETRIES: usize = 3;

/// Capability interface for reading one line of user input.
pub trait Prompt: Send + Sync {
    /// Display `message` and read one answer line (without the newline).
    fn read_line(&self, message: &str) -> Result<String>;
}

/// Parse a yes/no answer.
///
/// `y`/`yes` → true, `n`/`no` → false (case-insensitive), empty → false.
/// `q`/`quit`/`exit`/`cancel` → `UserCancelled`; anything else →
/// `InvalidInput`.
pub fn parse_confirmation(input: &str) -> Result<bool> {
    let answer = input.trim().to_ascii_lowercase();
    match answer.as_str() {
        "" => Ok(false),
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        "q" | "quit" | "exit" | "cancel" => Err(Error::UserCancelled),
        _ => Err(Error::InvalidInput {
            reason: format!("expected y or n, got '{}'", input.trim()),
        }),
    }
}

/// Parse a 1-based numeric selection.
pub fn parse_numeric_selection(input: &str) -> Result<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput {
            reason: "selection is empty".to_string(),
        });
    }
    if matches!(trimmed, "q" | "quit" | "exit" | "cancel") {
        return Err(Error::UserCancelled);
    }
    trimmed.parse::<usize>().map_err(|_| Error::InvalidInput {
        reason: format!("'{trimmed}' is not a number"),
    })
}

/// True when `choice` addresses one of `max` 1-based entries.
pub fn is_valid_choice(choice: usize, max: usize) -> bool {
    choice >= 1 && choice <= max
}

/// Ask a yes/no question. Empty input accepts `default`; invalid answers are
/// retried up to [`DEFAULT_PROMPT_RETRIES`] times.
pub fn prompt_for_confirmation(prompt: &dyn Prompt, message: &str, default: bool) -> Result<bool> {
    let suffix = if default { "[Y/n]" } else { "[y/N]" };
    let full = format!("{message} {suffix} ");
    for _ in 0..DEFAULT_PROMPT_RETRIES {
        let line = prompt.read_line(&full)?;
        if line.trim().is_empty() {
            return Ok(default);
        }
        match parse_confirmation(&line) {
            Ok(answer) => return Ok(answer),
            Err(Error::InvalidInput { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(Error::UserCancelled)
}

/// Ask the user to pick one of `choices`; returns the 0-based index.
pub fn prompt_for_selection(
    prompt: &dyn Prompt,
    message: &str,
    choices: &[String],
) -> Result<usize> {
    let mut listing = String::new();
    for (i, choice) in choices.iter().enumerate() {
        listing.push_str(&format!("  {}. {choice}\n", i + 1));
    }
    let full = format!("{message}\n{listing}> ");
    for _ in 0..DEFAULT_PROMPT_RETRIES {
        let line = prompt.read_line(&full)?;
        match parse_numeric_selection(&line) {
            Ok(choice) if is_valid_choice(choice, choices.len()) => return Ok(choice - 1),
            Ok(_) | Err(Error::InvalidInput { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(Error::UserCancelled)
}

/// Ask for a base path, offering `default`; empty input accepts the default.
pub fn prompt_for_base_path(prompt: &dyn Prompt, default: &Path) -> Result<String> {
    let message = format!("Base path for repositories and workspaces [{}] ", default.display());
    let line = prompt.read_line(&message)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(default.display().to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Terminal adapter: writes the message to stderr and reads stdin.
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for TerminalPrompt {
    fn read_line(&self, message: &str) -> Result<String> {
        let mut stderr = std::io::stderr();
        stderr.write_all(message.as_bytes()).map_err(Error::Io)?;
        stderr.flush().map_err(Error::Io)?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map_err(Error::Io)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
