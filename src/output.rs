//! Printing the presented function list.

use color_eyre::{eyre::eyre, Result};
use std::io::Write;

use crate::lambda::types::{FunctionRecord, PresentedFunction};
use crate::reconcile::TerminalState;

const CREDENTIALS_DOCS: &str =
  "https://docs.aws.amazon.com/cli/latest/userguide/cli-configure-files.html";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  Text,
  Json,
}

/// Keep functions whose name contains `filter`, ignoring case
pub fn filter_functions<'a>(
  functions: &'a [FunctionRecord],
  filter: Option<&str>,
) -> Vec<&'a FunctionRecord> {
  let needle = filter.map(str::to_lowercase).unwrap_or_default();
  functions
    .iter()
    .filter(|f| needle.is_empty() || f.name.to_lowercase().contains(&needle))
    .collect()
}

pub fn present(functions: &[&FunctionRecord], region: &str) -> Vec<PresentedFunction> {
  functions
    .iter()
    .map(|f| PresentedFunction::new(f, region))
    .collect()
}

/// Write the list in the given format
pub fn write_functions<W: Write>(
  out: &mut W,
  functions: &[PresentedFunction],
  format: Format,
) -> Result<()> {
  match format {
    Format::Json => {
      serde_json::to_writer_pretty(&mut *out, functions)
        .map_err(|e| eyre!("Failed to write JSON output: {}", e))?;
      writeln!(out)?;
    }
    Format::Text => {
      let name_width = functions
        .iter()
        .map(|f| f.display_name.chars().count())
        .max()
        .unwrap_or(0)
        .min(64);

      for f in functions {
        writeln!(
          out,
          "{:<name_width$}  {:<60}  {}",
          truncate(&f.display_name, 64),
          truncate(&f.description, 60),
          f.last_modified,
          name_width = name_width,
        )?;
      }
    }
  }
  Ok(())
}

/// Message for a terminal state
pub fn terminal_message(state: TerminalState) -> String {
  match state {
    TerminalState::CredentialsExpired => {
      "AWS credentials expired. Refresh your session credentials and try again.".to_string()
    }
    TerminalState::NoValidCredentials => format!(
      "No valid configuration and credential file ({}) found in your machine.",
      CREDENTIALS_DOCS
    ),
  }
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}
