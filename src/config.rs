//! Start-up configuration.
//!
//! Everything here is read once before the command loop starts; run-time
//! settings go through UCI options instead.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {reason}", .path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct UciConfig {
    /// Start with `debug on`.
    pub debug: bool,
    /// Commands executed before reading standard input.
    pub init_commands: Option<PathBuf>,
    /// Positions and expected counts for the `test` command.
    pub perft_data: Option<PathBuf>,
    /// Engine selected at start; the first registered one when `None`.
    pub engine: Option<String>,
}

impl UciConfig {
    /// Read the init commands file, if one is configured.
    ///
    /// Lines are trimmed; blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read.
    pub fn read_init_commands(&self) -> Result<Vec<String>, ConfigError> {
        let Some(path) = &self.init_commands else {
            return Ok(Vec::new());
        };
        let text = read(path)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Read the perft test data file, if one is configured.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or a line is malformed.
    pub fn read_perft_data(&self) -> Result<Vec<PerftTestData>, ConfigError> {
        let Some(path) = &self.perft_data else {
            return Ok(Vec::new());
        };
        let text = read(path)?;
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(|(index, line)| {
                PerftTestData::parse(line).map_err(|reason| ConfigError::Syntax {
                    path: path.clone(),
                    line: index + 1,
                    reason,
                })
            })
            .collect()
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// One position of a perft suite and its expected leaf counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerftTestData {
    pub fen: String,
    /// `counts[d - 1]` is the expected leaf count at depth `d`.
    pub counts: Vec<u64>,
}

impl PerftTestData {
    /// Parse an EPD style line: `<fen> ;D1 20 ;D2 400 ...`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the line is malformed.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut fields = line.split(';');
        let fen = fields.next().unwrap_or_default().trim();
        if fen.is_empty() {
            return Err("missing FEN".to_string());
        }
        let mut counts: Vec<u64> = Vec::new();
        for field in fields {
            let mut parts = field.split_whitespace();
            let (Some(label), Some(count), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(format!("expected 'D<depth> <count>', got '{}'", field.trim()));
            };
            let depth: usize = label
                .strip_prefix('D')
                .and_then(|d| d.parse().ok())
                .ok_or_else(|| format!("invalid depth label '{label}'"))?;
            if depth != counts.len() + 1 {
                return Err(format!("depth {depth} is out of sequence"));
            }
            counts.push(
                count
                    .parse()
                    .map_err(|_| format!("invalid count '{count}'"))?,
            );
        }
        Ok(PerftTestData {
            fen: fen.to_string(),
            counts,
        })
    }

    /// Expected leaf count at `depth`, if known.
    #[must_use]
    pub fn expected(&self, depth: u32) -> Option<u64> {
        let index = usize::try_from(depth).ok()?.checked_sub(1)?;
        self.counts.get(index).copied()
    }
}
