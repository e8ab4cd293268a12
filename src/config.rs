//! Configuration file support for portmon.
//!
//! Loads settings from `~/.config/portmon/config.toml` on Linux
//! (or platform-appropriate location on other OSes).
//!
//! ```toml
//! [command]
//! program = "netstat"
//! args = ["-anpt46"]
//!
//! [layout]
//! protocol = [0, 5]
//! local = [20, 43]
//! foreign = [44, 67]
//! state = [68, 79]
//! process = [80, 120]
//!
//! [filter]
//! states = ["LISTEN", "ESTABLISHED"]
//! ports = "22, 80, 443"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::filter::FilterCriteria;
use crate::layout::ColumnLayout;
use crate::source::NetstatCommand;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command producing the connection table.
    pub command: NetstatCommand,

    /// Column offsets of the table the command prints.
    pub layout: ColumnLayout,

    /// Filter applied when none is given on the command line.
    pub filter: FilterCriteria,
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load() -> Result<Self> {
        Self::load_if_present(Self::config_path().as_deref())
    }

    /// Load from `path` when it names an existing file, otherwise defaults.
    fn load_if_present(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_from(path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("portmon/config.toml"))
    }

    /// Validate all configuration settings.
    pub fn validate(&self) -> Result<()> {
        if self.command.program.trim().is_empty() {
            anyhow::bail!("Invalid [command]: program must not be empty");
        }
        self.layout
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid [layout]: {}", e))
    }
}
