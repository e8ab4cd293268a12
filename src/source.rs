//! Producers of raw connection-table text.
//!
//! [`NetstatCommand`] runs the external command and waits for it. There is no
//! timeout: a hung command hangs the refresh that asked for it.

use serde::Deserialize;
use std::process::{Command, Output};
use thiserror::Error;
use tracing::{debug, info};

/// Default command used to list connections.
pub const NETSTAT_PROGRAM: &str = "netstat";

/// Default arguments: all TCP sockets over IPv4 and IPv6, numeric, with pids.
pub const NETSTAT_ARGS: &[&str] = &["-anpt46"];

/// Errors from fetching the table text.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Command failed with exit status {}: {output}", status_text(.status))]
    CommandFailed {
        /// Exit code, or `None` when the process never started or was
        /// killed by a signal.
        status: Option<i32>,
        /// Captured diagnostic text.
        output: String,
    },

    #[error("Failed to read table text: {0}")]
    Read(#[from] std::io::Error),
}

fn status_text(status: &Option<i32>) -> String {
    status.map_or_else(|| "none".to_string(), |code| code.to_string())
}

/// Something that yields one block of connection-table text per call.
pub trait TableSource: Send + Sync {
    /// Human-readable name for log messages.
    fn name(&self) -> &str;

    /// Produce the current table text.
    fn fetch(&self) -> Result<String, SourceError>;
}

/// Runs an external command and returns its standard output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetstatCommand {
    /// Program to execute.
    pub program: String,

    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Default for NetstatCommand {
    fn default() -> Self {
        Self {
            program: NETSTAT_PROGRAM.to_string(),
            args: NETSTAT_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl NetstatCommand {
    /// Create a command with explicit program and arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The command line as one string, for log messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Turn a finished process into its stdout, or a `CommandFailed` error.
///
/// The diagnostic text is stderr when it has content, otherwise stdout.
fn check_output(output: Output) -> Result<String, SourceError> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let diagnostic = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };

    Err(SourceError::CommandFailed {
        status: output.status.code(),
        output: diagnostic.trim_end().to_string(),
    })
}

impl TableSource for NetstatCommand {
    fn name(&self) -> &str {
        &self.program
    }

    fn fetch(&self) -> Result<String, SourceError> {
        info!("Running {}", self.command_line());

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| SourceError::CommandFailed {
                status: None,
                output: format!("failed to launch '{}': {}", self.program, e),
            })?;

        debug!(
            "{} exited with {:?}, {} bytes of output",
            self.program,
            output.status.code(),
            output.stdout.len()
        );

        check_output(output)
    }
}

/// A fixed block of text, e.g. a saved `netstat` dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSource {
    text: String,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read the text once from `reader`.
    pub fn from_reader(mut reader: impl std::io::Read) -> Result<Self, SourceError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self { text })
    }
}

impl TableSource for TextSource {
    fn name(&self) -> &str {
        "text"
    }

    fn fetch(&self) -> Result<String, SourceError> {
        Ok(self.text.clone())
    }
}
