//! Fixed-width column layout of the connection table.
//!
//! `netstat -anpt46` on Linux prints its columns at fixed character offsets:
//!
//! ```text
//!           1         2         3         4         5         6         7         8
//! 012345678901234567890123456789012345678901234567890123456789012345678901234567890
//! Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
//! ```
//!
//! The offsets live in a [`ColumnLayout`] value handed to the parser, so a
//! different layout is a configuration change.

use serde::Deserialize;
use std::fmt;

/// A half-open `[start, end)` range of character positions.
///
/// Deserializes from a two-element array such as `[20, 43]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "[usize; 2]")]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self, String> {
        if start > end {
            return Err(format!(
                "column range [{}, {}) starts after it ends",
                start, end
            ));
        }
        Ok(Self { start, end })
    }

    /// Cut this range out of `line` and trim it.
    ///
    /// Positions count characters, not bytes. A line shorter than the range
    /// yields whatever part of the range it covers, possibly nothing.
    pub fn extract<'a>(&self, line: &'a str) -> &'a str {
        let start = byte_offset(line, self.start);
        let end = byte_offset(line, self.end.max(self.start));
        line[start..end].trim()
    }
}

impl TryFrom<[usize; 2]> for ColumnRange {
    type Error = String;

    fn try_from([start, end]: [usize; 2]) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Byte index of the `chars`-th character, clamped to the end of the line.
fn byte_offset(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

/// Named column ranges for one table layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    /// Protocol, e.g. "tcp6".
    pub protocol: ColumnRange,

    /// Local address and port.
    pub local: ColumnRange,

    /// Foreign address and port.
    pub foreign: ColumnRange,

    /// Connection state.
    pub state: ColumnRange,

    /// Process info, e.g. "1234/sshd" or "-".
    pub process: ColumnRange,
}

impl ColumnLayout {
    /// Layout of `netstat -anp` on Linux (net-tools).
    pub const LINUX_NETSTAT: ColumnLayout = ColumnLayout {
        protocol: ColumnRange { start: 0, end: 5 },
        local: ColumnRange { start: 20, end: 43 },
        foreign: ColumnRange { start: 44, end: 67 },
        state: ColumnRange { start: 68, end: 79 },
        process: ColumnRange { start: 80, end: 120 },
    };

    /// Split a line into its trimmed columns.
    pub fn split<'a>(&self, line: &'a str) -> Columns<'a> {
        Columns {
            protocol: self.protocol.extract(line),
            local: self.local.extract(line),
            foreign: self.foreign.extract(line),
            state: self.state.extract(line),
            process: self.process.extract(line),
        }
    }

    /// Iterate over the ranges together with their column names.
    pub fn named_ranges(&self) -> [(&'static str, ColumnRange); 5] {
        [
            ("protocol", self.protocol),
            ("local", self.local),
            ("foreign", self.foreign),
            ("state", self.state),
            ("process", self.process),
        ]
    }

    /// Check that no range is inverted.
    ///
    /// Ranges built through deserialization are already checked; this
    /// catches layouts assembled by hand.
    pub fn validate(&self) -> Result<(), String> {
        for (name, range) in self.named_ranges() {
            if range.start > range.end {
                return Err(format!("column '{}' has inverted range {}", name, range));
            }
        }
        Ok(())
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::LINUX_NETSTAT
    }
}

/// The trimmed text of each column of one data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns<'a> {
    pub protocol: &'a str,
    pub local: &'a str,
    pub foreign: &'a str,
    pub state: &'a str,
    pub process: &'a str,
}
