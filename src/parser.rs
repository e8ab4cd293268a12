//! Parser for the connection table printed by `netstat`.
//!
//! The table is fixed-width: every data line is cut into columns with a
//! [`ColumnLayout`], and the columns are then split into their parts.
//!
//! # Table Format
//!
//! ```text
//! Active Internet connections (servers and established)
//! Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
//! tcp        0      0 127.0.0.1:22            0.0.0.0:*               LISTEN      1234/sshd
//! tcp6       0      0 :::80                   :::*                    LISTEN      -
//! ```
//!
//! The first two lines are always a title and a column header and are skipped.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, eof, map, opt, rest},
    sequence::preceded,
};
use thiserror::Error;

use crate::layout::ColumnLayout;
use crate::record::{ConnectionRecord, ConnectionState, NO_PID};

/// Why a single data line could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("no ':' between address and port in {column} column")]
    MissingPortSeparator { column: &'static str },

    #[error("invalid local port '{0}'")]
    InvalidPort(String),

    #[error("invalid process info '{0}'")]
    InvalidProcessInfo(String),
}

/// Errors that can occur while parsing a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed input on line {line}: {cause} in {text:?}")]
    MalformedInput {
        /// 1-based line number within the whole input, preamble included.
        line: usize,
        /// The offending line.
        text: String,
        #[source]
        cause: LineError,
    },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse the process-info column into a pid and an optional program name.
///
/// Accepts `-`, an empty column, `1234` and `1234/program name`.
fn parse_process_info(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    all_consuming(alt((
        map(alt((tag(NO_PID), eof)), |_| (NO_PID, None::<&str>)),
        (digit1, opt(preceded(char('/'), rest))),
    )))
    .parse(input)
}

/// Split `address:port` on the last `:`, so IPv6 literals stay whole.
fn split_endpoint<'a>(
    column: &'a str,
    name: &'static str,
) -> Result<(&'a str, &'a str), LineError> {
    column
        .rsplit_once(':')
        .ok_or(LineError::MissingPortSeparator { column: name })
}

/// Turns raw table text into [`ConnectionRecord`]s.
///
/// # Example
///
/// ```
/// use portmon::layout::ColumnLayout;
/// use portmon::parser::RecordParser;
///
/// let text = "Active Internet connections (servers and established)\n\
///             Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name\n\
///             tcp        0      0 127.0.0.1:22            0.0.0.0:*               LISTEN      1234/sshd\n";
/// let records = RecordParser::new(ColumnLayout::default()).parse(text).unwrap();
/// assert_eq!(records[0].local_port, 22);
/// assert_eq!(records[0].pid, "1234");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordParser {
    layout: ColumnLayout,
}

impl RecordParser {
    /// Number of leading lines that never hold data.
    pub const PREAMBLE_LINES: usize = 2;

    /// Create a parser for the given column layout.
    pub fn new(layout: ColumnLayout) -> Self {
        Self { layout }
    }

    /// The layout this parser cuts lines with.
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Parse a whole table.
    ///
    /// Records come back in input order. Blank lines are skipped. The first
    /// malformed line fails the whole parse; no partial result is returned.
    pub fn parse(&self, text: &str) -> ParseResult<Vec<ConnectionRecord>> {
        text.lines()
            .enumerate()
            .skip(Self::PREAMBLE_LINES)
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                self.parse_line(line)
                    .map_err(|cause| ParseError::MalformedInput {
                        line: index + 1,
                        text: line.to_string(),
                        cause,
                    })
            })
            .collect()
    }

    /// Parse a single data line.
    pub fn parse_line(&self, line: &str) -> Result<ConnectionRecord, LineError> {
        let columns = self.layout.split(line);

        let (local_address, local_port) = split_endpoint(columns.local, "local")?;
        let local_port = local_port
            .parse::<u16>()
            .map_err(|_| LineError::InvalidPort(local_port.to_string()))?;

        let (foreign_address, foreign_port) = split_endpoint(columns.foreign, "foreign")?;

        let (_, (pid, program)) = parse_process_info(columns.process)
            .map_err(|_| LineError::InvalidProcessInfo(columns.process.to_string()))?;

        Ok(ConnectionRecord {
            protocol: columns.protocol.to_string(),
            local_address: local_address.to_string(),
            local_port,
            foreign_address: foreign_address.to_string(),
            foreign_port: foreign_port.to_string(),
            state: ConnectionState::from_column(columns.state),
            pid: pid.to_string(),
            program: program
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }
}
