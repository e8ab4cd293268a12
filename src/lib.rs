//! portmon - parse, filter and sort the connection table printed by `netstat`.
//!
//! This crate provides:
//! - A fixed-width parser turning `netstat -anp` output into typed records
//! - Port and state filtering with a stable sort by local port
//! - A non-reentrant refresh cycle that keeps the last good snapshot
//!
//! # Example
//!
//! ```rust,no_run
//! use portmon::{FilterCriteria, NetstatCommand, RecordParser, RecordPipeline, Refresher};
//! use portmon::render::render_table;
//!
//! let refresher = Refresher::new(NetstatCommand::default(), RecordParser::default());
//! let snapshot = refresher.refresh().expect("Failed to read connections");
//!
//! let pipeline = RecordPipeline::new(FilterCriteria::default().with_ports("22, 443"));
//! print!("{}", render_table(&snapshot.view(&pipeline)));
//! ```

pub mod config;
pub mod filter;
pub mod layout;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod refresh;
pub mod render;
pub mod source;

pub use config::Config;
pub use filter::{FilterCriteria, PortList, StateSet, parse_port_list};
pub use layout::{ColumnLayout, ColumnRange};
pub use parser::{LineError, ParseError, RecordParser};
pub use pipeline::{RecordPipeline, RecordView};
pub use record::{ConnectionRecord, ConnectionState, NO_PID};
pub use refresh::{RefreshError, Refresher, Snapshot};
pub use source::{NetstatCommand, SourceError, TableSource, TextSource};
