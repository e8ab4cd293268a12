//! Data structures representing parsed connection table rows.
//!
//! A [`ConnectionRecord`] is built once per data line of `netstat` output and
//! never modified afterwards. Filtering and sorting work on references.

use serde::{Serialize, Serializer};
use std::fmt;

/// Marker `netstat` prints when the owning process is not visible.
pub const NO_PID: &str = "-";

/// TCP connection state as reported by the kernel.
///
/// Unrecognised state text is kept verbatim in [`ConnectionState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionState {
    Listen,
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Closing,
    /// Anything else the command emits (e.g. an empty UDP state column)
    Other(String),
}

impl ConnectionState {
    /// Every named state, in the order `netstat` documents them.
    pub const KNOWN: [ConnectionState; 11] = [
        ConnectionState::Listen,
        ConnectionState::Established,
        ConnectionState::SynSent,
        ConnectionState::SynRecv,
        ConnectionState::FinWait1,
        ConnectionState::FinWait2,
        ConnectionState::TimeWait,
        ConnectionState::Close,
        ConnectionState::CloseWait,
        ConnectionState::LastAck,
        ConnectionState::Closing,
    ];

    /// Map raw column text to a state. Never fails.
    pub fn from_column(text: &str) -> Self {
        match text {
            "LISTEN" => ConnectionState::Listen,
            "ESTABLISHED" => ConnectionState::Established,
            "SYN_SENT" => ConnectionState::SynSent,
            "SYN_RECV" => ConnectionState::SynRecv,
            "FIN_WAIT1" => ConnectionState::FinWait1,
            "FIN_WAIT2" => ConnectionState::FinWait2,
            "TIME_WAIT" => ConnectionState::TimeWait,
            "CLOSE" => ConnectionState::Close,
            "CLOSE_WAIT" => ConnectionState::CloseWait,
            "LAST_ACK" => ConnectionState::LastAck,
            "CLOSING" => ConnectionState::Closing,
            other => ConnectionState::Other(other.to_string()),
        }
    }

    /// The text `netstat` uses for this state.
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionState::Listen => "LISTEN",
            ConnectionState::Established => "ESTABLISHED",
            ConnectionState::SynSent => "SYN_SENT",
            ConnectionState::SynRecv => "SYN_RECV",
            ConnectionState::FinWait1 => "FIN_WAIT1",
            ConnectionState::FinWait2 => "FIN_WAIT2",
            ConnectionState::TimeWait => "TIME_WAIT",
            ConnectionState::Close => "CLOSE",
            ConnectionState::CloseWait => "CLOSE_WAIT",
            ConnectionState::LastAck => "LAST_ACK",
            ConnectionState::Closing => "CLOSING",
            ConnectionState::Other(text) => text,
        }
    }

    /// Look up a named state, case-insensitively.
    ///
    /// Returns `None` for text that is not one of [`ConnectionState::KNOWN`].
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        match Self::from_column(&upper) {
            ConnectionState::Other(_) => None,
            state => Some(state),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConnectionState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// One row of the connection table.
///
/// A raw line like:
/// ```text
/// tcp        0      0 127.0.0.1:22            0.0.0.0:*               LISTEN      1234/sshd
/// ```
///
/// becomes a `ConnectionRecord` with:
/// - `protocol`: "tcp"
/// - `local_address`: "127.0.0.1"
/// - `local_port`: 22
/// - `foreign_address`: "0.0.0.0"
/// - `foreign_port`: "*"
/// - `state`: ConnectionState::Listen
/// - `pid`: "1234"
/// - `program`: Some("sshd")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    /// Protocol column, e.g. "tcp" or "tcp6".
    pub protocol: String,

    /// Local address, everything before the last `:` of the local column.
    pub local_address: String,

    /// Local port, everything after the last `:` of the local column.
    pub local_port: u16,

    /// Foreign address, or "*" / "0.0.0.0" for listening sockets.
    pub foreign_address: String,

    /// Foreign port kept as text. `*` means unset and is not normalised.
    pub foreign_port: String,

    /// Connection state.
    pub state: ConnectionState,

    /// Owning process id, or [`NO_PID`] when not visible.
    pub pid: String,

    /// Program name that followed the pid, if any.
    pub program: Option<String>,
}

impl ConnectionRecord {
    /// Whether a process-termination action may be offered for this row.
    pub fn is_killable(&self) -> bool {
        self.pid != NO_PID
    }

    /// The pid as a number, when one is visible.
    pub fn pid_number(&self) -> Option<u32> {
        if self.is_killable() {
            self.pid.parse().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.local_address,
            self.local_port,
            self.foreign_address,
            self.foreign_port,
            self.state,
            self.pid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(pid: &str) -> ConnectionRecord {
        ConnectionRecord {
            protocol: "tcp".to_string(),
            local_address: "127.0.0.1".to_string(),
            local_port: 22,
            foreign_address: "0.0.0.0".to_string(),
            foreign_port: "*".to_string(),
            state: ConnectionState::Listen,
            pid: pid.to_string(),
            program: None,
        }
    }

    #[test]
    fn test_state_round_trips_column_text() {
        for state in ConnectionState::KNOWN {
            assert_eq!(ConnectionState::from_column(state.as_str()), state);
        }
        let odd = ConnectionState::from_column("UNKNOWN");
        assert_eq!(odd, ConnectionState::Other("UNKNOWN".to_string()));
        assert_eq!(odd.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_state_from_name() {
        assert_eq!(
            ConnectionState::from_name("close_wait"),
            Some(ConnectionState::CloseWait)
        );
        assert_eq!(
            ConnectionState::from_name(" LISTEN "),
            Some(ConnectionState::Listen)
        );
        assert_eq!(ConnectionState::from_name("BOGUS"), None);
    }

    #[test]
    fn test_killable() {
        let hidden = make_record(NO_PID);
        assert!(!hidden.is_killable());
        assert_eq!(hidden.pid_number(), None);

        let visible = make_record("1234");
        assert!(visible.is_killable());
        assert_eq!(visible.pid_number(), Some(1234));
    }

    #[test]
    fn test_display() {
        let record = make_record("1234");
        assert_eq!(record.to_string(), "127.0.0.1 22 0.0.0.0 * LISTEN 1234");
    }

    #[test]
    fn test_serialize_state_as_text() {
        let json = serde_json::to_value(make_record("-")).unwrap();
        assert_eq!(json["state"], "LISTEN");
        assert_eq!(json["local_port"], 22);
        assert_eq!(json["foreign_port"], "*");
    }
}
