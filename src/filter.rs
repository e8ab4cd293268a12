//! Filter criteria for the connection table.
//!
//! A record is shown when its state is in the accepted state set and, if any
//! ports are listed, its local port is one of them.

use serde::Deserialize;
use serde::de::{self, Deserializer, Visitor};
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use crate::record::{ConnectionRecord, ConnectionState};

/// Parse comma-separated port text leniently.
///
/// Tokens are trimmed; anything that is empty, not made only of ASCII digits,
/// or too large for a port is dropped without error so half-typed input still
/// filters on the ports that are complete.
///
/// ```
/// use portmon::filter::parse_port_list;
///
/// let ports = parse_port_list("80,,abc, 443");
/// assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![80, 443]);
/// ```
pub fn parse_port_list(text: &str) -> BTreeSet<u16> {
    text.split(',')
        .map(str::trim)
        .filter_map(|token| {
            let port = if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
                token.parse::<u16>().ok()
            } else {
                None
            };
            if port.is_none() && !token.is_empty() {
                trace!("Ignoring port filter token '{}'", token);
            }
            port
        })
        .collect()
}

/// A set of accepted local ports. Empty means every port is accepted.
///
/// Deserializes from either a string or an array, so both work:
/// - `ports = "80, 443"` (parsed leniently with [`parse_port_list`])
/// - `ports = [80, 443]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortList(BTreeSet<u16>);

impl PortList {
    /// Build from free-form user text.
    pub fn parse(text: &str) -> Self {
        PortList(parse_port_list(text))
    }

    /// Whether `port` passes this list.
    pub fn accepts(&self, port: u16) -> bool {
        self.0.is_empty() || self.0.contains(&port)
    }

    /// The listed ports in ascending order.
    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }

    /// Check if no ports are listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u16> for PortList {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        PortList(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for PortList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PortListVisitor;

        impl<'de> Visitor<'de> for PortListVisitor {
            type Value = PortList;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a comma-separated string or an array of ports")
            }

            fn visit_str<E>(self, value: &str) -> Result<PortList, E>
            where
                E: de::Error,
            {
                Ok(PortList::parse(value))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<PortList, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut ports = BTreeSet::new();
                while let Some(port) = seq.next_element::<u16>()? {
                    ports.insert(port);
                }
                Ok(PortList(ports))
            }
        }

        deserializer.deserialize_any(PortListVisitor)
    }
}

/// The set of connection states that are shown.
///
/// An allow-list: states outside the set, including unrecognised ones, are
/// hidden. The default shows `LISTEN` and `ESTABLISHED` only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSet(BTreeSet<ConnectionState>);

impl StateSet {
    /// A set accepting nothing.
    pub fn empty() -> Self {
        StateSet(BTreeSet::new())
    }

    /// A set accepting every named state.
    pub fn all_known() -> Self {
        ConnectionState::KNOWN.into_iter().collect()
    }

    /// Whether records in `state` are shown.
    pub fn accepts(&self, state: &ConnectionState) -> bool {
        self.0.contains(state)
    }

    /// Turn one state on or off.
    pub fn set(&mut self, state: ConnectionState, enabled: bool) {
        if enabled {
            self.0.insert(state);
        } else {
            self.0.remove(&state);
        }
    }

    /// The accepted states in enum order.
    pub fn states(&self) -> impl Iterator<Item = &ConnectionState> {
        self.0.iter()
    }
}

impl Default for StateSet {
    fn default() -> Self {
        [ConnectionState::Listen, ConnectionState::Established]
            .into_iter()
            .collect()
    }
}

impl FromIterator<ConnectionState> for StateSet {
    fn from_iter<I: IntoIterator<Item = ConnectionState>>(iter: I) -> Self {
        StateSet(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for StateSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|name| {
                ConnectionState::from_name(name).ok_or_else(|| {
                    <D::Error as de::Error>::custom(format!("unknown connection state '{}'", name))
                })
            })
            .collect()
    }
}

/// Criteria deciding which records are shown.
///
/// Both parts must accept a record (AND logic).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Accepted connection states.
    pub states: StateSet,

    /// Accepted local ports; empty accepts all.
    pub ports: PortList,
}

impl FilterCriteria {
    /// Criteria accepting every named state and every port.
    pub fn accept_all() -> Self {
        Self {
            states: StateSet::all_known(),
            ports: PortList::default(),
        }
    }

    /// Replace the port list with ports parsed from user text.
    pub fn with_ports(mut self, text: &str) -> Self {
        self.ports = PortList::parse(text);
        self
    }

    /// Turn one state on or off.
    pub fn with_state(mut self, state: ConnectionState, enabled: bool) -> Self {
        self.states.set(state, enabled);
        self
    }

    /// Check if a record passes both the port and the state filter.
    pub fn matches(&self, record: &ConnectionRecord) -> bool {
        self.ports.accepts(record.local_port) && self.states.accepts(&record.state)
    }
}
