//! Core identifiers and enumerations shared by every layer.
//!
//! Connections and groups are addressed by plain newtype indices into the
//! arenas built at initialization; they are never raw pointers and never
//! change for the lifetime of the service.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable index of a configured connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u16);

impl ConnectionId {
    /// Creates a connection id from its arena index.
    pub fn new(index: u16) -> Self {
        Self(index)
    }

    /// Arena index of this connection.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "con#{}", self.0)
    }
}

/// Stable index of a configured connection group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u16);

impl GroupId {
    /// Creates a group id from its arena index.
    pub fn new(index: u16) -> Self {
        Self(index)
    }

    /// Arena index of this group.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grp#{}", self.0)
    }
}

/// Opaque handle of a transport-level socket, owned by the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketHandle(pub u32);

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock#{}", self.0)
    }
}

// =============================================================================
// TRANSPORT ENUMS
// =============================================================================

/// Transport protocol of a connection group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Udp,
}

/// Address family of a local or remote address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressDomain {
    Inet,
    Inet6,
}

impl AddressDomain {
    /// Domain of an IP address.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressDomain::Inet,
            IpAddr::V6(_) => AddressDomain::Inet6,
        }
    }

    /// The all-zero wildcard address of this domain.
    pub fn wildcard_ip(self) -> IpAddr {
        match self {
            AddressDomain::Inet => IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
            AddressDomain::Inet6 => IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for AddressDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressDomain::Inet => write!(f, "inet"),
            AddressDomain::Inet6 => write!(f, "inet6"),
        }
    }
}

/// State of a transport socket as tracked by this layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SocketState {
    #[default]
    Closed,
    /// TCP connect issued, waiting for `on_connected`.
    Connect,
    /// TCP listen socket accepting connections.
    Listen,
    /// Connected TCP socket or bound UDP socket.
    Established,
    /// Close issued, waiting for the transport to report `Closed`/`Reset`.
    Closing,
}

impl SocketState {
    /// Whether the socket still holds transport resources.
    pub fn is_open(self) -> bool {
        !matches!(self, SocketState::Closed)
    }
}

/// Kind of asynchronous socket event reported by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketEventKind {
    Reset,
    Closed,
    FinReceived,
}

/// Verdict returned to the transport for an inbound TCP connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptDecision {
    Accept,
    Reject,
}

/// Tunable socket parameters applied after acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketParameter {
    TcpNoDelay,
    TcpKeepAlive,
    TcpKeepAliveTime,
    Ttl,
    FramePriority,
    RxBufferSize,
    TxBufferSize,
}

// =============================================================================
// CONNECTION ENUMS
// =============================================================================

/// Observable mode of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Offline,
    Reconnect,
    Online,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Offline => write!(f, "OFFLINE"),
            Mode::Reconnect => write!(f, "RECONNECT"),
            Mode::Online => write!(f, "ONLINE"),
        }
    }
}

/// Two-phase release state of a connection's remote endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReleaseState {
    #[default]
    None,
    Release,
    ReleaseForce,
}

/// Assignment state of a group's local address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LocalAddressState {
    Assigned,
    #[default]
    Unassigned,
}
