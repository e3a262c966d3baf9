//! # Remote Endpoint
//!
//! The `(domain, ip, port)` a connection currently considers its peer.
//!
//! ## Classification
//!
//! Each axis classifies independently into [`AxisState`]:
//!
//! | stored value        | state  |
//! |---------------------|--------|
//! | absent              | NotSet |
//! | wildcard (0.0.0.0 / :: / port 0) | Any |
//! | anything else       | Set    |
//!
//! The classification is derived on every read and never stored. An axis is
//! only ever absent for a configured default; every run-time write supplies
//! both axes, so it classifies to `Set` or `Any`.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use super::AddressDomain;

/// Wildcard port sentinel.
pub const PORT_ANY: u16 = 0;

/// Classification of one axis of a remote endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisState {
    Set,
    Any,
    NotSet,
}

/// Two-axis classification (9 states).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EndpointClass {
    pub ip: AxisState,
    pub port: AxisState,
}

impl EndpointClass {
    pub fn is_fully_set(self) -> bool {
        self.ip == AxisState::Set && self.port == AxisState::Set
    }

    /// Whether any axis is still a wildcard or unset.
    pub fn has_wildcard(self) -> bool {
        !self.is_fully_set()
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.ip, self.port)
    }
}

/// Remote endpoint value of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RemoteEndpoint {
    domain: AddressDomain,
    ip: Option<IpAddr>,
    port: Option<u16>,
}

impl RemoteEndpoint {
    /// Statically configured endpoint. `None` on an axis means NOT_SET.
    ///
    /// The caller guarantees that `ip`, when present, belongs to `domain`
    /// (checked by configuration validation).
    pub fn configured(domain: AddressDomain, ip: Option<IpAddr>, port: Option<u16>) -> Self {
        Self { domain, ip, port }
    }

    /// Run-time endpoint built from a concrete socket address.
    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        Self {
            domain: AddressDomain::of(&addr.ip()),
            ip: Some(addr.ip()),
            port: Some(addr.port()),
        }
    }

    pub fn domain(&self) -> AddressDomain {
        self.domain
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Derive the two-axis classification from the stored address.
    pub fn classify(&self) -> EndpointClass {
        let ip = match self.ip {
            None => AxisState::NotSet,
            Some(ip) if ip.is_unspecified() => AxisState::Any,
            Some(_) => AxisState::Set,
        };
        let port = match self.port {
            None => AxisState::NotSet,
            Some(PORT_ANY) => AxisState::Any,
            Some(_) => AxisState::Set,
        };
        EndpointClass { ip, port }
    }

    pub fn is_fully_set(&self) -> bool {
        self.classify().is_fully_set()
    }

    /// Concrete socket address, available once both axes are stored.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match (self.ip, self.port) {
            (Some(ip), Some(port)) => Some(SocketAddr::new(ip, port)),
            _ => None,
        }
    }

    /// Whether this endpoint holds exactly `addr` with both axes SET.
    pub fn holds_exactly(&self, addr: &SocketAddr) -> bool {
        self.is_fully_set() && self.socket_addr() == Some(*addr)
    }

    /// Replace the stored address. Both axes become present.
    ///
    /// Domain agreement is enforced by the registry write policies.
    pub(crate) fn store(&mut self, addr: SocketAddr) {
        self.domain = AddressDomain::of(&addr.ip());
        self.ip = Some(addr.ip());
        self.port = Some(addr.port());
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ip, self.port) {
            (Some(ip), Some(port)) => write!(f, "{}", SocketAddr::new(ip, port)),
            (Some(ip), None) => write!(f, "{ip}:<unset>"),
            (None, Some(port)) => write!(f, "<unset>:{port}"),
            (None, None) => write!(f, "<unset>"),
        }
    }
}
