//! Static configuration of the socket adaptor.
//!
//! Built once, validated, and shared read-only (behind an `Arc`) with every
//! execution context. Connection and group ids are positions in
//! [`SocketAdaptorConfig::connections`] and [`SocketAdaptorConfig::groups`].

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    AddressDomain, ConnectionId, GroupId, RemoteEndpoint, SocketParameter, TransportKind,
};

/// Default depth of each connection's mode-change queue.
pub const DEFAULT_MODE_QUEUE_CAPACITY: usize = 4;

/// Default TCP listen backlog.
pub const DEFAULT_LISTEN_BACKLOG: u16 = 4;

/// Configuration validation and loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("configuration has no groups")]
    NoGroups,

    #[error("too many {what}: {count} (max 65535)")]
    TooMany { what: &'static str, count: usize },

    #[error("{connection} references unknown group {group}")]
    UnknownGroup {
        connection: ConnectionId,
        group: GroupId,
    },

    #[error("{0} has no connections")]
    EmptyGroup(GroupId),

    #[error("{connection}: remote address domain {actual} differs from group domain {expected}")]
    DomainMismatch {
        connection: ConnectionId,
        expected: AddressDomain,
        actual: AddressDomain,
    },

    #[error("{group}: {option} is not valid for {transport:?} groups")]
    InvalidOption {
        group: GroupId,
        option: &'static str,
        transport: TransportKind,
    },

    #[error("{group}: {option} must be at least one tick")]
    ZeroTimeout {
        group: GroupId,
        option: &'static str,
    },

    #[error("mode queue capacity must be at least 1")]
    ZeroModeQueueCapacity,

    #[error("failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Static settings of one connection group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub transport: TransportKind,
    /// Local address; port 0 lets the transport pick one.
    pub local_address: SocketAddr,
    /// Bring connections up without an explicit open request.
    #[serde(default)]
    pub auto_setup: bool,
    /// Demultiplex inbound traffic with the best-match selector.
    #[serde(default)]
    pub message_accept_filter: bool,
    /// UDP: stay ONLINE while the remote endpoint is a wildcard.
    #[serde(default)]
    pub keep_online: bool,
    /// TCP: actively connect (client) instead of listening (server).
    #[serde(default)]
    pub tcp_initiate: bool,
    /// UDP: go ONLINE without a concrete remote endpoint.
    #[serde(default)]
    pub udp_listen_only: bool,
    #[serde(default = "default_listen_backlog")]
    pub listen_backlog: u16,
    /// TCP client: ticks before an unfinished connect latches a timeout.
    #[serde(default)]
    pub auto_connect_timeout_ticks: Option<u32>,
    /// UDP: ticks without a datagram before a learned peer is dropped.
    #[serde(default)]
    pub udp_alive_timeout_ticks: Option<u32>,
    /// Applied in order after acquisition, before bind.
    #[serde(default)]
    pub socket_parameters: Vec<SocketParameterSetting>,
}

fn default_listen_backlog() -> u16 {
    DEFAULT_LISTEN_BACKLOG
}

/// One socket parameter with its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketParameterSetting {
    pub parameter: SocketParameter,
    pub value: u32,
}

impl GroupConfig {
    fn base(transport: TransportKind, local_address: SocketAddr) -> Self {
        Self {
            transport,
            local_address,
            auto_setup: false,
            message_accept_filter: false,
            keep_online: false,
            tcp_initiate: false,
            udp_listen_only: false,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
            auto_connect_timeout_ticks: None,
            udp_alive_timeout_ticks: None,
            socket_parameters: Vec::new(),
        }
    }

    pub fn udp(local_address: SocketAddr) -> Self {
        Self::base(TransportKind::Udp, local_address)
    }

    pub fn tcp_client(local_address: SocketAddr) -> Self {
        Self {
            tcp_initiate: true,
            ..Self::base(TransportKind::Tcp, local_address)
        }
    }

    pub fn tcp_server(local_address: SocketAddr) -> Self {
        Self::base(TransportKind::Tcp, local_address)
    }

    pub fn with_auto_setup(mut self, enabled: bool) -> Self {
        self.auto_setup = enabled;
        self
    }

    pub fn with_message_accept_filter(mut self, enabled: bool) -> Self {
        self.message_accept_filter = enabled;
        self
    }

    pub fn with_keep_online(mut self, enabled: bool) -> Self {
        self.keep_online = enabled;
        self
    }

    pub fn with_udp_listen_only(mut self, enabled: bool) -> Self {
        self.udp_listen_only = enabled;
        self
    }

    pub fn with_listen_backlog(mut self, backlog: u16) -> Self {
        self.listen_backlog = backlog;
        self
    }

    pub fn with_auto_connect_timeout(mut self, ticks: u32) -> Self {
        self.auto_connect_timeout_ticks = Some(ticks);
        self
    }

    pub fn with_udp_alive_timeout(mut self, ticks: u32) -> Self {
        self.udp_alive_timeout_ticks = Some(ticks);
        self
    }

    pub fn with_socket_parameter(mut self, parameter: SocketParameter, value: u32) -> Self {
        self.socket_parameters
            .push(SocketParameterSetting { parameter, value });
        self
    }

    pub fn domain(&self) -> AddressDomain {
        AddressDomain::of(&self.local_address.ip())
    }

    pub fn is_tcp_client(&self) -> bool {
        self.transport == TransportKind::Tcp && self.tcp_initiate
    }

    pub fn is_tcp_server(&self) -> bool {
        self.transport == TransportKind::Tcp && !self.tcp_initiate
    }

    pub fn is_udp(&self) -> bool {
        self.transport == TransportKind::Udp
    }
}

/// Static settings of one connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub group: GroupId,
    /// Configured remote IP; absent means NOT_SET, unspecified means ANY.
    #[serde(default)]
    pub remote_ip: Option<IpAddr>,
    /// Configured remote port; absent means NOT_SET, 0 means ANY.
    #[serde(default)]
    pub remote_port: Option<u16>,
}

impl ConnectionConfig {
    pub fn new(group: GroupId) -> Self {
        Self {
            group,
            remote_ip: None,
            remote_port: None,
        }
    }

    /// Configure a concrete or wildcard remote endpoint.
    pub fn with_remote(mut self, addr: SocketAddr) -> Self {
        self.remote_ip = Some(addr.ip());
        self.remote_port = Some(addr.port());
        self
    }

    pub fn with_remote_ip(mut self, ip: IpAddr) -> Self {
        self.remote_ip = Some(ip);
        self
    }

    pub fn with_remote_port(mut self, port: u16) -> Self {
        self.remote_port = Some(port);
        self
    }
}

/// Complete static configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SocketAdaptorConfig {
    #[serde(default = "default_mode_queue_capacity")]
    pub mode_queue_capacity: usize,
    pub groups: Vec<GroupConfig>,
    pub connections: Vec<ConnectionConfig>,
}

fn default_mode_queue_capacity() -> usize {
    DEFAULT_MODE_QUEUE_CAPACITY
}

impl Default for SocketAdaptorConfig {
    fn default() -> Self {
        Self {
            mode_queue_capacity: DEFAULT_MODE_QUEUE_CAPACITY,
            groups: Vec::new(),
            connections: Vec::new(),
        }
    }
}

impl SocketAdaptorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group and return its id.
    pub fn add_group(&mut self, group: GroupConfig) -> GroupId {
        self.groups.push(group);
        GroupId::new((self.groups.len() - 1) as u16)
    }

    /// Append a connection and return its id.
    pub fn add_connection(&mut self, connection: ConnectionConfig) -> ConnectionId {
        self.connections.push(connection);
        ConnectionId::new((self.connections.len() - 1) as u16)
    }

    pub fn with_mode_queue_capacity(mut self, capacity: usize) -> Self {
        self.mode_queue_capacity = capacity;
        self
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupConfig> {
        self.groups.get(id.index())
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&ConnectionConfig> {
        self.connections.get(id.index())
    }

    /// Group configuration of a connection.
    pub fn group_of(&self, id: ConnectionId) -> Option<(GroupId, &GroupConfig)> {
        let group = self.connection(id)?.group;
        Some((group, self.group(group)?))
    }

    /// Connections of `group` in index order.
    pub fn members(&self, group: GroupId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.group == group)
            .map(|(index, _)| ConnectionId::new(index as u16))
    }

    pub fn max_group_size(&self) -> usize {
        (0..self.groups.len())
            .map(|g| self.members(GroupId::new(g as u16)).count())
            .max()
            .unwrap_or(0)
    }

    /// Configured remote endpoint of a connection, in its group's domain.
    pub fn configured_remote(&self, id: ConnectionId) -> Option<RemoteEndpoint> {
        let conn = self.connection(id)?;
        let group = self.group(conn.group)?;
        Some(RemoteEndpoint::configured(
            group.domain(),
            conn.remote_ip,
            conn.remote_port,
        ))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode_queue_capacity == 0 {
            return Err(ConfigError::ZeroModeQueueCapacity);
        }
        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        if self.groups.len() > usize::from(u16::MAX) {
            return Err(ConfigError::TooMany {
                what: "groups",
                count: self.groups.len(),
            });
        }
        if self.connections.len() > usize::from(u16::MAX) {
            return Err(ConfigError::TooMany {
                what: "connections",
                count: self.connections.len(),
            });
        }

        for (index, group) in self.groups.iter().enumerate() {
            let id = GroupId::new(index as u16);
            validate_group(id, group)?;
            if self.members(id).next().is_none() {
                return Err(ConfigError::EmptyGroup(id));
            }
        }

        for (index, conn) in self.connections.iter().enumerate() {
            let id = ConnectionId::new(index as u16);
            let group = self.group(conn.group).ok_or(ConfigError::UnknownGroup {
                connection: id,
                group: conn.group,
            })?;
            if let Some(ip) = conn.remote_ip {
                let actual = AddressDomain::of(&ip);
                if actual != group.domain() {
                    return Err(ConfigError::DomainMismatch {
                        connection: id,
                        expected: group.domain(),
                        actual,
                    });
                }
            }
        }
        Ok(())
    }
}

fn validate_group(id: GroupId, group: &GroupConfig) -> Result<(), ConfigError> {
    let invalid = |option| ConfigError::InvalidOption {
        group: id,
        option,
        transport: group.transport,
    };

    match group.transport {
        TransportKind::Udp => {
            if group.tcp_initiate {
                return Err(invalid("tcp_initiate"));
            }
            if group.auto_connect_timeout_ticks.is_some() {
                return Err(invalid("auto_connect_timeout_ticks"));
            }
        }
        TransportKind::Tcp => {
            if group.udp_listen_only {
                return Err(invalid("udp_listen_only"));
            }
            if group.udp_alive_timeout_ticks.is_some() {
                return Err(invalid("udp_alive_timeout_ticks"));
            }
            if !group.tcp_initiate && group.auto_connect_timeout_ticks.is_some() {
                return Err(invalid("auto_connect_timeout_ticks"));
            }
        }
    }

    for (option, ticks) in [
        ("auto_connect_timeout_ticks", group.auto_connect_timeout_ticks),
        ("udp_alive_timeout_ticks", group.udp_alive_timeout_ticks),
    ] {
        if ticks == Some(0) {
            return Err(ConfigError::ZeroTimeout { group: id, option });
        }
    }
    Ok(())
}

// =============================================================================
// TOML LOADING
// =============================================================================

#[cfg(feature = "toml-config")]
mod toml_loading {
    use super::{ConfigError, SocketAdaptorConfig};
    use std::fs;
    use std::path::Path;

    impl SocketAdaptorConfig {
        /// Parse and validate a TOML document.
        ///
        /// ```toml
        /// mode_queue_capacity = 4
        ///
        /// [[groups]]
        /// transport = "udp"
        /// local_address = "0.0.0.0:30490"
        /// message_accept_filter = true
        ///
        /// [[connections]]
        /// group = 0
        /// remote_ip = "0.0.0.0"
        /// remote_port = 0
        /// ```
        pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
            let config: SocketAdaptorConfig =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            config.validate()?;
            Ok(config)
        }

        /// Read, parse and validate a TOML file.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;
            Self::from_toml_str(&content)
        }
    }
}
