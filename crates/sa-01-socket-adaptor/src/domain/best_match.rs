//! # Best-Match Selector
//!
//! Ranks the connections of one group against an inbound address and keeps
//! the tie set at the highest priority found.
//!
//! ## Priority (highest first)
//!
//! ```text
//! IP match  + port match
//! IP match  + port any
//! IP any    + port match
//! IP any    + port any
//! no match
//! ```
//!
//! A concretely different IP or port, or an axis that is NOT_SET, is no
//! match for that connection.
//!
//! ## Critical section
//!
//! The selector reads remote endpoints the receive path can rewrite. The
//! caller must hold the state lock across both the selection and the use of
//! the resulting [`BestMatchCandidates`].

use std::net::SocketAddr;

use super::{AddressDomain, AxisState, ConnectionId, ConnectionState, Mode, RemoteEndpoint};

/// Match priority of one connection against a query address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchPriority {
    NoMatch,
    IpAnyPortAny,
    IpAnyPortMatch,
    IpMatchPortAny,
    IpMatchPortMatch,
}

/// Rank `remote` against `query`.
pub fn match_priority(remote: &RemoteEndpoint, query: &SocketAddr) -> MatchPriority {
    let class = remote.classify();

    let ip_match = match class.ip {
        AxisState::Set => remote.ip() == Some(query.ip()),
        _ => false,
    };
    let ip_any = class.ip == AxisState::Any && remote.domain() == AddressDomain::of(&query.ip());
    let port_match = match class.port {
        AxisState::Set => remote.port() == Some(query.port()),
        _ => false,
    };
    let port_any = class.port == AxisState::Any;

    match (ip_match, ip_any, port_match, port_any) {
        (true, _, true, _) => MatchPriority::IpMatchPortMatch,
        (true, _, _, true) => MatchPriority::IpMatchPortAny,
        (_, true, true, _) => MatchPriority::IpAnyPortMatch,
        (_, true, _, true) => MatchPriority::IpAnyPortAny,
        _ => MatchPriority::NoMatch,
    }
}

/// Which connections take part in a selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateFilter {
    /// Every connection of the group.
    AnyMode,
    /// Connections that are not OFFLINE (datagram demultiplexing).
    OfflineExcluded,
    /// Connections waiting in RECONNECT (accept, unique assignment).
    ReconnectOnly,
}

impl CandidateFilter {
    fn admits(self, mode: Mode) -> bool {
        match self {
            CandidateFilter::AnyMode => true,
            CandidateFilter::OfflineExcluded => mode != Mode::Offline,
            CandidateFilter::ReconnectOnly => mode == Mode::Reconnect,
        }
    }
}

/// Tie list of one selection.
///
/// Kept as a reusable buffer in the service state, sized for the largest
/// group, and refilled on every call.
#[derive(Debug, Clone, Default)]
pub struct BestMatchCandidates {
    ids: Vec<ConnectionId>,
    priority: Option<MatchPriority>,
    inspected: usize,
}

impl BestMatchCandidates {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            priority: None,
            inspected: 0,
        }
    }

    /// First candidate in scan order.
    pub fn first(&self) -> Option<ConnectionId> {
        self.ids.first().copied()
    }

    pub fn as_slice(&self) -> &[ConnectionId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Priority of the tie set, `None` when nothing matched.
    pub fn priority(&self) -> Option<MatchPriority> {
        self.priority
    }

    /// Number of connections examined by the last selection.
    pub fn inspected(&self) -> usize {
        self.inspected
    }

    fn reset(&mut self) {
        self.ids.clear();
        self.priority = None;
        self.inspected = 0;
    }
}

/// Single linear scan over `connections` in index order.
///
/// Fills `out` with every admitted connection at the highest priority seen
/// and stops at the first exact IP and port match.
pub fn select_best_match<'a, I>(
    connections: I,
    query: &SocketAddr,
    filter: CandidateFilter,
    out: &mut BestMatchCandidates,
) where
    I: IntoIterator<Item = &'a ConnectionState>,
{
    out.reset();

    for conn in connections {
        out.inspected += 1;
        if !filter.admits(conn.mode()) {
            continue;
        }

        let priority = match_priority(conn.remote(), query);
        if priority == MatchPriority::NoMatch {
            continue;
        }

        match out.priority {
            Some(best) if priority < best => {}
            Some(best) if priority == best => out.ids.push(conn.id()),
            _ => {
                out.ids.clear();
                out.ids.push(conn.id());
                out.priority = Some(priority);
            }
        }

        if priority == MatchPriority::IpMatchPortMatch {
            break;
        }
    }
}
