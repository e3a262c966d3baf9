//! Remote endpoint release and unique assignment.
//!
//! Both run inside the critical section and build on the registry write
//! policies plus the lifecycle's `on_remote_changed` re-evaluation.

use std::net::SocketAddr;

use tracing::{debug, info};

use crate::domain::{
    registry, select_best_match, CandidateFilter, CloseMode, ConnectionId, EventKind, GroupId,
    ReleaseState, SocketState, TransportKind,
};
use crate::ports::TransportApi;

use super::lifecycle::Lifecycle;

impl<'a, T: TransportApi> Lifecycle<'a, T> {
    /// Second release phase.
    ///
    /// Deferred to the next tick while the connection is transferring. A
    /// forced release of a connected TCP connection reopens its socket; any
    /// other release falls back to the configured endpoint in place.
    pub(crate) fn handle_release(&mut self, id: ConnectionId) {
        let release = self.state.conn(id).release_state();
        if release == ReleaseState::None {
            return;
        }
        if self.is_transferring(id) {
            debug!(connection = %id, "[sa-01] release deferred, transfer in progress");
            self.state.events.add(EventKind::Release, id);
            return;
        }

        let (_, group_cfg) = self.group_of(id);
        let connected = group_cfg.transport == TransportKind::Tcp
            && self.state.conn(id).socket_state() == SocketState::Established;

        if connected && release == ReleaseState::ReleaseForce {
            self.state.conn_mut(id).clear_release();
            info!(connection = %id, "[sa-01] forced release, reconnecting socket");
            self.request_close(id, CloseMode::SocketReconnect);
            self.process_state_machine(id);
            return;
        }

        let conn = self.state.conn_mut(id);
        conn.reset_remote();
        conn.clear_release();
        debug!(connection = %id, remote = %conn.remote(), "[sa-01] remote address released");
        self.on_remote_changed(id);
    }

    /// Assign `addr` to exactly one connection of `group`.
    ///
    /// The caller has checked the address domain.
    pub(crate) fn assign_unique(&mut self, group: GroupId, addr: SocketAddr) -> Option<ConnectionId> {
        let members = self.members(group);
        if let Some(holder) = members
            .iter()
            .copied()
            .find(|m| self.state.conn(*m).remote().holds_exactly(&addr))
        {
            return Some(holder);
        }

        let state = &mut *self.state;
        select_best_match(
            members.iter().map(|m| &state.connections[m.index()]),
            &addr,
            CandidateFilter::ReconnectOnly,
            &mut state.candidates,
        );
        let chosen = state.candidates.first()?;

        let domain = self.group_config(group).domain();
        registry::overwrite(self.state.conn_mut(chosen), domain, addr).ok()?;
        self.state.conn_mut(chosen).clear_release();
        info!(connection = %chosen, %group, remote = %addr, "[sa-01] unique remote assigned");
        self.on_remote_changed(chosen);
        Some(chosen)
    }
}
