//! Inbound transport events.
//!
//! Each handler runs in the transport's callback context, inside one
//! critical section; the accept and datagram paths hold it across the
//! best-match selection and the endpoint write that follows.

use std::net::SocketAddr;

use tracing::{debug, info, warn};

use crate::domain::{
    registry, select_best_match, AcceptDecision, AddressDomain, CandidateFilter, CloseMode,
    ConnectionId, EventKind, GroupId, LocalAddressState, Mode, SocketEventKind, SocketHandle,
    SocketState,
};
use crate::ports::{TransportApi, TransportEventHandler};

use super::core::{Effect, SocketAdaptorService};
use super::lifecycle::Lifecycle;

impl<T: TransportApi> TransportEventHandler for SocketAdaptorService<T> {
    fn on_accepted(
        &self,
        listen: SocketHandle,
        accepted: SocketHandle,
        remote: SocketAddr,
    ) -> AcceptDecision {
        self.with_lifecycle(|lifecycle| lifecycle.accept(listen, accepted, remote))
    }

    fn on_connected(&self, handle: SocketHandle) {
        self.with_lifecycle(|lifecycle| lifecycle.connected(handle))
    }

    fn on_socket_event(&self, handle: SocketHandle, kind: SocketEventKind) {
        self.with_lifecycle(|lifecycle| lifecycle.socket_event(handle, kind))
    }

    fn on_datagram_metadata(
        &self,
        handle: SocketHandle,
        remote: SocketAddr,
    ) -> Option<ConnectionId> {
        self.with_lifecycle(|lifecycle| lifecycle.datagram(handle, remote))
    }

    fn on_local_address_assignment(&self, group: GroupId, state: LocalAddressState) {
        self.with_lifecycle(|lifecycle| lifecycle.local_address(group, state))
    }
}

impl<'a, T: TransportApi> Lifecycle<'a, T> {
    fn accept(
        &mut self,
        listen: SocketHandle,
        accepted: SocketHandle,
        remote: SocketAddr,
    ) -> AcceptDecision {
        if !self.state.initialized {
            return AcceptDecision::Reject;
        }
        let Some(group) = self.group_by_socket(listen) else {
            warn!(socket = %listen, "[sa-01] accept on unknown listen socket");
            return AcceptDecision::Reject;
        };
        let group_cfg = self.group_config(group);
        if !group_cfg.is_tcp_server() || AddressDomain::of(&remote.ip()) != group_cfg.domain() {
            self.state.stats.rejected_connections += 1;
            return AcceptDecision::Reject;
        }

        let members = self.members(group);
        let state = &mut *self.state;
        let eligible = members
            .iter()
            .map(|m| &state.connections[m.index()])
            .filter(|c| c.socket().is_none() && !c.close_request().is_pending());
        let chosen = if group_cfg.message_accept_filter {
            select_best_match(
                eligible,
                &remote,
                CandidateFilter::ReconnectOnly,
                &mut state.candidates,
            );
            state.candidates.first()
        } else {
            eligible
                .filter(|c| c.mode() == Mode::Reconnect)
                .map(|c| c.id())
                .next()
        };

        let Some(id) = chosen else {
            self.state.stats.rejected_connections += 1;
            warn!(%group, %remote, "[sa-01] no connection accepts inbound TCP connection");
            return AcceptDecision::Reject;
        };
        if registry::overwrite(self.state.conn_mut(id), group_cfg.domain(), remote).is_err() {
            self.state.stats.rejected_connections += 1;
            return AcceptDecision::Reject;
        }

        self.state
            .conn_mut(id)
            .attach_socket(accepted, SocketState::Established);
        self.state.stats.accepted_connections += 1;
        info!(connection = %id, socket = %accepted, %remote, "[sa-01] accepted");
        self.set_mode(id, Mode::Online);
        AcceptDecision::Accept
    }

    fn connected(&mut self, handle: SocketHandle) {
        if !self.state.initialized {
            return;
        }
        let Some(id) = self.connection_by_socket(handle) else {
            debug!(socket = %handle, "[sa-01] connect completion for unknown socket");
            return;
        };
        let conn = self.state.conn_mut(id);
        if conn.socket_state() != SocketState::Connect {
            return;
        }
        conn.set_socket_state(SocketState::Established);
        let closing = conn.close_request().is_pending();
        self.state.auto_connect.remove_element(id);
        info!(connection = %id, socket = %handle, "[sa-01] connected");
        if !closing {
            self.set_mode(id, Mode::Online);
        }
    }

    fn socket_event(&mut self, handle: SocketHandle, kind: SocketEventKind) {
        if !self.state.initialized {
            return;
        }

        if let Some(id) = self.connection_by_socket(handle) {
            self.connection_socket_event(id, kind);
            return;
        }

        if let Some(group) = self.group_by_socket(handle) {
            if kind == SocketEventKind::FinReceived {
                return;
            }
            self.state.group_mut(group).detach_socket();
            warn!(%group, socket = %handle, ?kind, "[sa-01] shared socket lost");
            for &member in self.members(group) {
                let conn = self.state.conn(member);
                if conn.mode() != Mode::Offline && conn.socket().is_none() {
                    self.request_close(member, CloseMode::SocketReconnect);
                    self.process_state_machine(member);
                }
            }
            return;
        }

        debug!(socket = %handle, ?kind, "[sa-01] event for unknown socket");
    }

    fn connection_socket_event(&mut self, id: ConnectionId, kind: SocketEventKind) {
        match kind {
            SocketEventKind::FinReceived => {
                debug!(connection = %id, "[sa-01] peer finished sending");
                if self.state.conn(id).close_request().is_pending() {
                    self.process_state_machine(id);
                } else {
                    self.connection_lost(id);
                }
            }
            SocketEventKind::Reset | SocketEventKind::Closed => {
                let conn = self.state.conn_mut(id);
                conn.detach_socket();
                match conn.post_close_mode() {
                    Some(post) if post == conn.mode() => self.try_complete_close(id),
                    Some(_) => self.process_state_machine(id),
                    None => {
                        warn!(connection = %id, ?kind, "[sa-01] connection socket lost");
                        self.connection_lost(id);
                    }
                }
            }
        }
    }

    fn datagram(&mut self, handle: SocketHandle, remote: SocketAddr) -> Option<ConnectionId> {
        if !self.state.initialized {
            return None;
        }
        let group = self.group_by_socket(handle)?;
        let group_cfg = self.group_config(group);
        let domain = group_cfg.domain();
        if !group_cfg.is_udp() || AddressDomain::of(&remote.ip()) != domain {
            self.state.stats.datagrams_dropped += 1;
            return None;
        }

        let members = self.members(group);
        let state = &mut *self.state;
        let open = members
            .iter()
            .map(|m| &state.connections[m.index()])
            .filter(|c| c.mode() != Mode::Offline);
        let chosen = if group_cfg.message_accept_filter {
            select_best_match(
                open,
                &remote,
                CandidateFilter::OfflineExcluded,
                &mut state.candidates,
            );
            state.candidates.first()
        } else {
            open.map(|c| c.id()).next()
        };

        let Some(id) = chosen else {
            self.state.stats.datagrams_dropped += 1;
            debug!(%group, %remote, "[sa-01] datagram matches no connection");
            return None;
        };

        // Keep-online connections stay ONLINE on a wildcard and learn there.
        let mode = self.state.conn(id).mode();
        let learns = mode == Mode::Reconnect
            || (group_cfg.keep_online && !self.state.conn(id).remote().is_fully_set());
        if learns {
            let conn = self.state.conn_mut(id);
            let learned = registry::overwrite_if_wildcard(conn, domain, remote, false);
            if learned {
                info!(connection = %id, %remote, "[sa-01] remote learned from datagram");
            } else if mode == Mode::Reconnect && !conn.remote().is_fully_set() {
                self.state.stats.datagrams_dropped += 1;
                return None;
            }
            self.set_mode(id, Mode::Online);
        }

        if let Some(ticks) = group_cfg.udp_alive_timeout_ticks {
            if self.state.conn(id).configured_remote().classify().has_wildcard() {
                let deadline = self.state.tick + u64::from(ticks);
                self.state.alive.set_element(id, deadline);
            }
        }
        self.state.stats.datagrams_accepted += 1;
        Some(id)
    }

    fn local_address(&mut self, group: GroupId, assignment: LocalAddressState) {
        let Some(group_state) = self.state.groups.get_mut(group.index()) else {
            warn!(%group, "[sa-01] local address event for unknown group");
            return;
        };
        if !group_state.set_local_address(assignment) {
            return;
        }
        info!(%group, ?assignment, "[sa-01] local address assignment changed");
        self.effects
            .push(Effect::LocalAddressChanged(group, assignment));
        if !self.state.initialized {
            return;
        }

        let auto_setup = self.group_config(group).auto_setup;
        let members = self.members(group);
        match assignment {
            LocalAddressState::Assigned => {
                for &member in members {
                    if self.state.conn(member).wants_online(auto_setup) {
                        self.state.events.add(EventKind::StateMachine, member);
                    }
                }
            }
            LocalAddressState::Unassigned => {
                // Every member carries its reason before the first close runs,
                // so the shared socket is released exactly once.
                let closing: Vec<ConnectionId> = members
                    .iter()
                    .copied()
                    .filter(|m| self.state.conn(*m).mode() != Mode::Offline)
                    .collect();
                for &member in &closing {
                    self.request_close(member, CloseMode::SocketReconnect);
                }
                for member in closing {
                    self.process_state_machine(member);
                }
            }
        }
    }
}
