//! # Connection Lifecycle
//!
//! The per-connection state machine. Every method here runs inside the
//! service's critical section; anything that must not run under the lock
//! (observer callbacks, Tx/Rx termination, diagnostics) is pushed onto the
//! effect list and performed by the caller after unlocking.
//!
//! ```text
//!            open (UDP, concrete remote or listen-only)
//!   OFFLINE ------------------------------------------> ONLINE
//!      |  open                                            ^  |
//!      v                       connect / accept / datagram|  |
//!   RECONNECT ------------------------------------------- +  |
//!      ^                                                     |
//!      +---------- close (RECONNECT reasons) ----------------+
//!   close (OFFLINE reasons) from any state -> OFFLINE
//! ```

use std::net::SocketAddr;

use tracing::{debug, warn};

use crate::config::{GroupConfig, SocketAdaptorConfig};
use crate::domain::{
    CloseMode, ConnectionId, EventKind, GroupId, Mode, ModePush, SocketHandle, SocketState,
    TransportKind,
};
use crate::ports::{Diagnostic, TransportApi, TransportError};

use super::core::{AdaptorState, Effect, TransferActivity};

/// Borrowed view of the service used inside one critical section.
pub(crate) struct Lifecycle<'a, T: TransportApi> {
    pub(crate) config: &'a SocketAdaptorConfig,
    pub(crate) transport: &'a T,
    pub(crate) group_members: &'a [Vec<ConnectionId>],
    pub(crate) activity: &'a [TransferActivity],
    pub(crate) state: &'a mut AdaptorState,
    pub(crate) effects: &'a mut Vec<Effect>,
}

impl<'a, T: TransportApi> Lifecycle<'a, T> {
    // =========================================================================
    // LOOKUPS
    // =========================================================================

    pub(crate) fn group_config(&self, group: GroupId) -> &'a GroupConfig {
        let config: &'a SocketAdaptorConfig = self.config;
        &config.groups[group.index()]
    }

    pub(crate) fn group_of(&self, id: ConnectionId) -> (GroupId, &'a GroupConfig) {
        let group = self.state.conn(id).group();
        (group, self.group_config(group))
    }

    pub(crate) fn members(&self, group: GroupId) -> &'a [ConnectionId] {
        let members: &'a [Vec<ConnectionId>] = self.group_members;
        &members[group.index()]
    }

    pub(crate) fn is_transferring(&self, id: ConnectionId) -> bool {
        self.activity[id.index()].is_active()
    }

    pub(crate) fn connection_by_socket(&self, handle: SocketHandle) -> Option<ConnectionId> {
        self.state
            .connections
            .iter()
            .find(|c| c.socket() == Some(handle))
            .map(|c| c.id())
    }

    pub(crate) fn group_by_socket(&self, handle: SocketHandle) -> Option<GroupId> {
        self.state
            .groups
            .iter()
            .position(|g| g.owns(handle))
            .map(|index| GroupId::new(index as u16))
    }

    // =========================================================================
    // MODE TRANSITIONS
    // =========================================================================

    /// Move `id` to `mode` and queue the notification.
    pub(crate) fn set_mode(&mut self, id: ConnectionId, mode: Mode) {
        let conn = self.state.conn_mut(id);
        let from = conn.mode();
        if from == mode {
            return;
        }
        conn.set_mode(mode);
        debug!(connection = %id, %from, to = %mode, "[sa-01] mode change");

        let push = conn.mode_queue_mut().push(mode);
        match push {
            ModePush::Deliver => self.effects.push(Effect::DeliverModes(id)),
            ModePush::Deferred => {
                self.state.events.add(EventKind::ModeDelivery, id);
            }
            ModePush::Overflowed { delivering } => {
                warn!(connection = %id, %mode, "[sa-01] mode queue overflow, newest entry overwritten");
                self.state.stats.mode_queue_overflows += 1;
                self.effects
                    .push(Effect::Diagnostic(Diagnostic::ModeQueueOverflow { connection: id }));
                if delivering {
                    self.state.events.add(EventKind::ModeDelivery, id);
                } else {
                    self.effects.push(Effect::DeliverModes(id));
                }
            }
        }

        if mode != Mode::Online {
            self.state.alive.remove_element(id);
        }
    }

    /// UDP mode for an open connection given its current remote endpoint.
    fn udp_target_mode(&self, id: ConnectionId, group: &GroupConfig) -> Mode {
        let remote_set = self.state.conn(id).remote().is_fully_set();
        if remote_set || group.udp_listen_only || group.keep_online {
            Mode::Online
        } else {
            Mode::Reconnect
        }
    }

    // =========================================================================
    // STATE MACHINE
    // =========================================================================

    /// Merge a close reason into the connection's pending close.
    pub(crate) fn request_close(&mut self, id: ConnectionId, reason: CloseMode) {
        let conn = self.state.conn_mut(id);
        if conn.request_close(reason) {
            debug!(connection = %id, ?reason, "[sa-01] close requested");
        }
    }

    /// Close first, then open once no close is outstanding.
    pub(crate) fn process_state_machine(&mut self, id: ConnectionId) {
        if self.state.conn(id).close_request().is_pending() {
            self.process_close(id);
        }
        if !self.state.conn(id).close_request().is_pending() {
            self.process_open(id);
        }
    }

    /// Queue an open for every automatically set up connection.
    pub(crate) fn schedule_auto_setup(&mut self) {
        for (index, conn) in self.config.connections.iter().enumerate() {
            if self.group_config(conn.group).auto_setup {
                self.state
                    .events
                    .add(EventKind::StateMachine, ConnectionId::new(index as u16));
            }
        }
    }

    // =========================================================================
    // CLOSE
    // =========================================================================

    fn process_close(&mut self, id: ConnectionId) {
        let conn = self.state.conn(id);
        let reason = conn.close_request();
        let Some(post) = reason.post_close_mode() else {
            return;
        };
        let abort = conn.abort_requested();
        let was = conn.mode();

        if !abort && self.is_transferring(id) {
            debug!(connection = %id, "[sa-01] close deferred, transfer in progress");
            self.state.events.add(EventKind::StateMachine, id);
            return;
        }

        let conn = self.state.conn_mut(id);
        if reason.resets_remote() {
            conn.reset_remote();
            conn.clear_release();
        }
        if reason.resets_open_demand() {
            conn.reset_open_demand();
        }
        if was != Mode::Offline {
            self.effects.push(Effect::TerminateTx(id));
            self.effects.push(Effect::TerminateRx(id, !abort));
        }

        self.state.alive.remove_element(id);
        if post == Mode::Offline {
            self.state.auto_connect.remove_element(id);
        }

        self.close_connection_socket(id, abort);
        self.close_shared_socket_if_unused(id, reason, post, abort);
        self.set_mode(id, post);
        self.try_complete_close(id);
    }

    fn close_connection_socket(&mut self, id: ConnectionId, abort: bool) {
        let conn = self.state.conn_mut(id);
        let Some(handle) = conn.socket() else {
            return;
        };
        if conn.socket_state() == SocketState::Closing && !abort {
            return;
        }
        self.transport.close(handle, abort);
        if abort {
            conn.detach_socket();
        } else {
            conn.set_socket_state(SocketState::Closing);
        }
        debug!(connection = %id, socket = %handle, abort, "[sa-01] socket close issued");
    }

    /// Close the group's shared socket once no other member needs it.
    fn close_shared_socket_if_unused(
        &mut self,
        id: ConnectionId,
        reason: CloseMode,
        post: Mode,
        abort: bool,
    ) {
        let (group, group_cfg) = self.group_of(id);
        if group_cfg.is_tcp_client() {
            return;
        }
        if post != Mode::Offline && !reason.forces_socket_close() {
            return;
        }
        // A socket bound to a lost local address is useless to everyone.
        let address_lost = !self.state.groups[group.index()].is_local_address_assigned();
        let still_needed = !address_lost
            && self.members(group).iter().any(|&m| {
                let other = self.state.conn(m);
                m != id
                    && other.mode() != Mode::Offline
                    && !other.close_request().forces_socket_close()
            });
        if still_needed {
            return;
        }
        if let Some(handle) = self.state.group_mut(group).detach_socket() {
            self.transport.close(handle, abort);
            debug!(%group, socket = %handle, "[sa-01] shared socket closed");
        }
    }

    /// End the close cycle once the mode matches and, for TCP, the
    /// connection's socket is gone.
    pub(crate) fn try_complete_close(&mut self, id: ConnectionId) {
        let (_, group_cfg) = self.group_of(id);
        let conn = self.state.conn(id);
        let Some(post) = conn.post_close_mode() else {
            return;
        };
        if conn.mode() != post {
            return;
        }
        if group_cfg.transport == TransportKind::Tcp && conn.socket().is_some() {
            return;
        }

        let reopen = conn.wants_online(group_cfg.auto_setup);
        self.state.conn_mut(id).clear_close_request();
        debug!(connection = %id, mode = %post, "[sa-01] close complete");
        if reopen {
            self.state.events.add(EventKind::StateMachine, id);
        }
    }

    /// Unexpected loss of a connection's own socket.
    pub(crate) fn connection_lost(&mut self, id: ConnectionId) {
        let (_, group_cfg) = self.group_of(id);
        let reason = if self.state.conn(id).wants_online(group_cfg.auto_setup) {
            if group_cfg.is_tcp_client() {
                CloseMode::SocketReconnect
            } else {
                CloseMode::Reconnect
            }
        } else {
            CloseMode::Socket
        };
        self.request_close(id, reason);
        self.process_state_machine(id);
    }

    // =========================================================================
    // OPEN
    // =========================================================================

    fn process_open(&mut self, id: ConnectionId) {
        let (group, group_cfg) = self.group_of(id);
        let conn = self.state.conn(id);
        if !conn.wants_online(group_cfg.auto_setup) || conn.close_request().is_pending() {
            return;
        }
        if !self.state.groups[group.index()].is_local_address_assigned() {
            debug!(connection = %id, %group, "[sa-01] open waits for local address");
            return;
        }

        match group_cfg.transport {
            TransportKind::Udp => self.open_udp(id, group, group_cfg),
            TransportKind::Tcp if group_cfg.tcp_initiate => {
                self.open_tcp_client(id, group, group_cfg)
            }
            TransportKind::Tcp => self.open_tcp_server(id, group, group_cfg),
        }
    }

    fn open_udp(&mut self, id: ConnectionId, group: GroupId, group_cfg: &GroupConfig) {
        if !self.ensure_shared_socket(id, group, group_cfg, false) {
            return;
        }
        if self.state.conn(id).mode() == Mode::Online {
            return;
        }
        let mode = self.udp_target_mode(id, group_cfg);
        self.set_mode(id, mode);
    }

    fn open_tcp_client(&mut self, id: ConnectionId, group: GroupId, group_cfg: &GroupConfig) {
        let conn = self.state.conn(id);
        if conn.socket().is_some() {
            return;
        }
        let remote = match conn.remote().socket_addr() {
            Some(addr) if conn.remote().is_fully_set() => addr,
            _ => {
                debug!(connection = %id, remote = %conn.remote(), "[sa-01] connect needs a concrete remote");
                return;
            }
        };

        if let Some(ticks) = group_cfg.auto_connect_timeout_ticks {
            if !self.state.auto_connect.is_armed(id) {
                let deadline = self.state.tick + u64::from(ticks);
                self.state.auto_connect.set_element(id, deadline);
            }
        }

        let handle = match self.connect_socket(group_cfg, remote) {
            Ok(handle) => handle,
            Err(error) => {
                self.open_failed(group, id, error);
                return;
            }
        };
        self.state
            .conn_mut(id)
            .attach_socket(handle, SocketState::Connect);
        debug!(connection = %id, socket = %handle, %remote, "[sa-01] connecting");
        self.set_mode(id, Mode::Reconnect);
    }

    fn open_tcp_server(&mut self, id: ConnectionId, group: GroupId, group_cfg: &GroupConfig) {
        if !self.ensure_shared_socket(id, group, group_cfg, true) {
            return;
        }
        if self.state.conn(id).mode() == Mode::Offline {
            self.set_mode(id, Mode::Reconnect);
        }
    }

    /// Make sure the group's shared socket exists. Returns `false` if the
    /// open has to be retried.
    fn ensure_shared_socket(
        &mut self,
        id: ConnectionId,
        group: GroupId,
        group_cfg: &GroupConfig,
        listen: bool,
    ) -> bool {
        if self.state.groups[group.index()].socket().is_some() {
            return true;
        }
        match self.acquire_configured_socket(group_cfg, listen) {
            Ok(handle) => {
                let socket_state = if listen {
                    SocketState::Listen
                } else {
                    SocketState::Established
                };
                self.state.group_mut(group).attach_socket(handle, socket_state);
                debug!(%group, socket = %handle, local = %group_cfg.local_address, listen, "[sa-01] shared socket opened");
                true
            }
            Err(error) => {
                self.open_failed(group, id, error);
                false
            }
        }
    }

    /// Acquire, tune and bind a socket (and listen if asked). On any
    /// failure the socket is handed back to the transport.
    fn acquire_configured_socket(
        &self,
        group_cfg: &GroupConfig,
        listen: bool,
    ) -> Result<SocketHandle, TransportError> {
        let handle = self
            .transport
            .acquire_socket(group_cfg.domain(), group_cfg.transport)?;
        if let Err(error) = configure_socket(self.transport, handle, group_cfg, listen) {
            self.transport.close(handle, true);
            return Err(error);
        }
        Ok(handle)
    }

    fn connect_socket(
        &self,
        group_cfg: &GroupConfig,
        remote: SocketAddr,
    ) -> Result<SocketHandle, TransportError> {
        let handle = self.acquire_configured_socket(group_cfg, false)?;
        if let Err(error) = self.transport.connect(handle, remote) {
            self.transport.close(handle, true);
            return Err(error);
        }
        Ok(handle)
    }

    fn open_failed(&mut self, group: GroupId, id: ConnectionId, error: TransportError) {
        warn!(connection = %id, %group, %error, "[sa-01] open failed, retrying next tick");
        self.state.stats.open_retries += 1;
        self.effects.push(Effect::Diagnostic(Diagnostic::ResourceExhausted {
            group,
            connection: Some(id),
            error,
        }));
        self.state.events.add(EventKind::StateMachine, id);
    }

    // =========================================================================
    // REMOTE ENDPOINT CHANGES
    // =========================================================================

    /// Re-evaluate the mode after the remote endpoint changed.
    pub(crate) fn on_remote_changed(&mut self, id: ConnectionId) {
        let (_, group_cfg) = self.group_of(id);
        let conn = self.state.conn(id);
        if conn.close_request().is_pending() {
            return;
        }

        if group_cfg.is_udp() {
            if conn.mode() == Mode::Offline {
                return;
            }
            let mode = self.udp_target_mode(id, group_cfg);
            self.set_mode(id, mode);
        } else if group_cfg.is_tcp_client()
            && conn.socket().is_none()
            && conn.wants_online(group_cfg.auto_setup)
        {
            // A client waiting for a concrete peer can connect now.
            self.state.events.add(EventKind::StateMachine, id);
        }
    }
}

fn configure_socket<T: TransportApi>(
    transport: &T,
    handle: SocketHandle,
    group_cfg: &GroupConfig,
    listen: bool,
) -> Result<(), TransportError> {
    for setting in &group_cfg.socket_parameters {
        transport.set_parameter(handle, setting.parameter, setting.value)?;
    }
    transport.bind(handle, group_cfg.local_address)?;
    if listen {
        transport.listen(handle, group_cfg.listen_backlog)?;
    }
    Ok(())
}
