//! # Connection State
//!
//! Dynamic state of one configured connection. The static part (group,
//! transport, configured remote) lives in the read-only configuration; this
//! struct holds only what changes at run time and is always accessed under
//! the service's state lock.
//!
//! Transfer activity (`txActive` / `rxActive`) is not stored here: it is
//! written by the Tx/Rx units from outside the lock and lives in atomics
//! owned by the service.

use super::{
    CloseMode, ConnectionId, GroupId, Mode, ModeChangeQueue, ReleaseState, RemoteEndpoint,
    SocketHandle, SocketState,
};

/// Result of the first release phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseCheck {
    /// Remote endpoint already equals the configured one.
    NoOp,
    /// Release recorded; apply it with the second phase.
    Pending(ReleaseState),
}

#[derive(Debug, Clone)]
pub struct ConnectionState {
    id: ConnectionId,
    group: GroupId,
    mode: Mode,
    close_request: CloseMode,
    open_demand: u16,
    abort: bool,
    timeout_latched: bool,
    release: ReleaseState,
    remote: RemoteEndpoint,
    configured_remote: RemoteEndpoint,
    socket: Option<SocketHandle>,
    socket_state: SocketState,
    mode_queue: ModeChangeQueue,
}

impl ConnectionState {
    pub fn new(
        id: ConnectionId,
        group: GroupId,
        configured_remote: RemoteEndpoint,
        mode_queue_capacity: usize,
    ) -> Self {
        Self {
            id,
            group,
            mode: Mode::Offline,
            close_request: CloseMode::None,
            open_demand: 0,
            abort: false,
            timeout_latched: false,
            release: ReleaseState::None,
            remote: configured_remote,
            configured_remote,
            socket: None,
            socket_state: SocketState::Closed,
            mode_queue: ModeChangeQueue::new(mode_queue_capacity),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Overwrite the mode. Notification is the caller's job.
    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    // -------------------------------------------------------------------------
    // Open / close demand
    // -------------------------------------------------------------------------

    pub fn open_demand(&self) -> u16 {
        self.open_demand
    }

    pub fn request_open(&mut self) {
        self.open_demand = self.open_demand.saturating_add(1);
    }

    /// Balance one open request. Returns the remaining demand.
    pub fn withdraw_open(&mut self) -> u16 {
        self.open_demand = self.open_demand.saturating_sub(1);
        self.open_demand
    }

    pub fn reset_open_demand(&mut self) {
        self.open_demand = 0;
    }

    pub fn close_request(&self) -> CloseMode {
        self.close_request
    }

    /// Record a close reason; lower-priority reasons are ignored.
    ///
    /// Returns `true` if the outstanding reason changed.
    pub fn request_close(&mut self, reason: CloseMode) -> bool {
        self.close_request.escalate(reason)
    }

    /// Mode the pending close leads to, if a close is outstanding.
    pub fn post_close_mode(&self) -> Option<Mode> {
        self.close_request.post_close_mode()
    }

    /// End the close cycle.
    pub(crate) fn clear_close_request(&mut self) {
        self.close_request = CloseMode::None;
        self.abort = false;
    }

    pub fn abort_requested(&self) -> bool {
        self.abort
    }

    pub fn request_abort(&mut self) {
        self.abort = true;
    }

    pub fn timeout_latched(&self) -> bool {
        self.timeout_latched
    }

    /// Latch an unrecoverable connect timeout. Sticky until re-init.
    pub fn latch_timeout(&mut self) {
        self.timeout_latched = true;
    }

    /// Whether the connection should be brought up.
    pub fn wants_online(&self, auto_setup: bool) -> bool {
        self.open_demand > 0 || (auto_setup && !self.timeout_latched)
    }

    // -------------------------------------------------------------------------
    // Remote endpoint
    // -------------------------------------------------------------------------

    pub fn remote(&self) -> &RemoteEndpoint {
        &self.remote
    }

    pub fn configured_remote(&self) -> &RemoteEndpoint {
        &self.configured_remote
    }

    pub(crate) fn remote_mut(&mut self) -> &mut RemoteEndpoint {
        &mut self.remote
    }

    pub fn reset_remote(&mut self) {
        self.remote = self.configured_remote;
    }

    pub fn release_state(&self) -> ReleaseState {
        self.release
    }

    pub(crate) fn clear_release(&mut self) {
        self.release = ReleaseState::None;
    }

    /// First phase of the release protocol.
    ///
    /// A pending forced release is never downgraded by a plain one.
    pub fn check_release(&mut self, force: bool) -> ReleaseCheck {
        if self.remote == self.configured_remote {
            return ReleaseCheck::NoOp;
        }
        self.release = if force || self.release == ReleaseState::ReleaseForce {
            ReleaseState::ReleaseForce
        } else {
            ReleaseState::Release
        };
        ReleaseCheck::Pending(self.release)
    }

    // -------------------------------------------------------------------------
    // Socket
    // -------------------------------------------------------------------------

    pub fn socket(&self) -> Option<SocketHandle> {
        self.socket
    }

    pub fn socket_state(&self) -> SocketState {
        self.socket_state
    }

    pub(crate) fn attach_socket(&mut self, handle: SocketHandle, state: SocketState) {
        self.socket = Some(handle);
        self.socket_state = state;
    }

    pub(crate) fn set_socket_state(&mut self, state: SocketState) {
        self.socket_state = state;
    }

    pub(crate) fn detach_socket(&mut self) -> Option<SocketHandle> {
        self.socket_state = SocketState::Closed;
        self.socket.take()
    }

    pub(crate) fn mode_queue_mut(&mut self) -> &mut ModeChangeQueue {
        &mut self.mode_queue
    }

    pub fn mode_queue(&self) -> &ModeChangeQueue {
        &self.mode_queue
    }
}
