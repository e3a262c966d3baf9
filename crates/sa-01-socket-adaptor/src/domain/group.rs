//! Dynamic state of a connection group.

use super::{LocalAddressState, SocketHandle, SocketState};

/// Shared socket and local address state of one group.
///
/// The shared socket is the UDP socket of a UDP group or the listen socket
/// of a TCP server group. TCP client groups never use it.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    socket: Option<SocketHandle>,
    socket_state: SocketState,
    local_address: LocalAddressState,
}

impl GroupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn socket(&self) -> Option<SocketHandle> {
        self.socket
    }

    pub fn socket_state(&self) -> SocketState {
        self.socket_state
    }

    pub fn local_address(&self) -> LocalAddressState {
        self.local_address
    }

    pub fn is_local_address_assigned(&self) -> bool {
        self.local_address == LocalAddressState::Assigned
    }

    /// Returns `true` if the state changed.
    pub(crate) fn set_local_address(&mut self, state: LocalAddressState) -> bool {
        let changed = self.local_address != state;
        self.local_address = state;
        changed
    }

    pub(crate) fn attach_socket(&mut self, handle: SocketHandle, state: SocketState) {
        self.socket = Some(handle);
        self.socket_state = state;
    }

    pub(crate) fn detach_socket(&mut self) -> Option<SocketHandle> {
        self.socket_state = SocketState::Closed;
        self.socket.take()
    }

    /// Whether `handle` is this group's shared socket.
    pub fn owns(&self, handle: SocketHandle) -> bool {
        self.socket == Some(handle)
    }
}
