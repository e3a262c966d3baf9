//! Driving Ports (API - Inbound)
//!
//! Two entry surfaces: the request API used by upper layers, and the event
//! handler the transport layer reports into. Both may be called from the
//! periodic task and from transport callback contexts.

use std::net::SocketAddr;

use crate::domain::{
    AcceptDecision, ConnectionId, GroupId, LocalAddressState, Mode, RemoteEndpoint,
    SocketAdaptorResult, SocketEventKind, SocketHandle,
};

/// Public request surface.
///
/// Every method fails with `NotInitialized` before `init()`. A failed
/// request is reported to the diagnostic sink and leaves all state as it
/// was.
pub trait SocketAdaptorApi: Send + Sync {
    /// Ask for the connection to be brought up. Requests are counted and
    /// balanced against [`SocketAdaptorApi::request_close`].
    fn request_open(&self, connection: ConnectionId) -> SocketAdaptorResult<()>;

    /// Withdraw one open request, or tear down immediately with `abort`.
    fn request_close(&self, connection: ConnectionId, abort: bool) -> SocketAdaptorResult<()>;

    /// Replace the remote endpoint unconditionally.
    fn set_remote_address(
        &self,
        connection: ConnectionId,
        addr: SocketAddr,
    ) -> SocketAdaptorResult<()>;

    /// Assign `addr` to exactly one connection of `group`.
    ///
    /// Returns the connection already holding `addr`, or the best-matching
    /// RECONNECT connection it was assigned to. `Ok(None)` means no
    /// connection could take it.
    fn set_unique_remote_address(
        &self,
        group: GroupId,
        addr: SocketAddr,
    ) -> SocketAdaptorResult<Option<ConnectionId>>;

    /// Request the remote endpoint to fall back to its configured value.
    ///
    /// Applied immediately when possible, otherwise deferred until the
    /// connection stops transferring.
    fn release_remote_address(
        &self,
        connection: ConnectionId,
        force: bool,
    ) -> SocketAdaptorResult<()>;

    fn get_mode(&self, connection: ConnectionId) -> SocketAdaptorResult<Mode>;

    fn get_remote_address(&self, connection: ConnectionId) -> SocketAdaptorResult<RemoteEndpoint>;
}

/// Inbound transport events.
pub trait TransportEventHandler: Send + Sync {
    /// A TCP listen socket accepted a connection from `remote`.
    fn on_accepted(
        &self,
        listen: SocketHandle,
        accepted: SocketHandle,
        remote: SocketAddr,
    ) -> AcceptDecision;

    /// An asynchronous connect completed.
    fn on_connected(&self, handle: SocketHandle);

    fn on_socket_event(&self, handle: SocketHandle, kind: SocketEventKind);

    /// Resolve which connection owns a datagram from `remote` before its
    /// payload is copied. `None` drops the datagram.
    fn on_datagram_metadata(&self, handle: SocketHandle, remote: SocketAddr)
        -> Option<ConnectionId>;

    fn on_local_address_assignment(&self, group: GroupId, state: LocalAddressState);
}
