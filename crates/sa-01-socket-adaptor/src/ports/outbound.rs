//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Collaborators the socket adaptor calls into. Every method is
//! non-blocking. Asynchronous outcomes of transport requests come back
//! through [`crate::ports::TransportEventHandler`].
//!
//! ## Re-entrancy
//!
//! [`TransportApi`] is invoked while the adaptor's state lock is held, so an
//! implementation must never call back into the adaptor synchronously;
//! outcomes are reported later from the transport's own context. Observers
//! and sessions are always invoked with the lock released and may call back
//! freely.

use std::net::SocketAddr;

use thiserror::Error;

use crate::domain::{
    AddressDomain, ConnectionId, ErrorClass, GroupId, LocalAddressState, Mode,
    SocketAdaptorError, SocketHandle, SocketParameter, TransportKind,
};

/// Failure reported synchronously by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no {kind:?} socket available for {domain}")]
    NoSocketAvailable {
        domain: AddressDomain,
        kind: TransportKind,
    },

    #[error("bind of {handle} to {addr} failed")]
    BindFailed { handle: SocketHandle, addr: SocketAddr },

    #[error("listen on {0} failed")]
    ListenFailed(SocketHandle),

    #[error("connect of {handle} to {addr} failed")]
    ConnectFailed { handle: SocketHandle, addr: SocketAddr },

    #[error("parameter {parameter:?} rejected on {handle}")]
    ParameterRejected {
        handle: SocketHandle,
        parameter: SocketParameter,
    },
}

/// Transport API.
///
/// Every method is called with the adaptor's state lock held, and that lock
/// is not reentrant. An implementation must never call back into the
/// adaptor (`on_connected`, `on_socket_event`, ...) from inside one of these
/// methods; doing so deadlocks. Report outcomes later from the transport's
/// own context, even when they are known immediately.
pub trait TransportApi: Send + Sync {
    fn acquire_socket(
        &self,
        domain: AddressDomain,
        kind: TransportKind,
    ) -> Result<SocketHandle, TransportError>;

    fn set_parameter(
        &self,
        handle: SocketHandle,
        parameter: SocketParameter,
        value: u32,
    ) -> Result<(), TransportError>;

    fn bind(&self, handle: SocketHandle, local: SocketAddr) -> Result<(), TransportError>;

    fn listen(&self, handle: SocketHandle, backlog: u16) -> Result<(), TransportError>;

    /// Start an asynchronous connect; completion arrives as `on_connected`.
    fn connect(&self, handle: SocketHandle, remote: SocketAddr) -> Result<(), TransportError>;

    /// Close a socket. TCP closes complete asynchronously with a
    /// `Closed`/`Reset` socket event.
    fn close(&self, handle: SocketHandle, abort: bool);
}

/// Upper-layer consumer of mode transitions.
pub trait ModeObserver: Send + Sync {
    /// Called once per transition, in order, never concurrently for the same
    /// connection.
    fn on_mode_changed(&self, connection: ConnectionId, mode: Mode);
}

/// Upper-layer consumer of local address assignment changes.
pub trait LocalAddressObserver: Send + Sync {
    fn on_local_address_assignment_changed(&self, group: GroupId, state: LocalAddressState);
}

/// Transmit unit.
pub trait TxSession: Send + Sync {
    /// Abandon any transmission in progress on `connection`.
    fn terminate(&self, connection: ConnectionId);
}

/// Receive unit.
pub trait RxSession: Send + Sync {
    /// Abandon reception on `connection`; `graceful` lets buffered data be
    /// delivered first.
    fn terminate(&self, connection: ConnectionId, graceful: bool);
}

/// Non-fatal conditions for the diagnostic stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A request-surface call was rejected.
    ApiRejected {
        api: &'static str,
        error: SocketAdaptorError,
    },
    /// An open attempt failed and will be retried next tick.
    ResourceExhausted {
        group: GroupId,
        connection: Option<ConnectionId>,
        error: TransportError,
    },
    /// A mode transition overwrote the newest pending notification.
    ModeQueueOverflow { connection: ConnectionId },
}

impl Diagnostic {
    pub fn class(&self) -> ErrorClass {
        match self {
            Diagnostic::ApiRejected { error, .. } => error.class(),
            Diagnostic::ResourceExhausted { .. } => ErrorClass::ResourceExhaustion,
            Diagnostic::ModeQueueOverflow { .. } => ErrorClass::QueueOverflow,
        }
    }
}

/// Diagnostic/error reporting collaborator.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}
