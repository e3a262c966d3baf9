//! Error types for the socket adaptor.
//!
//! Only request-surface errors are returned to callers. Transport faults are
//! absorbed by the lifecycle state machine and surface as mode changes plus
//! a diagnostic.

use thiserror::Error;

use super::{AddressDomain, ConnectionId, GroupId};

/// Errors returned by the public request surface.
///
/// A failed request never mutates connection state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketAdaptorError {
    /// Request issued before `init()`.
    #[error("socket adaptor not initialized")]
    NotInitialized,

    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    #[error("unknown group: {0}")]
    UnknownGroup(GroupId),

    /// Remote address family differs from the group's local address.
    #[error("address domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch {
        expected: AddressDomain,
        actual: AddressDomain,
    },

    /// Explicit open/close on a connection opened by automatic setup.
    #[error("connection {0} is managed by automatic setup")]
    AutoSetupManaged(ConnectionId),

    /// TCP remote endpoint cannot change while a socket is in use.
    #[error("remote address of {0} is locked while the connection is not offline")]
    RemoteAddressLocked(ConnectionId),
}

impl SocketAdaptorError {
    /// Taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            SocketAdaptorError::NotInitialized => ErrorClass::NotInitialized,
            _ => ErrorClass::InvalidArgument,
        }
    }
}

/// Error taxonomy used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidArgument,
    NotInitialized,
    ResourceExhaustion,
    QueueOverflow,
}

/// Result type for request-surface operations.
pub type SocketAdaptorResult<T> = Result<T, SocketAdaptorError>;
