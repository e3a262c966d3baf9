//! # Socket Adaptor
//!
//! Connection management between upper-layer protocol modules and a
//! TCP/UDP transport stack. A fixed, statically configured set of logical
//! connections is mapped onto a small pool of transport sockets: UDP
//! connections of a group share one socket, TCP server connections share
//! one listen socket, TCP client connections own their socket.
//!
//! ## Responsibilities
//!
//! - Connection lifecycle: OFFLINE / RECONNECT / ONLINE, driven by open and
//!   close requests, transport events and the periodic `main_function`.
//! - Remote endpoint registry with wildcard learning, two-phase release
//!   and unique assignment.
//! - Best-match dispatch of inbound datagrams and TCP connections.
//! - Auto-connect and UDP alive supervision timeouts.
//! - Ordered, overflow-tolerant mode change notification.
//!
//! ## Architecture
//!
//! - **Domain Layer:** state records, the close-mode lattice, best-match
//!   selection, event and timeout queues. No I/O.
//! - **Ports Layer:** `SocketAdaptorApi` and `TransportEventHandler`
//!   (driving), `TransportApi` and the upper-layer callbacks (driven).
//! - **Service Layer:** `SocketAdaptorService`, one critical section around
//!   all dynamic state.
//! - **Adapters Layer:** default observers and diagnostic sinks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sa_01_socket_adaptor::*;
//!
//! let mut config = SocketAdaptorConfig::new();
//! let group = config.add_group(GroupConfig::udp("192.168.0.10:30490".parse()?));
//! let conn = config.add_connection(
//!     ConnectionConfig::new(group).with_remote("192.168.0.20:30490".parse()?),
//! );
//!
//! let service = SocketAdaptorService::new(config, Arc::new(transport))?;
//! service.init();
//! service.on_local_address_assignment(group, LocalAddressState::Assigned);
//! service.request_open(conn)?;
//! service.main_function();
//! assert_eq!(service.get_mode(conn)?, Mode::Online);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (MockTransport).
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    AcceptDecision, AddressDomain, CloseMode, ConnectionId, ErrorClass, GroupId,
    LocalAddressState, Mode, ReleaseState, RemoteEndpoint, SocketAdaptorError,
    SocketAdaptorResult, SocketEventKind, SocketHandle, SocketParameter, SocketState,
    TransportKind,
};

// Domain services
pub use domain::{match_priority, select_best_match, CandidateFilter, MatchPriority};

// Configuration
pub use config::{
    ConfigError, ConnectionConfig, GroupConfig, SocketAdaptorConfig, SocketParameterSetting,
};

// Port traits
pub use ports::{
    Diagnostic, DiagnosticSink, LocalAddressObserver, ModeObserver, RxSession,
    SocketAdaptorApi, TransportApi, TransportError, TransportEventHandler, TxSession,
};

// Service
pub use service::{AdaptorStats, ConnectionSnapshot, SocketAdaptorService};

// Adapters
pub use adapters::{
    CollectingDiagnostics, InMemoryModeRecorder, NoOpLocalAddressObserver, NoOpModeObserver,
    NoOpSession, RecordingSessions, TracingDiagnostics,
};

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{MockTransport, TransportCall};
