//! Domain layer: pure connection-management logic, no I/O.

pub mod best_match;
pub mod close_mode;
pub mod connection;
pub mod errors;
pub mod event_queue;
pub mod group;
pub mod mode_queue;
pub mod registry;
pub mod remote_endpoint;
pub mod timeouts;
pub mod types;

pub use best_match::{
    match_priority, select_best_match, BestMatchCandidates, CandidateFilter, MatchPriority,
};
pub use close_mode::CloseMode;
pub use connection::{ConnectionState, ReleaseCheck};
pub use errors::{ErrorClass, SocketAdaptorError, SocketAdaptorResult};
pub use event_queue::{EventKind, EventQueue};
pub use group::GroupState;
pub use mode_queue::{ModeChangeQueue, ModePush};
pub use remote_endpoint::{AxisState, EndpointClass, RemoteEndpoint, PORT_ANY};
pub use timeouts::TimeoutList;
pub use types::*;
