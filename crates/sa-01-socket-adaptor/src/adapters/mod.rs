//! # Adapters Layer
//!
//! Implementations of the outbound ports that ship with the crate: the
//! default logging diagnostic sink, no-op observers used when nothing is
//! registered, and in-memory recorders for embedding applications and tests.

mod diagnostics;
mod observers;

pub use diagnostics::{CollectingDiagnostics, TracingDiagnostics};
pub use observers::{
    InMemoryModeRecorder, NoOpLocalAddressObserver, NoOpModeObserver, NoOpSession,
    RecordingSessions,
};
