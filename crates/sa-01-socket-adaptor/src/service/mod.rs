//! # Socket Adaptor Service
//!
//! Implements the `SocketAdaptorApi` and `TransportEventHandler` ports on
//! top of the domain layer, plus the periodic `main_function` tick.
//!
//! ## Critical section
//!
//! All dynamic state sits behind one `parking_lot::Mutex`. Each request,
//! transport event and tick takes it once, collects the callbacks it owes
//! the upper layers, releases it, and only then invokes them. Multi-step
//! sequences (best-match selection followed by the endpoint write) run
//! entirely inside one section.

mod api;
mod core;
mod events;
mod lifecycle;
mod maintenance;
mod release;

pub use self::core::{AdaptorStats, ConnectionSnapshot, SocketAdaptorService};
