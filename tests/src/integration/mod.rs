//! # End-to-End Scenarios
//!
//! Each module drives a complete `SocketAdaptorService` through its public
//! ports. The transport is the crate's `MockTransport`; upper layers are the
//! in-memory recorders from the adapters layer.

#[cfg(test)]
mod fixtures;

mod concurrency;
mod configuration;
mod scenarios;
