//! # Socket Adaptor Test Suite
//!
//! End-to-end scenarios driven only through the public surface of
//! `sa-01-socket-adaptor`: the request API, the transport event handler and
//! the periodic tick, with `MockTransport` standing in for the TCP/IP stack.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── scenarios.rs    # TCP client, TCP server demux, UDP learning, release
//! │   ├── configuration.rs# TOML-defined systems
//! │   └── concurrency.rs  # Transport callbacks racing the periodic task
//! └── benches/
//!     └── dispatch_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sa-tests
//!
//! # By category
//! cargo test -p sa-tests integration::scenarios
//!
//! # Benchmarks
//! cargo bench -p sa-tests
//! ```

#![allow(dead_code)]

pub mod integration;
