//! Test utilities for the socket adaptor.
//!
//! [`MockTransport`] records every transport request and can be told to
//! fail the next N calls of a kind. Enable with the `test-utils` feature.
//!
//! # Example
//!
//! ```rust
//! use sa_01_socket_adaptor::test_utils::{MockTransport, TransportCall};
//! use sa_01_socket_adaptor::{AddressDomain, TransportApi, TransportKind};
//!
//! let transport = MockTransport::new();
//! transport.fail_next_acquire(1);
//! assert!(transport.acquire_socket(AddressDomain::Inet, TransportKind::Udp).is_err());
//!
//! let handle = transport
//!     .acquire_socket(AddressDomain::Inet, TransportKind::Udp)
//!     .unwrap();
//! assert_eq!(transport.open_sockets(), vec![handle]);
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::domain::{AddressDomain, SocketHandle, SocketParameter, TransportKind};
use crate::ports::{TransportApi, TransportError};

/// One request made to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Acquire {
        handle: SocketHandle,
        domain: AddressDomain,
        kind: TransportKind,
    },
    SetParameter {
        handle: SocketHandle,
        parameter: SocketParameter,
        value: u32,
    },
    Bind {
        handle: SocketHandle,
        local: SocketAddr,
    },
    Listen {
        handle: SocketHandle,
        backlog: u16,
    },
    Connect {
        handle: SocketHandle,
        remote: SocketAddr,
    },
    Close {
        handle: SocketHandle,
        abort: bool,
    },
}

#[derive(Debug, Default)]
struct InjectedFailures {
    acquire: u32,
    parameter: u32,
    bind: u32,
    listen: u32,
    connect: u32,
}

fn take_failure(counter: &mut u32) -> bool {
    if *counter == 0 {
        return false;
    }
    *counter -= 1;
    true
}

/// Recording transport with injectable failures.
#[derive(Debug)]
pub struct MockTransport {
    next_handle: AtomicU32,
    calls: Mutex<Vec<TransportCall>>,
    open: Mutex<HashSet<SocketHandle>>,
    failures: Mutex<InjectedFailures>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU32::new(1),
            calls: Mutex::new(Vec::new()),
            open: Mutex::new(HashSet::new()),
            failures: Mutex::new(InjectedFailures::default()),
        }
    }

    /// Hand out a fresh handle, e.g. for a socket produced by accept.
    pub fn allocate_handle(&self) -> SocketHandle {
        let handle = SocketHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.open.lock().insert(handle);
        handle
    }

    pub fn fail_next_acquire(&self, count: u32) {
        self.failures.lock().acquire = count;
    }

    pub fn fail_next_parameter(&self, count: u32) {
        self.failures.lock().parameter = count;
    }

    pub fn fail_next_bind(&self, count: u32) {
        self.failures.lock().bind = count;
    }

    pub fn fail_next_listen(&self, count: u32) {
        self.failures.lock().listen = count;
    }

    pub fn fail_next_connect(&self, count: u32) {
        self.failures.lock().connect = count;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Handles acquired (or allocated) and not yet closed, in handle order.
    pub fn open_sockets(&self) -> Vec<SocketHandle> {
        let mut handles: Vec<SocketHandle> = self.open.lock().iter().copied().collect();
        handles.sort_by_key(|h| h.0);
        handles
    }

    pub fn last_acquired(&self) -> Option<SocketHandle> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            TransportCall::Acquire { handle, .. } => Some(*handle),
            _ => None,
        })
    }

    pub fn connects(&self) -> Vec<(SocketHandle, SocketAddr)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::Connect { handle, remote } => Some((*handle, *remote)),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<(SocketHandle, bool)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::Close { handle, abort } => Some((*handle, *abort)),
                _ => None,
            })
            .collect()
    }

    pub fn acquire_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, TransportCall::Acquire { .. }))
            .count()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().push(call);
    }
}

impl TransportApi for MockTransport {
    fn acquire_socket(
        &self,
        domain: AddressDomain,
        kind: TransportKind,
    ) -> Result<SocketHandle, TransportError> {
        if take_failure(&mut self.failures.lock().acquire) {
            return Err(TransportError::NoSocketAvailable { domain, kind });
        }
        let handle = self.allocate_handle();
        self.record(TransportCall::Acquire {
            handle,
            domain,
            kind,
        });
        Ok(handle)
    }

    fn set_parameter(
        &self,
        handle: SocketHandle,
        parameter: SocketParameter,
        value: u32,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::SetParameter {
            handle,
            parameter,
            value,
        });
        if take_failure(&mut self.failures.lock().parameter) {
            return Err(TransportError::ParameterRejected { handle, parameter });
        }
        Ok(())
    }

    fn bind(&self, handle: SocketHandle, local: SocketAddr) -> Result<(), TransportError> {
        self.record(TransportCall::Bind { handle, local });
        if take_failure(&mut self.failures.lock().bind) {
            return Err(TransportError::BindFailed {
                handle,
                addr: local,
            });
        }
        Ok(())
    }

    fn listen(&self, handle: SocketHandle, backlog: u16) -> Result<(), TransportError> {
        self.record(TransportCall::Listen { handle, backlog });
        if take_failure(&mut self.failures.lock().listen) {
            return Err(TransportError::ListenFailed(handle));
        }
        Ok(())
    }

    fn connect(&self, handle: SocketHandle, remote: SocketAddr) -> Result<(), TransportError> {
        self.record(TransportCall::Connect { handle, remote });
        if take_failure(&mut self.failures.lock().connect) {
            return Err(TransportError::ConnectFailed {
                handle,
                addr: remote,
            });
        }
        Ok(())
    }

    fn close(&self, handle: SocketHandle, abort: bool) {
        self.open.lock().remove(&handle);
        self.record(TransportCall::Close { handle, abort });
    }
}
