//! # Remote Endpoint Registry
//!
//! Write policies over a connection's remote endpoint. Reads go through
//! [`ConnectionState::remote`]; every write goes through one of these
//! functions so the domain rules hold in one place.
//!
//! | policy              | used by                                   |
//! |---------------------|-------------------------------------------|
//! | [`overwrite`]       | accepted TCP connection, explicit set     |
//! | [`overwrite_if_wildcard`] | open on first datagram              |
//! | unique assignment   | `set_unique_remote_address` (service)     |
//!
//! Unique assignment needs the Best-Match Selector and the lifecycle, so it
//! is composed in the service layer on top of [`overwrite`].

use std::net::SocketAddr;

use super::{AddressDomain, ConnectionState, SocketAdaptorError, SocketAdaptorResult};

/// Check that `addr` belongs to `expected` (the group's local domain).
pub fn check_domain(expected: AddressDomain, addr: &SocketAddr) -> SocketAdaptorResult<()> {
    let actual = AddressDomain::of(&addr.ip());
    if actual != expected {
        return Err(SocketAdaptorError::DomainMismatch { expected, actual });
    }
    Ok(())
}

/// Unconditional overwrite.
///
/// Fails only on a domain mismatch, in which case the endpoint is untouched.
pub fn overwrite(
    conn: &mut ConnectionState,
    group_domain: AddressDomain,
    addr: SocketAddr,
) -> SocketAdaptorResult<()> {
    check_domain(group_domain, &addr)?;
    conn.remote_mut().store(addr);
    Ok(())
}

/// Wildcard-gated overwrite.
///
/// Proceeds only while the current endpoint still has a wildcard or unset
/// axis, and only with a concrete `addr` unless `allow_wildcard` is given.
/// Returns `true` if the endpoint was written.
pub fn overwrite_if_wildcard(
    conn: &mut ConnectionState,
    group_domain: AddressDomain,
    addr: SocketAddr,
    allow_wildcard: bool,
) -> bool {
    if conn.remote().is_fully_set() {
        return false;
    }
    if !allow_wildcard && (addr.ip().is_unspecified() || addr.port() == 0) {
        return false;
    }
    if check_domain(group_domain, &addr).is_err() {
        return false;
    }
    conn.remote_mut().store(addr);
    true
}
