//! # Close-Mode Arbitration
//!
//! Several independent sources can ask a connection to close within one
//! close cycle (upper layer, transport faults, supervision timeouts, remote
//! release). They are merged into the single highest-priority reason.
//!
//! ## Priority
//!
//! ```text
//! None < SocketReconnect < Reconnect < Offline < Socket < OfflineReset
//! ```
//!
//! The derived `Ord` follows declaration order; do not reorder variants.

use super::Mode;

/// Outstanding close reason of a connection, ordered by priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CloseMode {
    #[default]
    None,
    /// Close the socket and come back in RECONNECT.
    SocketReconnect,
    /// Drop the peer and come back in RECONNECT.
    Reconnect,
    /// Upper-layer close, go OFFLINE.
    Offline,
    /// Close the socket and go OFFLINE.
    Socket,
    /// Go OFFLINE and forget the learned remote endpoint and open demand.
    OfflineReset,
}

impl CloseMode {
    /// Merge `requested` into `self`, keeping the higher priority.
    ///
    /// Returns `true` if the stored reason changed.
    pub fn escalate(&mut self, requested: CloseMode) -> bool {
        if requested > *self {
            *self = requested;
            true
        } else {
            false
        }
    }

    /// Mode the connection ends up in once this close is applied.
    ///
    /// Returns `None` for [`CloseMode::None`].
    pub fn post_close_mode(self) -> Option<Mode> {
        match self {
            CloseMode::None => None,
            CloseMode::SocketReconnect | CloseMode::Reconnect => Some(Mode::Reconnect),
            CloseMode::Offline | CloseMode::Socket | CloseMode::OfflineReset => {
                Some(Mode::Offline)
            }
        }
    }

    /// Whether applying this close resets the remote endpoint to its
    /// configured value.
    pub fn resets_remote(self) -> bool {
        matches!(
            self,
            CloseMode::SocketReconnect | CloseMode::Reconnect | CloseMode::OfflineReset
        )
    }

    /// Whether applying this close zeroes the open demand counter.
    pub fn resets_open_demand(self) -> bool {
        matches!(self, CloseMode::OfflineReset)
    }

    /// Whether this close tears down a shared (group) socket even though
    /// the closing connection itself stays in RECONNECT.
    pub fn forces_socket_close(self) -> bool {
        matches!(
            self,
            CloseMode::SocketReconnect | CloseMode::Socket | CloseMode::OfflineReset
        )
    }

    pub fn is_pending(self) -> bool {
        self != CloseMode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [CloseMode; 6] = [
        CloseMode::None,
        CloseMode::SocketReconnect,
        CloseMode::Reconnect,
        CloseMode::Offline,
        CloseMode::Socket,
        CloseMode::OfflineReset,
    ];

    #[test]
    fn test_total_order_matches_declaration() {
        for pair in ALL.windows(2) {
            assert!(pair[0] < pair[1], "{:?} must be below {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_lower_priority_does_not_replace_higher() {
        let mut current = CloseMode::None;
        assert!(current.escalate(CloseMode::Reconnect));
        assert!(!current.escalate(CloseMode::SocketReconnect));
        assert_eq!(current, CloseMode::Reconnect);
    }

    #[test]
    fn test_equal_priority_is_not_a_change() {
        let mut current = CloseMode::Offline;
        assert!(!current.escalate(CloseMode::Offline));
    }

    #[test]
    fn test_post_close_modes() {
        assert_eq!(CloseMode::None.post_close_mode(), None);
        assert_eq!(
            CloseMode::SocketReconnect.post_close_mode(),
            Some(Mode::Reconnect)
        );
        assert_eq!(CloseMode::Reconnect.post_close_mode(), Some(Mode::Reconnect));
        assert_eq!(CloseMode::Offline.post_close_mode(), Some(Mode::Offline));
        assert_eq!(CloseMode::Socket.post_close_mode(), Some(Mode::Offline));
        assert_eq!(CloseMode::OfflineReset.post_close_mode(), Some(Mode::Offline));
    }

    #[test]
    fn test_only_offline_reset_clears_demand() {
        for mode in ALL {
            assert_eq!(mode.resets_open_demand(), mode == CloseMode::OfflineReset);
        }
    }

    fn any_close_mode() -> impl Strategy<Value = CloseMode> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_escalation_is_order_independent(a in any_close_mode(), b in any_close_mode()) {
            let mut ab = CloseMode::None;
            ab.escalate(a);
            ab.escalate(b);

            let mut ba = CloseMode::None;
            ba.escalate(b);
            ba.escalate(a);

            prop_assert_eq!(ab, ba);
            prop_assert_eq!(ab, a.max(b));
        }

        #[test]
        fn prop_escalation_never_lowers(seq in prop::collection::vec(any_close_mode(), 0..16)) {
            let mut current = CloseMode::None;
            for requested in seq {
                let before = current;
                current.escalate(requested);
                prop_assert!(current >= before);
            }
        }
    }
}
