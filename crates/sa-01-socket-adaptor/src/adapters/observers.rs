//! Upper-layer observers and session stand-ins.

use parking_lot::Mutex;

use crate::domain::{ConnectionId, GroupId, LocalAddressState, Mode};
use crate::ports::{LocalAddressObserver, ModeObserver, RxSession, TxSession};

/// Ignores mode changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpModeObserver;

impl ModeObserver for NoOpModeObserver {
    fn on_mode_changed(&self, _connection: ConnectionId, _mode: Mode) {}
}

/// Ignores local address changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLocalAddressObserver;

impl LocalAddressObserver for NoOpLocalAddressObserver {
    fn on_local_address_assignment_changed(&self, _group: GroupId, _state: LocalAddressState) {}
}

/// Tx/Rx unit with nothing to terminate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSession;

impl TxSession for NoOpSession {
    fn terminate(&self, _connection: ConnectionId) {}
}

impl RxSession for NoOpSession {
    fn terminate(&self, _connection: ConnectionId, _graceful: bool) {}
}

/// Records every notification in arrival order.
#[derive(Debug, Default)]
pub struct InMemoryModeRecorder {
    modes: Mutex<Vec<(ConnectionId, Mode)>>,
    local_addresses: Mutex<Vec<(GroupId, LocalAddressState)>>,
}

impl InMemoryModeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All mode changes seen so far.
    pub fn modes(&self) -> Vec<(ConnectionId, Mode)> {
        self.modes.lock().clone()
    }

    /// Mode changes of one connection, in delivery order.
    pub fn modes_of(&self, connection: ConnectionId) -> Vec<Mode> {
        self.modes
            .lock()
            .iter()
            .filter(|(id, _)| *id == connection)
            .map(|(_, mode)| *mode)
            .collect()
    }

    pub fn local_addresses(&self) -> Vec<(GroupId, LocalAddressState)> {
        self.local_addresses.lock().clone()
    }

    pub fn clear(&self) {
        self.modes.lock().clear();
        self.local_addresses.lock().clear();
    }
}

impl ModeObserver for InMemoryModeRecorder {
    fn on_mode_changed(&self, connection: ConnectionId, mode: Mode) {
        self.modes.lock().push((connection, mode));
    }
}

impl LocalAddressObserver for InMemoryModeRecorder {
    fn on_local_address_assignment_changed(&self, group: GroupId, state: LocalAddressState) {
        self.local_addresses.lock().push((group, state));
    }
}

/// Counts Tx/Rx terminations.
#[derive(Debug, Default)]
pub struct RecordingSessions {
    tx: Mutex<Vec<ConnectionId>>,
    rx: Mutex<Vec<(ConnectionId, bool)>>,
}

impl RecordingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tx_terminations(&self) -> Vec<ConnectionId> {
        self.tx.lock().clone()
    }

    pub fn rx_terminations(&self) -> Vec<(ConnectionId, bool)> {
        self.rx.lock().clone()
    }
}

impl TxSession for RecordingSessions {
    fn terminate(&self, connection: ConnectionId) {
        self.tx.lock().push(connection);
    }
}

impl RxSession for RecordingSessions {
    fn terminate(&self, connection: ConnectionId, graceful: bool) {
        self.rx.lock().push((connection, graceful));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_filters_per_connection() {
        let recorder = InMemoryModeRecorder::new();
        recorder.on_mode_changed(ConnectionId::new(0), Mode::Reconnect);
        recorder.on_mode_changed(ConnectionId::new(1), Mode::Online);
        recorder.on_mode_changed(ConnectionId::new(0), Mode::Online);

        assert_eq!(
            recorder.modes_of(ConnectionId::new(0)),
            vec![Mode::Reconnect, Mode::Online]
        );
        recorder.clear();
        assert!(recorder.modes().is_empty());
    }
}
