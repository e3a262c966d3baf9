//! Tick-based supervision deadlines.
//!
//! There is no timer callback. A deadline is recorded against the
//! monotonically advancing tick counter and found by scanning on each tick.

use super::ConnectionId;

/// At most one deadline per connection, indexed by connection.
#[derive(Debug, Clone)]
pub struct TimeoutList {
    deadlines: Vec<Option<u64>>,
}

impl TimeoutList {
    pub fn new(connections: usize) -> Self {
        Self {
            deadlines: vec![None; connections],
        }
    }

    /// Arm (or re-arm) the deadline of `connection`.
    pub fn set_element(&mut self, connection: ConnectionId, deadline: u64) {
        if let Some(slot) = self.deadlines.get_mut(connection.index()) {
            *slot = Some(deadline);
        }
    }

    /// Disarm. Returns `true` if a deadline was armed.
    pub fn remove_element(&mut self, connection: ConnectionId) -> bool {
        self.deadlines
            .get_mut(connection.index())
            .and_then(Option::take)
            .is_some()
    }

    pub fn current_timeout(&self, connection: ConnectionId) -> Option<u64> {
        self.deadlines.get(connection.index()).copied().flatten()
    }

    pub fn is_armed(&self, connection: ConnectionId) -> bool {
        self.current_timeout(connection).is_some()
    }

    /// Remove and return every connection whose deadline is at or before
    /// `now`, in index order.
    pub fn check_elements(&mut self, now: u64) -> Vec<ConnectionId> {
        let mut expired = Vec::new();
        for (index, slot) in self.deadlines.iter_mut().enumerate() {
            if matches!(slot, Some(deadline) if *deadline <= now) {
                *slot = None;
                // Index fits: the list is sized from u16 connection ids.
                expired.push(ConnectionId::new(index as u16));
            }
        }
        expired
    }

    pub fn clear(&mut self) {
        self.deadlines.iter_mut().for_each(|slot| *slot = None);
    }
}
