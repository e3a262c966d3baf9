//! Deferred work for the next periodic tick.
//!
//! Entries are de-duplicated per `(kind, connection)`: scheduling the same
//! work twice before the tick drains it runs it once.

use std::collections::VecDeque;

use super::ConnectionId;

/// Kind of deferred work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Re-run the lifecycle state machine (close then open).
    StateMachine,
    /// Retry the second release phase.
    Release,
    /// Deliver mode changes queued during a re-entrant transition.
    ModeDelivery,
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: VecDeque<(EventKind, ConnectionId)>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` for `connection`. Returns `false` if it was already
    /// pending.
    pub fn add(&mut self, kind: EventKind, connection: ConnectionId) -> bool {
        if self.contains(kind, connection) {
            return false;
        }
        self.pending.push_back((kind, connection));
        true
    }

    pub fn contains(&self, kind: EventKind, connection: ConnectionId) -> bool {
        self.pending.contains(&(kind, connection))
    }

    /// Take everything scheduled so far. Work added while the snapshot is
    /// being processed waits for the following tick.
    pub fn take_pending(&mut self) -> Vec<(EventKind, ConnectionId)> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let mut queue = EventQueue::new();
        let id = ConnectionId::new(1);
        assert!(queue.add(EventKind::StateMachine, id));
        assert!(!queue.add(EventKind::StateMachine, id));
        assert!(queue.add(EventKind::Release, id));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_take_pending_preserves_order_and_empties() {
        let mut queue = EventQueue::new();
        queue.add(EventKind::Release, ConnectionId::new(2));
        queue.add(EventKind::StateMachine, ConnectionId::new(0));

        assert_eq!(
            queue.take_pending(),
            vec![
                (EventKind::Release, ConnectionId::new(2)),
                (EventKind::StateMachine, ConnectionId::new(0)),
            ]
        );
        assert!(queue.is_empty());
        assert!(queue.add(EventKind::Release, ConnectionId::new(2)));
    }
}
