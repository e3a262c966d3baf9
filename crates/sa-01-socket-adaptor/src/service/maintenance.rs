use tracing::{info, warn};

use crate::domain::{CloseMode, ConnectionId, EventKind, Mode, SocketState};
use crate::ports::TransportApi;
use crate::service::core::{Effect, SocketAdaptorService};
use crate::service::lifecycle::Lifecycle;

impl<T: TransportApi> SocketAdaptorService<T> {
    /// Periodic tick.
    ///
    /// Advances the tick counter, fires expired supervision timeouts and
    /// runs the deferred work queued before this tick started. Work queued
    /// while the tick runs waits for the next one.
    pub fn main_function(&self) {
        let mut effects = Vec::new();
        {
            let mut state = self.state.lock();
            if !state.initialized {
                return;
            }
            state.tick += 1;
            let now = state.tick;
            let pending = state.events.take_pending();

            let mut lifecycle = self.lifecycle(&mut state, &mut effects);
            lifecycle.check_timeouts(now);
            for (kind, id) in pending {
                match kind {
                    EventKind::StateMachine => lifecycle.process_state_machine(id),
                    EventKind::Release => lifecycle.handle_release(id),
                    EventKind::ModeDelivery => lifecycle.effects.push(Effect::DeliverModes(id)),
                }
            }
        }
        self.flush(effects);
    }
}

impl<'a, T: TransportApi> Lifecycle<'a, T> {
    fn check_timeouts(&mut self, now: u64) {
        for id in self.state.auto_connect.check_elements(now) {
            self.auto_connect_expired(id);
        }
        for id in self.state.alive.check_elements(now) {
            self.alive_expired(id);
        }
    }

    /// One-shot: latch, go OFFLINE, no further automatic opens.
    fn auto_connect_expired(&mut self, id: ConnectionId) {
        if self.state.conn(id).socket_state() == SocketState::Established {
            return;
        }
        self.state.stats.timeouts_fired += 1;
        warn!(connection = %id, "[sa-01] auto-connect timeout, giving up");

        let conn = self.state.conn_mut(id);
        conn.latch_timeout();
        conn.reset_open_demand();
        self.request_close(id, CloseMode::Offline);
        self.process_state_machine(id);
    }

    /// No datagram within the supervision window.
    fn alive_expired(&mut self, id: ConnectionId) {
        if self.state.conn(id).mode() != Mode::Online {
            return;
        }
        self.state.stats.timeouts_fired += 1;
        let (_, group_cfg) = self.group_of(id);

        if group_cfg.keep_online {
            if !self.is_transferring(id) {
                self.state.conn_mut(id).reset_remote();
                info!(connection = %id, "[sa-01] alive timeout, learned remote dropped");
            }
            return;
        }
        info!(connection = %id, "[sa-01] alive timeout, reconnecting");
        self.request_close(id, CloseMode::Reconnect);
        self.process_state_machine(id);
    }
}
