use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::adapters::{NoOpLocalAddressObserver, NoOpModeObserver, NoOpSession, TracingDiagnostics};
use crate::config::{ConfigError, SocketAdaptorConfig};
use crate::domain::{
    BestMatchCandidates, CloseMode, ConnectionId, ConnectionState, EventQueue,
    GroupId, GroupState, LocalAddressState, Mode, ReleaseState, RemoteEndpoint,
    SocketAdaptorError, SocketAdaptorResult, SocketState, TimeoutList,
};
use crate::ports::{
    Diagnostic, DiagnosticSink, LocalAddressObserver, ModeObserver, RxSession, TransportApi,
    TxSession,
};

use super::lifecycle::Lifecycle;

/// In-flight transfer flags, written by the Tx/Rx units without the lock.
#[derive(Debug, Default)]
pub(crate) struct TransferActivity {
    pub(crate) tx: AtomicBool,
    pub(crate) rx: AtomicBool,
}

impl TransferActivity {
    pub(crate) fn is_active(&self) -> bool {
        self.tx.load(Ordering::Acquire) || self.rx.load(Ordering::Acquire)
    }
}

/// Counters since the last `init()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdaptorStats {
    pub accepted_connections: u64,
    pub rejected_connections: u64,
    pub datagrams_accepted: u64,
    pub datagrams_dropped: u64,
    pub open_retries: u64,
    pub mode_queue_overflows: u64,
    pub timeouts_fired: u64,
}

/// Point-in-time view of one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub id: ConnectionId,
    pub group: GroupId,
    pub mode: Mode,
    pub remote: RemoteEndpoint,
    pub close_request: CloseMode,
    pub release: ReleaseState,
    pub open_demand: u16,
    pub socket_state: SocketState,
    pub timeout_latched: bool,
    pub tx_active: bool,
    pub rx_active: bool,
}

/// Mutable arena guarded by the service lock.
#[derive(Debug)]
pub(crate) struct AdaptorState {
    pub(crate) initialized: bool,
    pub(crate) tick: u64,
    pub(crate) connections: Vec<ConnectionState>,
    pub(crate) groups: Vec<GroupState>,
    pub(crate) events: EventQueue,
    pub(crate) auto_connect: TimeoutList,
    pub(crate) alive: TimeoutList,
    pub(crate) candidates: BestMatchCandidates,
    pub(crate) stats: AdaptorStats,
}

impl AdaptorState {
    fn build(config: &SocketAdaptorConfig) -> Self {
        let connections = (0..config.connections.len())
            .filter_map(|index| {
                let id = ConnectionId::new(index as u16);
                let (group, _) = config.group_of(id)?;
                let remote = config.configured_remote(id)?;
                Some(ConnectionState::new(
                    id,
                    group,
                    remote,
                    config.mode_queue_capacity,
                ))
            })
            .collect();

        Self {
            initialized: false,
            tick: 0,
            connections,
            groups: vec![GroupState::new(); config.groups.len()],
            events: EventQueue::new(),
            auto_connect: TimeoutList::new(config.connections.len()),
            alive: TimeoutList::new(config.connections.len()),
            candidates: BestMatchCandidates::with_capacity(config.max_group_size()),
            stats: AdaptorStats::default(),
        }
    }

    pub(crate) fn conn(&self, id: ConnectionId) -> &ConnectionState {
        &self.connections[id.index()]
    }

    pub(crate) fn conn_mut(&mut self, id: ConnectionId) -> &mut ConnectionState {
        &mut self.connections[id.index()]
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> &mut GroupState {
        &mut self.groups[id.index()]
    }
}

/// Work collected under the lock and performed after it is released.
#[derive(Debug)]
pub(crate) enum Effect {
    DeliverModes(ConnectionId),
    TerminateTx(ConnectionId),
    TerminateRx(ConnectionId, bool),
    LocalAddressChanged(GroupId, LocalAddressState),
    Diagnostic(Diagnostic),
}

/// Upper-layer callbacks registered at construction.
pub(crate) struct Hooks {
    pub(crate) mode_observer: Arc<dyn ModeObserver>,
    pub(crate) local_address_observer: Arc<dyn LocalAddressObserver>,
    pub(crate) tx: Arc<dyn TxSession>,
    pub(crate) rx: Arc<dyn RxSession>,
    pub(crate) diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            mode_observer: Arc::new(NoOpModeObserver),
            local_address_observer: Arc::new(NoOpLocalAddressObserver),
            tx: Arc::new(NoOpSession),
            rx: Arc::new(NoOpSession),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }
}

/// Socket adaptor service implementing the driving ports.
///
/// Owns the read-only configuration and the per-connection arena. One
/// short critical section guards every read-modify-write sequence; the
/// transport is called under it, observers and sessions never are. See
/// [`TransportApi`] for what that requires of a transport.
///
/// # Example
///
/// ```rust,ignore
/// let mut config = SocketAdaptorConfig::new();
/// let group = config.add_group(GroupConfig::udp(local).with_message_accept_filter(true));
/// let conn = config.add_connection(ConnectionConfig::new(group).with_remote(wildcard));
///
/// let service = SocketAdaptorService::new(config, transport)?
///     .with_mode_observer(observer);
/// service.init();
/// service.on_local_address_assignment(group, LocalAddressState::Assigned);
/// service.request_open(conn)?;
/// service.main_function();
/// ```
pub struct SocketAdaptorService<T: TransportApi> {
    pub(crate) config: Arc<SocketAdaptorConfig>,
    pub(crate) transport: Arc<T>,
    pub(crate) state: Mutex<AdaptorState>,
    /// Member connections of each group, in index order.
    pub(crate) group_members: Vec<Vec<ConnectionId>>,
    pub(crate) activity: Vec<TransferActivity>,
    pub(crate) hooks: Hooks,
}

impl<T: TransportApi> SocketAdaptorService<T> {
    /// Validate `config` and build an uninitialized service.
    pub fn new(config: SocketAdaptorConfig, transport: Arc<T>) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = AdaptorState::build(&config);
        let group_members = (0..config.groups.len())
            .map(|g| config.members(GroupId::new(g as u16)).collect())
            .collect();
        let activity = (0..config.connections.len())
            .map(|_| TransferActivity::default())
            .collect();
        Ok(Self {
            config: Arc::new(config),
            transport,
            state: Mutex::new(state),
            group_members,
            activity,
            hooks: Hooks::default(),
        })
    }

    pub fn with_mode_observer(mut self, observer: Arc<dyn ModeObserver>) -> Self {
        self.hooks.mode_observer = observer;
        self
    }

    pub fn with_local_address_observer(mut self, observer: Arc<dyn LocalAddressObserver>) -> Self {
        self.hooks.local_address_observer = observer;
        self
    }

    pub fn with_tx_session(mut self, tx: Arc<dyn TxSession>) -> Self {
        self.hooks.tx = tx;
        self
    }

    pub fn with_rx_session(mut self, rx: Arc<dyn RxSession>) -> Self {
        self.hooks.rx = rx;
        self
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.hooks.diagnostics = sink;
        self
    }

    pub fn config(&self) -> &SocketAdaptorConfig {
        &self.config
    }

    /// (Re)initialize all dynamic state.
    ///
    /// Sockets still open from a previous run are closed abortively. Local
    /// address assignment is kept, it mirrors the transport.
    pub fn init(&self) {
        let mut effects = Vec::new();
        {
            let mut state = self.state.lock();
            for handle in state
                .connections
                .iter()
                .filter_map(ConnectionState::socket)
                .chain(state.groups.iter().filter_map(GroupState::socket))
            {
                self.transport.close(handle, true);
            }

            let assignments: Vec<LocalAddressState> =
                state.groups.iter().map(GroupState::local_address).collect();
            *state = AdaptorState::build(&self.config);
            for (group, assignment) in state.groups.iter_mut().zip(assignments) {
                group.set_local_address(assignment);
            }
            for activity in &self.activity {
                activity.tx.store(false, Ordering::Release);
                activity.rx.store(false, Ordering::Release);
            }
            state.initialized = true;

            let mut lifecycle = self.lifecycle(&mut state, &mut effects);
            lifecycle.schedule_auto_setup();
            info!(
                connections = self.config.connections.len(),
                groups = self.config.groups.len(),
                "[sa-01] initialized"
            );
        }
        self.flush(effects);
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Current tick counter.
    pub fn tick(&self) -> u64 {
        self.state.lock().tick
    }

    pub fn stats(&self) -> AdaptorStats {
        self.state.lock().stats
    }

    pub fn connection_snapshot(&self, id: ConnectionId) -> SocketAdaptorResult<ConnectionSnapshot> {
        let state = self.state.lock();
        if !state.initialized {
            return Err(SocketAdaptorError::NotInitialized);
        }
        let conn = state
            .connections
            .get(id.index())
            .ok_or(SocketAdaptorError::UnknownConnection(id))?;
        let activity = &self.activity[id.index()];
        Ok(ConnectionSnapshot {
            id,
            group: conn.group(),
            mode: conn.mode(),
            remote: *conn.remote(),
            close_request: conn.close_request(),
            release: conn.release_state(),
            open_demand: conn.open_demand(),
            socket_state: conn.socket_state(),
            timeout_latched: conn.timeout_latched(),
            tx_active: activity.tx.load(Ordering::Acquire),
            rx_active: activity.rx.load(Ordering::Acquire),
        })
    }

    /// Publish the transmit unit's in-flight flag.
    pub fn set_tx_active(&self, id: ConnectionId, active: bool) -> SocketAdaptorResult<()> {
        self.set_activity(id, active, |a| &a.tx)
    }

    /// Publish the receive unit's in-flight flag.
    pub fn set_rx_active(&self, id: ConnectionId, active: bool) -> SocketAdaptorResult<()> {
        self.set_activity(id, active, |a| &a.rx)
    }

    fn set_activity(
        &self,
        id: ConnectionId,
        active: bool,
        flag: impl Fn(&TransferActivity) -> &AtomicBool,
    ) -> SocketAdaptorResult<()> {
        let activity = self
            .activity
            .get(id.index())
            .ok_or(SocketAdaptorError::UnknownConnection(id))?;
        flag(activity).store(active, Ordering::Release);
        if active || activity.is_active() {
            return Ok(());
        }

        // Transfer finished: a deferred release applies right away.
        let mut effects = Vec::new();
        {
            let mut state = self.state.lock();
            if state.initialized && state.conn(id).release_state() != ReleaseState::None {
                self.lifecycle(&mut state, &mut effects).handle_release(id);
            }
        }
        self.flush(effects);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internal plumbing
    // -------------------------------------------------------------------------

    pub(crate) fn lifecycle<'a>(
        &'a self,
        state: &'a mut AdaptorState,
        effects: &'a mut Vec<Effect>,
    ) -> Lifecycle<'a, T> {
        Lifecycle {
            config: &self.config,
            transport: self.transport.as_ref(),
            group_members: &self.group_members,
            activity: &self.activity,
            state,
            effects,
        }
    }

    /// Run `f` inside the critical section, then perform the collected
    /// effects with the lock released.
    pub(crate) fn with_lifecycle<R>(&self, f: impl FnOnce(&mut Lifecycle<'_, T>) -> R) -> R {
        let mut effects = Vec::new();
        let result = {
            let mut state = self.state.lock();
            let mut lifecycle = self.lifecycle(&mut state, &mut effects);
            f(&mut lifecycle)
        };
        self.flush(effects);
        result
    }

    pub(crate) fn flush(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::DeliverModes(id) => self.deliver_mode_changes(id),
                Effect::TerminateTx(id) => self.hooks.tx.terminate(id),
                Effect::TerminateRx(id, graceful) => self.hooks.rx.terminate(id, graceful),
                Effect::LocalAddressChanged(group, assignment) => self
                    .hooks
                    .local_address_observer
                    .on_local_address_assignment_changed(group, assignment),
                Effect::Diagnostic(diagnostic) => self.hooks.diagnostics.report(diagnostic),
            }
        }
    }

    /// Drain the mode-change queue of `id` into the observer.
    ///
    /// Only one context delivers per connection; a context that finds
    /// delivery in progress leaves the entries to the current deliverer.
    pub(crate) fn deliver_mode_changes(&self, id: ConnectionId) {
        if !self.state.lock().conn_mut(id).mode_queue_mut().begin_delivery() {
            return;
        }
        loop {
            let next = self.state.lock().conn_mut(id).mode_queue_mut().next_for_delivery();
            let Some(mode) = next else {
                break;
            };
            debug!(connection = %id, %mode, "[sa-01] delivering mode change");
            self.hooks.mode_observer.on_mode_changed(id, mode);
        }
    }

    /// Reject an API call: report, then return the error.
    pub(crate) fn reject<R>(&self, api: &'static str, error: SocketAdaptorError) -> SocketAdaptorResult<R> {
        self.hooks.diagnostics.report(Diagnostic::ApiRejected {
            api,
            error: error.clone(),
        });
        Err(error)
    }
}
