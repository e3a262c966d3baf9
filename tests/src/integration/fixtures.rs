//! Shared test fixtures.

use std::net::SocketAddr;
use std::sync::Arc;

use sa_01_socket_adaptor::{
    CollectingDiagnostics, ConnectionId, GroupId, InMemoryModeRecorder, LocalAddressState, Mode,
    MockTransport, RecordingSessions, SocketAdaptorApi, SocketAdaptorConfig,
    SocketAdaptorService, TransportEventHandler,
};

pub fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A running adaptor with its transport and upper-layer doubles.
pub struct System {
    pub service: Arc<SocketAdaptorService<MockTransport>>,
    pub transport: Arc<MockTransport>,
    pub modes: Arc<InMemoryModeRecorder>,
    pub sessions: Arc<RecordingSessions>,
    pub diagnostics: Arc<CollectingDiagnostics>,
}

impl System {
    /// Build, initialize and assign every group's local address.
    pub fn start(config: SocketAdaptorConfig) -> Self {
        init_tracing();
        let groups = config.groups.len();
        let transport = Arc::new(MockTransport::new());
        let modes = Arc::new(InMemoryModeRecorder::new());
        let sessions = Arc::new(RecordingSessions::new());
        let diagnostics = Arc::new(CollectingDiagnostics::new());
        let service = SocketAdaptorService::new(config, transport.clone())
            .unwrap()
            .with_mode_observer(modes.clone())
            .with_local_address_observer(modes.clone())
            .with_tx_session(sessions.clone())
            .with_rx_session(sessions.clone())
            .with_diagnostics(diagnostics.clone());
        service.init();
        for index in 0..groups {
            service.on_local_address_assignment(
                GroupId::new(index as u16),
                LocalAddressState::Assigned,
            );
        }
        Self {
            service: Arc::new(service),
            transport,
            modes,
            sessions,
            diagnostics,
        }
    }

    pub fn tick(&self, count: usize) {
        for _ in 0..count {
            self.service.main_function();
        }
    }

    pub fn mode(&self, id: ConnectionId) -> Mode {
        self.service.get_mode(id).unwrap()
    }

    /// Concrete remote endpoint, `None` while any axis is a wildcard.
    pub fn remote(&self, id: ConnectionId) -> Option<SocketAddr> {
        let remote = self.service.get_remote_address(id).unwrap();
        remote.is_fully_set().then(|| remote.socket_addr()).flatten()
    }
}
