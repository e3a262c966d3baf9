//! # Connection Scenarios
//!
//! Full lifecycles of TCP client, TCP server and UDP connections as seen
//! by an upper layer and the transport.

#[cfg(test)]
mod tests {
    use sa_01_socket_adaptor::{
        AcceptDecision, ConnectionConfig, GroupConfig, LocalAddressState, Mode, ReleaseState,
        SocketAdaptorApi, SocketAdaptorConfig, SocketEventKind, TransportEventHandler,
    };

    use proptest::prelude::*;

    use crate::integration::fixtures::{addr, System};

    // =========================================================================
    // TCP CLIENT
    // =========================================================================

    /// Connect, lose the peer gracefully, reconnect.
    #[test]
    fn test_tcp_client_survives_peer_shutdown() {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(
            GroupConfig::tcp_client(addr("10.0.0.100:0")).with_auto_setup(true),
        );
        let c = config.add_connection(ConnectionConfig::new(g).with_remote(addr("10.0.0.1:13400")));
        let system = System::start(config);

        system.tick(1);
        let first = system.transport.last_acquired().unwrap();
        system.service.on_connected(first);
        assert_eq!(system.mode(c), Mode::Online);

        // Peer sends FIN: close our side, wait for the transport to confirm.
        system
            .service
            .on_socket_event(first, SocketEventKind::FinReceived);
        assert_eq!(system.mode(c), Mode::Reconnect);
        assert_eq!(system.transport.closes(), vec![(first, false)]);
        system.tick(1);
        assert_eq!(system.transport.connects().len(), 1);

        system.service.on_socket_event(first, SocketEventKind::Closed);
        system.tick(1);
        let second = system.transport.last_acquired().unwrap();
        assert_ne!(first, second);
        system.service.on_connected(second);

        assert_eq!(system.mode(c), Mode::Online);
        assert_eq!(
            system.modes.modes_of(c),
            vec![Mode::Reconnect, Mode::Online, Mode::Reconnect, Mode::Online]
        );
        assert_eq!(system.sessions.rx_terminations(), vec![(c, true)]);
    }

    // =========================================================================
    // TCP SERVER
    // =========================================================================

    /// Inbound connections land on the most specific waiting connection.
    #[test]
    fn test_tcp_server_demultiplexes_by_best_match() {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(
            GroupConfig::tcp_server(addr("10.0.0.100:5000")).with_message_accept_filter(true),
        );
        let any = config.add_connection(ConnectionConfig::new(g).with_remote(addr("0.0.0.0:0")));
        let host = config.add_connection(
            ConnectionConfig::new(g)
                .with_remote_ip("10.0.0.1".parse().unwrap())
                .with_remote_port(0),
        );
        let exact = config.add_connection(ConnectionConfig::new(g).with_remote(addr("10.0.0.1:1234")));
        let system = System::start(config);
        for c in [any, host, exact] {
            system.service.request_open(c).unwrap();
        }
        system.tick(1);
        let listen = system.transport.last_acquired().unwrap();

        let accept = |peer: &str| {
            let socket = system.transport.allocate_handle();
            system.service.on_accepted(listen, socket, addr(peer))
        };

        assert_eq!(accept("10.0.0.1:1234"), AcceptDecision::Accept);
        assert_eq!(system.mode(exact), Mode::Online);

        assert_eq!(accept("10.0.0.1:9999"), AcceptDecision::Accept);
        assert_eq!(system.mode(host), Mode::Online);
        assert_eq!(system.remote(host), Some(addr("10.0.0.1:9999")));

        assert_eq!(accept("10.0.0.2:1"), AcceptDecision::Accept);
        assert_eq!(system.mode(any), Mode::Online);

        assert_eq!(accept("10.0.0.3:1"), AcceptDecision::Reject);
        assert_eq!(system.service.stats().rejected_connections, 1);
    }

    /// A reset connection goes back to waiting with its configured peer.
    #[test]
    fn test_tcp_server_connection_accepts_again_after_reset() {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(
            GroupConfig::tcp_server(addr("10.0.0.100:5000")).with_message_accept_filter(true),
        );
        let c = config.add_connection(ConnectionConfig::new(g).with_remote(addr("10.0.0.1:1234")));
        let system = System::start(config);
        system.service.request_open(c).unwrap();
        system.tick(1);
        let listen = system.transport.last_acquired().unwrap();

        let socket = system.transport.allocate_handle();
        system
            .service
            .on_accepted(listen, socket, addr("10.0.0.1:1234"));
        system.service.on_socket_event(socket, SocketEventKind::Reset);
        assert_eq!(system.mode(c), Mode::Reconnect);

        let again = system.transport.allocate_handle();
        assert_eq!(
            system
                .service
                .on_accepted(listen, again, addr("10.0.0.1:1234")),
            AcceptDecision::Accept
        );
        assert_eq!(system.mode(c), Mode::Online);
        assert_eq!(system.service.stats().accepted_connections, 2);
    }

    // =========================================================================
    // UDP
    // =========================================================================

    /// Wildcard connections sharing one socket each learn one peer.
    #[test]
    fn test_udp_connections_learn_peers_in_turn() {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(
            GroupConfig::udp(addr("10.0.0.100:30490")).with_message_accept_filter(true),
        );
        let first = config.add_connection(ConnectionConfig::new(g).with_remote(addr("0.0.0.0:0")));
        let second = config.add_connection(ConnectionConfig::new(g).with_remote(addr("0.0.0.0:0")));
        let system = System::start(config);
        system.service.request_open(first).unwrap();
        system.service.request_open(second).unwrap();
        system.tick(1);
        assert_eq!(system.transport.acquire_count(), 1);
        let socket = system.transport.last_acquired().unwrap();

        let a = addr("10.0.0.1:30490");
        let b = addr("10.0.0.2:30490");
        assert_eq!(system.service.on_datagram_metadata(socket, a), Some(first));
        assert_eq!(system.service.on_datagram_metadata(socket, b), Some(second));
        assert_eq!(system.service.on_datagram_metadata(socket, a), Some(first));
        assert_eq!(
            system
                .service
                .on_datagram_metadata(socket, addr("10.0.0.3:30490")),
            None
        );

        assert_eq!(system.remote(first), Some(a));
        assert_eq!(system.remote(second), Some(b));
        let stats = system.service.stats();
        assert_eq!(stats.datagrams_accepted, 3);
        assert_eq!(stats.datagrams_dropped, 1);
    }

    /// The forced release waits for both directions to go idle, then the
    /// endpoint falls back to its configuration in one step.
    #[test]
    fn test_release_waits_for_tx_and_rx() {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(
            GroupConfig::udp(addr("10.0.0.100:30490")).with_message_accept_filter(true),
        );
        let c = config.add_connection(ConnectionConfig::new(g).with_remote(addr("0.0.0.0:0")));
        let system = System::start(config);
        system.service.request_open(c).unwrap();
        system.tick(1);
        let socket = system.transport.last_acquired().unwrap();
        let peer = addr("10.0.0.1:30490");
        system.service.on_datagram_metadata(socket, peer);

        system.service.set_tx_active(c, true).unwrap();
        system.service.set_rx_active(c, true).unwrap();
        system.service.release_remote_address(c, false).unwrap();

        system.service.set_tx_active(c, false).unwrap();
        system.tick(1);
        assert_eq!(system.mode(c), Mode::Online);
        assert_eq!(system.remote(c), Some(peer));
        assert_eq!(
            system.service.connection_snapshot(c).unwrap().release,
            ReleaseState::Release
        );

        system.service.set_rx_active(c, false).unwrap();
        assert_eq!(system.mode(c), Mode::Reconnect);
        assert_eq!(system.remote(c), None);
        assert_eq!(
            system.modes.modes_of(c),
            vec![Mode::Reconnect, Mode::Online, Mode::Reconnect]
        );
    }

    /// A pending OFFLINE close is not downgraded by a later, weaker reason.
    #[test]
    fn test_stronger_close_reason_wins() {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(GroupConfig::udp(addr("10.0.0.100:30490")));
        let c = config.add_connection(ConnectionConfig::new(g).with_remote(addr("10.0.0.1:30490")));
        let system = System::start(config);
        system.service.request_open(c).unwrap();
        system.tick(1);

        system.service.set_tx_active(c, true).unwrap();
        system.service.request_close(c, false).unwrap();
        system
            .service
            .on_local_address_assignment(g, LocalAddressState::Unassigned);
        system.tick(1);
        assert_eq!(system.mode(c), Mode::Online);

        system.service.set_tx_active(c, false).unwrap();
        system.tick(1);
        assert_eq!(system.mode(c), Mode::Offline);
        assert_eq!(system.modes.modes_of(c), vec![Mode::Online, Mode::Offline]);
    }

    // =========================================================================
    // OPEN / CLOSE BALANCE
    // =========================================================================

    #[derive(Clone, Copy, Debug)]
    enum Step {
        Open,
        Close,
        Tick,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![Just(Step::Open), Just(Step::Close), Just(Step::Tick)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// One tick after the last request the connection is ONLINE exactly
        /// while open requests outnumber closes, whatever the interleaving.
        #[test]
        fn prop_open_close_sequences_settle(steps in prop::collection::vec(step(), 1..40)) {
            let mut config = SocketAdaptorConfig::new();
            let g = config.add_group(GroupConfig::udp(addr("10.0.0.100:30490")));
            let c = config
                .add_connection(ConnectionConfig::new(g).with_remote(addr("10.0.0.1:30490")));
            let system = System::start(config);

            let mut demand: u16 = 0;
            for step in steps {
                match step {
                    Step::Open => {
                        system.service.request_open(c).unwrap();
                        demand += 1;
                    }
                    Step::Close => {
                        system.service.request_close(c, false).unwrap();
                        demand = demand.saturating_sub(1);
                    }
                    Step::Tick => system.tick(1),
                }
            }
            system.tick(1);

            let expected = if demand > 0 { Mode::Online } else { Mode::Offline };
            prop_assert_eq!(system.mode(c), expected);
            prop_assert_eq!(
                system.service.connection_snapshot(c).unwrap().open_demand,
                demand
            );
            prop_assert_eq!(system.transport.open_sockets().is_empty(), demand == 0);

            let delivered = system.modes.modes_of(c);
            prop_assert!(delivered.windows(2).all(|pair| pair[0] != pair[1]));
            prop_assert_eq!(delivered.last().copied().unwrap_or(Mode::Offline), expected);
        }
    }
}
