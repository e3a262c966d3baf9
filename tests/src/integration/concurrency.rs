//! # Concurrent Contexts
//!
//! Transport callbacks, the periodic task and upper-layer requests run on
//! separate threads against one shared service.

#[cfg(test)]
mod tests {
    use std::thread;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use sa_01_socket_adaptor::{
        ConnectionConfig, ConnectionId, GroupConfig, Mode, SocketAdaptorApi, SocketAdaptorConfig,
        TransportEventHandler,
    };

    use crate::integration::fixtures::{addr, System};

    const CONNECTIONS: u16 = 8;
    const ROUNDS: usize = 2_000;

    fn wildcard_group() -> SocketAdaptorConfig {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(
            GroupConfig::udp(addr("10.0.0.100:30490"))
                .with_message_accept_filter(true)
                .with_udp_alive_timeout(3),
        );
        for _ in 0..CONNECTIONS {
            config.add_connection(ConnectionConfig::new(g).with_remote(addr("0.0.0.0:0")));
        }
        config
    }

    #[test]
    fn test_mode_notifications_stay_ordered_under_contention() {
        let system = System::start(wildcard_group());
        let ids: Vec<ConnectionId> = (0..CONNECTIONS).map(ConnectionId::new).collect();
        for id in &ids {
            system.service.request_open(*id).unwrap();
        }
        system.tick(1);
        let socket = system.transport.last_acquired().unwrap();

        thread::scope(|scope| {
            // Transport receive context.
            scope.spawn(|| {
                let mut rng = StdRng::seed_from_u64(7);
                for _ in 0..ROUNDS {
                    let host: u8 = rng.gen_range(1..=16);
                    let peer = addr(&format!("10.0.1.{host}:30490"));
                    system.service.on_datagram_metadata(socket, peer);
                }
            });

            // Periodic task.
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    system.service.main_function();
                }
            });

            // Upper layer releasing peers mid-transfer.
            scope.spawn(|| {
                let mut rng = StdRng::seed_from_u64(11);
                for _ in 0..ROUNDS {
                    let id = ConnectionId::new(rng.gen_range(0..CONNECTIONS));
                    system.service.set_tx_active(id, true).unwrap();
                    system
                        .service
                        .release_remote_address(id, rng.gen_bool(0.5))
                        .unwrap();
                    system.service.set_tx_active(id, false).unwrap();
                }
            });
        });

        // Deliveries deferred by contention are flushed on the next tick.
        system.tick(2);

        let overflowed = system.service.stats().mode_queue_overflows > 0;
        for id in ids {
            let delivered = system.modes.modes_of(id);
            let current = system.mode(id);
            assert_eq!(delivered.last(), Some(&current), "{id}: {delivered:?}");
            assert!(delivered.iter().all(|mode| *mode != Mode::Offline));
            if !overflowed {
                assert!(
                    delivered.windows(2).all(|pair| pair[0] != pair[1]),
                    "{id}: {delivered:?}"
                );
            }
        }
    }

    #[test]
    fn test_requests_from_many_threads_balance_out() {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(GroupConfig::udp(addr("10.0.0.100:30490")));
        let c = config.add_connection(ConnectionConfig::new(g).with_remote(addr("10.0.0.1:30490")));
        let system = System::start(config);

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        system.service.request_open(c).unwrap();
                        system.service.main_function();
                        system.service.request_close(c, false).unwrap();
                    }
                });
            }
        });
        system.tick(2);

        let snapshot = system.service.connection_snapshot(c).unwrap();
        assert_eq!(snapshot.open_demand, 0);
        assert_eq!(snapshot.mode, Mode::Offline);
        assert_eq!(system.modes.modes_of(c).last(), Some(&Mode::Offline));
        assert!(system.transport.open_sockets().is_empty());
    }
}
