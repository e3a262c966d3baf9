//! # Socket Adaptor Dispatch Benchmarks
//!
//! | Path | Claim |
//! |------|-------|
//! | Best-match selection | stops at the first exact match |
//! | Datagram resolution | one critical section per datagram |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};

use sa_01_socket_adaptor::domain::{BestMatchCandidates, ConnectionState};
use sa_01_socket_adaptor::{
    select_best_match, AddressDomain, CandidateFilter, ConnectionConfig, ConnectionId, GroupConfig,
    GroupId, LocalAddressState, MockTransport, RemoteEndpoint, SocketAdaptorApi,
    SocketAdaptorConfig, SocketAdaptorService, TransportEventHandler,
};

fn host(index: usize) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, (index / 250) as u8, (index % 250) as u8 + 1))
}

/// `size` connections with concrete remotes, ports 1000.., hosts in order.
fn concrete_connections(size: usize) -> Vec<ConnectionState> {
    (0..size)
        .map(|index| {
            ConnectionState::new(
                ConnectionId::new(index as u16),
                GroupId::new(0),
                RemoteEndpoint::configured(
                    AddressDomain::Inet,
                    Some(host(index)),
                    Some(1000 + index as u16),
                ),
                4,
            )
        })
        .collect()
}

// ============================================================================
// Best-match selection
// ============================================================================

fn bench_best_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("best-match");
    group.measurement_time(Duration::from_secs(5));

    for size in [16usize, 256, 4096] {
        let connections = concrete_connections(size);
        let mut out = BestMatchCandidates::with_capacity(size);
        let first = SocketAddr::new(host(0), 1000);
        let last = SocketAddr::new(host(size - 1), 1000 + (size - 1) as u16);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("exact_first", size), &first, |b, query| {
            b.iter(|| {
                select_best_match(
                    connections.iter(),
                    black_box(query),
                    CandidateFilter::AnyMode,
                    &mut out,
                );
                black_box(out.first())
            })
        });
        group.bench_with_input(BenchmarkId::new("exact_last", size), &last, |b, query| {
            b.iter(|| {
                select_best_match(
                    connections.iter(),
                    black_box(query),
                    CandidateFilter::AnyMode,
                    &mut out,
                );
                black_box(out.first())
            })
        });
    }
    group.finish();
}

// ============================================================================
// Datagram resolution through the service
// ============================================================================

fn bench_datagram_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("datagram-resolution");
    group.measurement_time(Duration::from_secs(5));

    for size in [8usize, 64] {
        let mut config = SocketAdaptorConfig::new();
        let g = config.add_group(
            GroupConfig::udp("10.0.0.100:30490".parse().unwrap()).with_message_accept_filter(true),
        );
        for index in 0..size {
            config.add_connection(
                ConnectionConfig::new(g)
                    .with_remote_ip(host(index))
                    .with_remote_port(30490),
            );
        }
        let transport = Arc::new(MockTransport::new());
        let service = SocketAdaptorService::new(config, transport.clone()).unwrap();
        service.init();
        service.on_local_address_assignment(g, LocalAddressState::Assigned);
        for index in 0..size {
            service.request_open(ConnectionId::new(index as u16)).unwrap();
        }
        service.main_function();
        let socket = transport.last_acquired().unwrap();

        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let peers: Vec<SocketAddr> = (0..1024)
            .map(|_| SocketAddr::new(host(rng.gen_range(0..size)), 30490))
            .collect();

        group.throughput(Throughput::Elements(peers.len() as u64));
        group.bench_with_input(BenchmarkId::new("resolve", size), &peers, |b, peers| {
            b.iter(|| {
                for peer in peers {
                    black_box(service.on_datagram_metadata(socket, *peer));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_best_match, bench_datagram_resolution);
criterion_main!(benches);
