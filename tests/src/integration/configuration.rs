//! # TOML-Defined Systems
//!
//! The configuration table is loaded once, validated, and then drives the
//! whole adaptor.

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sa_01_socket_adaptor::{
        ConfigError, ConnectionId, GroupId, Mode, SocketAdaptorConfig, SocketParameter,
        TransportCall, TransportEventHandler, TransportKind,
    };

    use crate::integration::fixtures::{addr, System};

    const GATEWAY: &str = r#"
mode_queue_capacity = 8

# Service discovery: shared UDP socket, peers learned on the fly.
[[groups]]
transport = "udp"
local_address = "10.0.0.100:30490"
auto_setup = true
message_accept_filter = true
udp_alive_timeout_ticks = 50
socket_parameters = [{ parameter = "ttl", value = 1 }]

# Diagnostics tester: outbound TCP.
[[groups]]
transport = "tcp"
local_address = "10.0.0.100:0"
tcp_initiate = true
auto_connect_timeout_ticks = 20

[[connections]]
group = 0
remote_ip = "0.0.0.0"
remote_port = 0

[[connections]]
group = 1
remote_ip = "10.0.0.1"
remote_port = 13400
"#;

    #[test]
    fn test_toml_system_runs() {
        let config = SocketAdaptorConfig::from_toml_str(GATEWAY).unwrap();
        assert_eq!(config.mode_queue_capacity, 8);
        assert_eq!(config.groups[1].transport, TransportKind::Tcp);
        assert_eq!(config.groups[0].listen_backlog, 4);

        let system = System::start(config);
        let discovery = ConnectionId::new(0);
        let tester = ConnectionId::new(1);

        system.tick(1);
        assert_eq!(system.mode(discovery), Mode::Reconnect);
        assert_eq!(system.mode(tester), Mode::Offline);

        let socket = system.transport.last_acquired().unwrap();
        assert!(system.transport.calls().contains(&TransportCall::SetParameter {
            handle: socket,
            parameter: SocketParameter::Ttl,
            value: 1,
        }));
        assert_eq!(
            system
                .service
                .on_datagram_metadata(socket, addr("10.0.0.7:30490")),
            Some(discovery)
        );
        assert_eq!(system.mode(discovery), Mode::Online);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GATEWAY.as_bytes()).unwrap();

        let config = SocketAdaptorConfig::load(file.path()).unwrap();
        assert_eq!(config, SocketAdaptorConfig::from_toml_str(GATEWAY).unwrap());
        assert_eq!(config.members(GroupId::new(1)).count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SocketAdaptorConfig::load("/nonexistent/socket-adaptor.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = SocketAdaptorConfig::from_toml_str("[[groups]]\ntransport = 7\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_option_is_rejected() {
        let result = SocketAdaptorConfig::from_toml_str(
            r#"
[[groups]]
transport = "udp"
local_address = "10.0.0.100:30490"
tcp_initiate = true

[[connections]]
group = 0
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidOption {
                option: "tcp_initiate",
                ..
            })
        ));
    }

    #[test]
    fn test_remote_of_other_domain_is_rejected() {
        let result = SocketAdaptorConfig::from_toml_str(
            r#"
[[groups]]
transport = "udp"
local_address = "10.0.0.100:30490"

[[connections]]
group = 0
remote_ip = "2001:db8::1"
remote_port = 30490
"#,
        );
        assert!(matches!(result, Err(ConfigError::DomainMismatch { .. })));
    }
}
