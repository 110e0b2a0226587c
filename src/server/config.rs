//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::ConfigError;

/// Environment variable holding the listen address
pub const APP_PORT_VAR: &str = "APP_PORT";

/// Default listen port
pub const DEFAULT_PORT: u16 = 9000;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (`host:port`, resolved when the listener binds)
    pub bind_addr: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: all_interfaces(DEFAULT_PORT),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Chunks are relayed as soon as they are read
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr.to_string(),
            ..Default::default()
        }
    }

    /// Load from the process environment (`APP_PORT`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    ///
    /// Absent values use the default. Invalid values are logged and also
    /// fall back to the default.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(APP_PORT_VAR) {
            match parse_listen_addr(APP_PORT_VAR, &value) {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => {
                    tracing::warn!(error = %e, default = %config.bind_addr, "Using default listen address");
                }
            }
        }

        config
    }

    /// Set the bind address
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

/// Parse a listen address
///
/// Accepts `host:port` where the host is an IP address (`[::1]` for IPv6)
/// or a name resolved at bind time, the host-less `:9000` form meaning all
/// IPv4 interfaces, or a bare port.
pub fn parse_listen_addr(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    let invalid = || ConfigError::InvalidAddress {
        var,
        value: value.to_string(),
    };

    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr.to_string());
    }

    let Some((host, port)) = value.rsplit_once(':') else {
        return value.parse::<u16>().map(all_interfaces).map_err(|_| invalid());
    };
    let port = port.parse::<u16>().map_err(|_| invalid())?;

    if host.is_empty() {
        return Ok(all_interfaces(port));
    }

    // Unbracketed IPv6 or anything with whitespace cannot name a host
    if host.contains(':') || host.contains(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(format!("{}:{}", host, port))
}

fn all_interfaces(port: u16) -> String {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, "127.0.0.1:9001");
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::default()
            .bind("localhost:9000")
            .max_connections(50)
            .tcp_nodelay(false);

        assert_eq!(config.bind_addr, "localhost:9000");
        assert_eq!(config.max_connections, 50);
        assert!(!config.tcp_nodelay);
    }

    #[test]
    fn test_parse_listen_addr_forms() {
        let parse = |v: &str| parse_listen_addr(APP_PORT_VAR, v).unwrap();

        assert_eq!(parse(":9000"), "0.0.0.0:9000");
        assert_eq!(parse("9100"), "0.0.0.0:9100");
        assert_eq!(parse("127.0.0.1:9200"), "127.0.0.1:9200");
        assert_eq!(parse("[::1]:9300"), "[::1]:9300");
        assert_eq!(parse(" 9400 "), "0.0.0.0:9400");
    }

    #[test]
    fn test_parse_listen_addr_hostnames() {
        let parse = |v: &str| parse_listen_addr(APP_PORT_VAR, v).unwrap();

        assert_eq!(parse("localhost:9000"), "localhost:9000");
        assert_eq!(parse("relay.internal:7000"), "relay.internal:7000");
    }

    #[test]
    fn test_parse_listen_addr_invalid() {
        for bad in [
            "",
            ":",
            "localhost",
            "localhost:",
            ":99999",
            "1.2.3.4",
            "::1:9000",
            "not an address:80",
        ] {
            let result = parse_listen_addr(APP_PORT_VAR, bad);
            assert!(
                matches!(result, Err(ConfigError::InvalidAddress { .. })),
                "value {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_from_lookup() {
        let config = ServerConfig::from_lookup(|key| (key == "APP_PORT").then(|| ":7000".into()));
        assert_eq!(config.bind_addr, "0.0.0.0:7000");

        let config = ServerConfig::from_lookup(|_| Some("not an address".into()));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");

        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_from_lookup_keeps_hostname() {
        let config =
            ServerConfig::from_lookup(|key| (key == "APP_PORT").then(|| "localhost:7000".into()));

        assert_eq!(config.bind_addr, "localhost:7000");
    }
}
