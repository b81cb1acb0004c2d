//! Server configuration.

use crate::error::{ServerError, ServerResult};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Upper bound on the time spent serving one request.
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the request timeout. Zero keeps the default.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = if timeout.is_zero() {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            timeout
        };
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}

/// Resolves a listen address given as `ip:port`, `host:port` or `:port`.
///
/// A missing host binds every interface.
pub fn parse_bind_addr(addr: &str) -> ServerResult<SocketAddr> {
    let full = match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => addr.to_string(),
    };

    full.to_socket_addrs()
        .map_err(|err| ServerError::Config(format!("invalid listen address {addr:?}: {err}")))?
        .next()
        .ok_or_else(|| ServerError::Config(format!("listen address {addr:?} did not resolve")))
}
