//! Server configuration from environment variables.
//!
//! Everything here is best-effort: malformed values are logged and replaced
//! by defaults, never fatal. The UI consuming this server lives elsewhere,
//! so the allowed CORS origin and the public WS URL are plain inputs.

use axum::http::HeaderValue;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower_http::cors::{Any, CorsLayer};

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (BIND_HOST)
    pub host: IpAddr,
    /// Bind port (PORT)
    pub port: u16,
    /// Allowed CORS origin for the external UI (ALLOWED_ORIGIN); unset means
    /// permissive
    pub allowed_origin: Option<String>,
    /// Client-facing WebSocket URL (PUBLIC_WS_URL); informational only
    pub public_ws_url: Option<String>,
}

impl ServerConfig {
    /// Load config from environment variables, falling back to defaults on
    /// anything missing or unparsable
    pub fn from_env() -> Self {
        let host = match std::env::var("BIND_HOST") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid BIND_HOST {:?}, using {}", raw, DEFAULT_HOST);
                DEFAULT_HOST
            }),
            Err(_) => DEFAULT_HOST,
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let public_ws_url = std::env::var("PUBLIC_WS_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            allowed_origin,
            public_ws_url,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// CORS layer restricted to the configured origin, or permissive when no
    /// origin is configured
    pub fn cors_layer(&self) -> CorsLayer {
        match &self.allowed_origin {
            Some(origin) => match origin.parse::<HeaderValue>() {
                Ok(value) => CorsLayer::new()
                    .allow_origin(value)
                    .allow_methods(Any)
                    .allow_headers(Any),
                Err(_) => {
                    tracing::warn!("Invalid ALLOWED_ORIGIN {:?}, allowing any origin", origin);
                    CorsLayer::permissive()
                }
            },
            None => CorsLayer::permissive(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            allowed_origin: None,
            public_ws_url: None,
        }
    }
}
