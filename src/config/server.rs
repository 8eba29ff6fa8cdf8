//! Server and service behaviour configuration types.

use serde::Deserialize;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port for the REST API.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Behaviour switches for the sale services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Report an empty sale listing as a client error instead of `[]`.
    /// Default: true
    pub empty_list_is_error: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            empty_list_is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let server = ServerConfig::default();
        assert_eq!(server.port, 8080);
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_service_config_default_keeps_empty_list_error() {
        assert!(ServiceConfig::default().empty_list_is_error);
    }
}
