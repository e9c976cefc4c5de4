use url::Url;

use crate::error::{ObservableLinkError, Result};

/// Where observable query sockets are opened.
///
/// Built from a base URL such as `https://api.example.com:8443`; `secure`
/// selects `wss://` over `ws://` for every route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Host with optional port, no scheme (e.g. `localhost:5000`)
    pub host: String,
    pub secure: bool,
}

impl HostContext {
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Parse a base URL. Accepts `http`, `https`, `ws` and `wss` schemes.
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url.trim())?;

        let secure = match parsed.scheme() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            other => {
                return Err(ObservableLinkError::ConfigurationError(format!(
                    "Unsupported URL scheme '{}' in base URL '{}'",
                    other, base_url
                )))
            },
        };

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(ObservableLinkError::ConfigurationError(
                "Base URL must not embed credentials".to_string(),
            ));
        }

        let host = parsed.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
            ObservableLinkError::ConfigurationError(format!(
                "Base URL '{}' has no host",
                base_url
            ))
        })?;

        let host = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self { host, secure })
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    /// Full socket URL for an already-resolved route.
    pub fn ws_url(&self, route: &str) -> String {
        if route.starts_with('/') {
            format!("{}://{}{}", self.scheme(), self.host, route)
        } else {
            format!("{}://{}/{}", self.scheme(), self.host, route)
        }
    }
}
