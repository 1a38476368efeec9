use pingora::http::RequestHeader;
use pingora::prelude::*;

use crate::backend::BackendSpec;
use crate::error::ConfigError;

pub const DEFAULT_NAME_HEADER: &str = "Color";

/// Upstream request header mutations applied after a backend is chosen.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    name_header: Option<String>,
    close_connection: bool,
}

impl HeaderPolicy {
    pub fn new() -> Self {
        Self {
            name_header: Some(DEFAULT_NAME_HEADER.to_string()),
            close_connection: true,
        }
    }

    /// Header carrying the backend name upstream; `None` disables it.
    ///
    /// The name is checked here so a bad value fails at startup instead of on
    /// every forwarded request.
    pub fn with_name_header(
        mut self,
        name_header: Option<&str>,
    ) -> std::result::Result<Self, ConfigError> {
        if let Some(name) = name_header
            && http::HeaderName::from_bytes(name.as_bytes()).is_err()
        {
            return Err(ConfigError::InvalidHeaderName(name.to_string()));
        }

        self.name_header = name_header.map(str::to_string);
        Ok(self)
    }

    /// Whether to ask for a fresh upstream connection on every request.
    pub fn with_close_connection(mut self, close_connection: bool) -> Self {
        self.close_connection = close_connection;
        self
    }

    pub fn name_header(&self) -> Option<&str> {
        self.name_header.as_deref()
    }

    pub fn apply_upstream_request_headers(
        &self,
        request: &mut RequestHeader,
        backend: &BackendSpec,
    ) -> Result<()> {
        if let Some(name_header) = &self.name_header {
            request.insert_header(name_header.clone(), backend.name().to_string())?;
        }

        // best effort; the upstream may still keep the connection open
        if self.close_connection {
            request.insert_header("Connection", "close")?;
        }

        Ok(())
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new()
    }
}
