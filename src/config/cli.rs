use clap::Parser;

use super::{DEFAULT_BACKENDS, listen_address};

/// Weighted random reverse proxy.
///
/// Each backend NAME is read from the environment: `NAME` holds the target URL
/// and `NAME_WEIGHT` an optional positive weight.
#[derive(Parser, Debug, Clone)]
#[command(name = "sillyproxy", version, about)]
pub struct Cli {
    /// Listen address; a bare `:port` listens on all interfaces
    #[arg(long, default_value = ":8080", env = "SILLYPROXY_ADDR")]
    pub addr: String,

    /// Header carrying the selected backend's name upstream; empty disables it
    #[arg(long, default_value = "Color")]
    pub name_header: String,

    /// Allow Pingora to reuse idle upstream connections
    #[arg(long)]
    pub keep_upstream_connections: bool,

    /// Extra backend names, looked up after the defaults
    pub backends: Vec<String>,
}

impl Cli {
    pub fn listen_address(&self) -> String {
        listen_address(&self.addr)
    }

    /// Default backend names followed by the ones given on the command line.
    pub fn backend_names(&self) -> Vec<String> {
        DEFAULT_BACKENDS
            .iter()
            .map(|name| name.to_string())
            .chain(self.backends.iter().cloned())
            .collect()
    }

    pub fn name_header(&self) -> Option<&str> {
        Some(self.name_header.as_str()).filter(|h| !h.is_empty())
    }
}
