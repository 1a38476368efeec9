use log::{debug, info, warn};
use std::collections::HashMap;

use crate::backend::BackendSpec;
use crate::error::ConfigError;

pub mod cli;

pub use cli::Cli;

/// Backend names looked up when nothing else is configured.
pub const DEFAULT_BACKENDS: &[&str] = &["blue", "green"];

/// Read access to configuration variables.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Raw strings for one backend, as discovered, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEntry {
    pub name: String,
    pub location: String,
    pub weight: String,
}

impl BackendEntry {
    pub fn parse(&self) -> Result<BackendSpec, ConfigError> {
        BackendSpec::parse(&self.name, &self.location, &self.weight).map_err(|source| {
            ConfigError::Backend {
                name: self.name.clone(),
                source,
            }
        })
    }
}

/// Looks up `NAME` (the URL) and `NAME_WEIGHT` for a backend name.
///
/// An unset or empty URL variable is an error; an unset weight is passed on as
/// an empty string.
pub fn discover(env: &impl Environment, name: &str) -> Result<BackendEntry, ConfigError> {
    let var = name.to_uppercase();

    let location = env.var(&var).filter(|v| !v.is_empty()).ok_or_else(|| {
        ConfigError::MissingService {
            name: name.to_string(),
            var: var.clone(),
        }
    })?;

    let weight = env.var(&format!("{}_WEIGHT", var)).unwrap_or_default();
    if weight.is_empty() {
        debug!("No weight for {}, defaulting to 1", name);
    }

    Ok(BackendEntry {
        name: name.to_lowercase(),
        location,
        weight,
    })
}

/// Discovers and parses every named backend, in order.
///
/// Backends that are missing or fail to parse are logged and skipped; they
/// never reach the routing table.
pub fn load_backends<S: AsRef<str>>(env: &impl Environment, names: &[S]) -> Vec<BackendSpec> {
    let names: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
    info!("Backend names: {:?}", names);

    names
        .into_iter()
        .filter_map(|name| match discover(env, name).and_then(|e| e.parse()) {
            Ok(backend) => Some(backend),
            Err(e) => {
                warn!("Skipping backend: {}", e);
                None
            }
        })
        .collect()
}

/// Widens a bare `:port` listen address to all interfaces.
pub fn listen_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}
