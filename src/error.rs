use thiserror::Error;

/// Failures while building a [`BackendSpec`](crate::backend::BackendSpec) from raw strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid weight {0:?}")]
    InvalidWeight(String),

    #[error("backend name required")]
    InvalidName,
}

/// Failures while discovering backends from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("service {name} missing in env, set {var}")]
    MissingService { name: String, var: String },

    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("backend {name}: {source}")]
    Backend {
        name: String,
        #[source]
        source: BackendError,
    },
}

pub type Result<T> = std::result::Result<T, BackendError>;
