use http::Uri;
use log::info;
use pingora::http::RequestHeader;
use pingora::prelude::*;
use std::sync::Arc;

use crate::backend::BackendSpec;

pub mod entropy;

pub use entropy::{Entropy, SeededEntropy, SequenceEntropy, ThreadRngEntropy};

/// Outcome of picking a backend for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into [`WeightedDirector::backends`].
    Backend(usize),
    /// No backend is configured; the request must be answered locally.
    Unroutable,
}

/// Picks a backend per request with probability proportional to its weight and
/// rewrites the upstream request to target it.
///
/// The cumulative-weight table is computed once in the constructor and only read
/// afterwards, so a director can be shared freely between worker threads.
pub struct WeightedDirector {
    backends: Vec<BackendSpec>,
    cumulative: Vec<u64>,
    entropy: Arc<dyn Entropy>,
}

impl WeightedDirector {
    pub fn new(backends: Vec<BackendSpec>) -> Self {
        Self::with_entropy(backends, Arc::new(ThreadRngEntropy))
    }

    pub fn with_entropy(backends: Vec<BackendSpec>, entropy: Arc<dyn Entropy>) -> Self {
        let mut cumulative = Vec::with_capacity(backends.len());
        let mut total = 0u64;

        // build out a cdf for weighted selection
        for backend in &backends {
            info!("{}", backend);
            total += u64::from(backend.weight());
            cumulative.push(total);
        }

        if backends.is_empty() {
            info!("No backends configured, all requests are unroutable");
        }

        Self {
            backends,
            cumulative,
            entropy,
        }
    }

    pub fn backends(&self) -> &[BackendSpec] {
        &self.backends
    }

    pub fn backend(&self, index: usize) -> Option<&BackendSpec> {
        self.backends.get(index)
    }

    /// Prefix sums of the backend weights, one entry per backend.
    pub fn cumulative(&self) -> &[u64] {
        &self.cumulative
    }

    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn is_unroutable(&self) -> bool {
        self.backends.is_empty()
    }

    /// Selects a backend using the director's own entropy source.
    pub fn select(&self) -> Selection {
        self.select_with(self.entropy.as_ref())
    }

    /// Selects a backend, consuming at most one draw from `entropy`.
    pub fn select_with(&self, entropy: &dyn Entropy) -> Selection {
        let selection = match self.backends.len() {
            0 => Selection::Unroutable,
            1 => Selection::Backend(0),
            _ => Selection::Backend(self.index_for(entropy.unit())),
        };

        match selection {
            Selection::Backend(index) => info!("selected {}", self.backends[index]),
            Selection::Unroutable => info!("unroutable request"),
        }

        selection
    }

    /// Maps a uniform draw to the first backend whose cumulative weight is not
    /// less than `total * unit`.
    ///
    /// Must only be called on a routable director.
    pub fn index_for(&self, unit: f64) -> usize {
        let r = self.total_weight() as f64 * unit;
        let index = self.cumulative.partition_point(|&c| (c as f64) < r);
        index.min(self.cumulative.len().saturating_sub(1))
    }

    /// Points `request` at `backend`: scheme, authority and path are replaced,
    /// the query string is kept.
    pub fn rewrite(&self, backend: &BackendSpec, request: &mut RequestHeader) -> Result<()> {
        let path_and_query = match request.uri.query() {
            Some(query) => format!("{}?{}", backend.path(), query),
            None => backend.path().to_string(),
        };

        let uri = Uri::builder()
            .scheme(backend.scheme())
            .authority(backend.authority())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| {
                Error::because(
                    ErrorType::InternalError,
                    format!("failed to rewrite request for {}", backend.name()),
                    e,
                )
            })?;

        request.set_uri(uri);
        Ok(())
    }
}
