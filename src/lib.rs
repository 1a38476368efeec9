pub mod backend;
pub mod config;
pub mod director;
pub mod error;
pub mod pipeline;
pub mod proxy;

// Stable public API re-exports
pub use backend::BackendSpec;
pub use director::{Entropy, Selection, WeightedDirector};
pub use error::{BackendError, ConfigError};
pub use pipeline::views::RequestView;
pub use proxy::WeightedProxy;
