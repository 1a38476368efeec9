use std::time::Instant;

/// Per-request state carried between Pingora phases.
#[derive(Debug, Default)]
pub struct Ctx {
    /// Index of the selected backend; `None` until selection or when unroutable.
    pub backend: Option<usize>,
    pub start: Option<Instant>,
}
