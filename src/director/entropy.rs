use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of uniform draws in `[0, 1)` used for backend selection.
///
/// Implementations are shared across Pingora worker threads, so a draw must
/// never corrupt state when called concurrently.
pub trait Entropy: Send + Sync {
    fn unit(&self) -> f64;
}

/// Draws from the calling thread's generator; no state is shared between requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngEntropy;

impl Entropy for ThreadRngEntropy {
    fn unit(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// A single seeded generator behind a lock, for reproducible runs.
#[derive(Debug)]
pub struct SeededEntropy {
    rng: Mutex<StdRng>,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Entropy for SeededEntropy {
    fn unit(&self) -> f64 {
        self.rng.lock().gen_range(0.0..1.0)
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
#[derive(Debug)]
pub struct SequenceEntropy {
    values: Vec<f64>,
    cursor: AtomicUsize,
}

impl SequenceEntropy {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "Entropy sequence cannot be empty");
        Self {
            values,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl Entropy for SequenceEntropy {
    fn unit(&self) -> f64 {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values[index]
    }
}
