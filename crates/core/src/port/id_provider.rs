// ID Provider Port (request/response correlation)

use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation id source (allows deterministic ids in tests)
pub trait IdProvider: Send + Sync {
    /// Next request id. Never repeats for the lifetime of the provider.
    fn next_id(&self) -> u64;
}

/// Monotonic in-memory counter (production)
///
/// The first id issued is 1. Safe to share across concurrent calls: the
/// increment and the read are one atomic operation.
#[derive(Debug, Default)]
pub struct CorrelationCounter {
    last: AtomicU64,
}

impl CorrelationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last id handed out, 0 if none yet.
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

impl IdProvider for CorrelationCounter {
    fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::AcqRel) + 1
    }
}
