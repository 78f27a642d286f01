//! Superseding tokens
//!
//! Each selection advances a shared generation counter and carries a [`RequestToken`]
//! snapshot of it. Work that suspends compares its token against the counter afterwards and
//! drops its result once a newer selection has started. Nothing is aborted; stale results are
//! simply never applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

/// Monotonic generation counter owned by one player
#[derive(Debug, Clone, Default)]
pub struct Generation {
    counter: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every outstanding token
    pub fn advance(&self) -> RequestToken {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        RequestToken {
            generation,
            counter: self.counter.clone(),
        }
    }

    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Snapshot of a generation
#[derive(Debug, Clone)]
pub struct RequestToken {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl RequestToken {
    /// Token that is never superseded, for one-shot resolution
    pub fn detached() -> Self {
        Generation::new().advance()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.generation
    }

    /// `Err(Superseded)` once a newer generation exists
    pub fn check(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(Error::Superseded)
        }
    }
}
