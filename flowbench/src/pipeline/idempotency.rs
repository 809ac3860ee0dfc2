//! Per-stage idempotency guard.
//!
//! Tracks the identities of events a stage has already processed in the
//! current run so a re-delivered event is skipped instead of reprocessed.
//! Two different events sharing an identity are treated as the same event.

use std::collections::HashSet;

/// Run-scoped set of processed event identities.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyGuard {
    enabled: bool,
    seen: HashSet<String>,
}

impl IdempotencyGuard {
    /// Creates a guard. A disabled guard never reports duplicates.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seen: HashSet::new(),
        }
    }

    /// Returns true if the guard is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true if `id` was already recorded.
    #[must_use]
    pub fn is_duplicate(&self, id: &str) -> bool {
        self.enabled && self.seen.contains(id)
    }

    /// Records `id` as successfully processed.
    pub fn record(&mut self, id: &str) {
        if self.enabled {
            self.seen.insert(id.to_string());
        }
    }

    /// Number of recorded identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forgets every recorded identity.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
