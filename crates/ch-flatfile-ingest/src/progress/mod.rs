//! Per-transfer progress registry.
//!
//! A process-wide map from transfer id to completion fraction in
//! [0, 100]. The registry is an explicit component injected into the
//! orchestrator; pollers hold a clone of the same handle. Entries live
//! only as long as their transfer: the [`ProgressGuard`] removes the
//! entry on every exit path, success or failure.
//!
//! After cleanup a poller cannot distinguish "finished" from "never
//! started" - both read 0. Callers must pair polling with the transfer
//! result itself; disappearance plus an error response is the failure
//! signal, not completion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cloneable handle to the shared progress map.
#[derive(Clone, Default)]
pub struct ProgressRegistry {
    inner: Arc<Mutex<HashMap<String, f64>>>,
}

impl ProgressRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record progress for a transfer, clamped to [0, 100].
    ///
    /// Updates are monotone per id: a value below the recorded fraction
    /// is ignored, so concurrent pollers never observe regress.
    pub fn set(&self, transfer_id: &str, fraction: f64) {
        let fraction = fraction.clamp(0.0, 100.0);
        let mut map = self.inner.lock().unwrap();
        let entry = map.entry(transfer_id.to_string()).or_insert(0.0);
        if fraction > *entry {
            *entry = fraction;
        }
    }

    /// Read the latest fraction, or 0.0 when the id is unknown.
    pub fn get(&self, transfer_id: &str) -> f64 {
        self.inner
            .lock()
            .unwrap()
            .get(transfer_id)
            .copied()
            .unwrap_or(0.0)
    }

    /// Remove a transfer's entry.
    pub fn clear(&self, transfer_id: &str) {
        self.inner.lock().unwrap().remove(transfer_id);
    }

    /// Create the entry and return a guard that clears it on drop.
    pub fn guard(&self, transfer_id: &str) -> ProgressGuard {
        self.set(transfer_id, 0.0);
        ProgressGuard {
            registry: self.clone(),
            transfer_id: transfer_id.to_string(),
        }
    }
}

/// Scoped cleanup for one transfer's progress entry.
///
/// Dropping the guard removes the entry, which makes cleanup run on
/// early returns and failures alike.
pub struct ProgressGuard {
    registry: ProgressRegistry,
    transfer_id: String,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.registry.clear(&self.transfer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_absent_is_zero() {
        let registry = ProgressRegistry::new();
        assert_eq!(registry.get("nope"), 0.0);
    }

    #[test]
    fn test_set_get_clear() {
        let registry = ProgressRegistry::new();
        registry.set("t1", 42.5);
        assert_eq!(registry.get("t1"), 42.5);
        registry.clear("t1");
        assert_eq!(registry.get("t1"), 0.0);
    }

    #[test]
    fn test_monotone_and_clamped() {
        let registry = ProgressRegistry::new();
        registry.set("t1", 50.0);
        registry.set("t1", 30.0);
        assert_eq!(registry.get("t1"), 50.0);

        registry.set("t1", 150.0);
        assert_eq!(registry.get("t1"), 100.0);
    }

    #[test]
    fn test_distinct_ids_do_not_interfere() {
        let registry = ProgressRegistry::new();
        registry.set("a", 10.0);
        registry.set("b", 90.0);
        assert_eq!(registry.get("a"), 10.0);
        assert_eq!(registry.get("b"), 90.0);
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let registry = ProgressRegistry::new();
        {
            let _guard = registry.guard("t1");
            registry.set("t1", 80.0);
            assert_eq!(registry.get("t1"), 80.0);
        }
        assert_eq!(registry.get("t1"), 0.0);
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let registry = ProgressRegistry::new();
        let poller = registry.clone();
        registry.set("t1", 25.0);
        assert_eq!(poller.get("t1"), 25.0);
    }
}
