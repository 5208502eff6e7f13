//! In-flight run registry.
//!
//! Guarantees at most one CFP run per record id inside this process. The
//! scheduler and manual triggers share one registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::id::RecordId;

#[derive(Debug, Clone, Default)]
pub struct InFlightRuns {
    running: Arc<Mutex<HashSet<RecordId>>>,
}

impl InFlightRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a record. `None` when a run for it is already in progress.
    pub fn try_acquire(&self, record_id: RecordId) -> Option<RunGuard> {
        if self.lock().insert(record_id) {
            Some(RunGuard {
                runs: self.clone(),
                record_id,
            })
        } else {
            None
        }
    }

    pub fn is_running(&self, record_id: RecordId) -> bool {
        self.lock().contains(&record_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<RecordId>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the claim on drop, including when the run panics.
#[derive(Debug)]
pub struct RunGuard {
    runs: InFlightRuns,
    record_id: RecordId,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.runs.lock().remove(&self.record_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let runs = InFlightRuns::new();
        let id = RecordId::new();

        let guard = runs.try_acquire(id);
        assert!(guard.is_some());
        assert!(runs.try_acquire(id).is_none());
        assert!(runs.is_running(id));

        drop(guard);
        assert!(!runs.is_running(id));
        assert!(runs.try_acquire(id).is_some());
    }

    #[test]
    fn test_records_are_independent() {
        let runs = InFlightRuns::new();
        let _a = runs.try_acquire(RecordId::new()).unwrap();
        let _b = runs.try_acquire(RecordId::new()).unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn test_guard_released_on_panic() {
        let runs = InFlightRuns::new();
        let id = RecordId::new();

        let cloned = runs.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.try_acquire(id).unwrap();
            panic!("run blew up");
        });

        assert!(result.is_err());
        assert!(runs.is_empty());
    }
}
