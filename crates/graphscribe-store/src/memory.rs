//! In-process template store

use crate::StoreError;
use graphscribe_domain::traits::TemplateStore;
use graphscribe_domain::TemplateSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Template store that keeps the set in memory
///
/// Clones share state, so a test can keep a handle after moving the store
/// into a manager.
///
/// # Examples
///
/// ```
/// use graphscribe_store::MemoryStore;
/// use graphscribe_domain::traits::TemplateStore;
/// use graphscribe_domain::TemplateSet;
///
/// let mut store = MemoryStore::new();
/// let handle = store.clone();
/// store.persist(&TemplateSet::new()).unwrap();
/// assert_eq!(handle.persist_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<TemplateSet>>,
    persist_calls: Arc<AtomicUsize>,
    fail_persist: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `set`
    pub fn with_set(set: TemplateSet) -> Self {
        Self {
            saved: Arc::new(Mutex::new(set)),
            ..Self::default()
        }
    }

    /// Number of successful persists
    pub fn persist_count(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// Make every following persist fail (or succeed again)
    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Copy of the last persisted set
    pub fn snapshot(&self) -> Result<TemplateSet, StoreError> {
        self.load()
    }
}

impl TemplateStore for MemoryStore {
    type Error = StoreError;

    fn load(&self) -> Result<TemplateSet, Self::Error> {
        let saved = self
            .saved
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        let mut set = saved.clone();
        set.normalize();
        Ok(set)
    }

    fn persist(&mut self, set: &TemplateSet) -> Result<(), Self::Error> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("persist disabled".to_string()));
        }
        let mut saved = self
            .saved
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        *saved = set.clone();
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
