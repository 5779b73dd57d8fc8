use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use alps_core::AlpsDocument;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::LoadError;

pub type LoadOutcome = Result<Arc<AlpsDocument>, LoadError>;

type Slot = Arc<OnceCell<LoadOutcome>>;

/// Per-session cache of external documents keyed by location.
///
/// Concurrent requests for the same location share one in-flight load and all
/// receive its outcome, failures included. Entries are never evicted.
#[derive(Debug, Default)]
pub struct ExternalCache {
    slots: Mutex<FxHashMap<String, Slot>>,
}

impl ExternalCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached outcome for `location`, running `load` only if no
    /// other caller has started loading it yet.
    pub async fn get_or_load<F, Fut>(&self, location: &str, load: F) -> LoadOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AlpsDocument, LoadError>>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get(location) {
                Some(slot) => {
                    debug!(location, "external cache hit");
                    Arc::clone(slot)
                }
                None => {
                    debug!(location, "external cache miss");
                    let slot = Slot::default();
                    slots.insert(location.to_string(), Arc::clone(&slot));
                    slot
                }
            }
        };

        slot.get_or_init(|| async { load().await.map(Arc::new) })
            .await
            .clone()
    }

    /// Completed outcome for `location`, if any.
    #[must_use]
    pub fn get(&self, location: &str) -> Option<LoadOutcome> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(location).and_then(|slot| slot.get().cloned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use alps_core::{AlpsDocument, Descriptor};
    use futures::future::join_all;

    use super::ExternalCache;
    use crate::LoadError;

    #[tokio::test]
    async fn concurrent_requests_collapse_into_one_load() {
        let cache = ExternalCache::new();
        let loads = Arc::new(AtomicUsize::new(0));

        let requests = (0..8).map(|_| {
            let loads = Arc::clone(&loads);
            let cache = &cache;
            async move {
                cache
                    .get_or_load("common.json", || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(AlpsDocument::new(vec![Descriptor::with_id("goHome")]))
                    })
                    .await
            }
        });
        let outcomes = join_all(requests).await;

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.len(), 8);
        let first = outcomes[0].as_ref().expect("loaded");
        for outcome in &outcomes {
            let document = outcome.as_ref().expect("loaded");
            assert!(Arc::ptr_eq(first, document));
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_cached_and_shared() {
        let cache = ExternalCache::new();
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let outcome = cache
                .get_or_load("missing.json", || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Err(LoadError::NotFound {
                        location: "missing.json".to_string(),
                    })
                })
                .await;
            assert!(matches!(outcome, Err(LoadError::NotFound { .. })));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.get("missing.json").is_some());
        assert!(cache.get("other.json").is_none());
    }
}
