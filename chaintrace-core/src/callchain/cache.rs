//! Run-scoped memo of resolved callers, keyed by method signature.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::MethodSignature;
use crate::model::MethodId;

/// Callers resolved for one target method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerSet {
    /// Distinct enclosing methods of matching calls, in call-expression order.
    pub callers: Vec<MethodId>,
    /// The target's declaring type has more than one overload of the same arity,
    /// so matches may belong to a sibling overload.
    pub ambiguous_overload: bool,
}

impl CallerSet {
    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}

/// Introspection counters for the caller cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub cached_methods: usize,
    pub total_callers: usize,
}

/// Concurrent caller cache.
///
/// Readers take the shared lock; a miss computes outside any lock and the
/// first insert for a signature wins, so racing workers agree on one value.
#[derive(Debug, Default)]
pub struct CallerCache {
    entries: RwLock<HashMap<MethodSignature, Arc<CallerSet>>>,
}

impl CallerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signature: &MethodSignature) -> Option<Arc<CallerSet>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(signature)
            .cloned()
    }

    /// Stores `callers` unless another worker got there first; returns the stored value.
    pub fn insert(&self, signature: MethodSignature, callers: CallerSet) -> Arc<CallerSet> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(signature)
            .or_insert_with(|| Arc::new(callers))
            .clone()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        CacheStats {
            cached_methods: entries.len(),
            total_callers: entries.values().map(|c| c.len()).sum(),
        }
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(s: &str) -> MethodSignature {
        MethodSignature::from(s.to_string())
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = CallerCache::new();
        let first = cache.insert(sig("a.A.run()"), CallerSet::default());
        let second = cache.insert(
            sig("a.A.run()"),
            CallerSet {
                callers: Vec::new(),
                ambiguous_overload: true,
            },
        );
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!second.ambiguous_overload);
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = CallerCache::new();
        cache.insert(sig("a.A.run()"), CallerSet::default());
        cache.insert(sig("a.A.stop()"), CallerSet::default());
        assert_eq!(
            cache.stats(),
            CacheStats {
                cached_methods: 2,
                total_callers: 0
            }
        );
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.get(&sig("a.A.run()")).is_none());
    }
}
