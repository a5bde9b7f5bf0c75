use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::models::PlanRecord;

struct CachedPlans {
    plans: Arc<Vec<PlanRecord>>,
    stored_at: Instant,
}

/// key: plan-cache -> per-service read cache, bounded and expiring
pub struct PlanCache {
    entries: DashMap<i64, CachedPlans>,
    capacity: usize,
    ttl: Duration,
    generation: AtomicU64,
}

impl PlanCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    /// Bumped by every invalidation. Readers capture it before loading from the store.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn get(&self, service_id: i64) -> Option<Arc<Vec<PlanRecord>>> {
        let fresh = {
            let entry = self.entries.get(&service_id)?;
            (entry.stored_at.elapsed() < self.ttl).then(|| Arc::clone(&entry.plans))
        };
        if fresh.is_none() {
            self.entries.remove(&service_id);
        }
        fresh
    }

    pub fn insert(&self, service_id: i64, plans: Vec<PlanRecord>) -> Arc<Vec<PlanRecord>> {
        let plans = Arc::new(plans);
        if !self.entries.contains_key(&service_id) {
            while self.entries.len() >= self.capacity {
                if !self.evict_oldest() {
                    break;
                }
            }
        }
        self.entries.insert(
            service_id,
            CachedPlans {
                plans: Arc::clone(&plans),
                stored_at: Instant::now(),
            },
        );
        plans
    }

    /// Stores `plans` only if no invalidation happened since `generation` was read.
    pub fn insert_if_current(
        &self,
        service_id: i64,
        plans: Vec<PlanRecord>,
        generation: u64,
    ) -> Arc<Vec<PlanRecord>> {
        if self.generation() != generation {
            return Arc::new(plans);
        }
        let plans = self.insert(service_id, plans);
        // An invalidation that raced the insert wins.
        if self.generation() != generation {
            self.entries.remove(&service_id);
        }
        plans
    }

    pub fn invalidate(&self, service_id: i64) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(&service_id);
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.stored_at)
            .map(|entry| *entry.key());
        match oldest {
            Some(service_id) => self.entries.remove(&service_id).is_some(),
            None => false,
        }
    }
}
