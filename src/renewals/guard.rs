use std::sync::Arc;

use dashmap::DashSet;

/// key: renewal-guard -> ids of subscriptions whose renewal is running in this process
#[derive(Clone, Default)]
pub struct InFlightRenewals {
    ids: Arc<DashSet<String>>,
}

impl InFlightRenewals {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when another task already holds `id`.
    pub fn try_acquire(&self, id: &str) -> Option<RenewalGuard> {
        if self.ids.insert(id.to_string()) {
            Some(RenewalGuard {
                ids: Arc::clone(&self.ids),
                id: id.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Releases its id when dropped.
pub struct RenewalGuard {
    ids: Arc<DashSet<String>>,
    id: String,
}

impl Drop for RenewalGuard {
    fn drop(&mut self) {
        self.ids.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let in_flight = InFlightRenewals::new();
        let guard = in_flight.try_acquire("sub-1").expect("first acquire");
        assert!(in_flight.try_acquire("sub-1").is_none());
        assert!(in_flight.try_acquire("sub-2").is_some());
        assert!(in_flight.contains("sub-1"));

        drop(guard);
        assert!(!in_flight.contains("sub-1"));
        assert!(in_flight.try_acquire("sub-1").is_some());
    }

    #[test]
    fn clones_share_the_same_set() {
        let in_flight = InFlightRenewals::new();
        let shared = in_flight.clone();
        let _guard = in_flight.try_acquire("sub-1").unwrap();
        assert!(shared.try_acquire("sub-1").is_none());
        assert_eq!(shared.len(), 1);
    }
}
