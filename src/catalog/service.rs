use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config;
use crate::retry::{retry_operation, RetryPolicy};
use crate::store::{DocumentStore, Filter, WriteBatch, MAX_BATCH_OPERATIONS};

use super::cache::PlanCache;
use super::models::{PlanEntry, PlanRecord, SeedOutcome, PLANS_COLLECTION};
use super::seed_data::default_plans;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPlan {
    #[serde(flatten)]
    plan: PlanEntry,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// key: plan-catalog -> seeding and per-service reads of subscription plans
pub struct PlanCatalog {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    cache: PlanCache,
}

impl PlanCatalog {
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy, cache: PlanCache) -> Self {
        Self {
            store,
            retry,
            cache,
        }
    }

    pub fn from_env(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            store,
            RetryPolicy::from_env(),
            PlanCache::new(
                *config::PLAN_CACHE_CAPACITY,
                Duration::from_secs(*config::PLAN_CACHE_TTL_SECS),
            ),
        )
    }

    /// Writes the shipped catalog unless any plan already exists.
    pub async fn seed(&self) -> Result<SeedOutcome> {
        self.seed_with(default_plans()).await
    }

    pub async fn seed_with(&self, plans: Vec<PlanEntry>) -> Result<SeedOutcome> {
        let store = self.store.as_ref();
        let existing = retry_operation(&self.retry, "check existing plans", move || async move {
            store.query(PLANS_COLLECTION, &Filter::new()).await
        })
        .await
        .context("failed to check for existing plans")?
        .len();

        if existing > 0 {
            info!(existing, "plans already seeded, skipping");
            return Ok(SeedOutcome::AlreadySeeded { existing });
        }

        let now = Utc::now();
        let mut batches = Vec::new();
        let mut batch = WriteBatch::new(PLANS_COLLECTION);
        for plan in plans {
            if batch.len() >= MAX_BATCH_OPERATIONS {
                batches.push(std::mem::replace(&mut batch, WriteBatch::new(PLANS_COLLECTION)));
            }
            let document = serde_json::to_value(StoredPlan {
                plan,
                created_at: now,
                updated_at: now,
            })
            .context("failed to encode plan")?;
            batch.set(self.store.generate_id(), document)?;
        }
        if !batch.is_empty() {
            batches.push(batch);
        }

        let mut written = 0;
        for (index, batch) in batches.iter().enumerate() {
            let label = format!("commit plan batch {}", index + 1);
            retry_operation(&self.retry, &label, move || store.commit(batch.clone()))
                .await
                .with_context(|| format!("failed to {label}"))?;
            written += batch.len();
            debug!(batch = index + 1, operations = batch.len(), "plan batch committed");
        }

        self.cache.invalidate_all();
        info!(written, batches = batches.len(), "plans seeded");
        Ok(SeedOutcome::Seeded {
            written,
            batches: batches.len(),
        })
    }

    /// key: plan-catalog -> plans offered by one service, served from cache when fresh
    pub async fn plans_for_service(&self, service_id: i64) -> Result<Vec<PlanRecord>> {
        if let Some(plans) = self.cache.get(service_id) {
            debug!(service_id, "plan cache hit");
            return Ok(plans.as_ref().clone());
        }

        let generation = self.cache.generation();
        let documents = self
            .store
            .query(PLANS_COLLECTION, &Filter::new().eq("serviceId", service_id))
            .await
            .with_context(|| format!("failed to load plans for service {service_id}"))?;

        let plans = documents
            .iter()
            .map(|document| {
                let stored: StoredPlan = document.decode()?;
                Ok(PlanRecord {
                    id: document.id.clone(),
                    plan: stored.plan,
                    created_at: stored.created_at,
                    updated_at: stored.updated_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .cache
            .insert_if_current(service_id, plans, generation)
            .as_ref()
            .clone())
    }

    /// Deletes every plan document and returns how many were removed.
    pub async fn clear_existing_plans(&self) -> Result<usize> {
        let documents = self
            .store
            .query(PLANS_COLLECTION, &Filter::new())
            .await
            .context("failed to list plans")?;

        try_join_all(
            documents
                .iter()
                .map(|document| self.store.delete(PLANS_COLLECTION, &document.id)),
        )
        .await
        .context("failed to delete plans")?;

        self.cache.invalidate_all();
        info!(deleted = documents.len(), "existing plans cleared");
        Ok(documents.len())
    }

    pub fn invalidate_cache(&self, service_id: Option<i64>) {
        match service_id {
            Some(service_id) => self.cache.invalidate(service_id),
            None => self.cache.invalidate_all(),
        }
    }
}
