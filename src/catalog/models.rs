use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PLANS_COLLECTION: &str = "subscriptionPlans";

/// key: catalog-models -> plan as written by the seeder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub service_id: i64,
    pub name: String,
    pub price: String,
    /// Days; sub-day test plans use fractions.
    pub duration: f64,
    pub features: Vec<String>,
}

impl PlanEntry {
    pub fn new(
        service_id: i64,
        name: &str,
        price: &str,
        duration: f64,
        features: &[&str],
    ) -> Self {
        Self {
            service_id,
            name: name.to_string(),
            price: price.to_string(),
            duration,
            features: features.iter().map(|feature| feature.to_string()).collect(),
        }
    }
}

/// key: catalog-models -> stored plan as returned to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord {
    pub id: String,
    #[serde(flatten)]
    pub plan: PlanEntry,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    AlreadySeeded { existing: usize },
    Seeded { written: usize, batches: usize },
}
