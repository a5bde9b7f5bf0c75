pub mod api;
mod cache;
mod models;
mod seed_data;
mod service;

pub use cache::PlanCache;
pub use models::{PlanEntry, PlanRecord, SeedOutcome, PLANS_COLLECTION};
pub use seed_data::default_plans;
pub use service::PlanCatalog;
