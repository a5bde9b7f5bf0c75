use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use subscription_backend::catalog::{PlanCatalog, SeedOutcome};
use subscription_backend::config;
use subscription_backend::store::PgDocumentStore;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let reset = std::env::args().skip(1).any(|arg| arg == "--reset");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(config::DATABASE_URL.as_str())
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let catalog = PlanCatalog::from_env(Arc::new(PgDocumentStore::new(pool)));
    if reset {
        let deleted = catalog.clear_existing_plans().await?;
        tracing::info!(deleted, "catalog reset before seeding");
    }

    match catalog.seed().await? {
        SeedOutcome::AlreadySeeded { existing } => {
            tracing::info!(existing, "catalog already populated, nothing to do")
        }
        SeedOutcome::Seeded { written, batches } => {
            tracing::info!(written, batches, "catalog seeded")
        }
    }
    Ok(())
}
