use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use sqlx::postgres::PgPoolOptions;
use subscription_backend::catalog::PlanCatalog;
use subscription_backend::chain::{ChainClient, JsonRpcChainClient, PaymentContract};
use subscription_backend::config;
use subscription_backend::notifications::BroadcastNotifier;
use subscription_backend::renewals::{self, MonitorContext, MonitorSettings, RenewalMonitor};
use subscription_backend::routes::{api_routes, root};
use subscription_backend::store::{DocumentStore, PgDocumentStore};
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

fn monitor_context_from_env() -> MonitorContext {
    let contract = config::RENEWAL_CONTRACT_ADDRESS
        .as_deref()
        .and_then(|address| match PaymentContract::new(address) {
            Ok(contract) => Some(contract),
            Err(error) => {
                tracing::warn!(?error, "ignoring invalid RENEWAL_CONTRACT_ADDRESS");
                None
            }
        });
    let client = config::CHAIN_RPC_URL.as_deref().and_then(|endpoint| {
        match JsonRpcChainClient::new(
            endpoint,
            Duration::from_secs(*config::CHAIN_RPC_TIMEOUT_SECS),
        ) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn ChainClient>),
            Err(error) => {
                tracing::warn!(?error, "failed to init chain client; renewals stay idle");
                None
            }
        }
    });

    MonitorContext {
        identity: config::RENEWAL_ACCOUNT.clone(),
        contract,
        client,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config::DATABASE_URL.as_str())
        .await?;

    if let Err(error) = sqlx::migrate!().run(&pool).await {
        if *config::ALLOW_MIGRATION_FAILURE {
            tracing::warn!(
                ?error,
                "Database migrations failed but continuing due to ALLOW_MIGRATION_FAILURE"
            );
        } else {
            return Err(Box::new(error) as Box<dyn std::error::Error>);
        }
    }

    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool.clone()));
    let notifier = BroadcastNotifier::new();
    let catalog = Arc::new(PlanCatalog::from_env(store.clone()));

    let (context_tx, context_rx) = watch::channel(monitor_context_from_env());
    let monitor = RenewalMonitor::new(
        store.clone(),
        Arc::new(notifier.clone()),
        context_rx,
        MonitorSettings::from_env(),
    );
    let monitor_handle = renewals::spawn(monitor);

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let app = Router::new()
        .route("/", get(root))
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .merge(api_routes())
        .layer(prometheus_layer)
        .layer(Extension(catalog))
        .layer(Extension(notifier))
        .layer(Extension(Arc::new(context_tx)));

    let addr: SocketAddr = format!("{}:{}", config::BIND_ADDRESS.as_str(), *config::BIND_PORT)
        .parse()
        .map_err(|error| Box::new(error) as Box<dyn std::error::Error>)?;
    tracing::info!(%addr, "Listening for incoming connections");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    monitor_handle.stop();
    Ok(())
}
