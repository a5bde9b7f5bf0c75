use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::chain::{
    gas_limit_with_margin, to_wei, ChainClient, ChainError, PaymentContract, TransactionReceipt,
    TransactionRequest,
};
use crate::config;
use crate::notifications::Notifier;
use crate::store::{DocumentStore, Filter};

use super::guard::InFlightRenewals;
use super::models::{
    RenewalFailure, RenewalOutcome, SkipReason, SubscriptionRecord, TickReport,
    SUBSCRIPTIONS_COLLECTION,
};

pub const LISTING_FAILURE_MESSAGE: &str = "Error checking subscription renewals";
pub const RENEWAL_SUCCESS_MESSAGE: &str = "Subscription renewed successfully!";

/// key: renewal-context -> identity and chain handles supplied by the host
#[derive(Clone, Default)]
pub struct MonitorContext {
    pub identity: Option<String>,
    pub contract: Option<PaymentContract>,
    pub client: Option<Arc<dyn ChainClient>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub renewal_window_secs: i64,
    pub gas_margin_percent: u64,
    pub scan_interval: Duration,
    pub confirmation_timeout: Duration,
    pub confirmation_poll_interval: Duration,
    /// Unmined renewals older than this fail on the next reconciliation.
    pub pending_timeout: Duration,
}

impl MonitorSettings {
    pub fn from_env() -> Self {
        Self {
            renewal_window_secs: *config::RENEWAL_WINDOW_SECS,
            gas_margin_percent: *config::RENEWAL_GAS_MARGIN_PERCENT,
            scan_interval: Duration::from_secs(*config::RENEWAL_SCAN_INTERVAL_SECS),
            confirmation_timeout: Duration::from_secs(*config::RENEWAL_CONFIRMATION_TIMEOUT_SECS),
            confirmation_poll_interval: Duration::from_millis(*config::RENEWAL_CONFIRMATION_POLL_MS),
            pending_timeout: Duration::from_secs(*config::RENEWAL_PENDING_TIMEOUT_SECS),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            renewal_window_secs: 30,
            gas_margin_percent: 20,
            scan_interval: Duration::from_secs(15),
            confirmation_timeout: Duration::from_secs(120),
            confirmation_poll_interval: Duration::from_secs(1),
            pending_timeout: Duration::from_secs(3600),
        }
    }
}

pub(super) struct Session {
    pub(super) identity: String,
    pub(super) contract: PaymentContract,
    pub(super) client: Arc<dyn ChainClient>,
}

/// key: renewal-monitor -> detect expiring subscriptions and renew them on chain
#[derive(Clone)]
pub struct RenewalMonitor {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    context: watch::Receiver<MonitorContext>,
    settings: MonitorSettings,
    in_flight: InFlightRenewals,
}

impl RenewalMonitor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        context: watch::Receiver<MonitorContext>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            context,
            settings,
            in_flight: InFlightRenewals::new(),
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn in_flight(&self) -> &InFlightRenewals {
        &self.in_flight
    }

    fn session(&self) -> Result<Session, SkipReason> {
        let context = self.context.borrow();
        let identity = context
            .identity
            .clone()
            .filter(|identity| !identity.trim().is_empty())
            .ok_or(SkipReason::MissingIdentity)?;
        let contract = context.contract.clone().ok_or(SkipReason::MissingContract)?;
        let client = context.client.clone().ok_or(SkipReason::MissingClient)?;
        Ok(Session {
            identity,
            contract,
            client,
        })
    }

    /// key: renewal-monitor -> tick handler
    pub async fn process_tick(&self, now: i64) -> Result<TickReport> {
        let mut report = TickReport::default();
        let session = match self.session() {
            Ok(session) => session,
            Err(reason) => {
                info!(reason = reason.as_str(), "skipping renewal cycle, context incomplete");
                report.skipped = Some(reason);
                return Ok(report);
            }
        };

        let owner = session.identity.to_lowercase();
        let filter = Filter::new()
            .eq("userId", owner.clone())
            .eq("autoRenew", true)
            .eq("status", "active")
            .eq("isCancelled", false);
        let documents = match self.store.query(SUBSCRIPTIONS_COLLECTION, &filter).await {
            Ok(documents) => documents,
            Err(err) => {
                error!(?err, %owner, "failed to list renewal candidates");
                self.notifier.notify(LISTING_FAILURE_MESSAGE);
                return Err(err.context("failed to list renewal candidates"));
            }
        };
        report.candidates = documents.len();

        for document in documents {
            let record: SubscriptionRecord = match document.decode() {
                Ok(record) => record,
                Err(err) => {
                    warn!(?err, subscription = %document.id, "skipping malformed subscription record");
                    continue;
                }
            };

            if record.pending_transaction_hash.is_none()
                && !record.is_due_for_renewal(now, self.settings.renewal_window_secs)
            {
                debug!(
                    subscription = %document.id,
                    end_time = record.end_time,
                    "subscription outside renewal window"
                );
                continue;
            }

            let Some(_guard) = self.in_flight.try_acquire(&document.id) else {
                debug!(subscription = %document.id, "renewal already in flight");
                continue;
            };

            match record.pending_transaction_hash.as_deref() {
                Some(hash) => {
                    match self
                        .reconcile_pending(&session, &document.id, &record, hash, now)
                        .await
                    {
                        RenewalOutcome::Renewed => report.reconciled += 1,
                        RenewalOutcome::Pending => report.pending += 1,
                        RenewalOutcome::Failed(_) => report.failed += 1,
                    }
                }
                None => {
                    report.attempted += 1;
                    match self.renew(&session, &document.id, &record, now).await {
                        RenewalOutcome::Renewed => report.renewed += 1,
                        RenewalOutcome::Pending => report.pending += 1,
                        RenewalOutcome::Failed(_) => report.failed += 1,
                    }
                }
            }
        }

        Ok(report)
    }

    async fn renew(
        &self,
        session: &Session,
        id: &str,
        record: &SubscriptionRecord,
        now: i64,
    ) -> RenewalOutcome {
        info!(subscription = %id, end_time = record.end_time, price = %record.price, "processing renewal");

        let hash = match self.submit(session, id, record).await {
            Ok(hash) => hash,
            Err(failure) => {
                self.record_failure(id, failure, now).await;
                return RenewalOutcome::Failed(failure);
            }
        };

        self.mark_pending(id, &hash, now).await;

        match self.await_receipt(session.client.as_ref(), &hash).await {
            Ok(Some(receipt)) if receipt.succeeded => {
                if self.record_success(id, record, &hash, now).await {
                    RenewalOutcome::Renewed
                } else {
                    RenewalOutcome::Pending
                }
            }
            Ok(Some(_)) => {
                warn!(subscription = %id, %hash, "renewal transaction reverted");
                self.record_failure(id, RenewalFailure::Other, now).await;
                RenewalOutcome::Failed(RenewalFailure::Other)
            }
            Ok(None) => {
                info!(subscription = %id, %hash, "renewal transaction not confirmed yet, left pending");
                RenewalOutcome::Pending
            }
            Err(err) => {
                warn!(?err, subscription = %id, %hash, "failed to fetch renewal receipt, left pending");
                RenewalOutcome::Pending
            }
        }
    }

    async fn submit(
        &self,
        session: &Session,
        id: &str,
        record: &SubscriptionRecord,
    ) -> Result<String, RenewalFailure> {
        let price = to_wei(&record.price).map_err(|err| {
            warn!(?err, subscription = %id, "renewal price conversion failed");
            RenewalFailure::Other
        })?;

        let call = session.contract.create_subscription(price, record.duration);
        let request = TransactionRequest::for_call(session.identity.as_str(), &call, price);

        let estimate = session
            .client
            .estimate_gas(&request)
            .await
            .map_err(|err| classify(id, "gas estimation", err, RenewalFailure::GasEstimation))?;
        let gas = gas_limit_with_margin(estimate, self.settings.gas_margin_percent);

        let hash = session
            .client
            .send_transaction(&request.with_gas(gas))
            .await
            .map_err(|err| classify(id, "submission", err, RenewalFailure::Other))?;

        info!(subscription = %id, %hash, estimate, gas, "renewal transaction submitted");
        Ok(hash)
    }

    async fn await_receipt(
        &self,
        client: &dyn ChainClient,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let deadline = Instant::now() + self.settings.confirmation_timeout;
        loop {
            if let Some(receipt) = client.transaction_receipt(hash).await? {
                return Ok(Some(receipt));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.settings.confirmation_poll_interval).await;
        }
    }

    async fn mark_pending(&self, id: &str, hash: &str, now: i64) {
        let fields = json!({
            "pendingTransactionHash": hash,
            "pendingSince": now,
            "updatedAt": now,
        });
        if let Err(err) = self.store.update(SUBSCRIPTIONS_COLLECTION, id, fields).await {
            warn!(?err, subscription = %id, %hash, "failed to record pending renewal transaction");
        }
    }

    /// Returns false when the record could not be written; it then stays pending.
    pub(super) async fn record_success(
        &self,
        id: &str,
        record: &SubscriptionRecord,
        hash: &str,
        now: i64,
    ) -> bool {
        let end_time = now.saturating_add(i64::try_from(record.duration).unwrap_or(i64::MAX));
        let fields = json!({
            "endTime": end_time,
            "lastRenewalTime": now,
            "transactionHash": hash,
            "status": "active",
            "pendingTransactionHash": null,
            "pendingSince": null,
            "updatedAt": now,
        });
        match self.store.update(SUBSCRIPTIONS_COLLECTION, id, fields).await {
            Ok(()) => {
                info!(subscription = %id, %hash, end_time, "subscription renewed");
                self.notifier.notify(RENEWAL_SUCCESS_MESSAGE);
                true
            }
            Err(err) => {
                error!(
                    ?err,
                    subscription = %id,
                    %hash,
                    "renewal paid on chain but record update failed"
                );
                false
            }
        }
    }

    pub(super) async fn record_failure(&self, id: &str, failure: RenewalFailure, now: i64) {
        self.notifier.notify(failure.user_message());
        let fields = json!({
            "autoRenew": false,
            "pendingTransactionHash": null,
            "pendingSince": null,
            "updatedAt": now,
        });
        match self.store.update(SUBSCRIPTIONS_COLLECTION, id, fields).await {
            Ok(()) => info!(
                subscription = %id,
                failure = failure.as_str(),
                "auto-renew disabled after failed renewal"
            ),
            Err(err) => error!(
                ?err,
                subscription = %id,
                failure = failure.as_str(),
                "failed to disable auto-renew"
            ),
        }
    }
}

fn classify(id: &str, stage: &str, err: ChainError, fallback: RenewalFailure) -> RenewalFailure {
    let failure = if err.is_user_rejection() {
        RenewalFailure::UserRejected
    } else {
        fallback
    };
    warn!(?err, subscription = %id, stage, failure = failure.as_str(), "renewal call failed");
    failure
}
