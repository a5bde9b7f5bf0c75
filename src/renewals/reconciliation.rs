use tracing::{info, warn};

use super::models::{RenewalFailure, RenewalOutcome, SubscriptionRecord};
use super::service::{RenewalMonitor, Session};

impl RenewalMonitor {
    /// key: renewal-outbox -> settle a renewal submitted on an earlier tick
    pub(super) async fn reconcile_pending(
        &self,
        session: &Session,
        id: &str,
        record: &SubscriptionRecord,
        hash: &str,
        now: i64,
    ) -> RenewalOutcome {
        match session.client.transaction_receipt(hash).await {
            Ok(Some(receipt)) if receipt.succeeded => {
                info!(
                    subscription = %id,
                    %hash,
                    pending_since = ?record.pending_since,
                    "pending renewal confirmed"
                );
                if self.record_success(id, record, hash, now).await {
                    RenewalOutcome::Renewed
                } else {
                    RenewalOutcome::Pending
                }
            }
            Ok(Some(_)) => {
                warn!(subscription = %id, %hash, "pending renewal reverted");
                self.record_failure(id, RenewalFailure::Other, now).await;
                RenewalOutcome::Failed(RenewalFailure::Other)
            }
            Ok(None) if self.pending_expired(record, now) => {
                warn!(
                    subscription = %id,
                    %hash,
                    pending_since = ?record.pending_since,
                    "pending renewal was never mined"
                );
                self.record_failure(id, RenewalFailure::Other, now).await;
                RenewalOutcome::Failed(RenewalFailure::Other)
            }
            Ok(None) => {
                info!(
                    subscription = %id,
                    %hash,
                    pending_since = ?record.pending_since,
                    "renewal still pending"
                );
                RenewalOutcome::Pending
            }
            Err(err) => {
                warn!(?err, subscription = %id, %hash, "failed to check pending renewal");
                RenewalOutcome::Pending
            }
        }
    }

    /// A record without `pendingSince` cannot be aged and counts as expired.
    fn pending_expired(&self, record: &SubscriptionRecord, now: i64) -> bool {
        let timeout =
            i64::try_from(self.settings().pending_timeout.as_secs()).unwrap_or(i64::MAX);
        record
            .pending_since
            .map_or(true, |since| now.saturating_sub(since) > timeout)
    }
}
