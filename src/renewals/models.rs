use serde::{Deserialize, Deserializer, Serialize};

pub const SUBSCRIPTIONS_COLLECTION: &str = "userSubscriptions";

/// key: renewal-models -> subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

/// key: renewal-models -> user subscription document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub user_id: String,
    #[serde(default)]
    pub service_id: Option<i64>,
    #[serde(deserialize_with = "price_string")]
    pub price: String,
    /// Seconds added to `endTime` on every renewal.
    #[serde(deserialize_with = "duration_seconds")]
    pub duration: u64,
    pub end_time: i64,
    #[serde(default)]
    pub start_time: Option<i64>,
    pub auto_renew: bool,
    #[serde(default)]
    pub is_cancelled: bool,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub last_renewal_time: Option<i64>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub pending_transaction_hash: Option<String>,
    #[serde(default)]
    pub pending_since: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl SubscriptionRecord {
    pub fn is_auto_renewing(&self) -> bool {
        self.auto_renew && !self.is_cancelled && self.status == SubscriptionStatus::Active
    }

    /// True when `0 < endTime - now <= window_secs`.
    pub fn within_renewal_window(&self, now: i64, window_secs: i64) -> bool {
        self.end_time
            .checked_sub(now)
            .map_or(false, |remaining| remaining > 0 && remaining <= window_secs)
    }

    pub fn is_due_for_renewal(&self, now: i64, window_secs: i64) -> bool {
        self.is_auto_renewing()
            && self.pending_transaction_hash.is_none()
            && self.within_renewal_window(now, window_secs)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Text(String),
    Number(serde_json::Number),
}

fn price_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawPrice::deserialize(deserializer)? {
        RawPrice::Text(text) => text,
        RawPrice::Number(number) => number.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Whole(u64),
    Fractional(f64),
}

fn duration_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Whole(seconds) => Ok(seconds),
        RawDuration::Fractional(seconds) if seconds.is_finite() && seconds >= 0.0 => {
            Ok(seconds.ceil() as u64)
        }
        RawDuration::Fractional(seconds) => Err(serde::de::Error::custom(format!(
            "duration must be a non-negative number of seconds, got {seconds}"
        ))),
    }
}

/// key: renewal-failure -> user-facing categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalFailure {
    UserRejected,
    GasEstimation,
    Other,
}

impl RenewalFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalFailure::UserRejected => "user_rejected",
            RenewalFailure::GasEstimation => "gas_estimation",
            RenewalFailure::Other => "other",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            RenewalFailure::UserRejected => {
                "Auto-renewal failed: Transaction was rejected. Auto-renew has been disabled for this subscription."
            }
            RenewalFailure::GasEstimation => {
                "Auto-renewal failed: Gas estimation failed, the renewal call would not succeed. Auto-renew has been disabled for this subscription."
            }
            RenewalFailure::Other => {
                "Auto-renewal failed: Please check your wallet connection and make sure you have enough balance. Auto-renew has been disabled for this subscription."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    Renewed,
    Pending,
    Failed(RenewalFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingIdentity,
    MissingContract,
    MissingClient,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingIdentity => "missing_identity",
            SkipReason::MissingContract => "missing_contract",
            SkipReason::MissingClient => "missing_chain_client",
        }
    }
}

/// key: renewal-monitor -> per-tick summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub skipped: Option<SkipReason>,
    pub candidates: usize,
    pub attempted: usize,
    pub renewed: usize,
    pub failed: usize,
    pub pending: usize,
    pub reconciled: usize,
}
