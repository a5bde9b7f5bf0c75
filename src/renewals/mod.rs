pub mod api;
mod guard;
mod models;
mod reconciliation;
mod scheduler;
mod service;

pub use guard::{InFlightRenewals, RenewalGuard};
pub use models::{
    RenewalFailure, RenewalOutcome, SkipReason, SubscriptionRecord, SubscriptionStatus,
    TickReport, SUBSCRIPTIONS_COLLECTION,
};
pub use scheduler::{spawn, MonitorHandle};
pub use service::{
    MonitorContext, MonitorSettings, RenewalMonitor, LISTING_FAILURE_MESSAGE,
    RENEWAL_SUCCESS_MESSAGE,
};
