use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::service::RenewalMonitor;

/// Stops future ticks when `stop` is called. Renewals already running keep going.
pub struct MonitorHandle {
    ticker: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.ticker.abort();
        info!("renewal monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.ticker.is_finished()
    }
}

/// key: renewal-scheduler -> run the monitor on a fixed interval
pub fn spawn(monitor: RenewalMonitor) -> MonitorHandle {
    let period = monitor.settings().scan_interval;
    info!(interval_secs = period.as_secs(), "starting renewal monitor");

    let ticker = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let monitor = monitor.clone();
            tokio::spawn(async move {
                let now = Utc::now().timestamp();
                match monitor.process_tick(now).await {
                    Ok(report) => debug!(?report, "renewal tick finished"),
                    Err(err) => warn!(?err, "renewal tick failed"),
                }
            });
        }
    });

    MonitorHandle { ticker }
}
