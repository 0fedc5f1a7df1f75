use crate::services::LifecycleService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info};

/// Background task that periodically activates equbs that have filled up
pub struct ActivationMonitor {
    lifecycle: Arc<LifecycleService>,
    interval: Duration,
}

impl ActivationMonitor {
    /// Create a new monitor
    ///
    /// # Arguments
    /// * `lifecycle` - Lifecycle service performing the activation
    /// * `interval` - How often to sweep Open equbs
    pub fn new(lifecycle: Arc<LifecycleService>, interval: Duration) -> Self {
        Self {
            lifecycle,
            interval,
        }
    }

    /// Start the monitor loop. Never returns.
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        info!("Activation monitor started, sweeping every {:?}", self.interval);

        loop {
            interval.tick().await;
            self.run_once().await;
        }
    }

    /// Run a single sweep, logging the outcome
    pub async fn run_once(&self) -> usize {
        match self.lifecycle.sweep().await {
            Ok(0) => {
                debug!("Activation sweep found nothing to activate");
                0
            }
            Ok(count) => {
                info!("Activation sweep activated {} equbs", count);
                count
            }
            Err(e) => {
                error!("Activation sweep failed: {}", e);
                0
            }
        }
    }
}
