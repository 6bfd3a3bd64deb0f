// libs/automation-cell/src/services/runner.rs
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use shared_config::AppConfig;

use crate::services::generation::SlotAutomationService;

const DAILY_TICK_SECONDS: u64 = 24 * 60 * 60;
const WEEKLY_TICK_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Background driver for the two cron-like generation triggers. The first
/// tick of each interval fires immediately, so a fresh deployment
/// materializes its window on startup. Runs use the system actor; there is
/// no user token in this path.
pub struct AutomationRunner {
    config: Arc<AppConfig>,
}

impl AutomationRunner {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!("Starting slot generation automation runner");

        let daily_config = self.config.clone();
        let daily = tokio::spawn(async move {
            let service = SlotAutomationService::new(&daily_config);
            let mut tick = interval(Duration::from_secs(DAILY_TICK_SECONDS));

            loop {
                tick.tick().await;
                let summary = service.run_daily(None).await;
                if summary.errored > 0 {
                    error!(
                        "Daily generation completed with {} errored dates",
                        summary.errored
                    );
                }
            }
        });

        let weekly_config = self.config.clone();
        let weekly = tokio::spawn(async move {
            let service = SlotAutomationService::new(&weekly_config);
            let mut tick = interval(Duration::from_secs(WEEKLY_TICK_SECONDS));

            loop {
                tick.tick().await;
                let summary = service.run_weekly(None).await;
                if summary.errored > 0 {
                    error!(
                        "Weekly generation completed with {} errored dates",
                        summary.errored
                    );
                }
            }
        });

        vec![daily, weekly]
    }
}
