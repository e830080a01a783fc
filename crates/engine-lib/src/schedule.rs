//! Periodic analysis loop
//!
//! Drives runs on a fixed interval with jitter, services manual scan
//! triggers from the API, and shuts down cleanly on the broadcast signal.
//! Overlap between scheduled invocations is prevented by the loop itself:
//! runs execute inline, one at a time.

use crate::config::{RunConfig, SchedulerAction};
use crate::report::ReportStore;
use crate::run::AnalysisRunner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{error, info};

/// Configuration for the analysis loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Base interval between scheduled runs (default: 6 hours)
    pub interval: Duration,
    /// Maximum jitter added to the interval (default: 5 minutes)
    pub jitter: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6 * 60 * 60),
            jitter: Duration::from_secs(5 * 60),
        }
    }
}

/// Manual scan request from the API
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Override the configured dry-run flag for this run only
    pub dry_run: Option<bool>,
    /// Service a scheduled stop/start window with this run
    pub scheduler_action: Option<SchedulerAction>,
}

pub struct AnalysisLoop {
    runner: Arc<AnalysisRunner>,
    run_config: RunConfig,
    config: LoopConfig,
    store: ReportStore,
    trigger_rx: mpsc::Receiver<ScanRequest>,
}

impl AnalysisLoop {
    /// Create the loop and the sender used to trigger manual scans
    pub fn new(
        runner: Arc<AnalysisRunner>,
        run_config: RunConfig,
        config: LoopConfig,
        store: ReportStore,
    ) -> (Self, mpsc::Sender<ScanRequest>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(4);
        let analysis_loop = Self {
            runner,
            run_config,
            config,
            store,
            trigger_rx,
        };
        (analysis_loop, trigger_tx)
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting analysis loop"
        );

        let mut ticker = interval(self.current_interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.execute(self.run_config.clone()).await;
                    ticker = interval(self.current_interval());
                }
                Some(request) = self.trigger_rx.recv() => {
                    let mut config = self.run_config.clone();
                    if let Some(dry_run) = request.dry_run {
                        config.dry_run = dry_run;
                    }
                    if request.scheduler_action.is_some() {
                        config.scheduler_action = request.scheduler_action;
                    }
                    self.execute(config).await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down analysis loop");
                    break;
                }
            }
        }
    }

    async fn execute(&self, config: RunConfig) {
        match self.runner.run(&config).await {
            Ok(report) => self.store.publish(report).await,
            Err(e) => error!(error = %e, "Analysis run failed"),
        }
    }

    /// Interval plus jitter to avoid thundering-herd load on the gateway
    fn current_interval(&self) -> Duration {
        let jitter_ms = rand_jitter(self.config.jitter.as_millis() as u64);
        self.config.interval + Duration::from_millis(jitter_ms)
    }
}

/// Generate a jitter value between 0 and max_ms
fn rand_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    now % max_ms
}
