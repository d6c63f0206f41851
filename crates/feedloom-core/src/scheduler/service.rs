use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::engine::{PollSummary, UpdateEngine};

/// Events emitted by the scheduler after each poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Every registered feed has been polled once
    CycleCompleted {
        polled: u32,
        new_entries: u32,
        failed: u32,
    },
}

impl From<PollSummary> for SchedulerEvent {
    fn from(summary: PollSummary) -> Self {
        SchedulerEvent::CycleCompleted {
            polled: summary.polled,
            new_entries: summary.new_entries,
            failed: summary.failed,
        }
    }
}

/// Repeats the poll fan-out with a fixed delay after each cycle finishes
pub struct SchedulerService {
    engine: Arc<UpdateEngine>,
    interval: Duration,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl SchedulerService {
    /// Create a new scheduler service
    pub fn new(engine: Arc<UpdateEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            event_tx: None,
        }
    }

    /// Set the event sender for cycle notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, event: SchedulerEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send scheduler event: receiver dropped");
            }
        }
    }

    /// Run one poll cycle over every registered feed
    pub async fn step(&self) -> PollSummary {
        debug!("Running poll cycle");
        let summary = self.engine.poll_all_feeds().await;

        if summary.new_entries > 0 || summary.failed > 0 {
            info!(
                "Poll cycle: {} feeds, {} new entries, {} failed",
                summary.polled, summary.new_entries, summary.failed
            );
        }

        self.send_event(summary.into());
        summary
    }

    /// Poll until the shutdown flag turns true or its sender is dropped.
    ///
    /// The first cycle starts immediately. A cycle in progress is allowed to
    /// finish before shutdown is observed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if self.interval.is_zero() {
            info!("Background polling disabled (poll_interval_secs = 0)");
            let _ = shutdown.wait_for(|stop| *stop).await;
            return;
        }

        info!("Scheduler started: interval={}s", self.interval.as_secs());

        while !*shutdown.borrow() {
            self.step().await;

            if self.pause(&mut shutdown).await {
                break;
            }
        }

        info!("Scheduler stopped");
    }

    /// Sleep for the interval. Returns true if shutdown was requested meanwhile.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = tokio::time::sleep(self.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Scheduler received shutdown signal");
                        return true;
                    }
                }
            }
        }
    }
}
