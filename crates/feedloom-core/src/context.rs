use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::engine::UpdateEngine;
use crate::feed::{FeedParser, FeedRsParser, Fetcher, HttpFetcher};
use crate::scheduler::{SchedulerEvent, SchedulerService};
use crate::state::Store;
use crate::Result;

/// Wires the store, the engine and its collaborators for one process
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub engine: Arc<UpdateEngine>,
}

impl AppContext {
    /// Context with the HTTP fetcher and feed-rs parser
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.sync)?);
        Ok(Self::with_collaborators(config, fetcher, Arc::new(FeedRsParser)))
    }

    pub fn with_collaborators(
        config: AppConfig,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn FeedParser>,
    ) -> Self {
        let store = Arc::new(Store::new());
        let engine = Arc::new(UpdateEngine::new(Arc::clone(&store), fetcher, parser));

        Self {
            config: Arc::new(config),
            store,
            engine,
        }
    }

    /// Start the background poll loop, reporting each cycle on `events`
    pub fn start_polling_with_events(&self, events: mpsc::UnboundedSender<SchedulerEvent>) -> Poller {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scheduler = SchedulerService::new(
            Arc::clone(&self.engine),
            self.config.sync.poll_interval(),
        )
        .with_event_sender(events);

        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        Poller { shutdown_tx, handle }
    }
}

/// Handle to a running poll loop
pub struct Poller {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Ask the loop to stop and wait for it; an in-flight cycle finishes first
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Scheduler task join error: {}", e);
        }
    }
}
