//! The ingestion pipeline.
//!
//! ```text
//!   FeedPoller (one per feed) ──┐
//!                               ├──> WorkQueue ──> ExtractionWorker x N ──> Database
//!   backfill (once at start) ───┘
//! ```
//!
//! Components only talk to each other through the queue and the store.
//! [`Pipeline::shutdown`] hands control to the [`ShutdownCoordinator`],
//! which closes the queue and waits for the workers.

mod backfill;
mod queue;
mod reconvert;
mod shutdown;
mod worker;

pub use backfill::run_backfill;
pub use queue::{QueueError, WorkQueue};
pub use reconvert::{reconvert_pages, ReconvertReport};
pub use shutdown::{shutdown_signal, PipelineState, ShutdownCoordinator};
pub use worker::{spawn_workers, ExtractionWorker, WorkerStats};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::content::PageExtractor;
use crate::feed::{FeedFetcher, FeedPoller};
use crate::storage::Database;

/// Build the HTTP client shared by pollers and workers.
pub fn http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.connect_timeout())
        .timeout(config.page_timeout())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("Failed to create HTTP client")
}

/// A running pipeline: workers, pollers and the startup backfill.
pub struct Pipeline {
    queue: WorkQueue,
    coordinator: ShutdownCoordinator,
    workers: Vec<JoinHandle<WorkerStats>>,
    pollers: Vec<JoinHandle<()>>,
    backfill: Option<JoinHandle<usize>>,
}

impl Pipeline {
    /// Start every component.
    ///
    /// # Errors
    ///
    /// Fails before spawning anything if the feed list cannot be read, since
    /// no component can make progress without the store.
    pub async fn start(db: Database, client: reqwest::Client, config: &Config) -> Result<Self> {
        let feeds = db
            .list_feeds(config.default_refresh(), config.refresh_jitter())
            .await
            .context("Failed to list feeds")?;
        tracing::info!(feeds = feeds.len(), workers = config.workers, "Starting pipeline");

        let queue = WorkQueue::new(config.queue_capacity);
        let coordinator = ShutdownCoordinator::new(queue.clone());

        let extractor = PageExtractor::new(client.clone());
        let workers = spawn_workers(config.workers, &db, &extractor, &queue);

        let backfill = {
            let db = db.clone();
            let queue = queue.clone();
            tokio::spawn(async move { run_backfill(&db, &queue).await })
        };

        let fetcher = FeedFetcher::new(client, config.feed_timeout());
        let pollers = feeds
            .into_iter()
            .map(|feed| {
                FeedPoller::new(
                    db.clone(),
                    fetcher.clone(),
                    queue.clone(),
                    feed,
                    coordinator.poller_token(),
                )
                .spawn()
            })
            .collect();

        Ok(Self {
            queue,
            coordinator,
            workers,
            pollers,
            backfill: Some(backfill),
        })
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn state(&self) -> PipelineState {
        self.coordinator.state()
    }

    pub fn poller_count(&self) -> usize {
        self.pollers.len()
    }

    /// Wait for the startup backfill to finish. Returns the number of links
    /// it enqueued; later calls return 0.
    pub async fn wait_for_backfill(&mut self) -> usize {
        match self.backfill.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Backfill task panicked");
                0
            }),
            None => 0,
        }
    }

    /// Drain the pipeline and wait for the workers to exit.
    ///
    /// Pollers are told to stop but not awaited; they hold no unflushed
    /// state.
    pub async fn shutdown(self) -> WorkerStats {
        let Self {
            coordinator,
            workers,
            pollers,
            ..
        } = self;
        drop(pollers);
        coordinator.drain(workers).await
    }
}
