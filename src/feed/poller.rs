use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::feed::fetcher::FeedFetcher;
use crate::pipeline::{QueueError, WorkQueue};
use crate::storage::{CandidateItem, Database, Feed, InsertOutcome};

/// Outcome counts of one fetch-and-ingest cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Entries parsed from the feed document
    pub entries: usize,
    /// Entries stored for the first time
    pub inserted: usize,
    /// New links handed to the work queue
    pub forwarded: usize,
    /// New links that could not be enqueued because the queue was closed
    pub dropped: usize,
    /// Entries skipped because the store rejected them
    pub failed: usize,
}

/// Long-lived polling loop for a single feed.
///
/// Each cycle fetches the feed, inserts every entry that is not yet known
/// and forwards the new links to the work queue in document order, then
/// sleeps for the feed's refresh interval. The loop only ends when the
/// shutdown token is cancelled.
pub struct FeedPoller {
    db: Database,
    fetcher: FeedFetcher,
    queue: WorkQueue,
    feed: Feed,
    shutdown: CancellationToken,
}

impl FeedPoller {
    pub fn new(
        db: Database,
        fetcher: FeedFetcher,
        queue: WorkQueue,
        feed: Feed,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            db,
            fetcher,
            queue,
            feed,
            shutdown,
        }
    }

    /// Run the poller on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll forever, stopping at the next fetch or sleep after cancellation.
    ///
    /// An ingest already in progress runs to completion so that stored
    /// items and their enqueue attempts stay paired; links refused by a
    /// closed queue are picked up by the next backfill.
    pub async fn run(self) {
        tracing::info!(
            feed = %self.feed.slug,
            url = %self.feed.url,
            refresh_secs = self.feed.refresh_interval.as_secs(),
            "Starting feed poller"
        );

        loop {
            let items = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                items = self.fetch_items() => items,
            };

            let report = self.ingest(items).await;
            tracing::info!(
                feed = %self.feed.slug,
                new = report.inserted,
                total = report.entries,
                failed = report.failed,
                dropped = report.dropped,
                sleep_ms = self.feed.refresh_interval.as_millis() as u64,
                "Feed cycle complete"
            );

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                _ = tokio::time::sleep(self.feed.refresh_interval) => {}
            }
        }

        tracing::debug!(feed = %self.feed.slug, "Feed poller stopped");
    }

    /// Run a single fetch-and-ingest cycle.
    pub async fn poll_once(&self) -> PollReport {
        let items = self.fetch_items().await;
        self.ingest(items).await
    }

    /// Fetch failures are treated as an empty batch for this cycle.
    async fn fetch_items(&self) -> Vec<CandidateItem> {
        match self.fetcher.fetch(&self.feed).await {
            Ok(result) => result.items,
            Err(e) => {
                tracing::warn!(
                    feed = %self.feed.slug,
                    url = %self.feed.url,
                    error = %e,
                    "Failed to fetch feed"
                );
                Vec::new()
            }
        }
    }

    async fn ingest(&self, items: Vec<CandidateItem>) -> PollReport {
        let mut report = PollReport {
            entries: items.len(),
            ..PollReport::default()
        };

        for item in items {
            match self.db.insert_item_if_absent(&item).await {
                Ok(InsertOutcome::Inserted) => {
                    report.inserted += 1;
                    match self.queue.enqueue(item.link).await {
                        Ok(()) => report.forwarded += 1,
                        Err(QueueError::Closed(link)) => {
                            report.dropped += 1;
                            tracing::warn!(
                                feed = %self.feed.slug,
                                url = %link,
                                "Work queue closed, dropping link until next backfill"
                            );
                        }
                    }
                }
                Ok(InsertOutcome::AlreadyExists) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        feed = %self.feed.slug,
                        url = %item.link,
                        error = %e,
                        "Failed to store feed item"
                    );
                }
            }
        }

        report
    }
}
