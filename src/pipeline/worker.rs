use tokio::task::JoinHandle;

use super::queue::WorkQueue;
use crate::content::PageExtractor;
use crate::storage::{Database, InsertOutcome};

/// Per-worker counters reported when the worker exits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Pages fetched, converted and stored
    pub extracted: usize,
    /// Links whose page was already stored
    pub skipped: usize,
    /// Links abandoned after an error
    pub failed: usize,
}

impl WorkerStats {
    pub fn merge(self, other: WorkerStats) -> WorkerStats {
        WorkerStats {
            extracted: self.extracted + other.extracted,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
        }
    }
}

/// Takes links from the work queue one at a time until the queue closes.
///
/// A link already taken when the queue closes is finished; links still
/// buffered are left behind. Failures are logged and the link is abandoned.
/// Either way the backfill scan on the next start retries anything still
/// missing a page.
pub struct ExtractionWorker {
    id: usize,
    db: Database,
    extractor: PageExtractor,
    queue: WorkQueue,
}

impl ExtractionWorker {
    pub fn new(id: usize, db: Database, extractor: PageExtractor, queue: WorkQueue) -> Self {
        Self {
            id,
            db,
            extractor,
            queue,
        }
    }

    pub fn spawn(self) -> JoinHandle<WorkerStats> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) -> WorkerStats {
        tracing::debug!(worker = self.id, "Extraction worker waiting for links");
        let mut stats = WorkerStats::default();

        while let Some(link) = self.queue.take_unless_closed().await {
            match self.process(&link).await {
                Some(InsertOutcome::Inserted) => stats.extracted += 1,
                Some(InsertOutcome::AlreadyExists) => stats.skipped += 1,
                None => stats.failed += 1,
            }
        }

        tracing::debug!(
            worker = self.id,
            extracted = stats.extracted,
            skipped = stats.skipped,
            failed = stats.failed,
            "Work queue closed, extraction worker exiting"
        );
        stats
    }

    /// Extract and store one link. `None` means the link was abandoned.
    async fn process(&self, link: &str) -> Option<InsertOutcome> {
        let content = match self.extractor.extract(link).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(worker = self.id, url = %link, error = %e, "Failed to extract page");
                return None;
            }
        };

        match self.db.insert_page(link, &content.html, &content.markdown).await {
            Ok(InsertOutcome::Inserted) => {
                tracing::info!(worker = self.id, url = %link, "Added page content");
                Some(InsertOutcome::Inserted)
            }
            Ok(InsertOutcome::AlreadyExists) => {
                tracing::debug!(worker = self.id, url = %link, "Page already stored");
                Some(InsertOutcome::AlreadyExists)
            }
            Err(e) => {
                tracing::warn!(worker = self.id, url = %link, error = %e, "Failed to store page");
                None
            }
        }
    }
}

/// Spawn `count` identical workers sharing the store and the queue.
pub fn spawn_workers(
    count: usize,
    db: &Database,
    extractor: &PageExtractor,
    queue: &WorkQueue,
) -> Vec<JoinHandle<WorkerStats>> {
    (0..count)
        .map(|id| ExtractionWorker::new(id, db.clone(), extractor.clone(), queue.clone()).spawn())
        .collect()
}
