use super::queue::{QueueError, WorkQueue};
use crate::storage::Database;

/// Re-enqueue every stored link that has no extracted page.
///
/// Runs once at startup so extraction interrupted by a crash or a failed
/// fetch is retried. A failing store query is logged and nothing is
/// enqueued; the next start scans again. Returns the number of links
/// enqueued.
pub async fn run_backfill(db: &Database, queue: &WorkQueue) -> usize {
    let links = match db.find_links_without_page().await {
        Ok(links) => links,
        Err(e) => {
            tracing::error!(error = %e, "Backfill scan failed, nothing re-enqueued");
            return 0;
        }
    };

    if links.is_empty() {
        tracing::debug!("Backfill found no links missing content");
        return 0;
    }

    tracing::info!(pending = links.len(), "Backfilling links without extracted content");

    let total = links.len();
    let mut enqueued = 0;
    for link in links {
        if let Err(QueueError::Closed(link)) = queue.enqueue(link).await {
            tracing::warn!(
                url = %link,
                remaining = total - enqueued,
                "Work queue closed during backfill, stopping"
            );
            break;
        }
        enqueued += 1;
    }

    enqueued
}
