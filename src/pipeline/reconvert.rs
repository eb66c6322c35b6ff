use anyhow::{Context, Result};

use crate::content::render_markdown;
use crate::storage::Database;

/// Outcome of a [`reconvert_pages`] run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconvertReport {
    /// Pages read from the store
    pub pages: usize,
    /// Pages whose content was rewritten
    pub updated: usize,
    /// Pages left untouched because conversion or the update failed
    pub failed: usize,
}

/// Re-run content conversion over every stored page.
///
/// Works from the raw documents already in the store; nothing is fetched.
/// A page that fails to convert keeps its previous content.
pub async fn reconvert_pages(db: &Database) -> Result<ReconvertReport> {
    let pages = db.get_all_pages().await.context("Failed to load pages")?;
    let mut report = ReconvertReport {
        pages: pages.len(),
        ..Default::default()
    };
    tracing::info!(pages = report.pages, "Reconverting stored pages");

    for page in pages {
        let markdown = match render_markdown(&page.html, &page.url) {
            Ok(markdown) => markdown,
            Err(e) => {
                tracing::warn!(url = %page.url, error = %e, "Reconversion failed, keeping previous content");
                report.failed += 1;
                continue;
            }
        };

        match db.update_page_content(&page.url, &markdown).await {
            Ok(_) => report.updated += 1,
            Err(e) => {
                tracing::warn!(url = %page.url, error = %e, "Failed to store reconverted content");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        updated = report.updated,
        failed = report.failed,
        "Reconversion complete"
    );
    Ok(report)
}
