use anyhow::Result;

use super::schema::Database;
use super::types::{ExtractedPage, InsertOutcome};

impl Database {
    // ========================================================================
    // Page Operations
    // ========================================================================

    /// Persist the extracted page for a link.
    ///
    /// At most one page exists per URL; a second insert (for example after a
    /// link was enqueued by both a poller and the backfill scan) is ignored.
    pub async fn insert_page(&self, url: &str, html: &str, content: &str) -> Result<InsertOutcome> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO pages (url, html, content, created_at)
            VALUES (?, ?, ?, ?)
        "#,
        )
        .bind(url)
        .bind(html)
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(InsertOutcome::from_rows_affected(result.rows_affected()))
    }

    /// Fetch the page stored for a URL
    pub async fn get_page(&self, url: &str) -> Result<Option<ExtractedPage>> {
        let page = sqlx::query_as::<_, ExtractedPage>(
            "SELECT url, html, content, created_at FROM pages WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(page)
    }

    /// Every stored page, oldest first
    pub async fn get_all_pages(&self) -> Result<Vec<ExtractedPage>> {
        let pages = sqlx::query_as::<_, ExtractedPage>(
            "SELECT url, html, content, created_at FROM pages ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(pages)
    }

    /// Replace the converted content of a page.
    ///
    /// Returns `false` when no page with this URL exists.
    pub async fn update_page_content(&self, url: &str, content: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE pages SET content = ? WHERE url = ?")
            .bind(content)
            .bind(url)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(url = %url, "Page content not updated (no such page)");
        }
        Ok(result.rows_affected() > 0)
    }

    /// Total number of stored pages
    pub async fn count_pages(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
