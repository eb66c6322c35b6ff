use anyhow::Result;

use super::schema::Database;
use super::types::{CandidateItem, FeedEntry, InsertOutcome, StoredItem};

impl Database {
    // ========================================================================
    // Item Operations
    // ========================================================================

    /// Store a candidate item unless its link is already known.
    ///
    /// Uses `INSERT OR IGNORE` against the UNIQUE `link` column, so two
    /// pollers racing on the same link produce exactly one row and the loser
    /// sees [`InsertOutcome::AlreadyExists`].
    pub async fn insert_item_if_absent(&self, item: &CandidateItem) -> Result<InsertOutcome> {
        let id = uuid::Uuid::new_v4().to_string();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO records
                (id, feed_id, title, description, content, published_at, link)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&id)
        .bind(&item.feed_id)
        .bind(&item.title)
        .bind(&item.summary)
        .bind(&item.content)
        .bind(item.published_at)
        .bind(&item.link)
        .execute(&self.pool)
        .await?;

        Ok(InsertOutcome::from_rows_affected(result.rows_affected()))
    }

    /// Links of stored items that have no extracted page yet.
    ///
    /// Left anti-join on `records.link = pages.url`; each link appears once.
    pub async fn find_links_without_page(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT r.link
            FROM records r
            LEFT JOIN pages p ON r.link = p.url
            WHERE p.url IS NULL
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(link,)| link).collect())
    }

    /// Fetch a stored item by its link
    pub async fn get_item_by_link(&self, link: &str) -> Result<Option<StoredItem>> {
        let item = sqlx::query_as::<_, StoredItem>(
            r#"
            SELECT id, feed_id, title, description AS summary, content, published_at, link
            FROM records
            WHERE link = ?
        "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Items of a feed that have extracted content, newest first.
    ///
    /// `content` holds the page's markdown rather than the feed snippet; this
    /// is what the normalized feed republishes.
    pub async fn get_feed_items(&self, feed_id: &str) -> Result<Vec<FeedEntry>> {
        let entries = sqlx::query_as::<_, FeedEntry>(
            r#"
            SELECT r.id, r.title, r.description AS summary, p.content,
                   r.published_at, r.link
            FROM records r
            JOIN pages p ON p.url = r.link
            WHERE r.feed_id = ?
            ORDER BY r.published_at DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Total number of stored items
    pub async fn count_items(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn db_with_feed() -> (Database, String) {
        let db = Database::open(":memory:").await.unwrap();
        let feed_id = db.add_feed("test", "https://feed.example/rss", None).await.unwrap();
        (db, feed_id)
    }

    fn candidate(feed_id: &str, link: &str) -> CandidateItem {
        CandidateItem {
            feed_id: feed_id.to_string(),
            title: format!("Title for {link}"),
            summary: "Summary".to_string(),
            content: "<p>Snippet</p>".to_string(),
            link: link.to_string(),
            published_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_insert_same_link_twice_is_idempotent() {
        let (db, feed_id) = db_with_feed().await;
        let item = candidate(&feed_id, "https://s/1");

        let first = db.insert_item_if_absent(&item).await.unwrap();
        let second = db.insert_item_if_absent(&item).await.unwrap();

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(db.count_items().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_item_with_unknown_feed_is_an_error() {
        let (db, _) = db_with_feed().await;
        let item = candidate("no-such-feed", "https://s/orphan");

        assert!(db.insert_item_if_absent(&item).await.is_err());
        assert_eq!(db.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_item_by_link() {
        let (db, feed_id) = db_with_feed().await;
        db.insert_item_if_absent(&candidate(&feed_id, "https://s/a"))
            .await
            .unwrap();

        let stored = db.get_item_by_link("https://s/a").await.unwrap().unwrap();
        assert_eq!(stored.feed_id, feed_id);
        assert_eq!(stored.summary, "Summary");
        assert_eq!(stored.published_at, 1_700_000_000);
        assert!(db.get_item_by_link("https://s/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_links_without_page_is_anti_join() {
        let (db, feed_id) = db_with_feed().await;
        for link in ["https://s/1", "https://s/2", "https://s/3"] {
            db.insert_item_if_absent(&candidate(&feed_id, link)).await.unwrap();
        }
        db.insert_page("https://s/2", "<html></html>", "body").await.unwrap();

        let mut links = db.find_links_without_page().await.unwrap();
        links.sort();
        assert_eq!(links, vec!["https://s/1".to_string(), "https://s/3".to_string()]);
    }

    #[tokio::test]
    async fn test_feed_items_only_include_extracted() {
        let (db, feed_id) = db_with_feed().await;
        db.insert_item_if_absent(&candidate(&feed_id, "https://s/1")).await.unwrap();
        db.insert_item_if_absent(&candidate(&feed_id, "https://s/2")).await.unwrap();
        db.insert_page("https://s/1", "<html>raw</html>", "# Distilled").await.unwrap();

        let entries = db.get_feed_items(&feed_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://s/1");
        assert_eq!(entries[0].content, "# Distilled");
    }
}
