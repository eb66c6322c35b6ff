use anyhow::Result;
use rand::Rng;
use std::time::Duration;

use super::schema::Database;
use super::types::{Feed, FeedRow};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed. Returns the generated feed id.
    ///
    /// `refresh` defaults to the column default (one hour) when `None`.
    /// Intervals that do not fit the millisecond column are rejected.
    pub async fn add_feed(&self, slug: &str, url: &str, refresh: Option<Duration>) -> Result<String> {
        let refresh_ms = match refresh {
            Some(d) => i64::try_from(d.as_millis())
                .map_err(|_| anyhow::anyhow!("Refresh interval too large: {:?}", d))?,
            None => 3_600_000,
        };
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO feeds (id, slug, url, created_at, updated_at, refresh_ms)
            VALUES (?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&id)
        .bind(slug)
        .bind(url)
        .bind(now)
        .bind(now)
        .bind(refresh_ms)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Look up a feed by its source URL
    pub async fn find_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(
            r#"
            SELECT id, slug, url, created_at, updated_at, refresh_ms
            FROM feeds
            WHERE url = ?
            LIMIT 1
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| feed_from_row(r, Duration::ZERO)))
    }

    /// Look up a feed by its slug
    pub async fn get_feed_by_slug(&self, slug: &str) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(
            r#"
            SELECT id, slug, url, created_at, updated_at, refresh_ms
            FROM feeds
            WHERE slug = ?
            LIMIT 1
        "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| feed_from_row(r, Duration::ZERO)))
    }

    /// List every feed with a jittered refresh interval.
    ///
    /// Each interval gets a random extra `[0, jitter)` so pollers started
    /// together spread their fetches out. A non-positive stored interval is
    /// replaced with `default_refresh`.
    pub async fn list_feeds(&self, default_refresh: Duration, jitter: Duration) -> Result<Vec<Feed>> {
        let rows: Vec<FeedRow> = sqlx::query_as(
            r#"
            SELECT id, slug, url, created_at, updated_at, refresh_ms
            FROM feeds
            ORDER BY slug
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let feeds = rows
            .into_iter()
            .map(|row| {
                let mut feed = feed_from_row(row, default_refresh);
                feed.refresh_interval += random_jitter(jitter);
                feed
            })
            .collect();

        Ok(feeds)
    }
}

fn feed_from_row(
    (id, slug, url, created_at, updated_at, refresh_ms): FeedRow,
    default_refresh: Duration,
) -> Feed {
    let refresh_interval = if refresh_ms > 0 {
        Duration::from_millis(refresh_ms as u64)
    } else {
        default_refresh
    };

    Feed {
        id,
        slug,
        url,
        created_at,
        updated_at,
        refresh_interval,
    }
}

fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms > 0 {
        Duration::from_millis(rand::rng().random_range(0..max_ms))
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_feed_rejects_oversized_interval() {
        let db = Database::open(":memory:").await.unwrap();
        let err = db
            .add_feed("huge", "https://huge.example/rss", Some(Duration::from_secs(u64::MAX)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(db.find_feed_by_url("https://huge.example/rss").await.unwrap().is_none());

        // Largest representable interval is stored as given
        let max = Duration::from_millis(i64::MAX as u64);
        db.add_feed("max", "https://max.example/rss", Some(max))
            .await
            .unwrap();
        let feed = db.get_feed_by_slug("max").await.unwrap().unwrap();
        assert_eq!(feed.refresh_interval, max);
    }

    #[tokio::test]
    async fn test_add_and_find_feed() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .add_feed("hn", "https://news.example/rss", Some(Duration::from_secs(600)))
            .await
            .unwrap();

        let by_url = db
            .find_feed_by_url("https://news.example/rss")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_url.id, id);
        assert_eq!(by_url.slug, "hn");
        assert_eq!(by_url.refresh_interval, Duration::from_secs(600));

        let by_slug = db.get_feed_by_slug("hn").await.unwrap().unwrap();
        assert_eq!(by_slug, by_url);

        assert!(db.get_feed_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_feed_url_rejected() {
        let db = Database::open(":memory:").await.unwrap();
        db.add_feed("a", "https://dup.example/rss", None).await.unwrap();
        assert!(db.add_feed("b", "https://dup.example/rss", None).await.is_err());
    }

    #[tokio::test]
    async fn test_list_feeds_applies_jitter_within_bounds() {
        let db = Database::open(":memory:").await.unwrap();
        db.add_feed("a", "https://a.example/rss", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let jitter = Duration::from_secs(10);
        let feeds = db.list_feeds(Duration::from_secs(3600), jitter).await.unwrap();
        assert_eq!(feeds.len(), 1);
        let interval = feeds[0].refresh_interval;
        assert!(interval >= Duration::from_secs(60));
        assert!(interval < Duration::from_secs(70));
    }

    #[tokio::test]
    async fn test_non_positive_refresh_uses_default() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.add_feed("zero", "https://zero.example/rss", None).await.unwrap();
        sqlx::query("UPDATE feeds SET refresh_ms = 0 WHERE id = ?")
            .bind(&id)
            .execute(&db.pool)
            .await
            .unwrap();

        let feeds = db
            .list_feeds(Duration::from_secs(900), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(feeds[0].refresh_interval, Duration::from_secs(900));
    }

    #[test]
    fn test_random_jitter_zero() {
        assert_eq!(random_jitter(Duration::ZERO), Duration::ZERO);
    }
}
