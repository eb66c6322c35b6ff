use std::time::Duration;
use thiserror::Error;

use crate::feed::parser::{parse_feed, ParseResult};
use crate::storage::Feed;
use crate::util::{read_limited_bytes, BodyError};

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request and body read together exceeded the fetch timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Body could not be read in full
    #[error(transparent)]
    Body(#[from] BodyError),
    /// Document could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Fetches and parses feed documents with a hard timeout.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch the feed document and parse it into candidate items.
    ///
    /// The timeout bounds the whole exchange, body included, so a server
    /// that trickles bytes cannot stall a poller past it.
    pub async fn fetch(&self, feed: &Feed) -> Result<ParseResult, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.download(&feed.url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let result = parse_feed(&bytes, &feed.id).map_err(|e| FetchError::Parse(e.to_string()))?;

        if result.skipped > 0 {
            tracing::debug!(
                feed = %feed.slug,
                skipped = result.skipped,
                "Entries without a link skipped"
            );
        }

        Ok(result)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        Ok(read_limited_bytes(response, MAX_FEED_SIZE).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>Test</title><link>https://s/1</link></item>
</channel></rss>"#;

    fn feed_for(url: String) -> Feed {
        Feed {
            id: "feed-1".to_string(),
            slug: "test".to_string(),
            url,
            created_at: 0,
            updated_at: 0,
            refresh_interval: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
        let result = fetcher
            .fetch(&feed_for(format!("{}/feed", mock_server.uri())))
            .await
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].feed_id, "feed-1");
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
        match fetcher.fetch(&feed_for(mock_server.uri())).await {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other.map(|r| r.items.len())),
        }
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
        match fetcher.fetch(&feed_for(mock_server.uri())).await {
            Err(FetchError::Parse(_)) => {}
            other => panic!("Expected Parse error, got {:?}", other.map(|r| r.items.len())),
        }
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(reqwest::Client::new(), Duration::from_millis(200));
        match fetcher.fetch(&feed_for(mock_server.uri())).await {
            Err(FetchError::Timeout(_)) => {}
            other => panic!("Expected Timeout, got {:?}", other.map(|r| r.items.len())),
        }
    }
}
