use thiserror::Error;
use url::Url;

use super::markdown::{to_markdown, MarkdownError};
use super::readability::{distill, DistillError};
use crate::util::{read_limited_bytes, BodyError};

const MAX_PAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// HTML fragment to markdown
pub type MarkdownConverter = fn(&str) -> Result<String, MarkdownError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Anything but 200 OK
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error(transparent)]
    Distill(#[from] DistillError),
    /// The conversion task panicked or was cancelled
    #[error("Conversion task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A fetched page and its converted content
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Raw document as served
    pub html: String,
    /// Markdown of the distilled content; empty if conversion failed
    pub markdown: String,
}

/// Fetches article pages and turns them into markdown.
///
/// Uses the timeouts configured on the client; nothing here bypasses them,
/// so an unreachable host eventually surfaces as [`ExtractError::Network`].
/// Parsing and conversion run on the blocking pool.
#[derive(Clone)]
pub struct PageExtractor {
    client: reqwest::Client,
    converter: MarkdownConverter,
}

impl PageExtractor {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            converter: to_markdown,
        }
    }

    /// Replace the markdown converter.
    pub fn with_converter(mut self, converter: MarkdownConverter) -> Self {
        self.converter = converter;
        self
    }

    pub async fn extract(&self, url: &str) -> Result<ExtractedContent, ExtractError> {
        let response = self.client.get(url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(ExtractError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_PAGE_SIZE).await?;
        let url = url.to_string();
        let converter = self.converter;

        let (html, markdown) = tokio::task::spawn_blocking(move || {
            let html = String::from_utf8_lossy(&bytes).into_owned();
            let markdown = convert_document_with(&html, &url, converter);
            (html, markdown)
        })
        .await?;

        Ok(ExtractedContent {
            html,
            markdown: markdown?,
        })
    }
}

/// Errors from [`render_markdown`]
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Distill(#[from] DistillError),
    #[error(transparent)]
    Markdown(#[from] MarkdownError),
}

/// Distill a document and convert the primary content to markdown.
pub fn render_markdown(html: &str, url: &str) -> Result<String, ConvertError> {
    render_markdown_with(html, url, to_markdown)
}

fn render_markdown_with(
    html: &str,
    url: &str,
    converter: MarkdownConverter,
) -> Result<String, ConvertError> {
    let page_url = Url::parse(url).ok();
    let distilled = distill(html, page_url.as_ref())?;
    Ok(converter(&distilled.content)?)
}

/// Like [`render_markdown`], but a markdown failure is not an error: it is
/// logged and yields an empty string so the raw document can still be stored.
pub fn convert_document(html: &str, url: &str) -> Result<String, DistillError> {
    convert_document_with(html, url, to_markdown)
}

/// [`convert_document`] with a caller-supplied markdown converter.
pub fn convert_document_with(
    html: &str,
    url: &str,
    converter: MarkdownConverter,
) -> Result<String, DistillError> {
    match render_markdown_with(html, url, converter) {
        Ok(markdown) => Ok(markdown),
        Err(ConvertError::Distill(e)) => Err(e),
        Err(ConvertError::Markdown(e)) => {
            tracing::warn!(url = %url, error = %e, "Markdown conversion failed, storing raw page only");
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><head><title>Post</title></head><body>
<article><h1>Post</h1><p>This article body is long enough to be selected as the primary content.</p></article>
</body></html>"#;

    #[tokio::test]
    async fn test_extract_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(reqwest::Client::new());
        let content = extractor
            .extract(&format!("{}/post", server.uri()))
            .await
            .unwrap();

        assert_eq!(content.html, PAGE);
        assert!(content.markdown.contains("# Post"));
        assert!(content.markdown.contains("primary content"));
    }

    #[tokio::test]
    async fn test_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(reqwest::Client::new());
        match extractor.extract(&server.uri()).await {
            Err(ExtractError::HttpStatus(204)) => {}
            other => panic!("Expected HttpStatus(204), got {:?}", other.map(|c| c.html)),
        }
    }

    #[tokio::test]
    async fn test_unreadable_page_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body><nav>menu</nav></body></html>"),
            )
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(reqwest::Client::new());
        match extractor.extract(&server.uri()).await {
            Err(ExtractError::Distill(DistillError::NoContent)) => {}
            other => panic!("Expected NoContent, got {:?}", other.map(|c| c.html)),
        }
    }

    fn failing_converter(_: &str) -> Result<String, MarkdownError> {
        Err(MarkdownError::new("converter rejected input"))
    }

    #[test]
    fn test_markdown_failure_yields_empty_content() {
        let md = convert_document_with(PAGE, "https://blog.example/post", failing_converter).unwrap();
        assert_eq!(md, "");

        assert!(matches!(
            render_markdown_with(PAGE, "https://blog.example/post", failing_converter),
            Err(ConvertError::Markdown(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_keeps_raw_html_when_markdown_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let extractor = PageExtractor::new(reqwest::Client::new()).with_converter(failing_converter);
        let content = extractor.extract(&server.uri()).await.unwrap();

        assert_eq!(content.html, PAGE);
        assert_eq!(content.markdown, "");
    }

    #[test]
    fn test_convert_document_uses_distilled_fragment() {
        let md = convert_document(PAGE, "https://blog.example/post").unwrap();
        assert!(md.starts_with("# Post"));
        assert!(!md.contains("<"));
    }
}
