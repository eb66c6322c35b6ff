use thiserror::Error;

#[derive(Debug, Error)]
#[error("Markdown conversion failed: {0}")]
pub struct MarkdownError(String);

impl MarkdownError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Convert an HTML fragment to markdown using `htmd`.
pub fn to_markdown(html: &str) -> Result<String, MarkdownError> {
    htmd::convert(html)
        .map(|md| md.trim().to_string())
        .map_err(|e| MarkdownError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_paragraph() {
        let md = to_markdown("<h1>Title</h1><p>Hello <strong>world</strong></p>").unwrap();
        assert!(md.contains("# Title"));
        assert!(md.contains("Hello **world**"));
    }

    #[test]
    fn test_links_are_kept() {
        let md = to_markdown(r#"<p><a href="https://s/1">one</a></p>"#).unwrap();
        assert!(md.contains("[one](https://s/1)"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_markdown("").unwrap(), "");
    }
}
