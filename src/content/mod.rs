//! Page content extraction.
//!
//! Fetches an article page, distills its primary content with [`distill`]
//! and converts the fragment to markdown with [`to_markdown`].

mod extract;
mod markdown;
mod readability;

pub use extract::{
    convert_document, convert_document_with, render_markdown, ConvertError, ExtractError,
    ExtractedContent, MarkdownConverter, PageExtractor,
};
pub use markdown::{to_markdown, MarkdownError};
pub use readability::{distill, DistillError, Distilled, MAX_NESTING_DEPTH};
