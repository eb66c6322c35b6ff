use anyhow::Result;
use feed_rs::parser;

use crate::storage::CandidateItem;
use crate::util::strip_tracking_params;

/// Entries parsed from one feed document
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Candidate items in source-document order
    pub items: Vec<CandidateItem>,
    /// Entries dropped because they carry no link
    pub skipped: usize,
}

/// Parse an RSS, Atom or JSON Feed document into candidate items.
///
/// Links are canonicalized with [`strip_tracking_params`]. The publication
/// time falls back to the entry's update time, then to the current time.
pub fn parse_feed(bytes: &[u8], feed_id: &str) -> Result<ParseResult> {
    let feed = parser::parse(bytes)?;
    let now = chrono::Utc::now().timestamp();

    let mut result = ParseResult::default();
    for entry in feed.entries {
        let Some(link) = entry_link(&entry.links) else {
            result.skipped += 1;
            continue;
        };

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.timestamp())
            .unwrap_or(now);

        result.items.push(CandidateItem {
            feed_id: feed_id.to_string(),
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            summary: entry.summary.map(|s| s.content).unwrap_or_default(),
            content: entry.content.and_then(|c| c.body).unwrap_or_default(),
            link: strip_tracking_params(&link),
            published_at,
        });
    }

    Ok(result)
}

/// The entry's article link: the first `alternate` (or untyped) link, else
/// whatever link comes first. Atom entries often list `replies`, `edit` or
/// `self` links ahead of the article itself.
fn entry_link(links: &[feed_rs::model::Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}
