//! Feed polling: fetching, parsing and ingesting feed documents.
//!
//! - `parser` - converts RSS/Atom/JSON Feed documents into candidate items
//!   using the `feed-rs` crate
//! - `fetcher` - HTTP retrieval with a hard timeout and size limit
//! - `poller` - the per-feed loop that deduplicates entries through the
//!   store and forwards new links to the work queue

mod fetcher;
mod parser;
mod poller;

pub use fetcher::{FeedFetcher, FetchError};
pub use parser::{parse_feed, ParseResult};
pub use poller::{FeedPoller, PollReport};
