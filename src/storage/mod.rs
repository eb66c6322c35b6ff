mod feeds;
mod items;
mod pages;
mod schema;
mod types;

pub use schema::Database;
pub use types::{
    CandidateItem, DatabaseError, ExtractedPage, Feed, FeedEntry, InsertOutcome, StoredItem,
};
