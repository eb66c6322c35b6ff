//! feedflow - continuous feed ingestion with readable page extraction.
//!
//! Per-feed pollers discover new entries and push their links onto a bounded
//! work queue. A small pool of extraction workers drains the queue, fetches
//! each page, distills its primary content, converts it to markdown and
//! stores the result. A backfill scan at startup re-enqueues links whose
//! extraction never completed.

pub mod config;
pub mod content;
pub mod feed;
pub mod pipeline;
pub mod storage;
pub mod util;
