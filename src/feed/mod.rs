//! Feed module for Gator.
//!
//! This module holds everything about feeds:
//! - Feed, follow and post models and their repositories
//! - The store seam consumed by the scraper
//! - HTTP fetching and RSS decoding
//! - The scrape cycle and the aggregation loop driving it

mod aggregator;
mod fetcher;
mod repository;
mod scraper;
mod store;
mod types;

pub use aggregator::{parse_interval, AggregateSummary, Aggregator};
pub use fetcher::{parse_document, validate_url, FeedFetcher};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scraper::{ScrapeOutcome, ScrapeReport, Scraper};
pub use store::FeedStore;
pub use types::{
    Feed, FeedDocument, FeedFollow, FeedFollowDetails, FeedItem, FeedWithOwner,
    InvalidDatePolicy, NewFeed, NewPost, Post, PostWithFeed,
};
