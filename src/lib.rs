//! Gator - a command-line RSS feed aggregator.
//!
//! Users register feeds, follow them, and browse the newest posts. The `agg`
//! command polls the least recently fetched feed on a fixed interval and
//! stores its items as posts in SQLite.

pub mod commands;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;

pub use commands::{execute, App, Cli, Command};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{
    AggregateSummary, Aggregator, Feed, FeedFetcher, FeedStore, InvalidDatePolicy, NewFeed,
    NewPost, Post, ScrapeOutcome, ScrapeReport, Scraper,
};
