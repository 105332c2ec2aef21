//! One scrape cycle: pick a feed, stamp it, fetch it, store its items.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::fetcher::FeedFetcher;
use super::store::FeedStore;
use super::types::{Feed, InvalidDatePolicy, NewPost};
use crate::datetime::parse_pub_date;
use crate::{GatorError, Result};

/// Result of a successful scrape cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    /// The store has no feeds.
    Idle,
    /// A feed was fetched.
    Scraped(ScrapeReport),
}

/// What happened to one feed during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeReport {
    /// The feed as selected (before it was stamped).
    pub feed: Feed,
    /// Channel title from the fetched document.
    pub channel_title: String,
    /// Posts stored.
    pub inserted: usize,
    /// Items not stored (insert failures, and bad dates under `Skip`).
    pub skipped: usize,
}

/// Runs scrape cycles against a store.
pub struct Scraper<S> {
    store: S,
    fetcher: FeedFetcher,
    policy: InvalidDatePolicy,
}

impl<S: FeedStore> Scraper<S> {
    /// Create a scraper using the default `Abort` date policy.
    pub fn new(store: S, fetcher: FeedFetcher) -> Self {
        Self {
            store,
            fetcher,
            policy: InvalidDatePolicy::default(),
        }
    }

    /// Set the invalid date policy.
    pub fn with_policy(mut self, policy: InvalidDatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one cycle.
    ///
    /// The feed is stamped before the network fetch, so a failing feed goes
    /// to the back of the queue. Fetch and stamp errors end the cycle. Under
    /// `Abort`, an unparsable `pubDate` ends the cycle with the earlier items
    /// already stored. Insert errors are logged and the item skipped.
    pub async fn scrape_once(&self) -> Result<ScrapeOutcome> {
        let Some(feed) = self.store.next_feed_to_fetch().await? else {
            debug!("No feeds to fetch");
            return Ok(ScrapeOutcome::Idle);
        };

        self.store.mark_fetched(feed.id, Utc::now()).await?;

        info!(feed_id = feed.id, url = %feed.url, "Fetching feed {}", feed.name);
        let doc = self.fetcher.fetch(&feed.url).await?;

        let mut inserted = 0;
        let mut skipped = 0;

        for (index, item) in doc.items.iter().enumerate() {
            let published_at = match parse_pub_date(&item.pub_date) {
                Ok(dt) => dt,
                Err(e) => match self.policy {
                    InvalidDatePolicy::Abort => {
                        warn!(
                            feed_id = feed.id,
                            item = index,
                            inserted,
                            "Aborting cycle on item {:?}: {}",
                            item.title,
                            e
                        );
                        return Err(e);
                    }
                    InvalidDatePolicy::Skip => {
                        warn!(feed_id = feed.id, item = index, "Skipping item {:?}: {}", item.title, e);
                        skipped += 1;
                        continue;
                    }
                },
            };

            let post = NewPost::new(feed.id, &item.title, &item.link, published_at)
                .with_description(&item.description);

            match self.store.insert_post(&post).await {
                Ok(_) => inserted += 1,
                Err(GatorError::AlreadyExists(_)) => {
                    debug!(feed_id = feed.id, url = %item.link, "Post already stored");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(feed_id = feed.id, url = %item.link, "Failed to store post: {}", e);
                    skipped += 1;
                }
            }
        }

        info!(
            feed_id = feed.id,
            inserted,
            skipped,
            "Feed {} done ({} item(s))",
            doc.title,
            doc.items.len()
        );

        Ok(ScrapeOutcome::Scraped(ScrapeReport {
            feed,
            channel_title: doc.title,
            inserted,
            skipped,
        }))
    }
}
