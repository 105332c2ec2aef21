//! Feed types for Gator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered feed.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Display name given when the feed was added.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// User who added the feed.
    pub user_id: i64,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last time a scrape cycle picked this feed.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user ID.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed request.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// Feed joined with the name of the user who added it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedWithOwner {
    /// The feed.
    #[sqlx(flatten)]
    pub feed: Feed,
    /// Owner's user name.
    pub owner_name: String,
}

/// A user following a feed.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: i64,
    /// Following user.
    pub user_id: i64,
    /// Followed feed.
    pub feed_id: i64,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// When the follow was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Feed follow with the names of both sides.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollowDetails {
    /// The follow record.
    #[sqlx(flatten)]
    pub follow: FeedFollow,
    /// Name of the followed feed.
    pub feed_name: String,
    /// Name of the following user.
    pub user_name: String,
}

/// A post scraped from a feed.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Item title.
    pub title: String,
    /// Link to the original article (unique).
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// When the item was published.
    pub published_at: DateTime<Utc>,
    /// Feed this post came from.
    pub feed_id: i64,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New post for insertion.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Feed ID.
    pub feed_id: i64,
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// When the item was published.
    pub published_at: DateTime<Utc>,
}

impl NewPost {
    /// Create a new post.
    pub fn new(
        feed_id: i64,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feed_id,
            title: title.into(),
            url: url.into(),
            description: None,
            published_at,
        }
    }

    /// Set the description. Empty strings are stored as NULL.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }
}

/// Post joined with the name of its feed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithFeed {
    /// The post.
    #[sqlx(flatten)]
    pub post: Post,
    /// Name of the feed it came from.
    pub feed_name: String,
}

/// A fetched RSS document: the channel and its items in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    /// Channel title.
    pub title: String,
    /// Channel link.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<FeedItem>,
}

/// One `<item>` of an RSS channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    /// Item title.
    pub title: String,
    /// Item link.
    pub link: String,
    /// Item description.
    pub description: String,
    /// Raw `pubDate` text.
    pub pub_date: String,
}

/// What a scrape cycle does with an item whose publish date does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidDatePolicy {
    /// Stop the cycle; items already inserted stay.
    #[default]
    Abort,
    /// Log the item and move on to the next one.
    Skip,
}
