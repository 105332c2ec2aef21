//! Storage seam used by the scrape cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::repository::{FeedRepository, PostRepository};
use super::types::{Feed, NewPost, Post};
use crate::db::Database;
use crate::Result;

/// The three store operations a scrape cycle needs.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed with the oldest `last_fetched_at` (never-fetched first).
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>>;

    /// Stamp the feed as fetched at `at`.
    async fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Insert one post.
    async fn insert_post(&self, post: &NewPost) -> Result<Post>;
}

#[async_trait]
impl FeedStore for Database {
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        FeedRepository::new(self.pool()).next_to_fetch().await
    }

    async fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self.pool())
            .mark_fetched(feed_id, at)
            .await?;
        Ok(())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post> {
        PostRepository::new(self.pool()).create(post).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::feed::NewFeed;

    #[tokio::test]
    async fn test_database_store_round() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(db.next_feed_to_fetch().await.unwrap().is_none());

        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Blog", "https://example.com/rss", user.id))
            .await
            .unwrap();

        let next = db.next_feed_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, feed.id);

        let at = Utc::now();
        db.mark_fetched(feed.id, at).await.unwrap();
        let next = db.next_feed_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.last_fetched_at, Some(at));

        let post = db
            .insert_post(&NewPost::new(feed.id, "Hi", "https://example.com/1", at))
            .await
            .unwrap();
        assert_eq!(post.feed_id, feed.id);
    }
}
