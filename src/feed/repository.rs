//! Feed, follow and post repositories for Gator.

use chrono::{DateTime, Utc};

use super::types::{
    Feed, FeedFollowDetails, FeedWithOwner, NewFeed, NewPost, Post, PostWithFeed,
};
use crate::db::DbPool;
use crate::{GatorError, Result};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

const POST_COLUMNS: &str =
    "id, title, url, description, published_at, feed_id, created_at, updated_at";

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed. Fails with `AlreadyExists` if the URL is registered.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at, last_fetched_at)
            VALUES (?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| GatorError::from_insert(e, "feed"))?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".into()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?");
        let feed = sqlx::query_as::<_, Feed>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(feed)
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?");
        let feed = sqlx::query_as::<_, Feed>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(feed)
    }

    /// List all feeds with their owner's name (ordered by registration order).
    pub async fn list_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let feeds = sqlx::query_as::<_, FeedWithOwner>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at,
                   f.last_fetched_at, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(feeds)
    }

    /// The feed that has waited longest for a fetch.
    ///
    /// Never-fetched feeds come first; ties are broken by ID so that the
    /// order is stable across calls.
    pub async fn next_to_fetch(&self) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
            LIMIT 1
            "#
        );
        let feed = sqlx::query_as::<_, Feed>(&query)
            .fetch_optional(self.pool)
            .await?;

        Ok(feed)
    }

    /// Record that the feed was picked at `at`.
    ///
    /// `last_fetched_at` never moves backwards: an older `at` leaves it as is.
    pub async fn mark_fetched(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at < ? THEN ?
                    ELSE last_fetched_at
                END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for feed follow operations.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Make `user_id` follow `feed_id`.
    pub async fn create(&self, user_id: i64, feed_id: i64) -> Result<FeedFollowDetails> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| GatorError::from_insert(e, "feed follow"))?;

        self.get_details(result.last_insert_rowid())
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".into()))
    }

    /// Get a follow with feed and user names.
    pub async fn get_details(&self, id: i64) -> Result<Option<FeedFollowDetails>> {
        let follow = sqlx::query_as::<_, FeedFollowDetails>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
                   f.name AS feed_name, u.name AS user_name
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(follow)
    }

    /// List the feeds a user follows (oldest follow first).
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<FeedFollowDetails>> {
        let follows = sqlx::query_as::<_, FeedFollowDetails>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
                   f.name AS feed_name, u.name AS user_name
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.user_id = ?
            ORDER BY ff.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(follows)
    }

    /// Remove the user's follow of the feed at `url`.
    pub async fn delete_by_url(&self, user_id: i64, url: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows
            WHERE user_id = ?
              AND feed_id IN (SELECT id FROM feeds WHERE url = ?)
            "#,
        )
        .bind(user_id)
        .bind(url)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a post. A URL that is already stored yields `AlreadyExists`.
    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, url, description, published_at, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| GatorError::from_insert(e, "post"))?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| GatorError::NotFound("post".into()))
    }

    /// Get a post by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(post)
    }

    /// List posts of a feed in document (insertion) order.
    pub async fn list_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE feed_id = ? ORDER BY id ASC");
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(feed_id)
            .fetch_all(self.pool)
            .await?;

        Ok(posts)
    }

    /// Newest posts from the feeds a user follows.
    pub async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<PostWithFeed>> {
        let posts = sqlx::query_as::<_, PostWithFeed>(
            r#"
            SELECT p.id, p.title, p.url, p.description, p.published_at, p.feed_id,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    /// Count posts of a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;
    use chrono::{Duration, TimeZone};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_test_user(db: &Database, name: &str) -> i64 {
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new(name)).await.unwrap().id
    }

    async fn create_test_feed(db: &Database, user_id: i64, url: &str) -> Feed {
        let repo = FeedRepository::new(db.pool());
        repo.create(&NewFeed::new("Test Feed", url, user_id))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_feed() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;

        let feed = create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        assert!(feed.id > 0);
        assert_eq!(feed.url, "https://example.com/feed.xml");
        assert_eq!(feed.user_id, user_id);
        assert!(feed.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_create_feed_duplicate_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let repo = FeedRepository::new(db.pool());

        create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        let result = repo
            .create(&NewFeed::new("Again", "https://example.com/feed.xml", user_id))
            .await;
        assert!(matches!(result, Err(GatorError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_feed_unknown_user() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());

        let result = repo
            .create(&NewFeed::new("Orphan", "https://example.com/feed.xml", 999))
            .await;
        assert!(matches!(result, Err(GatorError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_feed_by_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let repo = FeedRepository::new(db.pool());

        let created = create_test_feed(&db, user_id, "https://example.com/feed.xml").await;
        let found = repo
            .get_by_url("https://example.com/feed.xml")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
        assert!(repo.get_by_url("https://other.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_owner() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let bob = create_test_user(&db, "bob").await;
        create_test_feed(&db, alice, "https://a.example.com/feed").await;
        create_test_feed(&db, bob, "https://b.example.com/feed").await;

        let feeds = FeedRepository::new(db.pool()).list_with_owner().await.unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].owner_name, "alice");
        assert_eq!(feeds[1].owner_name, "bob");
        assert_eq!(feeds[1].feed.url, "https://b.example.com/feed");
    }

    #[tokio::test]
    async fn test_next_to_fetch_empty() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());
        assert!(repo.next_to_fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_to_fetch_prefers_never_fetched() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let repo = FeedRepository::new(db.pool());

        let fetched = create_test_feed(&db, user_id, "https://a.example.com/feed").await;
        let fresh = create_test_feed(&db, user_id, "https://b.example.com/feed").await;
        repo.mark_fetched(fetched.id, Utc::now()).await.unwrap();

        let next = repo.next_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, fresh.id);
    }

    #[tokio::test]
    async fn test_next_to_fetch_picks_oldest() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let repo = FeedRepository::new(db.pool());

        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let a = create_test_feed(&db, user_id, "https://a.example.com/feed").await;
        let b = create_test_feed(&db, user_id, "https://b.example.com/feed").await;
        let c = create_test_feed(&db, user_id, "https://c.example.com/feed").await;
        repo.mark_fetched(a.id, base + Duration::minutes(10)).await.unwrap();
        repo.mark_fetched(b.id, base).await.unwrap();
        repo.mark_fetched(c.id, base + Duration::milliseconds(500)).await.unwrap();

        assert_eq!(repo.next_to_fetch().await.unwrap().unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_next_to_fetch_ties_broken_by_id() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let repo = FeedRepository::new(db.pool());

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let first = create_test_feed(&db, user_id, "https://a.example.com/feed").await;
        let second = create_test_feed(&db, user_id, "https://b.example.com/feed").await;
        repo.mark_fetched(second.id, at).await.unwrap();
        repo.mark_fetched(first.id, at).await.unwrap();

        for _ in 0..3 {
            assert_eq!(repo.next_to_fetch().await.unwrap().unwrap().id, first.id);
        }
    }

    #[tokio::test]
    async fn test_mark_fetched_never_moves_backwards() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let repo = FeedRepository::new(db.pool());
        let feed = create_test_feed(&db, user_id, "https://a.example.com/feed").await;

        let later = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let earlier = later - Duration::hours(1);

        assert!(repo.mark_fetched(feed.id, later).await.unwrap());
        repo.mark_fetched(feed.id, earlier).await.unwrap();

        let reloaded = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(reloaded.last_fetched_at, Some(later));
    }

    #[tokio::test]
    async fn test_mark_fetched_unknown_feed() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());
        assert!(!repo.mark_fetched(42, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_and_list() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, alice, "https://a.example.com/feed").await;
        let repo = FeedFollowRepository::new(db.pool());

        let details = repo.create(alice, feed.id).await.unwrap();
        assert_eq!(details.feed_name, "Test Feed");
        assert_eq!(details.user_name, "alice");
        assert_eq!(details.follow.feed_id, feed.id);

        let follows = repo.list_for_user(alice).await.unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].follow.id, details.follow.id);
    }

    #[tokio::test]
    async fn test_follow_twice() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, alice, "https://a.example.com/feed").await;
        let repo = FeedFollowRepository::new(db.pool());

        repo.create(alice, feed.id).await.unwrap();
        let result = repo.create(alice, feed.id).await;
        assert!(matches!(result, Err(GatorError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_delete_follow_by_url() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let bob = create_test_user(&db, "bob").await;
        let feed = create_test_feed(&db, alice, "https://a.example.com/feed").await;
        let repo = FeedFollowRepository::new(db.pool());

        repo.create(alice, feed.id).await.unwrap();
        repo.create(bob, feed.id).await.unwrap();

        assert_eq!(repo.delete_by_url(alice, "https://a.example.com/feed").await.unwrap(), 1);
        assert!(repo.list_for_user(alice).await.unwrap().is_empty());
        assert_eq!(repo.list_for_user(bob).await.unwrap().len(), 1);

        assert_eq!(repo.delete_by_url(alice, "https://a.example.com/feed").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_post_and_duplicate() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, alice, "https://a.example.com/feed").await;
        let repo = PostRepository::new(db.pool());

        let published = Utc.with_ymd_and_hms(2024, 10, 21, 7, 28, 0).unwrap();
        let new_post = NewPost::new(feed.id, "Hello", "https://a.example.com/1", published)
            .with_description("First post");
        let post = repo.create(&new_post).await.unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.published_at, published);
        assert_eq!(post.description.as_deref(), Some("First post"));

        let result = repo.create(&new_post).await;
        assert!(matches!(result, Err(GatorError::AlreadyExists(_))));
        assert_eq!(repo.count_by_feed(feed.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_posts_for_user() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let followed = create_test_feed(&db, alice, "https://a.example.com/feed").await;
        let other = create_test_feed(&db, alice, "https://b.example.com/feed").await;
        FeedFollowRepository::new(db.pool())
            .create(alice, followed.id)
            .await
            .unwrap();

        let repo = PostRepository::new(db.pool());
        let base = Utc.with_ymd_and_hms(2024, 10, 21, 7, 0, 0).unwrap();
        for i in 0..3 {
            let post = NewPost::new(
                followed.id,
                format!("Post {i}"),
                format!("https://a.example.com/{i}"),
                base + Duration::hours(i),
            );
            repo.create(&post).await.unwrap();
        }
        repo.create(&NewPost::new(other.id, "Hidden", "https://b.example.com/1", base))
            .await
            .unwrap();

        let posts = repo.list_for_user(alice, 2).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].post.title, "Post 2");
        assert_eq!(posts[1].post.title, "Post 1");
        assert_eq!(posts[0].feed_name, "Test Feed");
    }

    #[tokio::test]
    async fn test_delete_users_cascades() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, alice, "https://a.example.com/feed").await;
        PostRepository::new(db.pool())
            .create(&NewPost::new(feed.id, "x", "https://a.example.com/x", Utc::now()))
            .await
            .unwrap();

        UserRepository::new(db.pool()).delete_all().await.unwrap();

        assert!(FeedRepository::new(db.pool())
            .get_by_id(feed.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            PostRepository::new(db.pool()).count_by_feed(feed.id).await.unwrap(),
            0
        );
    }
}
