//! Test helpers for integration tests.
//!
//! Provides an in-memory database, seeded users and feeds, and a wiremock
//! server publishing RSS documents.

#![allow(dead_code)]

use std::path::Path;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gator::config::FetcherConfig;
use gator::db::{NewUser, User, UserRepository};
use gator::feed::FeedRepository;
use gator::{App, Config, Database, Feed, FeedFetcher, NewFeed, Scraper};

/// A valid RSS publish date.
pub const PUB_DATE: &str = "Mon, 21 Oct 2024 07:28:00 +0000";

/// One item of a generated RSS document.
pub struct TestItem<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub pub_date: &'a str,
    pub description: &'a str,
}

impl<'a> TestItem<'a> {
    pub fn new(title: &'a str, link: &'a str) -> Self {
        Self {
            title,
            link,
            pub_date: PUB_DATE,
            description: "",
        }
    }

    pub fn dated(mut self, pub_date: &'a str) -> Self {
        self.pub_date = pub_date;
        self
    }

    pub fn described(mut self, description: &'a str) -> Self {
        self.description = description;
        self
    }
}

/// Render an RSS 2.0 document. Text is inserted verbatim, so callers
/// escape it themselves.
pub fn rss_document(title: &str, items: &[TestItem<'_>]) -> String {
    let mut body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <rss version=\"2.0\">\n<channel>\n\
         <title>{title}</title>\n<link>https://example.com/</link>\n\
         <description>Test channel</description>\n"
    );
    for item in items {
        body.push_str(&format!(
            "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate><description>{}</description></item>\n",
            item.title, item.link, item.pub_date, item.description
        ));
    }
    body.push_str("</channel>\n</rss>\n");
    body
}

/// Serve `body` at `route` on `server`.
pub async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Open a fresh in-memory database.
pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Create a user.
pub async fn create_user(db: &Database, name: &str) -> User {
    UserRepository::new(db.pool())
        .create(&NewUser::new(name))
        .await
        .unwrap()
}

/// Register a feed owned by `user_id`.
pub async fn create_feed(db: &Database, user_id: i64, name: &str, url: &str) -> Feed {
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, user_id))
        .await
        .unwrap()
}

/// Reload a feed.
pub async fn reload_feed(db: &Database, id: i64) -> Feed {
    FeedRepository::new(db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}

/// Fetcher configuration with short timeouts.
pub fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        user_agent: "gator-test".to_string(),
        connect_timeout_secs: 2,
        total_timeout_secs: 5,
        ..FetcherConfig::default()
    }
}

/// Scraper over `db` using the default policy.
pub fn scraper(db: &Database) -> Scraper<Database> {
    Scraper::new(db.clone(), FeedFetcher::new(&fetcher_config()).unwrap())
}

/// Application state with its config file inside `dir`.
pub fn test_app(db: Database, dir: &Path) -> App {
    let config = Config {
        fetcher: fetcher_config(),
        ..Config::default()
    };
    App::new(config, dir.join("gator.toml"), db)
}
