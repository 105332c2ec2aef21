//! Feed commands: agg, addfeed, feeds, follow, following, unfollow, browse.

use std::future::Future;
use std::io::Write;

use tracing::{error, info};

use super::App;
use crate::datetime::{format_optional, DISPLAY_FORMAT};
use crate::db::User;
use crate::feed::{
    parse_interval, validate_url, AggregateSummary, Aggregator, FeedFetcher,
    FeedFollowRepository, FeedRepository, NewFeed, PostRepository, Scraper,
};
use crate::{GatorError, Result};

pub(super) async fn aggregate(app: &App, interval: &str, out: &mut dyn Write) -> Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    aggregate_until(app, interval, shutdown, out).await?;
    Ok(())
}

/// Run the aggregation loop until `shutdown` resolves.
///
/// The interval is validated before anything else runs.
pub async fn aggregate_until<F>(
    app: &App,
    interval: &str,
    shutdown: F,
    out: &mut dyn Write,
) -> Result<AggregateSummary>
where
    F: Future<Output = ()>,
{
    let interval = parse_interval(interval)?;
    let fetcher = FeedFetcher::new(&app.config.fetcher)?;
    let scraper =
        Scraper::new(app.db.clone(), fetcher).with_policy(app.config.scraper.on_invalid_date);
    let aggregator = Aggregator::new(scraper, interval)?;

    writeln!(
        out,
        "Collecting feeds every {}",
        humantime::format_duration(interval)
    )?;
    out.flush()?;

    let summary = aggregator.run_until(shutdown).await;
    writeln!(
        out,
        "Stopped after {} cycle(s), {} failed.",
        summary.cycles, summary.failed
    )?;
    Ok(summary)
}

pub(super) async fn add_feed(
    app: &App,
    user: &User,
    name: &str,
    url: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatorError::Validation("feed name must not be empty".to_string()));
    }
    let url = url.trim();
    validate_url(url)?;

    let feed = FeedRepository::new(app.db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await?;
    FeedFollowRepository::new(app.db.pool())
        .create(user.id, feed.id)
        .await?;

    info!(feed_id = feed.id, user_id = user.id, "Added feed {}", feed.url);
    writeln!(out, "Feed added: {} (id {})", feed.name, feed.id)?;
    writeln!(out, "  URL:   {}", feed.url)?;
    writeln!(out, "  Owner: {}", user.name)?;
    writeln!(out, "{} now follows {}", user.name, feed.name)?;
    Ok(())
}

pub(super) async fn list(app: &App, out: &mut dyn Write) -> Result<()> {
    let feeds = FeedRepository::new(app.db.pool()).list_with_owner().await?;
    if feeds.is_empty() {
        writeln!(out, "No feeds registered.")?;
        return Ok(());
    }

    for entry in feeds {
        writeln!(out, "* {}", entry.feed.name)?;
        writeln!(out, "  URL:          {}", entry.feed.url)?;
        writeln!(out, "  Owner:        {}", entry.owner_name)?;
        writeln!(
            out,
            "  Last fetched: {}",
            format_optional(entry.feed.last_fetched_at.as_ref())
        )?;
    }
    Ok(())
}

pub(super) async fn follow(app: &App, user: &User, url: &str, out: &mut dyn Write) -> Result<()> {
    let url = url.trim();
    let feed = FeedRepository::new(app.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {:?}", url)))?;

    let details = FeedFollowRepository::new(app.db.pool())
        .create(user.id, feed.id)
        .await?;

    writeln!(out, "{} now follows {}", details.user_name, details.feed_name)?;
    Ok(())
}

pub(super) async fn following(app: &App, user: &User, out: &mut dyn Write) -> Result<()> {
    let follows = FeedFollowRepository::new(app.db.pool())
        .list_for_user(user.id)
        .await?;

    if follows.is_empty() {
        writeln!(out, "{} is not following any feeds.", user.name)?;
        return Ok(());
    }

    writeln!(out, "{} is following:", user.name)?;
    for follow in follows {
        writeln!(out, "* {}", follow.feed_name)?;
    }
    Ok(())
}

pub(super) async fn unfollow(app: &App, user: &User, url: &str, out: &mut dyn Write) -> Result<()> {
    let url = url.trim();
    let removed = FeedFollowRepository::new(app.db.pool())
        .delete_by_url(user.id, url)
        .await?;

    if removed == 0 {
        return Err(GatorError::NotFound(format!(
            "follow of {:?} for {}",
            url, user.name
        )));
    }

    writeln!(out, "{} unfollowed {}", user.name, url)?;
    Ok(())
}

pub(super) async fn browse(app: &App, user: &User, limit: i64, out: &mut dyn Write) -> Result<()> {
    let posts = PostRepository::new(app.db.pool())
        .list_for_user(user.id, limit)
        .await?;

    if posts.is_empty() {
        writeln!(out, "No posts yet.")?;
        return Ok(());
    }

    for entry in posts {
        writeln!(
            out,
            "{} [{}] {}",
            entry.post.published_at.format(DISPLAY_FORMAT),
            entry.feed_name,
            entry.post.title
        )?;
        writeln!(out, "    {}", entry.post.url)?;
        if let Some(description) = entry.post.description.as_deref() {
            writeln!(out, "    {}", description)?;
        }
    }
    Ok(())
}
