//! Command line surface for Gator.
//!
//! Each subcommand is a variant of [`Command`]; [`execute`] matches on it and
//! calls the handler. Handlers that act on behalf of a user resolve it with
//! [`App::current_user`] first and receive it as an argument.

mod feeds;
mod users;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::db::{Database, User, UserRepository};
use crate::{GatorError, Result};

pub use feeds::aggregate_until;

/// Gator command line.
#[derive(Debug, Parser)]
#[command(name = "gator", author, version, about = "A command-line RSS feed aggregator", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.gatorconfig.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in as an existing user
    Login {
        /// User name
        name: String,
    },

    /// Create a user and log in as them
    Register {
        /// User name
        name: String,
    },

    /// Delete every user, with their feeds, follows and posts
    Reset,

    /// List users
    Users,

    /// Scrape feeds continuously until interrupted
    Agg {
        /// Time between scrape cycles, e.g. 30s or 1m30s
        interval: String,
    },

    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed {
        /// Display name
        name: String,
        /// Feed URL (http or https)
        url: String,
    },

    /// List all feeds
    Feeds,

    /// Follow an existing feed
    Follow {
        /// Feed URL
        url: String,
    },

    /// List the feeds you follow
    Following,

    /// Stop following a feed
    Unfollow {
        /// Feed URL
        url: String,
    },

    /// Show the newest posts from the feeds you follow
    Browse {
        /// Number of posts
        #[arg(default_value_t = 2, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
}

/// State shared by command handlers.
pub struct App {
    /// Loaded configuration.
    pub config: Config,
    /// Where the configuration is persisted.
    pub config_path: PathBuf,
    /// Open database.
    pub db: Database,
}

impl App {
    /// Create the application state.
    pub fn new(config: Config, config_path: impl Into<PathBuf>, db: Database) -> Self {
        Self {
            config,
            config_path: config_path.into(),
            db,
        }
    }

    /// Resolve the logged-in user.
    pub async fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or(GatorError::NotLoggedIn)?;

        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {:?}", name)))
    }
}

/// Run one command, writing its output to `out`.
pub async fn execute(app: &mut App, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Login { name } => users::login(app, &name, out).await,
        Command::Register { name } => users::register(app, &name, out).await,
        Command::Reset => users::reset(app, out).await,
        Command::Users => users::list(app, out).await,
        Command::Agg { interval } => feeds::aggregate(app, &interval, out).await,
        Command::AddFeed { name, url } => {
            let user = app.current_user().await?;
            feeds::add_feed(app, &user, &name, &url, out).await
        }
        Command::Feeds => feeds::list(app, out).await,
        Command::Follow { url } => {
            let user = app.current_user().await?;
            feeds::follow(app, &user, &url, out).await
        }
        Command::Following => {
            let user = app.current_user().await?;
            feeds::following(app, &user, out).await
        }
        Command::Unfollow { url } => {
            let user = app.current_user().await?;
            feeds::unfollow(app, &user, &url, out).await
        }
        Command::Browse { limit } => {
            let user = app.current_user().await?;
            feeds::browse(app, &user, limit, out).await
        }
    }
}
