//! User commands: login, register, reset, users.

use std::io::Write;

use tracing::info;

use super::App;
use crate::db::{NewUser, UserRepository};
use crate::{GatorError, Result};

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatorError::Validation("user name must not be empty".to_string()));
    }
    Ok(name)
}

pub(super) async fn login(app: &mut App, name: &str, out: &mut dyn Write) -> Result<()> {
    let name = validate_name(name)?;
    let user = UserRepository::new(app.db.pool())
        .get_by_name(name)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("user {:?}", name)))?;

    app.config.set_user(&user.name, &app.config_path)?;
    info!(user_id = user.id, "Logged in as {}", user.name);
    writeln!(out, "Logged in as {}", user.name)?;
    Ok(())
}

pub(super) async fn register(app: &mut App, name: &str, out: &mut dyn Write) -> Result<()> {
    let name = validate_name(name)?;
    let repo = UserRepository::new(app.db.pool());

    if repo.get_by_name(name).await?.is_some() {
        return Err(GatorError::AlreadyExists(format!("user {:?}", name)));
    }
    let user = repo.create(&NewUser::new(name)).await?;

    app.config.set_user(&user.name, &app.config_path)?;
    info!(user_id = user.id, "Registered {}", user.name);
    writeln!(out, "User created: {} (id {})", user.name, user.id)?;
    writeln!(out, "Logged in as {}", user.name)?;
    Ok(())
}

pub(super) async fn reset(app: &App, out: &mut dyn Write) -> Result<()> {
    let deleted = UserRepository::new(app.db.pool()).delete_all().await?;
    info!(deleted, "Reset database");
    writeln!(out, "Deleted {} user(s).", deleted)?;
    Ok(())
}

pub(super) async fn list(app: &App, out: &mut dyn Write) -> Result<()> {
    let users = UserRepository::new(app.db.pool()).list().await?;
    let current = app.config.current_user_name.as_deref();

    for user in users {
        if Some(user.name.as_str()) == current {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}
