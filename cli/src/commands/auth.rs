//! Session commands.

use anyhow::{Context, Result};

use super::AppContext;
use crate::utils::print_json;

/// Signs in and stores the session tokens.
pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    ctx.api
        .login(email, password)
        .await
        .context("login failed")?;
    tracing::info!("Signed in; tokens stored in {}", ctx.config.data_dir.display());
    Ok(())
}

/// Forgets the stored session tokens.
pub fn logout(ctx: &AppContext) -> Result<()> {
    ctx.api.logout();
    tracing::info!("Signed out.");
    Ok(())
}

/// Prints the signed-in administrator.
pub async fn whoami(ctx: &AppContext) -> Result<()> {
    let profile = ctx.api.me().await.context("failed to fetch profile")?;
    print_json(&profile)
}
