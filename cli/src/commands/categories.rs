//! `categories` commands.

use anyhow::{bail, Result};
use blogdesk_client::CategoryCatalog;

use super::AppContext;
use crate::{cli::CategoryCommands, utils::format_table};

/// Runs one `categories` subcommand.
pub async fn run(ctx: &AppContext, command: CategoryCommands) -> Result<()> {
    match command {
        CategoryCommands::List => {
            let catalog = CategoryCatalog::new(ctx.api.clone());
            let snapshot = catalog.load().await;
            if let Some(error) = snapshot.error {
                bail!("failed to load categories: {error}");
            }
            let rows: Vec<Vec<String>> = snapshot
                .categories
                .iter()
                .map(|category| vec![category.slug.clone(), category.name.clone()])
                .collect();
            tracing::info!("Categories ({}):\n{}", rows.len(), format_table(&["SLUG", "NAME"], &rows));
            Ok(())
        },
    }
}
