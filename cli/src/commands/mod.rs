//! Command handlers.

pub mod articles;
pub mod auth;
pub mod categories;
pub mod drafts;
pub mod media;
pub mod translate;

use std::sync::Arc;

use anyhow::{Context, Result};
use blogdesk_client::{ApiClient, CategoryCatalog, ClientConfig, FileStore};
use blogdesk_shared::CategoryRef;

use crate::cli::{Cli, Commands};

/// Configuration and collaborators built once per invocation.
pub struct AppContext {
    /// Effective configuration.
    pub config: ClientConfig,
    /// Local token and draft storage.
    pub store: Arc<FileStore>,
    /// API client sharing `store` for its tokens.
    pub api: Arc<ApiClient>,
}

impl AppContext {
    /// Environment configuration with command-line overrides applied.
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = ClientConfig::from_env().context("invalid client configuration")?;
        if let Some(base) = &cli.api_base {
            config = config
                .with_api_base(base)
                .with_context(|| format!("invalid --api-base `{base}`"))?;
        }
        if let Some(dir) = &cli.data_dir {
            config = config.with_data_dir(dir);
        }

        let store = Arc::new(FileStore::new(&config.data_dir));
        let api = Arc::new(ApiClient::new(&config, store.clone())?);
        tracing::debug!("api base {}, data dir {}", config.api_base, config.data_dir.display());
        Ok(Self {
            config,
            store,
            api,
        })
    }

    /// Canonical categories, or an empty list when they cannot be fetched.
    pub async fn categories(&self) -> Vec<CategoryRef> {
        let catalog = CategoryCatalog::new(self.api.clone());
        let snapshot = catalog.load().await;
        if let Some(error) = snapshot.error {
            tracing::warn!("categories unavailable, continuing without them: {error}");
        }
        snapshot.categories
    }
}

/// Builds the context and dispatches `cli.command`.
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::new(&cli)?;

    match cli.command {
        Commands::Login {
            email,
            password,
        } => auth::login(&ctx, &email, &password).await,
        Commands::Logout => auth::logout(&ctx),
        Commands::Whoami => auth::whoami(&ctx).await,
        Commands::Articles {
            command,
        } => articles::run(&ctx, command).await,
        Commands::Categories {
            command,
        } => categories::run(&ctx, command).await,
        Commands::Media {
            command,
        } => media::run(&ctx, command).await,
        Commands::Drafts {
            command,
        } => drafts::run(&ctx, command),
        Commands::Translate {
            command,
        } => translate::run(command),
    }
}
