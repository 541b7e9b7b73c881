//! Canonical category list, fetched once per catalog.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use blogdesk_shared::CategoryRef;
use tokio::sync::OnceCell;

use crate::api::CategorySource;

/// Point-in-time view of the category list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategorySnapshot {
    /// Canonical categories, empty until loaded.
    pub categories: Vec<CategoryRef>,
    /// A fetch is in flight.
    pub is_loading: bool,
    /// Message of the failed fetch, if it failed.
    pub error: Option<String>,
}

/// Canonical category list, fetched at most once per catalog.
pub struct CategoryCatalog {
    source: Arc<dyn CategorySource>,
    loaded: OnceCell<Result<Vec<CategoryRef>, String>>,
    loading: AtomicBool,
}

impl CategoryCatalog {
    /// Catalog reading from `source`.
    pub fn new(source: Arc<dyn CategorySource>) -> Self {
        Self {
            source,
            loaded: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// Fetches the list on first use. Concurrent callers wait for the same
    /// fetch; a failure is remembered and reported in the snapshot.
    pub async fn load(&self) -> CategorySnapshot {
        self.loaded
            .get_or_init(|| async {
                self.loading.store(true, Ordering::SeqCst);
                let result = self.source.fetch_categories().await.map_err(|err| {
                    tracing::error!("failed to load categories: {err}");
                    err.to_string()
                });
                if let Ok(categories) = &result {
                    tracing::debug!("loaded {} categories", categories.len());
                }
                self.loading.store(false, Ordering::SeqCst);
                result
            })
            .await;
        self.snapshot()
    }

    /// Current state without triggering a fetch.
    pub fn snapshot(&self) -> CategorySnapshot {
        match self.loaded.get() {
            Some(Ok(categories)) => CategorySnapshot {
                categories: categories.clone(),
                is_loading: false,
                error: None,
            },
            Some(Err(error)) => CategorySnapshot {
                categories: Vec::new(),
                is_loading: false,
                error: Some(error.clone()),
            },
            None => CategorySnapshot {
                categories: Vec::new(),
                // Nothing fetched yet counts as loading.
                is_loading: true,
                error: None,
            },
        }
    }

    /// Loaded categories, empty until [`Self::load`] succeeds.
    pub fn categories(&self) -> &[CategoryRef] {
        match self.loaded.get() {
            Some(Ok(categories)) => categories,
            _ => &[],
        }
    }

    /// Whether the first fetch is still running.
    pub fn is_fetching(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}
