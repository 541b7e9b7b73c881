//! List views with bulk actions over the selection.

use std::{
    collections::{BTreeSet, HashSet},
    future::Future,
    sync::Arc,
};

use async_trait::async_trait;
use blogdesk_shared::{
    listing::{ListFilterState, Listable, PageView},
    ArticleRecord, BulkAction, CategoryRef, MediaItem, MediaType,
};
use futures::future::join_all;

use crate::{
    api::{ArticleApi, MediaApi},
    error::ClientError,
};

/// Items fetched per request when loading a whole collection.
pub const LOAD_CHUNK: usize = 100;

/// Asks the user to confirm a bulk action.
pub trait Confirm: Send + Sync {
    /// Returns `true` to go ahead with the action described by `prompt`.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything, for `--yes` style invocations.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("auto-confirmed: {prompt}");
        true
    }
}

/// Loads a full collection from the server.
#[async_trait]
pub trait CollectionLoader<T>: Send + Sync {
    /// Loads every item of the collection.
    async fn load_all(&self) -> Result<Vec<T>, ClientError>;
}

/// Runs one bulk action against one item.
#[async_trait]
pub trait BulkExecutor: Send + Sync {
    /// Applies `action` to item `id`.
    async fn execute(&self, action: BulkAction, id: &str) -> Result<(), ClientError>;
}

/// Requests `LOAD_CHUNK`-sized ranges until a chunk comes back short or
/// adds no id that is not loaded yet. Servers that ignore the range or
/// return overlapping pages still terminate, and each id is kept once.
async fn load_chunked<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ClientError>
where
    T: Listable,
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ClientError>>,
{
    let mut all = Vec::new();
    let mut seen = HashSet::new();
    let mut start = 0;
    loop {
        let chunk = fetch(start, start + LOAD_CHUNK).await?;
        let short = chunk.len() < LOAD_CHUNK;
        let before = all.len();
        for item in chunk {
            if seen.insert(item.id().to_string()) {
                all.push(item);
            }
        }
        if short || all.len() == before {
            break;
        }
        start += LOAD_CHUNK;
    }
    Ok(all)
}

/// Article collection access through [`ArticleApi`].
pub struct Articles(pub Arc<dyn ArticleApi>);

#[async_trait]
impl CollectionLoader<ArticleRecord> for Articles {
    async fn load_all(&self) -> Result<Vec<ArticleRecord>, ClientError> {
        load_chunked(|start, stop| self.0.list_articles(start, stop)).await
    }
}

#[async_trait]
impl BulkExecutor for Articles {
    async fn execute(&self, action: BulkAction, id: &str) -> Result<(), ClientError> {
        match action.target_state() {
            None => self.0.delete_article(id).await,
            Some(state) => self.0.set_article_state(id, state).await,
        }
    }
}

/// Media collection access through [`MediaApi`].
pub struct Media {
    /// Media endpoints.
    pub api: Arc<dyn MediaApi>,
    /// Only items of this kind, when set.
    pub kind: Option<MediaType>,
}

#[async_trait]
impl CollectionLoader<MediaItem> for Media {
    async fn load_all(&self) -> Result<Vec<MediaItem>, ClientError> {
        load_chunked(|start, stop| self.api.list_media(self.kind, start, stop)).await
    }
}

#[async_trait]
impl BulkExecutor for Media {
    async fn execute(&self, action: BulkAction, id: &str) -> Result<(), ClientError> {
        match action {
            BulkAction::Delete => self.api.delete_media(id).await,
            other => Err(ClientError::Unsupported(format!("media items cannot be set to {other}"))),
        }
    }
}

/// Aggregate result of a bulk action.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkOutcome {
    /// Ids the action succeeded for.
    pub succeeded: Vec<String>,
    /// Failed ids with their error text, for logs only.
    pub failed: Vec<(String, String)>,
    /// The user declined the confirmation.
    pub cancelled: bool,
}

impl BulkOutcome {
    /// User-facing summary. Never lists individual items.
    pub fn summary(&self, action: BulkAction) -> String {
        if self.cancelled {
            return "Cancelled".to_string();
        }
        let verb = match action {
            BulkAction::Delete => "Deleted",
            BulkAction::Publish => "Published",
            BulkAction::Draft => "Moved to draft",
        };
        let ok = self.succeeded.len();
        match (ok, self.failed.len()) {
            (0, 0) => "Nothing selected".to_string(),
            (_, 0) => format!("{verb} {ok} {}", plural(ok)),
            (0, _) => format!("{action} failed for all selected items"),
            (_, _) => format!("{verb} {ok} {}; some operations failed", plural(ok)),
        }
    }

    /// Whether any item failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "item"
    } else {
        "items"
    }
}

/// Loaded collection, its list state and the bulk action runner.
pub struct ListController<T: Listable> {
    items: Vec<T>,
    state: ListFilterState<T::Kind>,
    loader: Arc<dyn CollectionLoader<T>>,
    executor: Arc<dyn BulkExecutor>,
}

impl<T: Listable + Send + Sync> ListController<T> {
    /// Empty controller over `loader` and `executor`.
    pub fn new(loader: Arc<dyn CollectionLoader<T>>, executor: Arc<dyn BulkExecutor>) -> Self {
        Self {
            items: Vec::new(),
            state: ListFilterState::default(),
            loader,
            executor,
        }
    }

    /// Replaces the collection with a fresh server copy.
    pub async fn reload(&mut self) -> Result<usize, ClientError> {
        self.items = self.loader.load_all().await?;
        self.state
            .retain_loaded(self.items.iter().map(|item| item.id()));
        Ok(self.items.len())
    }

    /// Items loaded by the last reload.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Filters, sort, paging and selection.
    pub fn state(&self) -> &ListFilterState<T::Kind> {
        &self.state
    }

    /// Mutable list state.
    pub fn state_mut(&mut self) -> &mut ListFilterState<T::Kind> {
        &mut self.state
    }

    /// Page of items for the current list state.
    pub fn visible_page(&self, canonical: &[CategoryRef]) -> PageView<'_, T> {
        self.state.visible_page(&self.items, canonical)
    }

    /// Runs `action` on every selected item concurrently.
    ///
    /// Succeeded deletes leave the in-memory list at once. When anything
    /// succeeded the collection is reloaded and the selection cleared;
    /// failures are not retried or rolled back.
    pub async fn run_bulk(&mut self, action: BulkAction, confirm: &dyn Confirm) -> Result<BulkOutcome, ClientError> {
        let targets: Vec<String> = self.state.selected().iter().cloned().collect();
        if targets.is_empty() {
            return Ok(BulkOutcome::default());
        }
        if !confirm.confirm(&action.confirmation(targets.len())) {
            return Ok(BulkOutcome {
                cancelled: true,
                ..BulkOutcome::default()
            });
        }

        let executor = self.executor.clone();
        let results = join_all(targets.iter().map(|id| {
            let executor = executor.clone();
            async move { (id.clone(), executor.execute(action, id).await) }
        }))
        .await;

        let mut outcome = BulkOutcome::default();
        for (id, result) in results {
            match result {
                Ok(()) => outcome.succeeded.push(id),
                Err(err) => {
                    tracing::warn!("bulk {action} failed for {id}: {err}");
                    outcome.failed.push((id, err.to_string()));
                },
            }
        }

        if action == BulkAction::Delete {
            let removed: BTreeSet<&str> = outcome.succeeded.iter().map(String::as_str).collect();
            self.items.retain(|item| !removed.contains(item.id()));
            self.state
                .retain_loaded(self.items.iter().map(|item| item.id()));
        }

        if !outcome.succeeded.is_empty() {
            if let Err(err) = self.reload().await {
                tracing::error!("reload after bulk {action} failed: {err}");
            }
            self.state.clear_selection();
        }

        tracing::info!(
            "bulk {action}: {} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }
}

/// Article list with its loader and executor wired to one API.
pub fn article_list(api: Arc<dyn ArticleApi>) -> ListController<ArticleRecord> {
    let articles = Arc::new(Articles(api));
    ListController::new(articles.clone(), articles)
}

/// Media list with its loader and executor wired to one API.
pub fn media_list(api: Arc<dyn MediaApi>, kind: Option<MediaType>) -> ListController<MediaItem> {
    let media = Arc::new(Media {
        api,
        kind,
    });
    ListController::new(media.clone(), media)
}

#[cfg(test)]
mod tests {
    use blogdesk_shared::{ArticlePayload, ArticleState};
    use parking_lot::Mutex;
    use serde_json::Value;

    use super::*;
    use crate::api::UploadFile;

    #[test]
    fn summary_is_aggregate() {
        let outcome = BulkOutcome {
            succeeded: vec!["a".to_string(), "b".to_string()],
            failed: vec![("c".to_string(), "boom".to_string())],
            cancelled: false,
        };
        let summary = outcome.summary(BulkAction::Delete);
        assert_eq!(summary, "Deleted 2 items; some operations failed");
        assert!(!summary.contains("boom"));
        assert_eq!(BulkOutcome::default().summary(BulkAction::Publish), "Nothing selected");
    }

    struct Deny;

    impl Confirm for Deny {
        fn confirm(&self, _prompt: &str) -> bool {
            false
        }
    }

    struct NoopLoader;

    #[async_trait]
    impl CollectionLoader<MediaItem> for NoopLoader {
        async fn load_all(&self) -> Result<Vec<MediaItem>, ClientError> {
            Ok(vec![MediaItem {
                id: "m1".to_string(),
                url: String::new(),
                name: "kit.png".to_string(),
                media_type: MediaType::Image,
                category: None,
                date: None,
            }])
        }
    }

    struct PanicExecutor;

    #[async_trait]
    impl BulkExecutor for PanicExecutor {
        async fn execute(&self, _action: BulkAction, id: &str) -> Result<(), ClientError> {
            panic!("executor must not run for {id}");
        }
    }

    #[tokio::test]
    async fn declined_confirmation_runs_nothing() {
        let mut list: ListController<MediaItem> = ListController::new(Arc::new(NoopLoader), Arc::new(PanicExecutor));
        list.reload().await.expect("reload");
        list.state_mut().toggle("m1");
        let outcome = list.run_bulk(BulkAction::Delete, &Deny).await.expect("bulk");
        assert!(outcome.cancelled);
        assert!(list.state().is_selected("m1"));
        assert_eq!(list.items().len(), 1);
    }

    fn record(n: usize) -> ArticleRecord {
        ArticleRecord {
            id: format!("a{n}"),
            title: format!("Article {n}"),
            ..ArticleRecord::default()
        }
    }

    fn media_item(n: usize) -> MediaItem {
        MediaItem {
            id: format!("m{n}"),
            url: format!("https://cdn.example.com/{n}.png"),
            name: format!("{n}.png"),
            media_type: MediaType::Image,
            category: None,
            date: None,
        }
    }

    /// Answers every list call with the same 150 articles.
    struct RangeIgnoringArticles {
        calls: Mutex<Vec<(usize, usize)>>,
    }

    #[async_trait]
    impl ArticleApi for RangeIgnoringArticles {
        async fn list_articles(&self, start: usize, stop: usize) -> Result<Vec<ArticleRecord>, ClientError> {
            let mut calls = self.calls.lock();
            calls.push((start, stop));
            if calls.len() > 10 {
                return Err(ClientError::Unsupported("list called too often".to_string()));
            }
            Ok((0..150).map(record).collect())
        }
        async fn get_article(&self, id: &str) -> Result<ArticleRecord, ClientError> {
            Err(ClientError::Unsupported(id.to_string()))
        }
        async fn create_article(&self, _payload: &ArticlePayload) -> Result<ArticleRecord, ClientError> {
            Err(ClientError::Unsupported("create".to_string()))
        }
        async fn update_article(&self, _id: &str, _payload: &ArticlePayload) -> Result<(), ClientError> {
            Ok(())
        }
        async fn set_article_state(&self, _id: &str, _state: ArticleState) -> Result<(), ClientError> {
            Ok(())
        }
        async fn delete_article(&self, _id: &str) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn reload_stops_when_server_ignores_range() {
        let api = Arc::new(RangeIgnoringArticles {
            calls: Mutex::new(Vec::new()),
        });
        let mut list = article_list(api.clone());

        assert_eq!(list.reload().await.expect("reload"), 150);
        assert_eq!(api.calls.lock().as_slice(), &[(0, LOAD_CHUNK), (LOAD_CHUNK, 2 * LOAD_CHUNK)]);
    }

    /// Serves `total` items where every chunk after the first starts with the
    /// last item of the previous one.
    struct OverlappingMedia {
        total: usize,
    }

    #[async_trait]
    impl MediaApi for OverlappingMedia {
        async fn list_media(&self, _kind: Option<MediaType>, start: usize, stop: usize) -> Result<Vec<MediaItem>, ClientError> {
            let from = start.saturating_sub(1);
            Ok((from..stop.min(self.total)).map(media_item).collect())
        }
        async fn get_media(&self, id: &str) -> Result<MediaItem, ClientError> {
            Err(ClientError::Unsupported(id.to_string()))
        }
        async fn upload_media(&self, _file: &UploadFile, _category: &str) -> Result<Value, ClientError> {
            Ok(Value::Null)
        }
        async fn upload_image(&self, _file: &UploadFile) -> Result<String, ClientError> {
            Ok(String::new())
        }
        async fn upload_with_caption(&self, _media_id: &str, _file: &UploadFile, _caption: &str) -> Result<Option<String>, ClientError> {
            Ok(None)
        }
        async fn update_media_category(&self, _id: &str, _category: &str) -> Result<(), ClientError> {
            Ok(())
        }
        async fn delete_media(&self, _id: &str) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn overlapping_chunks_keep_each_id_once() {
        let mut list = media_list(
            Arc::new(OverlappingMedia {
                total: 230,
            }),
            None,
        );

        assert_eq!(list.reload().await.expect("reload"), 230);
        let unique: HashSet<&str> = list.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(unique.len(), 230);
        assert_eq!(list.items()[100].id, "m100");
    }
}
