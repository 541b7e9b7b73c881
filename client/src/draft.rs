//! Article editing session: remote/local load precedence, the save cycle
//! and local draft bookkeeping.

use std::{fmt, str::FromStr, sync::Arc};

use blogdesk_shared::{
    category::reconcile,
    document::{self, normalize_body, ContentBlock, EditorBlock},
    models::DEFAULT_FEATURE_IMAGE_ALT,
    ArticlePayload, ArticleRecord, ArticleState, Author, BlogType, CategoryRef, FeatureImage,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
    api::ArticleApi,
    error::ClientError,
    store::{draft_key, KeyValueStore},
};

/// Route prefix of the editor page for a saved article.
pub const EDITOR_ROUTE_PREFIX: &str = "/admin/editor/";
const EVENT_CAPACITY: usize = 64;

/// Which article the editor is opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftTarget {
    /// Not yet created on the server.
    New,
    /// Existing article with this id.
    Existing(String),
}

impl DraftTarget {
    /// Article id, `None` for a new article.
    pub fn article_id(&self) -> Option<&str> {
        match self {
            Self::New => None,
            Self::Existing(id) => Some(id),
        }
    }
}

impl FromStr for DraftTarget {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "" => Err("article id must not be empty".to_string()),
            "new" => Ok(Self::New),
            id => Ok(Self::Existing(id.to_string())),
        }
    }
}

/// Persistence state of an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Initial load not finished.
    Loading,
    /// Loaded from the server.
    LoadedRemote,
    /// Restored from the local draft.
    LoadedLocal,
    /// A save cycle is running.
    Saving,
    /// The last save succeeded.
    Saved,
    /// The last save failed.
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loading => "loading",
            Self::LoadedRemote => "loaded",
            Self::LoadedLocal => "restored local draft",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        })
    }
}

/// Notices and navigation requests raised by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Remote load failed and the local draft was used instead.
    RestoredLocalDraft,
    /// Remote load failed; `message` is shown to the user.
    LoadFailed {
        /// Notice text.
        message: String,
    },
    /// The first save created the article.
    Created {
        /// Server id of the new article.
        id: String,
    },
    /// The visible route must now reference the new id.
    RouteChanged(String),
    /// A save cycle succeeded.
    Saved,
    /// `network` tells a connectivity problem from a server rejection.
    SaveFailed {
        /// Notice text.
        notice: String,
        /// The request never reached the server.
        network: bool,
    },
}

/// In-memory form state of the article being edited.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArticleForm {
    /// Article title.
    pub title: String,
    /// Author display name.
    pub author_name: String,
    /// Author avatar URL.
    pub author_avatar: String,
    /// Author affiliation line.
    pub author_affiliation: String,
    /// Selected category, reconciled against the canonical list.
    pub category: Option<CategoryRef>,
    /// Feature image URL.
    pub feature_image_url: String,
    /// Publication state.
    pub state: ArticleState,
    /// Placement on the public site.
    pub blog_type: BlogType,
    /// Body in API form.
    pub body: Vec<ContentBlock>,
}

impl ArticleForm {
    fn from_record(record: &ArticleRecord) -> Self {
        Self {
            title: record.title.clone(),
            author_name: record.author.name.clone(),
            author_avatar: record.author.avatar_url.clone(),
            author_affiliation: record.author.affiliation.clone(),
            category: record.category.clone(),
            feature_image_url: record.feature_image.url.clone(),
            state: record.state,
            blog_type: record.blog_type,
            body: normalize_body(&record.body),
        }
    }

    fn from_snapshot(snapshot: DraftSnapshot) -> Self {
        Self {
            title: snapshot.title,
            author_name: snapshot.author_name,
            author_avatar: snapshot.author_avatar,
            author_affiliation: snapshot.author_affiliation,
            category: snapshot.category,
            feature_image_url: snapshot.feature_image_url,
            state: snapshot.status,
            blog_type: snapshot.blog_type,
            body: snapshot.body,
        }
    }

    /// Request body for create/update with `state` in effect.
    pub fn payload(&self, state: ArticleState) -> ArticlePayload {
        let alt_text = if self.title.trim().is_empty() {
            DEFAULT_FEATURE_IMAGE_ALT.to_string()
        } else {
            self.title.clone()
        };
        ArticlePayload {
            title: self.title.clone(),
            author: Author {
                name: self.author_name.clone(),
                avatar_url: self.author_avatar.clone(),
                affiliation: self.author_affiliation.clone(),
            },
            category: self.category.clone(),
            feature_image: FeatureImage {
                url: self.feature_image_url.clone(),
                alt_text,
            },
            state,
            blog_type: self.blog_type,
            current_page_body: self.body.clone(),
        }
    }

    /// Replaces the body with a translated editor document.
    pub fn set_editor_document(&mut self, blocks: &[EditorBlock]) {
        self.body = document::to_api(blocks);
    }

    /// The body as the editor expects it (never empty).
    pub fn editor_document(&self) -> Vec<EditorBlock> {
        document::editor_document(&self.body)
    }

    fn snapshot(&self) -> DraftSnapshot {
        DraftSnapshot {
            title: self.title.clone(),
            author_name: self.author_name.clone(),
            author_avatar: self.author_avatar.clone(),
            author_affiliation: self.author_affiliation.clone(),
            category: self.category.clone(),
            feature_image_url: self.feature_image_url.clone(),
            status: self.state,
            blog_type: self.blog_type,
            body: self.body.clone(),
            last_saved: Utc::now().timestamp_millis(),
        }
    }
}

/// Local draft as stored under `draft_<id>` / `draft_new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    /// Article title.
    #[serde(default)]
    pub title: String,
    /// Author display name.
    #[serde(default)]
    pub author_name: String,
    /// Author avatar URL.
    #[serde(default)]
    pub author_avatar: String,
    /// Author affiliation line.
    #[serde(default)]
    pub author_affiliation: String,
    /// Selected category.
    #[serde(default)]
    pub category: Option<CategoryRef>,
    /// Feature image URL.
    #[serde(default)]
    pub feature_image_url: String,
    /// Publication state.
    #[serde(default)]
    pub status: ArticleState,
    /// Placement on the public site.
    #[serde(default)]
    pub blog_type: BlogType,
    /// Body in API form.
    #[serde(default, deserialize_with = "lenient_body")]
    pub body: Vec<ContentBlock>,
    /// Epoch milliseconds of the write.
    #[serde(default)]
    pub last_saved: i64,
}

fn lenient_body<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(normalize_body).unwrap_or_default())
}

/// Reads and parses a local draft. Missing, unreadable and malformed
/// drafts all count as "no draft".
pub fn read_local_draft(store: &dyn KeyValueStore, key: &str) -> Option<DraftSnapshot> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!("failed to read local draft {key}: {err}");
            return None;
        },
    };
    match serde_json::from_str::<DraftSnapshot>(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(source) => {
            let err = ClientError::MalformedLocalDraft {
                key: key.to_string(),
                source,
            };
            tracing::warn!("{err}; ignoring it");
            None
        },
    }
}

/// Collaborators shared by the sessions of one editor.
#[derive(Clone)]
pub struct DraftContext {
    /// Article endpoints.
    pub api: Arc<dyn ArticleApi>,
    /// Local draft storage.
    pub store: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<EditorEvent>,
}

impl DraftContext {
    /// Context with a fresh event channel.
    pub fn new(api: Arc<dyn ArticleApi>, store: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            store,
            events,
        }
    }

    /// Subscribes to events of every session using this context.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EditorEvent) {
        // No subscriber is fine.
        let _ = self.events.send(event);
    }
}

/// A loaded editing session. Dropping it writes the form to the local
/// draft one last time.
pub struct DraftSession {
    ctx: DraftContext,
    article_id: Option<String>,
    form: ArticleForm,
    phase: Phase,
    canonical: Vec<CategoryRef>,
}

impl DraftSession {
    /// Loads the article the editor is opened on.
    ///
    /// For an existing article the remote copy wins whenever it can be
    /// fetched, and the stale local draft is discarded. The local draft is
    /// only a fallback for a failed fetch.
    pub async fn open(ctx: DraftContext, target: DraftTarget, canonical: Vec<CategoryRef>) -> Self {
        let mut session = Self {
            ctx,
            article_id: target.article_id().map(str::to_string),
            form: ArticleForm::default(),
            phase: Phase::Loading,
            canonical,
        };

        match &target {
            DraftTarget::Existing(id) => match session.ctx.api.get_article(id).await {
                Ok(record) => {
                    session.form = ArticleForm::from_record(&record);
                    session.discard_local();
                    session.phase = Phase::LoadedRemote;
                    tracing::info!("loaded article {id} from server");
                },
                Err(err) => {
                    tracing::warn!("failed to load article {id}: {err}");
                    session.ctx.emit(EditorEvent::LoadFailed {
                        message: err.save_notice(),
                    });
                    session.restore_local_or_empty();
                },
            },
            DraftTarget::New => session.restore_local_or_empty(),
        }

        session.form.category = reconcile(session.form.category.as_ref(), &session.canonical);
        session
    }

    fn restore_local_or_empty(&mut self) {
        match read_local_draft(self.ctx.store.as_ref(), &self.local_key()) {
            Some(snapshot) => {
                self.form = ArticleForm::from_snapshot(snapshot);
                self.phase = Phase::LoadedLocal;
                tracing::info!("restored local draft {}", self.local_key());
                self.ctx.emit(EditorEvent::RestoredLocalDraft);
            },
            None => {
                // Empty content is a recoverable state, not an error.
                self.phase = Phase::LoadedRemote;
            },
        }
    }

    /// Server id, once the article exists.
    pub fn article_id(&self) -> Option<&str> {
        self.article_id.as_deref()
    }

    /// Current form values.
    pub fn form(&self) -> &ArticleForm {
        &self.form
    }

    /// Current persistence phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Collaborators of this session.
    pub fn context(&self) -> &DraftContext {
        &self.ctx
    }

    /// Storage key the form is mirrored under right now.
    pub fn local_key(&self) -> String {
        draft_key(self.article_id.as_deref())
    }

    /// Applies one field change. Category changes are resolved against the
    /// canonical list.
    pub fn apply(&mut self, edit: FormEdit) {
        match edit {
            FormEdit::Title(title) => self.form.title = title,
            FormEdit::AuthorName(name) => self.form.author_name = name,
            FormEdit::AuthorAvatar(url) => self.form.author_avatar = url,
            FormEdit::AuthorAffiliation(affiliation) => self.form.author_affiliation = affiliation,
            FormEdit::Category(category) => {
                self.form.category = reconcile(category.as_ref(), &self.canonical);
            },
            FormEdit::FeatureImageUrl(url) => self.form.feature_image_url = url,
            FormEdit::BlogType(kind) => self.form.blog_type = kind,
            FormEdit::Body(body) => self.form.body = body,
            FormEdit::EditorDocument(blocks) => self.form.set_editor_document(&blocks),
        }
    }

    /// Writes the current form to the local draft.
    pub fn write_local(&self) -> Result<(), ClientError> {
        let raw = serde_json::to_string(&self.form.snapshot())?;
        self.ctx.store.set(&self.local_key(), &raw)
    }

    fn discard_local(&self) {
        if let Err(err) = self.ctx.store.remove(&self.local_key()) {
            tracing::warn!("failed to remove local draft {}: {err}", self.local_key());
        }
    }

    /// One save cycle: local write, then create or update.
    ///
    /// `forced` overrides the form's publication state for this cycle. A
    /// failure leaves the local draft in place and is reported both as the
    /// return value and as a [`EditorEvent::SaveFailed`] notice.
    pub async fn save(&mut self, forced: Option<ArticleState>) -> Result<(), ClientError> {
        if let Err(err) = self.write_local() {
            tracing::error!("failed to write local draft {}: {err}", self.local_key());
        }
        self.phase = Phase::Saving;

        let result = match self.article_id.clone() {
            None => self.create(forced).await,
            Some(id) => self.update(&id, forced.unwrap_or(self.form.state)).await,
        };

        match result {
            Ok(()) => {
                self.phase = Phase::Saved;
                self.ctx.emit(EditorEvent::Saved);
                Ok(())
            },
            Err(err) => {
                self.phase = Phase::Error;
                tracing::error!("save of {} failed: {err}", self.local_key());
                self.ctx.emit(EditorEvent::SaveFailed {
                    notice: err.save_notice(),
                    network: err.is_network(),
                });
                Err(err)
            },
        }
    }

    async fn create(&mut self, forced: Option<ArticleState>) -> Result<(), ClientError> {
        // New articles start as drafts unless publishing was asked for.
        let state = forced.unwrap_or(ArticleState::Draft);
        let created = self.ctx.api.create_article(&self.form.payload(state)).await?;
        let id = created.id;
        self.form.state = state;
        self.article_id = Some(id.clone());
        self.migrate_new_draft(&id);
        tracing::info!("created article {id}");
        self.ctx.emit(EditorEvent::Created {
            id: id.clone(),
        });
        self.ctx
            .emit(EditorEvent::RouteChanged(format!("{EDITOR_ROUTE_PREFIX}{id}")));
        Ok(())
    }

    /// Copies `draft_new` to the id-scoped key and deletes it only once the
    /// copy is written.
    fn migrate_new_draft(&self, id: &str) {
        let from = draft_key(None);
        let to = draft_key(Some(id));
        let raw = match self.ctx.store.get(&from) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!("failed to read {from} for migration: {err}");
                return;
            },
        };
        if let Err(err) = self.ctx.store.set(&to, &raw) {
            tracing::warn!("failed to copy {from} to {to}; keeping {from}: {err}");
            return;
        }
        if let Err(err) = self.ctx.store.remove(&from) {
            tracing::warn!("failed to remove {from} after migration: {err}");
        }
    }

    async fn update(&mut self, id: &str, state: ArticleState) -> Result<(), ClientError> {
        self.ctx
            .api
            .update_article(id, &self.form.payload(state))
            .await?;
        self.discard_local();
        Ok(())
    }

    /// Marks the article published and saves immediately.
    pub async fn publish(&mut self) -> Result<(), ClientError> {
        self.form.state = ArticleState::Published;
        self.save(Some(ArticleState::Published)).await
    }

    /// Moves the article back to draft and saves immediately.
    pub async fn unpublish(&mut self) -> Result<(), ClientError> {
        self.form.state = ArticleState::Draft;
        self.save(Some(ArticleState::Draft)).await
    }
}

impl Drop for DraftSession {
    fn drop(&mut self) {
        if self.phase == Phase::Loading {
            return;
        }
        if let Err(err) = self.write_local() {
            tracing::error!("final local draft write for {} failed: {err}", self.local_key());
        }
    }
}

/// A single form field change.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEdit {
    /// Sets the title.
    Title(String),
    /// Sets the author name.
    AuthorName(String),
    /// Sets the author avatar URL.
    AuthorAvatar(String),
    /// Sets the author affiliation.
    AuthorAffiliation(String),
    /// Sets or clears the category.
    Category(Option<CategoryRef>),
    /// Sets the feature image URL.
    FeatureImageUrl(String),
    /// Sets the blog type.
    BlogType(BlogType),
    /// Replaces the body with API blocks.
    Body(Vec<ContentBlock>),
    /// Editor-native document, translated on apply.
    EditorDocument(Vec<EditorBlock>),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn draft_target_parses_new_keyword() {
        assert_eq!("new".parse::<DraftTarget>(), Ok(DraftTarget::New));
        assert_eq!("abc".parse::<DraftTarget>(), Ok(DraftTarget::Existing("abc".to_string())));
        assert!(" ".parse::<DraftTarget>().is_err());
    }

    #[test]
    fn snapshot_uses_camel_case_keys_and_lenient_body() {
        let snapshot: DraftSnapshot = serde_json::from_value(json!({
            "title": "Hi",
            "authorName": "Ada",
            "featureImageUrl": "https://cdn.example.com/f.png",
            "status": "published",
            "blogType": "featured story",
            "body": "[{\"type\":\"text\",\"content\":\"legacy\"}]",
            "lastSaved": 200
        }))
        .expect("snapshot");
        assert_eq!(snapshot.author_name, "Ada");
        assert_eq!(snapshot.status, ArticleState::Published);
        assert_eq!(snapshot.blog_type, BlogType::FeaturedStory);
        assert_eq!(snapshot.body, vec![ContentBlock::plain_paragraph("legacy")]);
        assert_eq!(snapshot.last_saved, 200);

        let wire = serde_json::to_value(&snapshot).expect("serialize");
        assert!(wire.get("featureImageUrl").is_some());
        assert!(wire.get("lastSaved").is_some());
    }

    #[test]
    fn payload_defaults_feature_image_alt_to_title() {
        let mut form = ArticleForm::default();
        assert_eq!(form.payload(ArticleState::Draft).feature_image.alt_text, "Feature image");
        form.title = "Derby day".to_string();
        let payload = form.payload(ArticleState::Published);
        assert_eq!(payload.feature_image.alt_text, "Derby day");
        assert_eq!(payload.state, ArticleState::Published);
    }

    #[test]
    fn editor_document_of_empty_form_is_one_blank_paragraph() {
        let form = ArticleForm::default();
        let doc = form.editor_document();
        assert_eq!(doc.len(), 1);
        assert!(doc[0].is_blank_paragraph());
    }
}
