#![allow(dead_code, reason = "each test binary uses a different subset of the fakes")]

use std::{
    collections::{BTreeMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use blogdesk_client::{ArticleApi, ClientError};
use blogdesk_shared::{
    document::body_to_value, ArticlePayload, ArticleRecord, ArticleState, CategoryRef, Timestamp,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(usize, usize),
    Get(String),
    Create(ArticlePayload),
    Update(String, ArticlePayload),
    SetState(String, ArticleState),
    Delete(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    Network,
    Rejected,
}

impl Failure {
    fn error(self) -> ClientError {
        match self {
            Self::Network => ClientError::NetworkUnavailable("connection refused".to_string()),
            Self::Rejected => ClientError::ServerRejected {
                status: 422,
                message: "body.title: field required".to_string(),
            },
        }
    }
}

/// In-memory article service recording every call.
#[derive(Default)]
pub struct FakeArticles {
    pub articles: Mutex<BTreeMap<String, ArticleRecord>>,
    pub calls: Mutex<Vec<Call>>,
    pub get_failure: Mutex<Option<Failure>>,
    pub save_failure: Mutex<Option<Failure>>,
    pub failing_ids: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
}

impl FakeArticles {
    pub fn seeded(records: Vec<ArticleRecord>) -> Self {
        let fake = Self::default();
        {
            let mut articles = fake.articles.lock();
            for record in records {
                articles.insert(record.id.clone(), record);
            }
        }
        fake
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn creates(&self) -> Vec<ArticlePayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<(String, ArticlePayload)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(id, payload) => Some((id, payload)),
                _ => None,
            })
            .collect()
    }

    fn check_save(&self) -> Result<(), ClientError> {
        match *self.save_failure.lock() {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }

    fn check_id(&self, id: &str) -> Result<(), ClientError> {
        if self.failing_ids.lock().contains(id) {
            Err(ClientError::ServerRejected {
                status: 500,
                message: format!("cannot change {id}"),
            })
        } else {
            Ok(())
        }
    }
}

fn record_from_payload(id: &str, payload: &ArticlePayload) -> ArticleRecord {
    ArticleRecord {
        id: id.to_string(),
        title: payload.title.clone(),
        author: payload.author.clone(),
        category: payload.category.clone(),
        feature_image: payload.feature_image.clone(),
        state: payload.state,
        blog_type: payload.blog_type,
        body: body_to_value(&payload.current_page_body),
        ..ArticleRecord::default()
    }
}

#[async_trait]
impl ArticleApi for FakeArticles {
    async fn list_articles(&self, start: usize, stop: usize) -> Result<Vec<ArticleRecord>, ClientError> {
        self.calls.lock().push(Call::List(start, stop));
        let articles = self.articles.lock();
        Ok(articles
            .values()
            .skip(start)
            .take(stop.saturating_sub(start))
            .cloned()
            .collect())
    }

    async fn get_article(&self, id: &str) -> Result<ArticleRecord, ClientError> {
        self.calls.lock().push(Call::Get(id.to_string()));
        if let Some(failure) = *self.get_failure.lock() {
            return Err(failure.error());
        }
        self.articles
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::ServerRejected {
                status: 404,
                message: "Blog not found".to_string(),
            })
    }

    async fn create_article(&self, payload: &ArticlePayload) -> Result<ArticleRecord, ClientError> {
        self.calls.lock().push(Call::Create(payload.clone()));
        self.check_save()?;
        let id = format!("gen-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = record_from_payload(&id, payload);
        self.articles.lock().insert(id, record.clone());
        Ok(record)
    }

    async fn update_article(&self, id: &str, payload: &ArticlePayload) -> Result<(), ClientError> {
        self.calls
            .lock()
            .push(Call::Update(id.to_string(), payload.clone()));
        self.check_save()?;
        self.articles
            .lock()
            .insert(id.to_string(), record_from_payload(id, payload));
        Ok(())
    }

    async fn set_article_state(&self, id: &str, state: ArticleState) -> Result<(), ClientError> {
        self.calls
            .lock()
            .push(Call::SetState(id.to_string(), state));
        self.check_id(id)?;
        if let Some(record) = self.articles.lock().get_mut(id) {
            record.state = state;
        }
        Ok(())
    }

    async fn delete_article(&self, id: &str) -> Result<(), ClientError> {
        self.calls.lock().push(Call::Delete(id.to_string()));
        self.check_id(id)?;
        self.articles.lock().remove(id);
        Ok(())
    }
}

pub fn canonical() -> Vec<CategoryRef> {
    vec![CategoryRef::new("News", "news"), CategoryRef::new("Features", "features")]
}

pub fn remote_article(id: &str, title: &str, state: ArticleState, last_updated: i64) -> ArticleRecord {
    ArticleRecord {
        id: id.to_string(),
        title: title.to_string(),
        state,
        category: Some(CategoryRef::new("features", "features")),
        last_updated: Some(Timestamp::from_secs(last_updated)),
        body: serde_json::json!([{ "type": "paragraph", "content": [{ "type": "text", "text": "remote body" }] }]),
        ..ArticleRecord::default()
    }
}
