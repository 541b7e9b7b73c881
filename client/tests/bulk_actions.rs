mod common;

use std::sync::Arc;

use async_trait::async_trait;
use blogdesk_client::{
    dashboard::{article_list, media_list, AssumeYes},
    ClientError, MediaApi, UploadFile,
};
use blogdesk_shared::{listing::Filter, ArticleState, BulkAction, MediaItem, MediaType};
use common::{canonical, remote_article, Call, FakeArticles};
use serde_json::Value;

fn seeded() -> Arc<FakeArticles> {
    Arc::new(FakeArticles::seeded(vec![
        remote_article("a1", "First", ArticleState::Draft, 100),
        remote_article("a2", "Second", ArticleState::Draft, 200),
        remote_article("a3", "Third", ArticleState::Draft, 300),
        remote_article("a4", "Fourth", ArticleState::Published, 400),
    ]))
}

#[tokio::test]
async fn partial_delete_failure_keeps_failed_item_and_clears_selection() {
    let api = seeded();
    api.failing_ids.lock().insert("a2".to_string());
    let mut list = article_list(api.clone());
    assert_eq!(list.reload().await.expect("load"), 4);

    for id in ["a1", "a2", "a3"] {
        assert!(list.state_mut().toggle(id));
    }
    let outcome = list
        .run_bulk(BulkAction::Delete, &AssumeYes)
        .await
        .expect("bulk");

    assert_eq!(outcome.succeeded.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert!(outcome.has_failures());
    let summary = outcome.summary(BulkAction::Delete);
    assert_eq!(summary, "Deleted 2 items; some operations failed");
    assert!(!summary.contains("a2"));

    let remaining: Vec<&str> = list.items().iter().map(|item| item.id.as_str()).collect();
    assert_eq!(remaining, vec!["a2", "a4"]);
    assert!(list.state().selected().is_empty());

    let deletes = api
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Delete(_)))
        .count();
    assert_eq!(deletes, 3);
}

#[tokio::test]
async fn bulk_publish_sets_state_on_each_selected_article() {
    let api = seeded();
    let mut list = article_list(api.clone());
    list.reload().await.expect("load");
    list.state_mut()
        .toggle_select_all(&["a1".to_string(), "a3".to_string()]);

    let outcome = list
        .run_bulk(BulkAction::Publish, &AssumeYes)
        .await
        .expect("bulk");
    assert!(!outcome.has_failures());
    assert_eq!(outcome.summary(BulkAction::Publish), "Published 2 items");

    let mut changed: Vec<(String, ArticleState)> = api
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::SetState(id, state) => Some((id, state)),
            _ => None,
        })
        .collect();
    changed.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        changed,
        vec![
            ("a1".to_string(), ArticleState::Published),
            ("a3".to_string(), ArticleState::Published)
        ]
    );

    // the reloaded list reflects the new states
    list.state_mut().set_tab(Filter::Only(ArticleState::Published));
    let page = list.visible_page(&canonical());
    assert_eq!(page.total_items, 3);
}

#[tokio::test]
async fn empty_selection_is_a_no_op() {
    let api = seeded();
    let mut list = article_list(api.clone());
    list.reload().await.expect("load");
    let calls_before = api.calls().len();

    let outcome = list
        .run_bulk(BulkAction::Delete, &AssumeYes)
        .await
        .expect("bulk");
    assert_eq!(outcome.summary(BulkAction::Delete), "Nothing selected");
    assert_eq!(api.calls().len(), calls_before);
}

struct TwoImages;

fn image(id: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        url: format!("https://cdn.example.com/{id}.png"),
        name: format!("{id}.png"),
        media_type: MediaType::Image,
        category: None,
        date: None,
    }
}

#[async_trait]
impl MediaApi for TwoImages {
    async fn list_media(&self, _kind: Option<MediaType>, start: usize, _stop: usize) -> Result<Vec<MediaItem>, ClientError> {
        Ok(if start == 0 {
            vec![image("m1"), image("m2")]
        } else {
            Vec::new()
        })
    }
    async fn get_media(&self, id: &str) -> Result<MediaItem, ClientError> {
        Ok(image(id))
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
async fn media_items_cannot_be_published() {
    let mut list = media_list(Arc::new(TwoImages), Some(MediaType::Image));
    list.reload().await.expect("load");
    list.state_mut().toggle("m1");

    let outcome = list
        .run_bulk(BulkAction::Publish, &AssumeYes)
        .await
        .expect("bulk");
    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed.len(), 1);
    // nothing succeeded, so the selection stays for another attempt
    assert!(list.state().is_selected("m1"));
}
