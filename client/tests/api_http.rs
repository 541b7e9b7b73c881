use std::{sync::Arc, time::Duration};

use blogdesk_client::{
    config::parse_api_base, ApiClient, ArticleApi, CategorySource, ClientConfig, ClientError, MediaApi, MemoryStore,
};
use blogdesk_shared::{ArticleState, BlogType, MediaType, TokenPair};
use futures::future::join_all;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ClientConfig {
        api_base: parse_api_base(&server.uri()).expect("base"),
        data_dir: std::env::temp_dir(),
        autosave_delay: Duration::from_millis(200),
        http_timeout: Duration::from_secs(5),
    };
    let client = ApiClient::new(&config, Arc::new(MemoryStore::new())).expect("client");
    client
        .tokens()
        .save(&TokenPair {
            access_token: "old".to_string(),
            refresh_token: "r1".to_string(),
        })
        .expect("tokens");
    client
}

fn article_json(id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "title": "Derby day",
        "category": "features",
        "state": "published",
        "blogType": "editors pick",
        "currentPageBody": [],
        "last_updated": 1700000000
    })
}

#[tokio::test]
async fn bearer_is_attached_and_data_envelope_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/blogs/abc"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": article_json("abc") })))
        .expect(1)
        .mount(&server)
        .await;

    let article = client_for(&server).get_article("abc").await.expect("article");
    assert_eq!(article.id, "abc");
    assert_eq!(article.state, ArticleState::Published);
    assert_eq!(article.blog_type, BlogType::EditorsPick);
    assert_eq!(article.category.map(|c| c.slug), Some("features".to_string()));
}

#[tokio::test]
async fn list_requests_carry_range_and_skip_bad_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/blogs/"))
        .and(query_param("start", "0"))
        .and(query_param("stop", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([article_json("a1"), 42, article_json("a2")])))
        .expect(1)
        .mount(&server)
        .await;

    let articles = client_for(&server).list_articles(0, 100).await.expect("list");
    let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/blogs/abc"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "token expired" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/admins/refresh"))
        .and(body_json(json!({ "refresh_token": "r1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "new", "refresh_token": "r2" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/blogs/abc"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(article_json("abc")))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let results = join_all((0..3).map(|_| client.get_article("abc"))).await;
    for result in results {
        assert_eq!(result.expect("retried").id, "abc");
    }
    assert_eq!(client.tokens().access_token().as_deref(), Some("new"));
    assert_eq!(client.tokens().refresh_token().as_deref(), Some("r2"));
}

#[tokio::test]
async fn failed_refresh_expires_session_and_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/blogs/abc"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/admins/refresh"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "detail": "refresh token revoked" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.delete_article("abc").await.expect_err("expired");
    assert!(matches!(err, ClientError::SessionExpired { ref login_route } if login_route == "/login"));
    assert_eq!(client.tokens().access_token(), None);
    assert_eq!(client.tokens().refresh_token(), None);
}

#[tokio::test]
async fn rejection_message_is_flattened() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/blogs/abc"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [
                { "loc": ["body", "title"], "msg": "field required" },
                { "loc": ["body", "state"], "msg": "invalid value" }
            ]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .set_article_state("abc", ArticleState::Draft)
        .await
        .expect_err("rejected");
    match err {
        ClientError::ServerRejected {
            status,
            message,
        } => {
            assert_eq!(status, 422);
            assert_eq!(message, "body.title: field required; body.state: invalid value");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn categories_are_unwrapped_from_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/articles/content/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "listOfCategories": [
                { "name": "News", "slug": "news" },
                { "name": "Features", "slug": "features" },
                { "name": "News again", "slug": "news" }
            ]
        })))
        .mount(&server)
        .await;

    let categories = client_for(&server).fetch_categories().await.expect("categories");
    let slugs: Vec<&str> = categories.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, vec!["news", "features"]);
}

#[tokio::test]
async fn media_by_type_uses_type_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/media/by-type/video"))
        .and(query_param("start", "10"))
        .and(query_param("stop", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "_id": "v1", "url": "https://cdn.example.com/v1.mp4", "mediaType": "video" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let items = client
        .list_media(Some(MediaType::Video), 10, 20)
        .await
        .expect("media");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "v1");
    assert_eq!(items[0].media_type, MediaType::Video);
}

#[tokio::test]
async fn single_media_item_is_fetched_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/media/m7"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "_id": "m7", "url": "https://cdn.example.com/m7.png", "mediaType": "image", "category": "News" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = client_for(&server).get_media("m7").await.expect("media");
    assert_eq!(item.id, "m7");
    assert_eq!(item.media_type, MediaType::Image);
}

#[tokio::test]
async fn media_category_change_patches_only_category() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/media/m7"))
        .and(body_json(json!({ "category": "features" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .update_media_category("m7", "features")
        .await
        .expect("category change");
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let config = ClientConfig {
        api_base: parse_api_base("http://127.0.0.1:9").expect("base"),
        data_dir: std::env::temp_dir(),
        autosave_delay: Duration::from_millis(200),
        http_timeout: Duration::from_secs(2),
    };
    let client = ApiClient::new(&config, Arc::new(MemoryStore::new())).expect("client");
    let err = client.get_article("abc").await.expect_err("offline");
    assert!(err.is_network());
    assert_eq!(err.save_notice(), "Network error - saved locally");
}
