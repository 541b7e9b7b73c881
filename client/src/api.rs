//! HTTP client for the content API.
//!
//! Every authenticated call carries the stored bearer token. A 401 hands the
//! request to the [`RefreshCoordinator`] and retries it once with whatever
//! token comes back; there is no other retry.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use blogdesk_shared::{
    flatten_error_payload, unwrap_categories, AdminProfile, ArticlePayload, ArticleRecord, ArticleState, CategoryRef,
    MediaItem, MediaType, TokenPair,
};
use reqwest::{
    multipart::{Form, Part},
    RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::{
    auth::{RefreshCoordinator, TokenRefresher, TokenStore},
    config::ClientConfig,
    error::ClientError,
    store::KeyValueStore,
};

const CATEGORIES_PATH: &str = "api/v1/articles/content/categories";

/// Article endpoints.
#[async_trait]
pub trait ArticleApi: Send + Sync {
    /// Lists articles in the half-open index range `start..stop`.
    async fn list_articles(&self, start: usize, stop: usize) -> Result<Vec<ArticleRecord>, ClientError>;
    /// Fetches one article by id.
    async fn get_article(&self, id: &str) -> Result<ArticleRecord, ClientError>;
    /// Creates an article and returns it with its server id.
    async fn create_article(&self, payload: &ArticlePayload) -> Result<ArticleRecord, ClientError>;
    /// Replaces the editable fields of an article.
    async fn update_article(&self, id: &str, payload: &ArticlePayload) -> Result<(), ClientError>;
    /// Changes only the publication state.
    async fn set_article_state(&self, id: &str, state: ArticleState) -> Result<(), ClientError>;
    /// Deletes an article.
    async fn delete_article(&self, id: &str) -> Result<(), ClientError>;
}

/// Media library endpoints.
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// Lists media in `start..stop`, optionally only of one kind.
    async fn list_media(&self, kind: Option<MediaType>, start: usize, stop: usize) -> Result<Vec<MediaItem>, ClientError>;
    /// Fetches one media item by id.
    async fn get_media(&self, id: &str) -> Result<MediaItem, ClientError>;
    /// Uploads a file into the library under `category`.
    async fn upload_media(&self, file: &UploadFile, category: &str) -> Result<Value, ClientError>;
    /// Uploads an inline body image and returns its public URL.
    async fn upload_image(&self, file: &UploadFile) -> Result<String, ClientError>;
    /// Attaches a captioned file to an existing media entry and returns the
    /// URL the server reports, if any.
    async fn upload_with_caption(&self, media_id: &str, file: &UploadFile, caption: &str) -> Result<Option<String>, ClientError>;
    /// Moves a media item to another category.
    async fn update_media_category(&self, id: &str, category: &str) -> Result<(), ClientError>;
    /// Deletes a media item.
    async fn delete_media(&self, id: &str) -> Result<(), ClientError>;
}

/// Source of the canonical category list.
#[async_trait]
pub trait CategorySource: Send + Sync {
    /// Fetches and unwraps the canonical category list.
    async fn fetch_categories(&self) -> Result<Vec<CategoryRef>, ClientError>;
}

/// A file read into memory for a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name sent with the multipart part.
    pub file_name: String,
    /// MIME type guessed from the file extension.
    pub mime: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Reads `path` into memory.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::InvalidInput(format!("{} has no usable file name", path.display())))?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    fn part(&self) -> Result<Part, ClientError> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)
            .map_err(|err| ClientError::InvalidInput(format!("bad mime type `{}`: {err}", self.mime)))
    }
}

/// Client for every endpoint the admin app talks to.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Builds a client whose tokens live in `store`.
    pub fn new(config: &ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|err| ClientError::InvalidInput(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base: config.api_base.clone(),
            refresh: Arc::new(RefreshCoordinator::new(TokenStore::new(store))),
        })
    }

    /// Stored session tokens.
    pub fn tokens(&self) -> &TokenStore {
        self.refresh.tokens()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|err| ClientError::InvalidInput(format!("invalid endpoint `{path}`: {err}")))
    }

    fn ranged(&self, path: &str, start: usize, stop: usize) -> Result<Url, ClientError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("stop", &stop.to_string());
        Ok(url)
    }

    /// Sends an authenticated request built by `build`, refreshing the token
    /// and retrying once on 401. Returns the unwrapped `data` payload.
    async fn send<F>(&self, build: F) -> Result<Value, ClientError>
    where
        F: Fn(&reqwest::Client) -> Result<RequestBuilder, ClientError> + Send + Sync,
    {
        let token = self.tokens().access_token();
        let response = with_bearer(build(&self.http)?, token.as_deref()).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_payload(response).await;
        }

        tracing::debug!("request unauthorized; awaiting fresh token");
        let fresh = self.refresh.await_token(token.as_deref(), self).await?;
        let retried = build(&self.http)?.bearer_auth(fresh).send().await?;
        read_payload(retried).await
    }

    async fn send_json<T, F>(&self, build: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> Result<RequestBuilder, ClientError> + Send + Sync,
    {
        let payload = self.send(build).await?;
        serde_json::from_value(payload).map_err(ClientError::from)
    }

    /// Signs in and stores the returned tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ClientError> {
        let url = self.endpoint("v1/admins/login")?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let tokens: TokenPair = serde_json::from_value(read_payload(response).await?)?;
        self.tokens().save(&tokens)?;
        tracing::info!("signed in as {email}");
        Ok(tokens)
    }

    /// Forgets the stored tokens.
    pub fn logout(&self) {
        self.tokens().clear();
    }

    /// Profile of the signed-in administrator.
    pub async fn me(&self) -> Result<AdminProfile, ClientError> {
        let url = self.endpoint("v1/admins/me")?;
        self.send_json(|http| Ok(http.get(url.clone()))).await
    }
}

#[async_trait]
impl TokenRefresher for ApiClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let url = self.endpoint("v1/admins/refresh")?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Ok(serde_json::from_value(read_payload(response).await?)?)
    }
}

#[async_trait]
impl ArticleApi for ApiClient {
    async fn list_articles(&self, start: usize, stop: usize) -> Result<Vec<ArticleRecord>, ClientError> {
        let url = self.ranged("v1/blogs/", start, stop)?;
        let payload = self.send(|http| Ok(http.get(url.clone()))).await?;
        Ok(decode_list(payload, "article"))
    }

    async fn get_article(&self, id: &str) -> Result<ArticleRecord, ClientError> {
        let url = self.endpoint(&format!("v1/blogs/{id}"))?;
        self.send_json(|http| Ok(http.get(url.clone()))).await
    }

    async fn create_article(&self, payload: &ArticlePayload) -> Result<ArticleRecord, ClientError> {
        let url = self.endpoint("v1/blogs/")?;
        let created: ArticleRecord = self.send_json(|http| Ok(http.post(url.clone()).json(payload))).await?;
        if created.id.is_empty() {
            return Err(ClientError::ParseFailure {
                what: "created article".to_string(),
                detail: "response has no id".to_string(),
            });
        }
        Ok(created)
    }

    async fn update_article(&self, id: &str, payload: &ArticlePayload) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("v1/blogs/{id}"))?;
        self.send(|http| Ok(http.patch(url.clone()).json(payload))).await?;
        Ok(())
    }

    async fn set_article_state(&self, id: &str, state: ArticleState) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("v1/blogs/{id}"))?;
        let body = json!({ "state": state });
        self.send(|http| Ok(http.patch(url.clone()).json(&body))).await?;
        Ok(())
    }

    async fn delete_article(&self, id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("v1/blogs/{id}"))?;
        self.send(|http| Ok(http.delete(url.clone()))).await?;
        Ok(())
    }
}

#[async_trait]
impl MediaApi for ApiClient {
    async fn list_media(&self, kind: Option<MediaType>, start: usize, stop: usize) -> Result<Vec<MediaItem>, ClientError> {
        let url = match kind {
            Some(kind) => self.ranged(&format!("v1/media/by-type/{kind}"), start, stop)?,
            None => self.ranged("v1/media/", start, stop)?,
        };
        let payload = self.send(|http| Ok(http.get(url.clone()))).await?;
        Ok(decode_list(payload, "media"))
    }

    async fn get_media(&self, id: &str) -> Result<MediaItem, ClientError> {
        let url = self.endpoint(&format!("v1/media/{id}"))?;
        self.send_json(|http| Ok(http.get(url.clone()))).await
    }

    async fn upload_media(&self, file: &UploadFile, category: &str) -> Result<Value, ClientError> {
        let url = self.endpoint("v1/media/")?;
        self.send(|http| {
            let form = Form::new()
                .part("file", file.part()?)
                .text("category", category.to_string());
            Ok(http.post(url.clone()).multipart(form))
        })
        .await
    }

    async fn upload_image(&self, file: &UploadFile) -> Result<String, ClientError> {
        let url = self.endpoint("v1/media/upload-media")?;
        let payload = self
            .send(|http| Ok(http.post(url.clone()).multipart(Form::new().part("file", file.part()?))))
            .await?;
        payload
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ClientError::ParseFailure {
                what: "upload response".to_string(),
                detail: "missing url".to_string(),
            })
    }

    async fn upload_with_caption(&self, media_id: &str, file: &UploadFile, caption: &str) -> Result<Option<String>, ClientError> {
        let url = self.endpoint(&format!("v1/media/{media_id}"))?;
        let payload = self
            .send(|http| {
                let form = Form::new()
                    .text("caption", caption.to_string())
                    .part("file", file.part()?);
                Ok(http.post(url.clone()).multipart(form))
            })
            .await?;
        Ok(payload.get("url").and_then(Value::as_str).map(str::to_string))
    }

    async fn update_media_category(&self, id: &str, category: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("v1/media/{id}"))?;
        let body = json!({ "category": category });
        self.send(|http| Ok(http.patch(url.clone()).json(&body))).await?;
        Ok(())
    }

    async fn delete_media(&self, id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("v1/media/{id}"))?;
        self.send(|http| Ok(http.delete(url.clone()))).await?;
        Ok(())
    }
}

#[async_trait]
impl CategorySource for ApiClient {
    async fn fetch_categories(&self) -> Result<Vec<CategoryRef>, ClientError> {
        let url = self.endpoint(CATEGORIES_PATH)?;
        let response = self.http.get(url).send().await?;
        Ok(unwrap_categories(&read_payload(response).await?))
    }
}

fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Reads a response body, turning non-success statuses into
/// [`ClientError::ServerRejected`] and unwrapping the `data` envelope.
async fn read_payload(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = match serde_json::from_str::<Value>(&body) {
            Ok(payload) => flatten_error_payload(&payload),
            Err(_) if !body.trim().is_empty() => body.trim().to_string(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        return Err(ClientError::ServerRejected {
            status: status.as_u16(),
            message,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let payload: Value = serde_json::from_str(&body).map_err(|err| ClientError::ParseFailure {
        what: "response body".to_string(),
        detail: err.to_string(),
    })?;
    Ok(unwrap_data(payload))
}

fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut object) if object.contains_key("data") => object.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

/// Decodes a list response item by item, skipping entries that do not parse.
fn decode_list<T: DeserializeOwned>(payload: Value, what: &str) -> Vec<T> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("expected a {what} list, got {other}");
            Vec::new()
        },
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                tracing::warn!("skipping malformed {what} entry: {err}");
                None
            },
        })
        .collect()
}
