//! Media library with server-side chunked loading and uploads.

use std::{collections::HashSet, sync::Arc};

use blogdesk_shared::{MediaItem, MediaType};
use serde_json::Value;

use crate::{
    api::{MediaApi, UploadFile},
    error::ClientError,
};

/// Media items loaded so far, one server page at a time.
pub struct MediaLibrary {
    api: Arc<dyn MediaApi>,
    kind: Option<MediaType>,
    per_page: usize,
    items: Vec<MediaItem>,
    loaded_pages: usize,
    has_more: bool,
}

impl MediaLibrary {
    /// Empty library loading `per_page` items per request.
    pub fn new(api: Arc<dyn MediaApi>, kind: Option<MediaType>, per_page: usize) -> Self {
        Self {
            api,
            kind,
            per_page: per_page.max(1),
            items: Vec::new(),
            loaded_pages: 0,
            has_more: true,
        }
    }

    /// Items loaded so far.
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Whether the last page came back full, so another may exist.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Highest page loaded.
    pub fn loaded_pages(&self) -> usize {
        self.loaded_pages
    }

    /// Loads server page `page` (1-based). Page 1 replaces the list; later
    /// pages append items whose ids are not loaded yet.
    pub async fn load_page(&mut self, page: usize) -> Result<usize, ClientError> {
        let page = page.max(1);
        let start = (page - 1) * self.per_page;
        let stop = page * self.per_page;
        let chunk = self.api.list_media(self.kind, start, stop).await?;
        self.has_more = chunk.len() == self.per_page;

        let added = if page == 1 {
            self.items = chunk;
            self.items.len()
        } else {
            let existing: HashSet<String> = self.items.iter().map(|item| item.id.clone()).collect();
            let before = self.items.len();
            self.items
                .extend(chunk.into_iter().filter(|item| !existing.contains(&item.id)));
            self.items.len() - before
        };
        self.loaded_pages = self.loaded_pages.max(page);
        tracing::debug!("media page {page}: {added} new items, has_more={}", self.has_more);
        Ok(added)
    }

    /// Loads the page after the last one loaded.
    pub async fn load_more(&mut self) -> Result<usize, ClientError> {
        if !self.has_more && self.loaded_pages > 0 {
            return Ok(0);
        }
        self.load_page(self.loaded_pages + 1).await
    }

    /// Uploads a library file under `category` and reloads from page 1.
    pub async fn upload(&mut self, file: &UploadFile, category: &str) -> Result<Value, ClientError> {
        let response = self.api.upload_media(file, category).await?;
        tracing::info!("uploaded {} to media library", file.file_name);
        if let Err(err) = self.load_page(1).await {
            tracing::warn!("reload after upload failed: {err}");
        }
        Ok(response)
    }

    /// Uploads an inline body image and returns its URL.
    pub async fn upload_inline(&self, file: &UploadFile) -> Result<String, ClientError> {
        self.api.upload_image(file).await
    }

    /// Attaches a captioned file to an existing media entry.
    pub async fn attach_with_caption(
        &self,
        media_id: &str,
        file: &UploadFile,
        caption: &str,
    ) -> Result<Option<String>, ClientError> {
        self.api.upload_with_caption(media_id, file, caption).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    struct Pages {
        total: usize,
        calls: Mutex<Vec<(usize, usize)>>,
    }

    fn item(n: usize) -> MediaItem {
        MediaItem {
            id: format!("m{n}"),
            url: format!("https://cdn.example.com/{n}.png"),
            name: format!("{n}.png"),
            media_type: MediaType::Image,
            category: None,
            date: None,
        }
    }

    #[async_trait]
    impl MediaApi for Pages {
        async fn list_media(&self, _kind: Option<MediaType>, start: usize, stop: usize) -> Result<Vec<MediaItem>, ClientError> {
            self.calls.lock().push((start, stop));
            let mut page: Vec<MediaItem> = (start..stop.min(self.total)).map(item).collect();
            // the first entry of later pages repeats the previous page's last one
            if start > 0 && !page.is_empty() {
                page[0] = item(start - 1);
            }
            Ok(page)
        }
        async fn get_media(&self, id: &str) -> Result<MediaItem, ClientError> {
            Err(ClientError::Unsupported(id.to_string()))
        }
        async fn upload_media(&self, _file: &UploadFile, _category: &str) -> Result<Value, ClientError> {
            Ok(Value::Null)
        }
        async fn upload_image(&self, _file: &UploadFile) -> Result<String, ClientError> {
            Ok("https://cdn.example.com/inline.png".to_string())
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
    async fn chunks_merge_unique_ids_until_short_page() {
        let api = Arc::new(Pages {
            total: 25,
            calls: Mutex::new(Vec::new()),
        });
        let mut library = MediaLibrary::new(api.clone(), None, 10);

        assert_eq!(library.load_more().await.expect("page 1"), 10);
        assert!(library.has_more());
        assert_eq!(library.load_more().await.expect("page 2"), 9);
        assert!(library.has_more());
        assert_eq!(library.load_more().await.expect("page 3"), 4);
        assert_eq!(library.items().len(), 23);
        assert!(!library.has_more());
        assert_eq!(library.load_more().await.expect("exhausted"), 0);
        assert_eq!(api.calls.lock().as_slice(), &[(0, 10), (10, 20), (20, 30)]);
    }
}
