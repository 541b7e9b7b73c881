//! Domain types and pure logic for the blogdesk admin client.
//!
//! Nothing in this crate performs I/O: the document translator, category
//! reconciliation, list derivation and error flattening all operate on
//! values handed to them.

pub mod category;
pub mod document;
pub mod error_payload;
pub mod listing;
pub mod models;

pub use category::{reconcile, unwrap_categories, CategoryRef};
pub use document::{from_api, to_api, ContentBlock, EditorBlock, StoredBlock};
pub use error_payload::flatten_error_payload;
pub use listing::{BulkAction, Filter, ListFilterState, Listable, PageView, SortDirection, SortField, SortKey};
pub use models::{
    AdminProfile, ArticlePayload, ArticleRecord, ArticleState, Author, BlogType, FeatureImage, MediaCategory,
    MediaItem, MediaType, Timestamp, TokenPair,
};
