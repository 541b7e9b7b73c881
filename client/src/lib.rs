//! Networked half of the blogdesk admin client.
//!
//! Talks to the content API, keeps tokens and local drafts in a key/value
//! store, runs editing sessions with debounced autosave and executes bulk
//! actions over list selections.

pub mod api;
pub mod auth;
pub mod autosave;
pub mod categories;
pub mod config;
pub mod dashboard;
pub mod draft;
pub mod error;
pub mod media;
pub mod store;

pub use api::{ApiClient, ArticleApi, CategorySource, MediaApi, UploadFile};
pub use autosave::{Autosave, AutosaveStatus};
pub use categories::{CategoryCatalog, CategorySnapshot};
pub use config::ClientConfig;
pub use draft::{ArticleForm, DraftContext, DraftSession, DraftSnapshot, DraftTarget, EditorEvent, FormEdit, Phase};
pub use error::ClientError;
pub use store::{FileStore, KeyValueStore, MemoryStore};
