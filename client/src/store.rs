//! Local key/value persistence for tokens and drafts.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;

use crate::error::ClientError;

/// Key of the stored access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key of the stored refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Prefix of every local draft key.
pub const DRAFT_KEY_PREFIX: &str = "draft_";
const NEW_DRAFT_SCOPE: &str = "new";
const FILE_SUFFIX: &str = ".json";

/// Storage key of the local draft for `article_id`, or of the draft for a
/// not-yet-created article.
pub fn draft_key(article_id: Option<&str>) -> String {
    format!("{DRAFT_KEY_PREFIX}{}", article_id.unwrap_or(NEW_DRAFT_SCOPE))
}

/// String key/value storage. Values are JSON text.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), ClientError>;
    /// All keys, sorted.
    fn keys(&self) -> Result<Vec<String>, ClientError>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Directory holding the files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ClientError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}{FILE_SUFFIX}")))
    }
}

fn validate_key(key: &str) -> Result<(), ClientError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(ClientError::InvalidInput(format!("invalid store key `{key}`")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        // 先写临时文件再 rename，避免写到一半的草稿
        let tmp = self.root.join(format!(".{key}{FILE_SUFFIX}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, ClientError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(FILE_SUFFIX) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process store, used by tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}
