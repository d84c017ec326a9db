use std::{
    collections::HashMap,
    path::{Path, PathBuf}
};

use serde::{
    de::DeserializeOwned,
    Serialize
};
use serde_json::Value;

use super::AssetError;

/// Key-value store for saves and settings, optionally backed by a JSON file.
/// Writes stay in memory until [`CacheManager::flush`].
#[derive(Debug, Default)]
pub struct CacheManager {
    values: HashMap<String, Value>,
    path: Option<PathBuf>,
}

impl CacheManager {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the file at `path`, a missing file starts an empty cache.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { values, path: Some(path) })
    }

    /// Missing keys and values of another shape both read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Cached '{key}' has unexpected shape, reason: {e}");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), AssetError> {
        self.values.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub async fn flush(&self) -> Result<(), AssetError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        tokio::fs::write(path, serde_json::to_vec_pretty(&self.values)?).await?;
        log::debug!("Cache flushed to {path:?}");
        Ok(())
    }
}

#[test]
fn test_typed_access() {
    let mut cache = CacheManager::in_memory();
    cache.set("best_score", &1200u32).unwrap();
    cache.set("name", &"ada").unwrap();

    assert_eq!(cache.get::<u32>("best_score"), Some(1200));
    assert_eq!(cache.get::<u32>("name"), None);
    assert_eq!(cache.get::<String>("missing"), None);
    assert!(cache.has("name"));
    assert!(cache.delete("name"));
    assert!(!cache.delete("name"));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_persistence_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("save.json");

    let mut cache = CacheManager::open(&path).await.unwrap();
    assert!(cache.is_empty());
    cache.set("level", &3).unwrap();
    cache.set("volume", &0.5f32).unwrap();
    cache.flush().await.unwrap();

    let reopened = CacheManager::open(&path).await.unwrap();
    assert_eq!(reopened.get::<i32>("level"), Some(3));
    assert_eq!(reopened.get::<f32>("volume"), Some(0.5));
}

#[tokio::test]
async fn test_corrupt_file_is_reported() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("save.json");
    tokio::fs::write(&path, b"{ broken").await.unwrap();
    assert!(matches!(CacheManager::open(&path).await, Err(AssetError::Json(_))));
}
