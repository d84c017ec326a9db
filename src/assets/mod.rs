//! Asset handles and the async loader.
//!
//! The engine never decodes anything: a handle is the key it was loaded
//! under plus the raw bytes, and the renderer or sound player decides what to
//! do with them.

pub mod sound;
pub mod storage;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc
};

use serde::Deserialize;
use serde_json::Value;

use crate::game::math::Rect2F;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IoError, reason='{0}'")]
    Io(#[from] std::io::Error),

    #[error("JsonError, reason='{0}'")]
    Json(#[from] serde_json::Error),

    #[error("Invalid atlas, reason='{0}'")]
    InvalidAtlas(String),

    #[error("Asset '{0}' is not loaded")]
    NotLoaded(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureHandle {
    key: String,
    data: Arc<[u8]>,
}

impl TextureHandle {
    pub fn new<S: AsRef<str>>(key: S, data: Vec<u8>) -> Self {
        Self { key: key.as_ref().to_string(), data: data.into() }
    }

    /// Handle without pixel data, enough for the core and for tests.
    pub fn placeholder<S: AsRef<str>>(key: S) -> Self {
        Self::new(key, vec![])
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioHandle {
    key: String,
    data: Arc<[u8]>,
}

impl AudioHandle {
    pub fn new<S: AsRef<str>>(key: S, data: Vec<u8>) -> Self {
        Self { key: key.as_ref().to_string(), data: data.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtlasFrame {
    pub key: String,
    pub rect: Rect2F,
}

#[derive(Debug, Deserialize)]
struct AtlasJson {
    name: String,
    data: Vec<AtlasEntry>,
}

#[derive(Debug, Deserialize)]
struct AtlasEntry {
    key: String,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

/// Named source rectangles inside one texture.
///
/// Expected JSON: `{ "name": "...", "data": [ { "key": "...", "x": 0, "y": 0, "w": 16, "h": 16 } ] }`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAtlas {
    pub name: String,
    frames: Vec<AtlasFrame>,
}

impl TextureAtlas {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, AssetError> {
        let atlas = AtlasJson::deserialize(value)
            .map_err(|e| AssetError::InvalidAtlas(e.to_string()))?;
        let frames = atlas.data.into_iter()
            .map(|entry| AtlasFrame { key: entry.key, rect: Rect2F::new(entry.x, entry.y, entry.w, entry.h) })
            .collect();
        Ok(Self { name: atlas.name, frames })
    }

    pub fn frame<S: AsRef<str>>(&self, key: S) -> Option<Rect2F> {
        self.frames.iter().find(|f| f.key == key.as_ref()).map(|f| f.rect)
    }

    pub fn frames(&self) -> &[AtlasFrame] {
        &self.frames
    }

    /// Rectangles in atlas order, ready for a spritesheet body.
    pub fn rects(&self) -> Vec<Rect2F> {
        self.frames.iter().map(|f| f.rect).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Loads files relative to a root directory and keeps them by key.
#[derive(Debug, Default)]
pub struct AssetLoader {
    root: PathBuf,
    textures: HashMap<String, TextureHandle>,
    json: HashMap<String, Value>,
    audio: HashMap<String, AudioHandle>,
    atlases: HashMap<String, TextureAtlas>,
}

impl AssetLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    async fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>, AssetError> {
        let full_path = self.root.join(path.as_ref());
        log::debug!("Loading {full_path:?}");
        Ok(tokio::fs::read(&full_path).await?)
    }

    pub async fn load_texture<S: AsRef<str>, P: AsRef<Path>>(&mut self, key: S, path: P) -> Result<TextureHandle, AssetError> {
        let handle = TextureHandle::new(key.as_ref(), self.read(path).await?);
        self.textures.insert(key.as_ref().to_string(), handle.clone());
        Ok(handle)
    }

    pub async fn load_json<S: AsRef<str>, P: AsRef<Path>>(&mut self, key: S, path: P) -> Result<Value, AssetError> {
        let value: Value = serde_json::from_slice(&self.read(path).await?)?;
        self.json.insert(key.as_ref().to_string(), value.clone());
        Ok(value)
    }

    pub async fn load_audio<S: AsRef<str>, P: AsRef<Path>>(&mut self, key: S, path: P) -> Result<AudioHandle, AssetError> {
        let handle = AudioHandle::new(key.as_ref(), self.read(path).await?);
        self.audio.insert(key.as_ref().to_string(), handle.clone());
        Ok(handle)
    }

    /// Loads and validates an atlas description. A malformed file is
    /// reported and nothing is stored.
    pub async fn load_atlas<S: AsRef<str>, P: AsRef<Path>>(&mut self, key: S, path: P) -> Result<TextureAtlas, AssetError> {
        let value: Value = serde_json::from_slice(&self.read(path).await?)?;
        let atlas = TextureAtlas::from_value(&value).inspect_err(|e| log::warn!("{e}"))?;
        self.atlases.insert(key.as_ref().to_string(), atlas.clone());
        Ok(atlas)
    }

    pub fn texture<S: AsRef<str>>(&self, key: S) -> Result<&TextureHandle, AssetError> {
        self.textures.get(key.as_ref()).ok_or_else(|| AssetError::NotLoaded(key.as_ref().to_string()))
    }

    pub fn json<S: AsRef<str>>(&self, key: S) -> Result<&Value, AssetError> {
        self.json.get(key.as_ref()).ok_or_else(|| AssetError::NotLoaded(key.as_ref().to_string()))
    }

    pub fn audio<S: AsRef<str>>(&self, key: S) -> Result<&AudioHandle, AssetError> {
        self.audio.get(key.as_ref()).ok_or_else(|| AssetError::NotLoaded(key.as_ref().to_string()))
    }

    pub fn atlas<S: AsRef<str>>(&self, key: S) -> Result<&TextureAtlas, AssetError> {
        self.atlases.get(key.as_ref()).ok_or_else(|| AssetError::NotLoaded(key.as_ref().to_string()))
    }
}

#[test]
fn test_atlas_validation() {
    let atlas = TextureAtlas::from_json(r#"{
        "name": "hero",
        "data": [
            { "key": "idle", "x": 0, "y": 0, "w": 16, "h": 16 },
            { "key": "run", "x": 16, "y": 0, "w": 16, "h": 16 }
        ]
    }"#).unwrap();
    assert_eq!(atlas.name, "hero");
    assert_eq!(atlas.len(), 2);
    assert_eq!(atlas.frame("run"), Some(Rect2F::new(16.0, 0.0, 16.0, 16.0)));
    assert_eq!(atlas.frame("jump"), None);

    for malformed in [
        r#"{ "data": [] }"#,
        r#"{ "name": "hero" }"#,
        r#"{ "name": "hero", "data": {} }"#,
        r#"{ "name": "hero", "data": [ { "x": 0, "y": 0, "w": 1, "h": 1 } ] }"#,
        r#"{ "name": "hero", "data": [ { "key": "a", "x": "0", "y": 0, "w": 1, "h": 1 } ] }"#,
    ] {
        assert!(matches!(TextureAtlas::from_json(malformed), Err(AssetError::InvalidAtlas(_))), "{malformed}");
    }
    assert!(matches!(TextureAtlas::from_json("not json"), Err(AssetError::Json(_))));

    let missing_name = TextureAtlas::from_json(r#"{ "data": [] }"#).unwrap_err();
    assert!(missing_name.to_string().contains("name"), "{missing_name}");
}

#[tokio::test]
async fn test_loader_keys_handles() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("hero.png"), [1u8, 2, 3]).unwrap();
    std::fs::write(dir.path().join("level.json"), r#"{ "size": 3 }"#).unwrap();
    std::fs::write(dir.path().join("bad_atlas.json"), r#"{ "name": "x" }"#).unwrap();

    let mut loader = AssetLoader::new(dir.path());
    let texture = loader.load_texture("hero", "hero.png").await.unwrap();
    assert_eq!(texture.key(), "hero");
    assert_eq!(texture.bytes(), &[1, 2, 3]);
    assert_eq!(loader.texture("hero").unwrap(), &texture);

    let level = loader.load_json("level", "level.json").await.unwrap();
    assert_eq!(level["size"], 3);

    assert!(matches!(loader.load_atlas("bad", "bad_atlas.json").await, Err(AssetError::InvalidAtlas(_))));
    assert!(matches!(loader.atlas("bad"), Err(AssetError::NotLoaded(_))));
    assert!(matches!(loader.load_audio("theme", "missing.ogg").await, Err(AssetError::Io(_))));
}
