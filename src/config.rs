use std::path::Path;

use serde::{
    Deserialize,
    Serialize
};

use crate::{
    game::{
        camera::{DEFAULT_DISTANCE, DEFAULT_FOV},
        math::Vector2F
    },
    rendering::Color
};

pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;
pub const DEFAULT_FPS_SAMPLES: usize = 100;
pub const DEFAULT_SMOOTHING_VARIANCE: f32 = 0.85;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IoError, reason='{0}'")]
    Io(#[from] std::io::Error),

    #[error("JsonError, reason='{0}'")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub width: u32,
    pub height: u32,
    /// Scenes tick physics themselves, the loop skips the physics server.
    pub custom_tick: bool,
    pub gravity: Vector2F,
    pub round_pixels: bool,
    pub fps_samples: usize,
    pub smoothing_variance: f32,
    pub show_fps: bool,
    pub frustum_culling: bool,
    pub background: Color,
    pub camera_distance: f32,
    pub camera_fov: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            custom_tick: false,
            gravity: Vector2F::zero(),
            round_pixels: false,
            fps_samples: DEFAULT_FPS_SAMPLES,
            smoothing_variance: DEFAULT_SMOOTHING_VARIANCE,
            show_fps: false,
            frustum_culling: true,
            background: Color::DARK_GRAY,
            camera_distance: DEFAULT_DISTANCE,
            camera_fov: DEFAULT_FOV,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {:?}", path.as_ref());
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn canvas_size(&self) -> Vector2F {
        Vector2F::new(self.width as f32, self.height as f32)
    }
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = GameConfig::from_json(r#"{ "width": 1280, "custom_tick": true, "gravity": { "x": 0.0, "y": 9.8 } }"#).unwrap();
    assert_eq!(config.width, 1280);
    assert_eq!(config.height, DEFAULT_CANVAS_HEIGHT);
    assert!(config.custom_tick);
    assert_eq!(config.gravity, Vector2F::new(0.0, 9.8));
    assert_eq!(config.fps_samples, 100);
    assert_eq!(config.smoothing_variance, 0.85);
}

#[test]
fn test_malformed_json_is_reported() {
    assert!(matches!(GameConfig::from_json("{ width: }"), Err(ConfigError::Json(_))));
    assert!(matches!(GameConfig::load("/definitely/not/here.json"), Err(ConfigError::Io(_))));
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("game.json");
    let config = GameConfig { show_fps: true, background: Color::BLACK, ..Default::default() };
    config.save(&path).unwrap();
    assert_eq!(GameConfig::load(&path).unwrap(), config);
}
