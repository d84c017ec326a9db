pub mod app;
pub mod assets;
pub mod config;
pub mod debug;
pub mod error;
pub mod game;
pub mod rendering;

pub use error::EngineError;
