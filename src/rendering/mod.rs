//! Drawing surface seen by the engine core.
//!
//! The core never touches a GPU or a canvas directly, it calls the narrow
//! [`Renderer`] trait. [`RecordingRenderer`] keeps the calls as data for the
//! headless runner and tests, [`renderer::WgpuRenderer`] puts them on screen.

pub mod renderer;

use serde::{
    Deserialize,
    Serialize
};

use crate::{
    assets::TextureHandle,
    game::math::{Rect2F, Vector2F}
};

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum RenderError {
    #[error("Rendering context lost, reason='{0}'")]
    ContextLost(String),

    #[error("Surface unavailable, reason='{0}'")]
    Surface(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const DARK_GRAY: Color = Color::rgb(26, 26, 26);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
}

/// Narrow drawing interface the frame loop talks to.
///
/// Transform calls follow canvas semantics: `scale` then `translate` means a
/// world point `p` lands at `scale * (p + translate)`.
pub trait Renderer {
    /// Starts a frame. A lost context is unrecoverable and must be returned as
    /// [`RenderError::ContextLost`].
    fn clear_frame(&mut self, background: Color) -> Result<(), RenderError>;

    /// Finishes a frame and hands it to the platform.
    fn present(&mut self) -> Result<(), RenderError>;

    fn canvas_size(&self) -> Vector2F;

    fn set_fill_color(&mut self, color: Color);
    fn set_blend_mode(&mut self, mode: BlendMode);

    fn save(&mut self);
    fn restore(&mut self);
    fn scale(&mut self, sx: f32, sy: f32);
    fn translate(&mut self, x: f32, y: f32);

    fn draw_rect(&mut self, x: f32, y: f32, w: f32, h: f32);
    fn draw_circle(&mut self, x: f32, y: f32, r: f32);
    fn draw_round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32);
    fn draw_sprite(&mut self, texture: &TextureHandle, source: Option<Rect2F>, destination: Rect2F);
    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32);
}

/// Anything that can put itself on a [`Renderer`].
pub trait Drawable {
    fn draw(&self, renderer: &mut dyn Renderer);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    FillColor(Color),
    Blend(BlendMode),
    Save,
    Restore,
    Scale(f32, f32),
    Translate(f32, f32),
    Rect(Rect2F),
    Circle { center: Vector2F, r: f32 },
    RoundRect { rect: Rect2F, radius: f32 },
    Sprite { texture: String, source: Option<Rect2F>, destination: Rect2F },
    Text { text: String, position: Vector2F, size: f32 },
}

/// Renderer that keeps the commands of the current frame as data.
#[derive(Debug)]
pub struct RecordingRenderer {
    size: Vector2F,
    commands: Vec<DrawCommand>,
    frames_presented: u64,
    lost: Option<String>,
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Vector2F::new(width as f32, height as f32),
            commands: vec![],
            frames_presented: 0,
            lost: None,
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Shapes drawn this frame, leaving out state changes.
    pub fn shape_count(&self) -> usize {
        self.commands.iter()
            .filter(|c| matches!(c,
                DrawCommand::Rect(_)
                | DrawCommand::Circle { .. }
                | DrawCommand::RoundRect { .. }
                | DrawCommand::Sprite { .. }
            ))
            .count()
    }

    /// Makes every following frame fail as if the device went away.
    pub fn lose_context<S: AsRef<str>>(&mut self, reason: S) {
        self.lost = Some(reason.as_ref().to_string());
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Vector2F::new(width as f32, height as f32);
    }
}

impl Renderer for RecordingRenderer {
    fn clear_frame(&mut self, background: Color) -> Result<(), RenderError> {
        if let Some(reason) = &self.lost {
            return Err(RenderError::ContextLost(reason.clone()));
        }
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(background));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if let Some(reason) = &self.lost {
            return Err(RenderError::ContextLost(reason.clone()));
        }
        self.frames_presented += 1;
        log::trace!("Recorded frame {} with {} commands", self.frames_presented, self.commands.len());
        Ok(())
    }

    fn canvas_size(&self) -> Vector2F {
        self.size
    }

    fn set_fill_color(&mut self, color: Color) {
        self.commands.push(DrawCommand::FillColor(color));
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.commands.push(DrawCommand::Blend(mode));
    }

    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.commands.push(DrawCommand::Scale(sx, sy));
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::Translate(x, y));
    }

    fn draw_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.commands.push(DrawCommand::Rect(Rect2F::new(x, y, w, h)));
    }

    fn draw_circle(&mut self, x: f32, y: f32, r: f32) {
        self.commands.push(DrawCommand::Circle { center: Vector2F::new(x, y), r });
    }

    fn draw_round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) {
        self.commands.push(DrawCommand::RoundRect { rect: Rect2F::new(x, y, w, h), radius });
    }

    fn draw_sprite(&mut self, texture: &TextureHandle, source: Option<Rect2F>, destination: Rect2F) {
        self.commands.push(DrawCommand::Sprite {
            texture: texture.key().to_string(),
            source,
            destination
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position: Vector2F::new(x, y),
            size
        });
    }
}

#[test]
fn test_recording_renderer_resets_each_frame() {
    let mut renderer = RecordingRenderer::new(800, 600);
    renderer.clear_frame(Color::BLACK).unwrap();
    renderer.draw_rect(0.0, 0.0, 10.0, 10.0);
    renderer.draw_circle(5.0, 5.0, 2.0);
    renderer.present().unwrap();
    assert_eq!(renderer.shape_count(), 2);

    renderer.clear_frame(Color::BLACK).unwrap();
    assert_eq!(renderer.shape_count(), 0);
    assert_eq!(renderer.commands(), &[DrawCommand::Clear(Color::BLACK)]);
    assert_eq!(renderer.frames_presented(), 1);
}

#[test]
fn test_recording_renderer_context_loss() {
    let mut renderer = RecordingRenderer::new(800, 600);
    renderer.lose_context("gpu reset");
    assert_eq!(
        renderer.clear_frame(Color::BLACK),
        Err(RenderError::ContextLost("gpu reset".to_string()))
    );
}
