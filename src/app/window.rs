use std::{
    sync::Arc,
    time::Instant
};

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId}
};

use crate::{
    config::GameConfig,
    error::EngineError,
    game::game_loop::Game,
    rendering::{renderer::WgpuRenderer, RenderError}
};

use super::demo;

const SCROLL_SENSITIVITY: f32 = 0.1;
const PIXELS_PER_LINE: f32 = 40.0;

struct WindowApp {
    game: Game,
    renderer: Option<WgpuRenderer>,
    started: Instant,
    error: Option<EngineError>,
}

impl WindowApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: EngineError) {
        log::error!("{error}");
        self.game.stop();
        self.error = Some(error);
        event_loop.exit();
    }

    /// Scroll up zooms in.
    fn zoom(&mut self, lines: f32) {
        if let Some(scene) = self.game.current_scene_mut() {
            scene.camera_mut().zoom_by((1.0 + SCROLL_SENSITIVITY).powf(-lines));
        }
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        let config = self.game.config();
        let attributes = Window::default_attributes()
            .with_title("rust canvas engine")
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, RenderError::Surface(e.to_string()).into()),
        };

        match pollster::block_on(WgpuRenderer::new(window.clone())) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => return self.fail(event_loop, e.into()),
        }

        let size = window.inner_size();
        self.game.resize(size.width, size.height);
        self.game.start();
        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("The close button was pressed; stopping");
                self.game.stop();
                event_loop.exit();
            },
            WindowEvent::RedrawRequested => {
                let Some(renderer) = self.renderer.as_mut() else {
                    return;
                };
                let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
                if let Err(e) = self.game.frame(renderer, now_ms) {
                    return self.fail(event_loop, e);
                }
                renderer.window().request_redraw();
            },
            WindowEvent::Resized(size) => {
                // Always followed by a redraw request, no render here.
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
                self.game.resize(size.width, size.height);
            },
            WindowEvent::MouseWheel { delta, .. } => {
                match delta {
                    MouseScrollDelta::LineDelta(_, y) => self.zoom(y),
                    MouseScrollDelta::PixelDelta(position) => self.zoom(position.y as f32 / PIXELS_PER_LINE),
                }
            },
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Released {
                    return;
                }
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => {
                        self.game.stop();
                        event_loop.exit();
                    },
                    Key::Named(NamedKey::Home) => {
                        if let Some(scene) = self.game.current_scene_mut() {
                            scene.camera_mut().reset();
                        }
                    },
                    _ => {}
                }
            },
            _ => (),
        }
    }
}

/// Opens a window and runs the demo until it is closed.
pub fn run(config: GameConfig) -> Result<(), EngineError> {
    let event_loop = EventLoop::new()?;
    // Render as fast as the surface presents.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut game = Game::new(config);
    demo::install(&mut game);

    let mut app = WindowApp {
        game,
        renderer: None,
        started: Instant::now(),
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => {
            log::info!("Window closed after {} frames", app.game.frame_count());
            Ok(())
        }
    }
}
