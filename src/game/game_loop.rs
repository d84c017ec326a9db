//! Top level frame loop over a stack of scenes.

use std::{
    collections::VecDeque,
    rc::Rc
};

use crate::{
    config::GameConfig,
    debug::{DebugSink, LogSink},
    error::EngineError,
    rendering::{Color, RenderError, Renderer}
};

use super::{
    events::EventEmitter,
    scene::{FrameReport, Scene}
};

pub const START_EVENT: &str = "start";
pub const STOP_EVENT: &str = "stop";
pub const SCENE_SWITCH_EVENT: &str = "scene_switch";

const FPS_TEXT_SIZE: f32 = 16.0;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Start,
    Stop,
    SceneSwitch { from: Option<String>, to: String },
}

/// Averages `samples` twice: every entry is replaced by the mean of a scaled
/// global average and its local three point average, then the result is
/// averaged again. Returns 0 for no samples.
pub fn smooth_out(samples: &[f32], variance: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean = |values: &[f32]| values.iter().sum::<f32>() / values.len() as f32;
    let target = mean(samples) * variance;

    let mut smoothed: Vec<f32> = Vec::with_capacity(samples.len());
    for (i, current) in samples.iter().enumerate() {
        let previous = smoothed.last().copied().unwrap_or(*current);
        let next = samples.get(i + 1).copied().unwrap_or(*current);
        let local = (previous + current + next) / 3.0;
        smoothed.push((target + local) / 2.0);
    }
    mean(&smoothed)
}

/// Frame timing: delta from the previous frame and a rolling fps window.
#[derive(Debug, Clone)]
pub struct FrameClock {
    first_ms: Option<f64>,
    last_ms: Option<f64>,
    delta: f32,
    fps: f32,
    samples: VecDeque<f32>,
    capacity: usize,
    variance: f32,
}

impl FrameClock {
    pub fn new(capacity: usize, variance: f32) -> Self {
        Self {
            first_ms: None,
            last_ms: None,
            delta: 0.0,
            fps: 0.0,
            samples: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            variance,
        }
    }

    /// Registers a frame at `now_ms` and returns the delta in seconds. The
    /// first frame and frames that do not move the clock forward get 0.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        self.first_ms.get_or_insert(now_ms);
        let elapsed = self.last_ms.map(|last| now_ms - last).unwrap_or(0.0);
        self.last_ms = Some(now_ms);

        if elapsed <= 0.0 {
            self.delta = 0.0;
            return 0.0;
        }
        self.delta = (elapsed / 1000.0) as f32;
        self.fps = 1.0 / self.delta;
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(self.fps);
        self.delta
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn smoothed_fps(&self) -> f32 {
        let samples: Vec<f32> = self.samples.iter().copied().collect();
        smooth_out(&samples, self.variance)
    }

    /// Delta in seconds derived from the unscaled smoothed window, so a
    /// single slow frame does not move bodies by its full length. Frames
    /// with a zero delta stay at zero.
    pub fn smoothed_delta(&self) -> f32 {
        if self.delta <= 0.0 {
            return 0.0;
        }
        let samples: Vec<f32> = self.samples.iter().copied().collect();
        let fps = smooth_out(&samples, 1.0);
        if fps > 0.0 { 1.0 / fps } else { self.delta }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Milliseconds since the first frame.
    pub fn elapsed_ms(&self) -> f64 {
        match (self.first_ms, self.last_ms) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Forgets the previous frame so a restart does not see the pause as one
    /// long delta. The elapsed time keeps counting from where it stopped.
    pub fn pause(&mut self) {
        if let (Some(first), Some(last)) = (self.first_ms, self.last_ms) {
            self.first_ms = Some(first - last);
        }
        self.last_ms = None;
        self.delta = 0.0;
    }

    fn resume_at(&mut self, now_ms: f64) {
        if let Some(offset) = self.first_ms.filter(|_| self.last_ms.is_none()) {
            self.first_ms = Some(now_ms + offset);
        }
    }
}

/// Source of frame timestamps, the stand-in for the platform's animation
/// frame callback.
pub trait FrameDriver {
    /// Waits for the next frame and returns its timestamp in milliseconds,
    /// `None` once the driver is done.
    fn next_frame(&mut self) -> Option<f64>;
}

/// What one call to [`Game::frame`] did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Raw delta of this frame.
    pub dt: f32,
    /// Delta handed to physics, scripts and particles.
    pub smoothed_dt: f32,
    pub fps: f32,
    pub smoothed_fps: f32,
    pub scenes: usize,
    pub drawn: usize,
    pub culled: usize,
    pub collisions: usize,
}

impl FrameStats {
    fn add(&mut self, report: FrameReport) {
        self.scenes += 1;
        self.drawn += report.drawn;
        self.culled += report.culled;
        self.collisions += report.collisions;
    }
}

pub struct Game {
    config: GameConfig,
    scenes: Vec<Scene>,
    current: Option<usize>,
    clock: FrameClock,
    running: bool,
    frames: u64,
    pub events: EventEmitter<GameEvent>,
    debug: Rc<dyn DebugSink>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("scenes", &self.scenes)
            .field("current", &self.current_scene().map(Scene::name))
            .field("running", &self.running)
            .field("frames", &self.frames)
            .finish()
    }
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self::with_sink(config, Rc::new(LogSink))
    }

    pub fn with_sink(config: GameConfig, debug: Rc<dyn DebugSink>) -> Self {
        let clock = FrameClock::new(config.fps_samples, config.smoothing_variance);
        Self {
            config,
            scenes: vec![],
            current: None,
            clock,
            running: false,
            frames: 0,
            events: EventEmitter::new(),
            debug,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Sink shared by the game and every scene it creates.
    pub fn debug(&self) -> Rc<dyn DebugSink> {
        self.debug.clone()
    }

    fn report(&self, error: EngineError) -> EngineError {
        if error.is_fatal() {
            self.debug.error(&error.to_string());
        } else {
            self.debug.warn(&error.to_string());
        }
        error
    }

    // Scene stack.

    /// Builds a scene with this game's config and sink and pushes it.
    pub fn create_scene<S: AsRef<str>>(&mut self, name: S) -> &mut Scene {
        let scene = Scene::new(name, &self.config, self.debug.clone());
        let index = self.add_scene(scene);
        &mut self.scenes[index]
    }

    /// Pushes `scene` on the stack, replacing a scene with the same name.
    /// The first scene added becomes the current one.
    pub fn add_scene(&mut self, scene: Scene) -> usize {
        let index = match self.position(scene.name()) {
            Some(index) => {
                log::warn!("Scene '{}' replaced", scene.name());
                self.scenes[index] = scene;
                index
            },
            None => {
                self.scenes.push(scene);
                self.scenes.len() - 1
            }
        };
        self.current.get_or_insert(index);
        index
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.name() == name)
    }

    fn require_position(&self, name: &str) -> Result<usize, EngineError> {
        self.position(name).ok_or_else(|| self.report(EngineError::SceneNotFound(name.to_string())))
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene<S: AsRef<str>>(&self, name: S) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name() == name.as_ref())
    }

    pub fn scene_mut<S: AsRef<str>>(&mut self, name: S) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.name() == name.as_ref())
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current.map(|i| &self.scenes[i])
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut Scene> {
        self.current.map(|i| &mut self.scenes[i])
    }

    /// Shows `name`, hides the previous current scene and makes `name`
    /// current. Unknown names are reported and nothing changes.
    pub fn switch_scene<S: AsRef<str>>(&mut self, name: S) -> Result<(), EngineError> {
        let index = self.require_position(name.as_ref())?;
        let from = self.current.map(|i| self.scenes[i].name().to_string());
        if let Some(previous) = self.current.filter(|&i| i != index) {
            self.scenes[previous].visible = false;
        }
        self.scenes[index].visible = true;
        self.current = Some(index);

        log::info!("Switched scene {from:?} -> '{}'", name.as_ref());
        self.events.emit(SCENE_SWITCH_EVENT, &GameEvent::SceneSwitch { from, to: name.as_ref().to_string() });
        Ok(())
    }

    pub fn show_scene<S: AsRef<str>>(&mut self, name: S) -> Result<(), EngineError> {
        let index = self.require_position(name.as_ref())?;
        self.scenes[index].visible = true;
        Ok(())
    }

    pub fn hide_scene<S: AsRef<str>>(&mut self, name: S) -> Result<(), EngineError> {
        let index = self.require_position(name.as_ref())?;
        self.scenes[index].visible = false;
        Ok(())
    }

    /// Propagates a new canvas size to every scene's cameras.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        let canvas = self.config.canvas_size();
        for scene in self.scenes.iter_mut() {
            scene.resize(canvas);
        }
    }

    // Loop.

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        for scene in self.scenes.iter_mut() {
            scene.resume();
        }
        log::info!("Game started with {} scenes", self.scenes.len());
        self.events.emit(START_EVENT, &GameEvent::Start);
    }

    /// Stops the loop and cancels every scene's timers and camera
    /// transitions.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        for scene in self.scenes.iter_mut() {
            scene.stop();
        }
        self.clock.pause();
        log::info!("Game stopped after {} frames", self.frames);
        self.events.emit(STOP_EVENT, &GameEvent::Stop);
    }

    /// A lost context stops the game and is returned, anything else is
    /// reported and the frame carries on.
    fn handle_render_error(&mut self, error: RenderError) -> Result<(), EngineError> {
        let error = self.report(error.into());
        if error.is_fatal() {
            self.stop();
            return Err(error);
        }
        Ok(())
    }

    /// Runs one frame at timestamp `now_ms`: clear, every visible scene in
    /// stack order, optional fps text, present.
    pub fn frame(&mut self, renderer: &mut dyn Renderer, now_ms: f64) -> Result<FrameStats, EngineError> {
        if let Err(e) = renderer.clear_frame(self.config.background) {
            self.handle_render_error(e)?;
        }
        self.clock.resume_at(now_ms);
        let dt = self.clock.tick(now_ms);
        let smoothed_dt = self.clock.smoothed_delta();
        let elapsed_ms = self.clock.elapsed_ms();

        let mut stats = FrameStats {
            frame: self.frames,
            dt,
            smoothed_dt,
            fps: self.clock.fps(),
            smoothed_fps: self.clock.smoothed_fps(),
            ..Default::default()
        };

        // Hidden scenes keep their clocks so timers do not fire in bursts once shown.
        for scene in self.scenes.iter_mut() {
            scene.advance_timers(elapsed_ms);
        }
        for scene in self.scenes.iter_mut().filter(|s| s.visible) {
            stats.add(scene.run_frame(renderer, smoothed_dt, self.config.custom_tick));
        }

        if self.config.show_fps {
            renderer.set_fill_color(Color::WHITE);
            renderer.draw_text(&format!("FPS: {:.0}", stats.smoothed_fps), 10.0, 20.0, FPS_TEXT_SIZE);
        }

        if let Err(e) = renderer.present() {
            self.handle_render_error(e)?;
        }
        self.frames += 1;
        Ok(stats)
    }

    /// Starts the game and runs frames until the driver ends or the game is
    /// stopped. Returns the number of frames run.
    pub fn run(&mut self, driver: &mut dyn FrameDriver, renderer: &mut dyn Renderer) -> Result<u64, EngineError> {
        self.start();
        let first = self.frames;
        while self.running {
            let Some(now_ms) = driver.next_frame() else {
                break;
            };
            self.frame(renderer, now_ms)?;
        }
        self.stop();
        Ok(self.frames - first)
    }
}

#[cfg(test)]
use crate::{
    debug::{DebugLevel, MemorySink},
    game::{
        body::Shape,
        particles::{EmitterConfig, ParticlePrototype}
    },
    rendering::{DrawCommand, RecordingRenderer}
};

#[cfg(test)]
fn test_game() -> (Game, Rc<MemorySink>) {
    let sink = Rc::new(MemorySink::new());
    let game = Game::with_sink(GameConfig::default(), sink.clone());
    (game, sink)
}

#[test]
fn test_smooth_out() {
    assert_eq!(smooth_out(&[], 0.85), 0.0);
    assert!((smooth_out(&[60.0, 60.0, 60.0], 1.0) - 60.0).abs() < 1e-4);

    // A single spike is pulled toward the scaled mean.
    let smoothed = smooth_out(&[60.0, 60.0, 240.0, 60.0, 60.0], 1.0);
    assert!(smoothed < 240.0);
    assert!(smoothed > 60.0);
}

#[test]
fn test_frame_clock() {
    let mut clock = FrameClock::new(3, 1.0);
    assert_eq!(clock.tick(1000.0), 0.0);
    assert_eq!(clock.sample_count(), 0);

    let dt = clock.tick(1016.0);
    assert!((dt - 0.016).abs() < 1e-6);
    assert!((clock.fps() - 62.5).abs() < 1e-2);

    assert_eq!(clock.tick(1016.0), 0.0);
    for now in [1032.0, 1048.0, 1064.0, 1080.0] {
        clock.tick(now);
    }
    assert_eq!(clock.sample_count(), 3);
    assert_eq!(clock.elapsed_ms(), 80.0);

    clock.pause();
    assert_eq!(clock.smoothed_delta(), 0.0);
    clock.resume_at(5000.0);
    assert_eq!(clock.tick(5000.0), 0.0);
    assert_eq!(clock.elapsed_ms(), 80.0);
}

#[test]
fn test_smoothed_delta_absorbs_one_slow_frame() {
    let mut clock = FrameClock::new(100, 0.85);
    assert_eq!(clock.tick(0.0), 0.0);
    assert_eq!(clock.smoothed_delta(), 0.0);

    for i in 1..=10 {
        clock.tick(i as f64 * 16.0);
    }
    assert!((clock.smoothed_delta() - 0.016).abs() < 1e-4);

    let raw = clock.tick(360.0);
    assert!((raw - 0.2).abs() < 1e-6);
    assert!(clock.smoothed_delta() < 0.03);
}

#[test]
fn test_slow_frame_does_not_jump_bodies() {
    let (mut game, _) = test_game();
    let body = game.create_scene("level").add_rect(0.0, 0.0, 1.0, 1.0);
    let mut renderer = RecordingRenderer::new(800, 600);
    game.start();

    let velocity = crate::game::math::Vector2F::new(100.0, 0.0);
    let position_x = |game: &Game| game.scene("level").unwrap().body(body).unwrap().position.x;
    for i in 0..=10 {
        game.scene_mut("level").unwrap().set_velocity(body, velocity).unwrap();
        game.frame(&mut renderer, i as f64 * 16.0).unwrap();
    }
    let before = position_x(&game);
    assert!((before - 10.0 * 1.6).abs() < 1e-2);

    game.scene_mut("level").unwrap().set_velocity(body, velocity).unwrap();
    let stats = game.frame(&mut renderer, 360.0).unwrap();
    assert!((stats.dt - 0.2).abs() < 1e-6);
    // The raw delta would move it 20 units.
    let moved = position_x(&game) - before;
    assert!(moved > 1.0 && moved < 3.0, "{moved}");
    assert!((moved - 100.0 * stats.smoothed_dt).abs() < 1e-3);
}

#[test]
fn test_switch_scene() {
    let (mut game, sink) = test_game();
    let switches = Rc::new(std::cell::RefCell::new(vec![]));
    let seen = switches.clone();
    game.events.on(SCENE_SWITCH_EVENT, move |e: &GameEvent| seen.borrow_mut().push(e.clone()));

    game.create_scene("menu");
    game.create_scene("level");
    assert_eq!(game.current_scene().map(Scene::name), Some("menu"));

    game.switch_scene("level").unwrap();
    assert_eq!(game.current_scene().map(Scene::name), Some("level"));
    assert!(!game.scene("menu").unwrap().visible);
    assert!(game.scene("level").unwrap().visible);
    assert_eq!(switches.borrow().as_slice(), &[GameEvent::SceneSwitch { from: Some("menu".into()), to: "level".into() }]);

    assert!(matches!(game.switch_scene("credits"), Err(EngineError::SceneNotFound(_))));
    assert!(game.hide_scene("credits").is_err());
    assert_eq!(sink.count(DebugLevel::Warn), 2);
    assert_eq!(game.current_scene().map(Scene::name), Some("level"));
}

#[test]
fn test_frame_draws_visible_scenes_in_order() {
    let (mut game, _) = test_game();
    game.create_scene("background").add_rect(0.0, 0.0, 5.0, 5.0);
    game.create_scene("hud").add_circle(0.0, 0.0, 2.0);
    game.create_scene("hidden").add_rect(1.0, 1.0, 1.0, 1.0);
    game.hide_scene("hidden").unwrap();

    let mut renderer = RecordingRenderer::new(800, 600);
    game.start();
    let stats = game.frame(&mut renderer, 0.0).unwrap();
    assert_eq!(stats.scenes, 2);
    assert_eq!(stats.drawn, 2);

    let shapes: Vec<&DrawCommand> = renderer.commands().iter()
        .filter(|c| matches!(c, DrawCommand::Rect(_) | DrawCommand::Circle { .. }))
        .collect();
    assert!(matches!(shapes[0], DrawCommand::Rect(_)));
    assert!(matches!(shapes[1], DrawCommand::Circle { .. }));
    assert_eq!(renderer.commands()[0], DrawCommand::Clear(GameConfig::default().background));
    assert_eq!(renderer.frames_presented(), 1);
}

#[test]
fn test_stop_cancels_scene_timers() {
    let (mut game, _) = test_game();
    let scene = game.create_scene("level");
    let emitter = scene.add_emitter(ParticlePrototype::new(Shape::Circle { r: 1.0 }), EmitterConfig::default());
    scene.keep_emitting(emitter, 10.0, None).unwrap();
    assert!(!scene.world.timers.is_empty());

    game.start();
    game.stop();
    assert!(!game.is_running());
    assert!(game.scene("level").unwrap().world.timers.is_empty());
    assert!(!game.scene("level").unwrap().emitter(emitter).unwrap().emitting);
}

#[test]
fn test_context_loss_is_fatal() {
    let (mut game, sink) = test_game();
    game.create_scene("level");
    let mut renderer = RecordingRenderer::new(800, 600);
    game.start();
    game.frame(&mut renderer, 0.0).unwrap();

    renderer.lose_context("device removed");
    let result = game.frame(&mut renderer, 16.0);
    assert!(matches!(result, Err(EngineError::Render(RenderError::ContextLost(_)))));
    assert!(!game.is_running());
    assert_eq!(sink.count(DebugLevel::Error), 1);
}

#[test]
fn test_resize_reaches_scene_cameras() {
    let (mut game, _) = test_game();
    game.create_scene("level");
    game.resize(1600, 900);
    assert_eq!(game.config().canvas_size(), crate::game::math::Vector2F::new(1600.0, 900.0));
    assert_eq!(game.scene("level").unwrap().camera().canvas(), crate::game::math::Vector2F::new(1600.0, 900.0));
}

#[test]
fn test_fps_overlay() {
    let sink = Rc::new(MemorySink::new());
    let config = GameConfig { show_fps: true, ..Default::default() };
    let mut game = Game::with_sink(config, sink);
    let mut renderer = RecordingRenderer::new(800, 600);

    game.frame(&mut renderer, 0.0).unwrap();
    game.frame(&mut renderer, 20.0).unwrap();
    assert!(renderer.commands().iter().any(|c| matches!(c, DrawCommand::Text { text, .. } if text.starts_with("FPS: "))));
}
