use std::{
    cell::RefCell,
    rc::Rc
};

use rust_canvas_engine::{
    config::GameConfig,
    debug::{DebugLevel, MemorySink},
    error::EngineError,
    game::{
        body::{BodyType, Hitbox, PhysicsBody, Shape},
        collider::CollisionTargets,
        game_loop::{FrameDriver, Game},
        math::Vector2F,
        particles::{EmitterConfig, ParticlePrototype, SpawnRange},
        scene::{SceneEvent, OFFLOAD_EVENT}
    },
    rendering::{DrawCommand, RecordingRenderer, RenderError}
};

/// Replays fixed timestamps.
struct ScriptedDriver {
    timestamps: std::vec::IntoIter<f64>,
}

impl ScriptedDriver {
    fn every(step_ms: f64, frames: usize) -> Self {
        let timestamps: Vec<f64> = (0..frames).map(|i| i as f64 * step_ms).collect();
        Self { timestamps: timestamps.into_iter() }
    }
}

impl FrameDriver for ScriptedDriver {
    fn next_frame(&mut self) -> Option<f64> {
        self.timestamps.next()
    }
}

fn new_game(config: GameConfig) -> (Game, Rc<MemorySink>) {
    let sink = Rc::new(MemorySink::new());
    (Game::with_sink(config, sink.clone()), sink)
}

#[test]
fn test_particles_live_and_die_across_frames() {
    let (mut game, _) = new_game(GameConfig::default());
    let scene = game.create_scene("sparks");
    let emitter = scene.add_emitter(
        ParticlePrototype::new(Shape::Circle { r: 2.0 }),
        EmitterConfig {
            range_x: SpawnRange::new(-50.0, 50.0),
            range_y: SpawnRange::new(-50.0, 50.0),
            max_age: Some(2.0),
            seed: Some(7),
            ..Default::default()
        }
    );
    scene.keep_emitting(emitter, 100.0, Some(5)).unwrap();

    let offloaded = Rc::new(RefCell::new(vec![]));
    let seen = offloaded.clone();
    scene.events.on(OFFLOAD_EVENT, move |event: &SceneEvent| {
        if let SceneEvent::Offload { particles, .. } = event {
            seen.borrow_mut().extend(particles.iter().copied());
        }
    });

    let mut renderer = RecordingRenderer::new(800, 600);
    game.start();
    for now in (0..=12).map(|i| i as f64 * 50.0) {
        game.frame(&mut renderer, now).unwrap();
    }

    let scene = game.scene("sparks").unwrap();
    assert_eq!(scene.emitter(emitter).unwrap().len(), 5);
    assert_eq!(scene.world.len(), 5);
    assert_eq!(scene.world.display_list().len(), 5);
    assert_eq!(scene.world.physics_list().len(), 5);

    for now in (13..=40).map(|i| i as f64 * 50.0) {
        game.frame(&mut renderer, now).unwrap();
    }

    let scene = game.scene("sparks").unwrap();
    assert_eq!(scene.emitter(emitter).unwrap().len(), 0);
    assert!(scene.world.is_empty());
    assert_eq!(scene.world.display_list().len(), 0);
    assert_eq!(scene.world.physics_list().len(), 0);
    assert_eq!(offloaded.borrow().len(), 5);
}

#[test]
fn test_body_falls_onto_floor_group() {
    let config = GameConfig {
        gravity: Vector2F::new(0.0, 100.0),
        ..Default::default()
    };
    let (mut game, _) = new_game(config);
    let scene = game.create_scene("level");
    let floor = scene.add_body(
        PhysicsBody::rect(-100.0, 100.0, 200.0, 20.0)
            .with_body_type(BodyType::Static)
            .with_hitbox(Hitbox::auto())
    );
    scene.add_to_group("ground", floor).unwrap();
    // Centered over the floor so landing resolves vertically.
    let player = scene.add_rect(-5.0, 0.0, 10.0, 10.0);
    scene.add_collider(player, CollisionTargets::Group("ground".into())).unwrap();

    let mut renderer = RecordingRenderer::new(800, 600);
    let frames = game.run(&mut ScriptedDriver::every(100.0, 20), &mut renderer).unwrap();
    assert_eq!(frames, 20);
    assert!(!game.is_running());

    let body = game.scene("level").unwrap().body(player).unwrap();
    assert!((body.position.y - 90.0).abs() < 1e-3, "{:?}", body.position);
    assert!(body.is_on_floor());
    assert_eq!(game.scene("level").unwrap().body(floor).unwrap().position, Vector2F::new(-100.0, 100.0));
}

#[test]
fn test_frame_timing() {
    let (mut game, _) = new_game(GameConfig::default());
    game.create_scene("empty");
    let mut renderer = RecordingRenderer::new(800, 600);

    let first = game.frame(&mut renderer, 1000.0).unwrap();
    assert_eq!(first.dt, 0.0);
    let second = game.frame(&mut renderer, 1016.0).unwrap();
    assert!((second.dt - 0.016).abs() < 1e-6);
    assert!((second.fps - 62.5).abs() < 1e-2);
    assert_eq!(game.frame_count(), 2);
    assert_eq!(renderer.frames_presented(), 2);
}

#[test]
fn test_stop_and_restart_manage_timers() {
    let (mut game, _) = new_game(GameConfig::default());
    let scene = game.create_scene("level");
    let emitter = scene.add_emitter(ParticlePrototype::new(Shape::Circle { r: 1.0 }), EmitterConfig::default());
    scene.keep_emitting(emitter, 10.0, None).unwrap();
    let doomed = scene.add_rect(0.0, 0.0, 1.0, 1.0);
    scene.destroy_after(doomed, 5000.0).unwrap();
    assert_eq!(scene.world.timers.len(), 3);

    game.start();
    game.stop();
    assert!(game.scene("level").unwrap().world.timers.is_empty());

    game.start();
    // Only aging comes back, spawning and timed destroys stay cancelled.
    assert_eq!(game.scene("level").unwrap().world.timers.len(), 1);
    assert!(game.scene("level").unwrap().body(doomed).is_some());
}

#[test]
fn test_context_loss_ends_run() {
    let (mut game, sink) = new_game(GameConfig::default());
    game.create_scene("level").add_rect(0.0, 0.0, 1.0, 1.0);
    let mut renderer = RecordingRenderer::new(800, 600);
    renderer.lose_context("gpu reset");

    let result = game.run(&mut ScriptedDriver::every(16.0, 10), &mut renderer);
    assert!(matches!(result, Err(EngineError::Render(RenderError::ContextLost(_)))));
    assert!(!game.is_running());
    assert_eq!(game.frame_count(), 0);
    assert!(sink.contains("gpu reset"));
    assert_eq!(sink.count(DebugLevel::Error), 1);
}

#[test]
fn test_recoverable_errors_do_not_stop_the_loop() {
    let (mut game, sink) = new_game(GameConfig::default());
    let scene = game.create_scene("level");
    let wall = scene.add_body(PhysicsBody::rect(0.0, 0.0, 5.0, 5.0).with_body_type(BodyType::Static));
    let ghost = scene.add_body(PhysicsBody::rect(10.0, 0.0, 5.0, 5.0).with_physics(false));

    assert!(scene.set_velocity(wall, Vector2F::new(1.0, 0.0)).is_err());
    assert!(scene.add_collider(ghost, CollisionTargets::Bodies(vec![wall])).is_err());
    assert!(scene.switch_camera("missing").is_err());
    assert!(game.switch_scene("missing").is_err());

    let mut renderer = RecordingRenderer::new(800, 600);
    let frames = game.run(&mut ScriptedDriver::every(16.0, 3), &mut renderer).unwrap();
    assert_eq!(frames, 3);
    assert_eq!(sink.count(DebugLevel::Error), 1);
    assert_eq!(sink.count(DebugLevel::Warn), 3);

    let rects = renderer.commands().iter().filter(|c| matches!(c, DrawCommand::Rect(_))).count();
    assert_eq!(rects, 2);
}
