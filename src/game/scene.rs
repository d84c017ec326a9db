//! A scene ties one [`World`] to its cameras, emitters, physics and user script.
//!
//! Bodies are created through the `add_*` factories, which store them and
//! register them for drawing and physics in one step. Removal goes through
//! [`Scene::destroy`]. Recoverable problems are written to the injected
//! [`DebugSink`] and returned, they never stop the frame.

use std::{
    collections::{BTreeMap, HashMap},
    rc::Rc
};

use crate::{
    assets::TextureHandle,
    config::GameConfig,
    debug::DebugSink,
    error::EngineError,
    rendering::{Drawable, Renderer}
};

use super::{
    body::{Hitbox, PhysicsBody},
    camera::Camera,
    collider::{Collider, CollisionTargets},
    events::EventEmitter,
    math::{Rect2F, Vector2F},
    particles::{EmitterConfig, EmitterId, ParticleContainer, ParticleEmitter, ParticlePrototype},
    physics::{CollisionEvent, PhysicsServer},
    timers::{TaskId, TaskOwner, TimerAction},
    world::{EntityId, World, WorldError}
};

pub const MAIN_CAMERA: &str = "main";

pub const COLLISION_EVENT: &str = "collision";
pub const OFFLOAD_EVENT: &str = "offload";
pub const DESTROY_EVENT: &str = "destroy";

#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Collision(CollisionEvent),
    Offload { emitter: EmitterId, particles: Vec<EntityId> },
    Destroy(EntityId),
}

/// User hook run by the frame loop. `update` is called after the physics
/// step with the frame delta in seconds.
pub trait SceneScript {
    fn init(&mut self, _scene: &mut Scene) {}
    fn update(&mut self, scene: &mut Scene, dt: f32);
}

pub struct Scene {
    name: String,
    pub visible: bool,
    pub world: World,
    pub physics: PhysicsServer,
    pub frustum_culling: bool,
    pub events: EventEmitter<SceneEvent>,
    camera: Camera,
    active_camera: String,
    /// Inactive cameras by name.
    cameras: HashMap<String, Camera>,
    emitters: BTreeMap<EmitterId, ParticleEmitter>,
    next_emitter_id: EmitterId,
    script: Option<Box<dyn SceneScript>>,
    script_initialized: bool,
    debug: Rc<dyn DebugSink>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("visible", &self.visible)
            .field("entities", &self.world.len())
            .field("emitters", &self.emitters.len())
            .field("active_camera", &self.active_camera)
            .finish()
    }
}

/// What a frame of this scene did.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub drawn: usize,
    pub culled: usize,
    pub collisions: usize,
}

impl Scene {
    pub fn new<S: AsRef<str>>(name: S, config: &GameConfig, debug: Rc<dyn DebugSink>) -> Self {
        let camera = Camera::with_view(config.canvas_size(), config.camera_distance, config.camera_fov);

        log::debug!("Scene '{}' created", name.as_ref());
        Self {
            name: name.as_ref().to_string(),
            visible: true,
            world: World::new(),
            physics: PhysicsServer::new(config.gravity, config.round_pixels),
            frustum_culling: config.frustum_culling,
            events: Default::default(),
            camera,
            active_camera: MAIN_CAMERA.to_string(),
            cameras: HashMap::new(),
            emitters: BTreeMap::new(),
            next_emitter_id: 0,
            script: None,
            script_initialized: false,
            debug,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_script<T: SceneScript + 'static>(&mut self, script: T) {
        self.script = Some(Box::new(script));
        self.script_initialized = false;
    }

    /// Logs `error` through the sink and hands it back.
    pub fn report(&self, error: EngineError) -> EngineError {
        let message = format!("[{}] {error}", self.name);
        match error {
            EngineError::PhysicsDisabled(_) | EngineError::Render(_) | EngineError::Config(_) => self.debug.error(&message),
            _ => self.debug.warn(&message),
        }
        error
    }

    // Factories.

    pub fn add_body(&mut self, body: PhysicsBody) -> EntityId {
        self.world.create_entity(body)
    }

    pub fn add_rect(&mut self, x: f32, y: f32, w: f32, h: f32) -> EntityId {
        self.add_body(PhysicsBody::rect(x, y, w, h))
    }

    pub fn add_circle(&mut self, x: f32, y: f32, r: f32) -> EntityId {
        self.add_body(PhysicsBody::circle(x, y, r))
    }

    pub fn add_round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) -> EntityId {
        self.add_body(PhysicsBody::round_rect(x, y, w, h, radius))
    }

    pub fn add_sprite(&mut self, x: f32, y: f32, w: f32, h: f32, texture: TextureHandle) -> EntityId {
        self.add_body(PhysicsBody::sprite(x, y, w, h, texture))
    }

    pub fn add_spritesheet(&mut self, x: f32, y: f32, w: f32, h: f32, texture: TextureHandle, frames: Vec<Rect2F>) -> EntityId {
        self.add_body(PhysicsBody::spritesheet(x, y, w, h, texture, frames))
    }

    pub fn body(&self, id: EntityId) -> Option<&PhysicsBody> {
        self.world.get_entity_by_id(id)
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut PhysicsBody> {
        self.world.get_entity_by_id_mut(id)
    }

    fn require_body_mut(&mut self, id: EntityId) -> Result<&mut PhysicsBody, EngineError> {
        if !self.world.contains(id) {
            return Err(self.report(WorldError::EntityNotExist(id).into()));
        }
        self.world.get_entity_by_id_mut(id)
            .ok_or(WorldError::EntityNotExist(id).into())
    }

    pub fn add_hitbox(&mut self, id: EntityId, hitbox: Hitbox) -> Result<(), EngineError> {
        self.require_body_mut(id)?.hitbox = Some(hitbox);
        Ok(())
    }

    /// Attaches a collider, adding an auto-fitted hitbox when the body has
    /// none. Bodies with physics disabled are reported and left unchanged.
    pub fn add_collider(&mut self, id: EntityId, targets: CollisionTargets) -> Result<(), EngineError> {
        let body = self.require_body_mut(id)?;
        if !body.options.physics_enabled {
            return Err(self.report(EngineError::PhysicsDisabled(id)));
        }
        if body.hitbox.is_none() {
            body.hitbox = Some(Hitbox::auto());
        }
        body.collider = Some(Collider::new(targets));
        Ok(())
    }

    pub fn add_to_group<S: AsRef<str>>(&mut self, group: S, id: EntityId) -> Result<(), EngineError> {
        self.world.add_to_group(group, id).map_err(|e| self.report(e.into()))
    }

    /// Velocity changes on static bodies are reported and skipped.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vector2F) -> Result<(), EngineError> {
        let result = self.require_body_mut(id)?.set_velocity(velocity);
        result.map_err(|e| self.report(e))
    }

    /// The single removal routine: store, display list, physics list,
    /// groups, owned timers and emitter lists.
    pub fn destroy(&mut self, id: EntityId) -> Result<(), EngineError> {
        if let Err(e) = self.world.destroy(id) {
            return Err(self.report(e.into()));
        }
        for emitter in self.emitters.values_mut() {
            emitter.sync(&self.world);
        }
        for camera in self.cameras.values_mut().chain(std::iter::once(&mut self.camera)) {
            if camera.following() == Some(id) {
                camera.stop_follow();
            }
        }
        self.events.emit(DESTROY_EVENT, &SceneEvent::Destroy(id));
        Ok(())
    }

    /// Destroys the body after `delay_ms`. Destroying it earlier cancels the task.
    pub fn destroy_after(&mut self, id: EntityId, delay_ms: f64) -> Result<TaskId, EngineError> {
        if !self.world.contains(id) {
            return Err(self.report(WorldError::EntityNotExist(id).into()));
        }
        Ok(self.world.timers.schedule_once(TaskOwner::Body(id), delay_ms, TimerAction::DestroyBody(id)))
    }

    // Animation.

    pub fn play_animation<S: AsRef<str>>(&mut self, id: EntityId, animation: S) -> Result<(), EngineError> {
        let body = self.require_body_mut(id)?;
        let result = match body.animation.as_mut() {
            Some(manager) => manager.play(animation.as_ref()),
            None => Err(EngineError::AnimationNotFound(animation.as_ref().to_string())),
        };
        result.map_err(|e| self.report(e))
    }

    /// Feeds a trigger to the body's state machine, returns the new state.
    pub fn fire_trigger<S: AsRef<str>>(&mut self, id: EntityId, trigger: S) -> Option<String> {
        let body = self.world.get_entity_by_id_mut(id)?;
        match (body.state_machine.as_mut(), body.animation.as_mut()) {
            (Some(machine), Some(manager)) => machine.fire(trigger, manager),
            _ => None,
        }
    }

    // Cameras.

    /// Registers a camera under `name`, replacing the active one when the name matches.
    pub fn add_camera<S: AsRef<str>>(&mut self, name: S, camera: Camera) {
        if name.as_ref() == self.active_camera {
            self.camera = camera;
        } else {
            self.cameras.insert(name.as_ref().to_string(), camera);
        }
    }

    /// Unknown names are reported and the active camera stays.
    pub fn switch_camera<S: AsRef<str>>(&mut self, name: S) -> Result<(), EngineError> {
        let name = name.as_ref();
        if name == self.active_camera {
            return Ok(());
        }
        let Some(next) = self.cameras.remove(name) else {
            return Err(self.report(EngineError::CameraNotFound(name.to_string())));
        };
        let previous = std::mem::replace(&mut self.camera, next);
        let previous_name = std::mem::replace(&mut self.active_camera, name.to_string());
        self.cameras.insert(previous_name, previous);
        Ok(())
    }

    pub fn active_camera_name(&self) -> &str {
        &self.active_camera
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn camera_by_name<S: AsRef<str>>(&self, name: S) -> Option<&Camera> {
        if name.as_ref() == self.active_camera {
            Some(&self.camera)
        } else {
            self.cameras.get(name.as_ref())
        }
    }

    pub fn resize(&mut self, canvas: Vector2F) {
        self.camera.resize(canvas);
        for camera in self.cameras.values_mut() {
            camera.resize(canvas);
        }
    }

    // Emitters.

    pub fn add_emitter(&mut self, prototype: ParticlePrototype, config: EmitterConfig) -> EmitterId {
        let id = self.next_emitter_id;
        self.next_emitter_id += 1;
        let mut emitter = ParticleEmitter::new(id, prototype, config);
        emitter.start_aging(&mut self.world.timers);
        self.emitters.insert(id, emitter);
        id
    }

    pub fn emitter(&self, id: EmitterId) -> Option<&ParticleEmitter> {
        self.emitters.get(&id)
    }

    /// The emitter together with the world it spawns into.
    fn emitter_with_world(&mut self, id: EmitterId) -> Result<(&mut ParticleEmitter, &mut World), EngineError> {
        if !self.emitters.contains_key(&id) {
            return Err(self.report(EngineError::EmitterNotFound(id)));
        }
        let emitter = self.emitters.get_mut(&id).ok_or(EngineError::EmitterNotFound(id))?;
        Ok((emitter, &mut self.world))
    }

    pub fn emit(&mut self, id: EmitterId, amount: usize) -> Result<Vec<EntityId>, EngineError> {
        let (emitter, world) = self.emitter_with_world(id)?;
        Ok(emitter.create(amount, world))
    }

    pub fn keep_emitting(&mut self, id: EmitterId, interval_ms: f64, limit: Option<usize>) -> Result<(), EngineError> {
        let (emitter, world) = self.emitter_with_world(id)?;
        emitter.keep_emitting(interval_ms, limit, &mut world.timers);
        Ok(())
    }

    pub fn stop_emitting(&mut self, id: EmitterId) -> Result<(), EngineError> {
        let (emitter, world) = self.emitter_with_world(id)?;
        emitter.stop_emitting(&mut world.timers);
        Ok(())
    }

    pub fn set_container(&mut self, id: EmitterId, container: Option<ParticleContainer>) -> Result<(), EngineError> {
        let (emitter, _) = self.emitter_with_world(id)?;
        emitter.container = container;
        Ok(())
    }

    pub fn offload_max_age(&mut self, id: EmitterId, age_seconds: f32) -> Result<Vec<EntityId>, EngineError> {
        let (emitter, world) = self.emitter_with_world(id)?;
        let removed = emitter.offload_max_age(age_seconds, world);
        self.emit_offload(id, &removed);
        Ok(removed)
    }

    pub fn offload_bounds(&mut self, id: EmitterId, bounds: Rect2F) -> Result<Vec<EntityId>, EngineError> {
        let (emitter, world) = self.emitter_with_world(id)?;
        let removed = emitter.offload_bounds(&bounds, world);
        self.emit_offload(id, &removed);
        Ok(removed)
    }

    /// Destroys the emitter together with its particles and tasks.
    pub fn remove_emitter(&mut self, id: EmitterId) -> Result<(), EngineError> {
        let Some(mut emitter) = self.emitters.remove(&id) else {
            return Err(self.report(EngineError::EmitterNotFound(id)));
        };
        emitter.destroy(&mut self.world);
        Ok(())
    }

    fn emit_offload(&mut self, emitter: EmitterId, particles: &[EntityId]) {
        if !particles.is_empty() {
            self.events.emit(OFFLOAD_EVENT, &SceneEvent::Offload { emitter, particles: particles.to_vec() });
        }
    }

    // Frame.

    /// Moves the scene clock and runs whatever timers became due.
    pub fn advance_timers(&mut self, now_ms: f64) {
        for fired in self.world.timers.advance(now_ms) {
            match fired.action {
                TimerAction::SpawnParticle(id) => {
                    if let Some(emitter) = self.emitters.get_mut(&id) {
                        emitter.on_spawn_tick(&mut self.world);
                    }
                },
                TimerAction::AgeParticles(id) => {
                    if let Some(emitter) = self.emitters.get_mut(&id) {
                        emitter.on_age_tick(&mut self.world);
                    }
                },
                TimerAction::DestroyBody(id) => {
                    // Already gone is fine, the owner may have been destroyed by hand.
                    if self.world.contains(id) {
                        if let Err(e) = self.destroy(id) {
                            log::debug!("Timed destroy of {id} skipped: {e}");
                        }
                    }
                },
            }
        }
    }

    /// Physics step on its own, for scenes that tick manually.
    pub fn tick(&mut self, dt: f32) -> usize {
        let collisions = self.physics.tick(&mut self.world, dt);
        for collision in collisions.iter() {
            self.events.emit(COLLISION_EVENT, &SceneEvent::Collision(*collision));
        }
        collisions.len()
    }

    fn run_script(&mut self, dt: f32) {
        let Some(mut script) = self.script.take() else {
            return;
        };
        if !self.script_initialized {
            script.init(self);
            self.script_initialized = true;
        }
        script.update(self, dt);
        // The script may have installed a replacement for itself.
        if self.script.is_none() {
            self.script = Some(script);
        }
    }

    fn update_emitters(&mut self) {
        let mut offloaded = vec![];
        for (id, emitter) in self.emitters.iter_mut() {
            let removed = emitter.update(&mut self.world);
            if !removed.is_empty() {
                offloaded.push((*id, removed));
            }
        }
        for (id, removed) in offloaded {
            self.emit_offload(id, &removed);
        }
    }

    fn update_animations(&mut self, dt_ms: f32) {
        let animated: Vec<EntityId> = self.world.display_list().filter_by(self.world.bodies(), |b| b.animation.is_some());
        for id in animated {
            if let Some(body) = self.world.get_entity_by_id_mut(id) {
                if let Some(frame) = body.animation.as_mut().and_then(|a| a.update(dt_ms)) {
                    body.set_sheet_frame(frame);
                }
            }
        }
    }

    fn draw(&self, renderer: &mut dyn Renderer) -> (usize, usize) {
        let camera = self.camera();
        let mut drawn = 0;
        let mut culled = 0;
        for id in self.world.display_list().depth_sort(self.world.bodies()) {
            let Some(body) = self.world.get_entity_by_id(id).filter(|b| b.visible) else {
                continue;
            };
            if self.frustum_culling && !camera.is_visible(&body.bounding_rect()) {
                culled += 1;
                continue;
            }
            body.draw(renderer);
            drawn += 1;
        }
        (drawn, culled)
    }

    /// One frame: camera begin, physics unless `custom_tick`, user script,
    /// emitters and animations, depth sorted draw, camera end.
    pub fn run_frame(&mut self, renderer: &mut dyn Renderer, dt: f32, custom_tick: bool) -> FrameReport {
        let dt_ms = dt * 1000.0;
        self.camera.begin(renderer, &self.world, dt_ms);

        let collisions = if custom_tick { 0 } else { self.tick(dt) };
        self.run_script(dt);
        self.update_emitters();
        self.update_animations(dt_ms);
        let (drawn, culled) = self.draw(renderer);

        self.camera.end(renderer);
        log::trace!("Scene '{}' drew {drawn}, culled {culled}", self.name);
        FrameReport { drawn, culled, collisions }
    }

    /// Cancels every scheduled task and camera transition.
    pub fn stop(&mut self) {
        for emitter in self.emitters.values_mut() {
            emitter.cancel_tasks(&mut self.world.timers);
        }
        self.world.timers.clear();
        self.camera.cancel_transition();
        for camera in self.cameras.values_mut() {
            camera.cancel_transition();
        }
        log::debug!("Scene '{}' stopped", self.name);
    }

    /// Restarts emitter aging after a [`Scene::stop`].
    pub fn resume(&mut self) {
        for emitter in self.emitters.values_mut() {
            emitter.start_aging(&mut self.world.timers);
        }
    }
}

#[cfg(test)]
use crate::{
    debug::{DebugLevel, MemorySink},
    game::body::BodyType,
    rendering::{DrawCommand, RecordingRenderer}
};

#[cfg(test)]
fn test_scene() -> (Scene, Rc<MemorySink>) {
    let sink = Rc::new(MemorySink::new());
    let scene = Scene::new("test", &GameConfig::default(), sink.clone());
    (scene, sink)
}

#[test]
fn test_factories_register_in_both_lists() {
    let (mut scene, _) = test_scene();
    let a = scene.add_rect(0.0, 0.0, 10.0, 10.0);
    let b = scene.add_circle(5.0, 5.0, 2.0);
    let c = scene.add_round_rect(0.0, 0.0, 4.0, 4.0, 1.0);
    let d = scene.add_sprite(0.0, 0.0, 8.0, 8.0, TextureHandle::placeholder("hero"));

    for id in [a, b, c, d] {
        assert!(scene.world.display_list().contains(id));
        assert!(scene.world.physics_list().contains(id));
    }
}

#[test]
fn test_collider_on_disabled_physics_is_reported() {
    let (mut scene, sink) = test_scene();
    let ghost = scene.add_body(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0).with_physics(false));
    let result = scene.add_collider(ghost, CollisionTargets::Bodies(vec![]));
    assert!(matches!(result, Err(EngineError::PhysicsDisabled(id)) if id == ghost));
    assert!(scene.body(ghost).unwrap().collider.is_none());
    assert_eq!(sink.count(DebugLevel::Error), 1);

    let solid = scene.add_rect(0.0, 0.0, 1.0, 1.0);
    scene.add_collider(solid, CollisionTargets::Group("walls".into())).unwrap();
    assert_eq!(scene.body(solid).unwrap().hitbox, Some(Hitbox::auto()));
}

#[test]
fn test_static_velocity_and_missing_camera_are_reported() {
    let (mut scene, sink) = test_scene();
    let wall = scene.add_body(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0).with_body_type(BodyType::Static));
    assert!(scene.set_velocity(wall, Vector2F::new(1.0, 0.0)).is_err());
    assert!(scene.switch_camera("minimap").is_err());
    assert_eq!(scene.active_camera_name(), MAIN_CAMERA);
    assert_eq!(sink.count(DebugLevel::Warn), 2);

    scene.add_camera("minimap", Camera::new(Vector2F::new(200.0, 200.0)));
    scene.switch_camera("minimap").unwrap();
    assert_eq!(scene.camera().canvas(), Vector2F::new(200.0, 200.0));
}

#[test]
fn test_destroy_clears_everything_and_emits() {
    let (mut scene, sink) = test_scene();
    let destroyed = Rc::new(std::cell::RefCell::new(vec![]));
    let log = destroyed.clone();
    scene.events.on(DESTROY_EVENT, move |event| {
        if let SceneEvent::Destroy(id) = event {
            log.borrow_mut().push(*id);
        }
    });

    let id = scene.add_rect(0.0, 0.0, 1.0, 1.0);
    scene.add_to_group("enemies", id).unwrap();
    scene.destroy_after(id, 500.0).unwrap();
    scene.destroy(id).unwrap();

    assert!(scene.body(id).is_none());
    assert!(scene.world.group("enemies").unwrap().is_empty());
    assert!(scene.world.timers.is_empty());
    assert_eq!(*destroyed.borrow(), vec![id]);

    assert!(scene.destroy(id).is_err());
    assert!(sink.contains("does not exist"));
}

#[test]
fn test_timed_destroy_and_emitter_spawning() {
    let (mut scene, _) = test_scene();
    let id = scene.add_rect(0.0, 0.0, 1.0, 1.0);
    scene.destroy_after(id, 100.0).unwrap();

    let emitter = scene.add_emitter(ParticlePrototype::new(super::body::Shape::Circle { r: 1.0 }), EmitterConfig {
        seed: Some(3),
        ..Default::default()
    });
    scene.keep_emitting(emitter, 50.0, Some(3)).unwrap();

    scene.advance_timers(99.0);
    assert!(scene.body(id).is_some());
    assert_eq!(scene.emitter(emitter).unwrap().len(), 1);

    // The spawn interval fell behind, it fires once instead of catching up.
    scene.advance_timers(1000.0);
    assert!(scene.body(id).is_none());
    assert_eq!(scene.emitter(emitter).unwrap().len(), 2);
    assert_eq!(scene.world.len(), 2);

    // Aged once at 1000 ms.
    let removed = scene.offload_max_age(emitter, 1.0).unwrap();
    assert_eq!(removed.len(), 2);
    assert!(scene.world.is_empty());

    scene.stop();
    assert!(scene.world.timers.is_empty());
    assert!(!scene.emitter(emitter).unwrap().emitting);
}

#[test]
fn test_emitter_does_not_burst_after_long_pause() {
    let (mut scene, _) = test_scene();
    let emitter = scene.add_emitter(ParticlePrototype::new(super::body::Shape::Circle { r: 1.0 }), EmitterConfig {
        seed: Some(5),
        ..Default::default()
    });
    scene.keep_emitting(emitter, 10.0, None).unwrap();

    scene.advance_timers(16.0);
    assert_eq!(scene.emitter(emitter).unwrap().len(), 1);
    scene.advance_timers(60_016.0);
    assert_eq!(scene.emitter(emitter).unwrap().len(), 2);
    assert_eq!(scene.world.len(), 2);
}

#[test]
fn test_run_frame_order_and_culling() {
    struct Mover {
        target: EntityId,
        seen_position: Option<Vector2F>,
    }
    impl SceneScript for Mover {
        fn update(&mut self, scene: &mut Scene, _dt: f32) {
            // Runs after physics: the body already moved this frame.
            self.seen_position = scene.body(self.target).map(|b| b.position);
            assert_eq!(self.seen_position, Some(Vector2F::new(10.0, 0.0)));
        }
    }

    let (mut scene, _) = test_scene();
    let far = scene.add_rect(10_000.0, 0.0, 5.0, 5.0);
    let front = scene.add_body(PhysicsBody::rect(0.0, 0.0, 5.0, 5.0).with_z_index(1));
    let back = scene.add_rect(0.0, 0.0, 5.0, 5.0);
    scene.set_velocity(back, Vector2F::new(10.0, 0.0)).unwrap();
    scene.set_script(Mover { target: back, seen_position: None });

    let mut renderer = RecordingRenderer::new(800, 600);
    let report = scene.run_frame(&mut renderer, 1.0, false);
    assert_eq!(report, FrameReport { drawn: 2, culled: 1, collisions: 0 });

    let rects: Vec<Rect2F> = renderer.commands().iter()
        .filter_map(|c| if let DrawCommand::Rect(r) = c { Some(*r) } else { None })
        .collect();
    assert_eq!(rects, vec![Rect2F::new(10.0, 0.0, 5.0, 5.0), Rect2F::new(0.0, 0.0, 5.0, 5.0)]);
    assert_eq!(renderer.commands().first(), Some(&DrawCommand::Save));
    assert_eq!(renderer.commands().last(), Some(&DrawCommand::Restore));
    assert!(scene.body(far).is_some() && scene.body(front).is_some());
}

#[test]
fn test_custom_tick_skips_physics() {
    let (mut scene, _) = test_scene();
    let id = scene.add_rect(0.0, 0.0, 5.0, 5.0);
    scene.set_velocity(id, Vector2F::new(10.0, 0.0)).unwrap();

    let mut renderer = RecordingRenderer::new(800, 600);
    scene.run_frame(&mut renderer, 1.0, true);
    assert_eq!(scene.body(id).unwrap().position, Vector2F::zero());

    scene.tick(1.0);
    assert_eq!(scene.body(id).unwrap().position, Vector2F::new(10.0, 0.0));
}
