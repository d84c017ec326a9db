//! Particle emitters.
//!
//! Particles are ordinary bodies stored in the [`World`]. The emitter keeps
//! only their ids and removes them through [`World::destroy`], so the
//! emitter list, the display list and the physics list never disagree.
//! Spawning and aging run on the scene timers, owned by the emitter.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{
    Deserialize,
    Serialize
};

use crate::{
    error::EngineError,
    rendering::{BlendMode, Color}
};

use super::{
    body::{BodyType, PhysicsBody, Shape},
    math::{Rect2F, Vector2F},
    timers::{TaskId, TaskOwner, TimerAction, Timers},
    world::{EntityId, World}
};

pub type EmitterId = u32;

/// Per-particle data carried by the body.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParticleState {
    /// Seconds, increased by the emitter's aging task.
    pub age: f32,
    /// Added to the velocity on every physics step.
    pub float_velocity: Vector2F,
    pub emitter: EmitterId,
}

/// Template every spawned particle is cloned from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticlePrototype {
    pub shape: Shape,
    pub color: Color,
    pub blend_mode: BlendMode,
    pub z_index: i32,
    pub body_type: BodyType,
}

impl ParticlePrototype {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            color: Color::WHITE,
            blend_mode: BlendMode::Normal,
            z_index: 0,
            body_type: BodyType::Kinematic,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }
}

/// Inclusive `[min, max]` sampling range.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRange {
    pub min: f32,
    pub max: f32,
}

impl SpawnRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min: min.min(max), max: min.max(max) }
    }

    pub fn fixed(value: f32) -> Self {
        Self { min: value, max: value }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.min >= self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub range_x: SpawnRange,
    pub range_y: SpawnRange,
    pub float_range_x: SpawnRange,
    pub float_range_y: SpawnRange,
    /// Applied on every update when set.
    pub max_age: Option<f32>,
    /// Applied on every update when set.
    pub offload_bounds: Option<Rect2F>,
    /// Fixed seed for reproducible spawns.
    pub seed: Option<u64>,
}

/// Keeps particles inside a region by kicking them back in when they leave.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleContainer {
    pub bounds: Rect2F,
    pub bounciness: f32,
}

impl ParticleContainer {
    pub fn new(bounds: Rect2F, bounciness: f32) -> Self {
        Self { bounds, bounciness }
    }

    /// Sets velocity and float velocity to `±bounciness` on each axis the
    /// particle left through. Returns whether the particle was outside.
    pub fn update(&self, body: &mut PhysicsBody) -> Result<bool, EngineError> {
        let footprint = body.footprint();
        let rect = footprint.bounding_rect();
        if footprint.intersects_rect(&self.bounds) && self.bounds.encloses(&rect) {
            return Ok(false);
        }

        let kick_x = if rect.left() < self.bounds.left() {
            Some(self.bounciness)
        } else if rect.right() > self.bounds.right() {
            Some(-self.bounciness)
        } else {
            None
        };
        let kick_y = if rect.top() < self.bounds.top() {
            Some(self.bounciness)
        } else if rect.bottom() > self.bounds.bottom() {
            Some(-self.bounciness)
        } else {
            None
        };

        if let Some(x) = kick_x {
            body.set_velocity_x(x)?;
            if let Some(particle) = body.particle.as_mut() {
                particle.float_velocity.x = x;
            }
        }
        if let Some(y) = kick_y {
            body.set_velocity_y(y)?;
            if let Some(particle) = body.particle.as_mut() {
                particle.float_velocity.y = y;
            }
        }
        Ok(true)
    }
}

const AGE_INTERVAL_MS: f64 = 1000.0;

#[derive(Debug)]
pub struct ParticleEmitter {
    id: EmitterId,
    prototype: ParticlePrototype,
    config: EmitterConfig,
    particles: Vec<EntityId>,
    pub emitting: bool,
    pub enabled: bool,
    pub container: Option<ParticleContainer>,
    spawn_task: Option<TaskId>,
    spawn_limit: Option<usize>,
    age_task: Option<TaskId>,
    rng: StdRng,
}

impl ParticleEmitter {
    pub fn new(id: EmitterId, prototype: ParticlePrototype, config: EmitterConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            id,
            prototype,
            config,
            particles: vec![],
            emitting: false,
            enabled: true,
            container: None,
            spawn_task: None,
            spawn_limit: None,
            age_task: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> EmitterId {
        self.id
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn particles(&self) -> &[EntityId] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Spawns `amount` particles and registers each in the world lists.
    pub fn create(&mut self, amount: usize, world: &mut World) -> Vec<EntityId> {
        let created: Vec<EntityId> = (0..amount)
            .map(|_| {
                let body = self.spawn_body();
                world.create_entity(body)
            })
            .collect();
        self.particles.extend_from_slice(&created);
        log::trace!("Emitter {} created {amount} particles, {} alive", self.id, self.particles.len());
        created
    }

    fn spawn_body(&mut self) -> PhysicsBody {
        let position = Vector2F::new(
            self.config.range_x.sample(&mut self.rng),
            self.config.range_y.sample(&mut self.rng),
        );
        let float_velocity = Vector2F::new(
            self.config.float_range_x.sample(&mut self.rng),
            self.config.float_range_y.sample(&mut self.rng),
        );

        let mut body = PhysicsBody::new(self.prototype.shape.clone(), position)
            .with_name(format!("particle-{}", self.id))
            .with_body_type(self.prototype.body_type)
            .with_color(self.prototype.color)
            .with_blend_mode(self.prototype.blend_mode)
            .with_z_index(self.prototype.z_index);
        body.particle = Some(ParticleState { age: 0.0, float_velocity, emitter: self.id });
        body
    }

    /// Starts the once-per-second aging task. Calling it again is a no-op.
    pub fn start_aging(&mut self, timers: &mut Timers) {
        if self.age_task.is_none() {
            let task = timers.schedule_interval(TaskOwner::Emitter(self.id), AGE_INTERVAL_MS, TimerAction::AgeParticles(self.id));
            self.age_task = Some(task);
        }
    }

    /// Spawns one particle every `interval_ms` until `limit` particles are
    /// alive. Replaces a previous emission schedule.
    pub fn keep_emitting(&mut self, interval_ms: f64, limit: Option<usize>, timers: &mut Timers) {
        if let Some(task) = self.spawn_task.take() {
            timers.cancel(task);
        }
        let task = timers.schedule_interval(TaskOwner::Emitter(self.id), interval_ms, TimerAction::SpawnParticle(self.id));
        self.spawn_task = Some(task);
        self.spawn_limit = limit;
        self.emitting = true;
        log::debug!("Emitter {} emitting every {interval_ms} ms, limit {limit:?}", self.id);
    }

    pub fn stop_emitting(&mut self, timers: &mut Timers) {
        if let Some(task) = self.spawn_task.take() {
            timers.cancel(task);
        }
        self.emitting = false;
    }

    pub fn on_spawn_tick(&mut self, world: &mut World) -> Option<EntityId> {
        if !self.enabled || !self.emitting {
            return None;
        }
        self.sync(world);
        if self.spawn_limit.is_some_and(|limit| self.particles.len() >= limit) {
            return None;
        }
        self.create(1, world).pop()
    }

    pub fn on_age_tick(&mut self, world: &mut World) {
        for id in &self.particles {
            if let Some(particle) = world.get_entity_by_id_mut(*id).and_then(|b| b.particle.as_mut()) {
                particle.age += 1.0;
            }
        }
    }

    /// Destroys every particle at least `age_seconds` old.
    pub fn offload_max_age(&mut self, age_seconds: f32, world: &mut World) -> Vec<EntityId> {
        self.offload_where(world, |body| body.particle.is_some_and(|p| p.age >= age_seconds))
    }

    /// Destroys every particle whose center left `bounds`.
    pub fn offload_bounds(&mut self, bounds: &Rect2F, world: &mut World) -> Vec<EntityId> {
        self.offload_where(world, |body| !bounds.contains(&body.center()))
    }

    fn offload_where<F>(&mut self, world: &mut World, predicate: F) -> Vec<EntityId>
    where
        F: Fn(&PhysicsBody) -> bool
    {
        let expired: Vec<EntityId> = self.particles.iter()
            .copied()
            .filter(|id| world.get_entity_by_id(*id).is_some_and(&predicate))
            .collect();

        for id in expired.iter() {
            if let Err(e) = world.destroy(*id) {
                log::warn!("Emitter {} offload: {e}", self.id);
            }
        }
        self.particles.retain(|id| !expired.contains(id));
        expired
    }

    /// Forgets particles destroyed by someone else.
    pub fn sync(&mut self, world: &World) {
        self.particles.retain(|id| world.contains(*id));
    }

    /// Per-frame bookkeeping: prune, contain, then apply the configured offloads.
    /// Returns ids removed on this call.
    pub fn update(&mut self, world: &mut World) -> Vec<EntityId> {
        self.sync(world);
        if !self.enabled {
            return vec![];
        }

        if let Some(container) = self.container {
            for id in self.particles.iter() {
                if let Some(body) = world.get_entity_by_id_mut(*id) {
                    if let Err(e) = container.update(body) {
                        log::warn!("Emitter {} container: {e}", self.id);
                    }
                }
            }
        }

        let mut removed = vec![];
        if let Some(max_age) = self.config.max_age {
            removed.extend(self.offload_max_age(max_age, world));
        }
        if let Some(bounds) = self.config.offload_bounds {
            removed.extend(self.offload_bounds(&bounds, world));
        }
        removed
    }

    /// Cancels spawning and aging. Particles stay where they are.
    pub fn cancel_tasks(&mut self, timers: &mut Timers) {
        timers.cancel_owner(TaskOwner::Emitter(self.id));
        self.spawn_task = None;
        self.age_task = None;
        self.emitting = false;
    }

    /// Cancels the emitter's tasks and destroys all of its particles.
    pub fn destroy(&mut self, world: &mut World) {
        self.cancel_tasks(&mut world.timers);
        for id in self.particles.drain(..) {
            if let Err(e) = world.destroy(id) {
                log::debug!("Emitter {} teardown: {e}", self.id);
            }
        }
    }
}

#[cfg(test)]
fn seeded_emitter() -> ParticleEmitter {
    let config = EmitterConfig {
        range_x: SpawnRange::new(10.0, 20.0),
        range_y: SpawnRange::new(-5.0, 5.0),
        float_range_x: SpawnRange::fixed(0.0),
        float_range_y: SpawnRange::new(-1.0, -3.0),
        seed: Some(7),
        ..Default::default()
    };
    ParticleEmitter::new(1, ParticlePrototype::new(Shape::Circle { r: 2.0 }), config)
}

#[test]
fn test_create_registers_in_all_three_lists() {
    let mut world = World::new();
    let mut emitter = seeded_emitter();
    let created = emitter.create(10, &mut world);

    assert_eq!(created.len(), 10);
    assert_eq!(emitter.len(), 10);
    assert_eq!(world.display_list().len(), 10);
    assert_eq!(world.physics_list().len(), 10);
    for id in created {
        let body = world.get_entity_by_id(id).unwrap();
        assert!((10.0..=20.0).contains(&body.position.x));
        assert!((-5.0..=5.0).contains(&body.position.y));
        let particle = body.particle.unwrap();
        assert_eq!(particle.emitter, 1);
        assert!((-3.0..=-1.0).contains(&particle.float_velocity.y));
    }
}

#[test]
fn test_offload_max_age_removes_from_all_three_lists() {
    let mut world = World::new();
    let mut emitter = seeded_emitter();
    let old = emitter.create(4, &mut world);
    emitter.on_age_tick(&mut world);
    emitter.on_age_tick(&mut world);
    let young = emitter.create(3, &mut world);

    let removed = emitter.offload_max_age(2.0, &mut world);
    assert_eq!(removed, old);
    assert_eq!(emitter.particles(), young.as_slice());
    for id in old {
        assert!(!world.contains(id));
        assert!(!world.display_list().contains(id));
        assert!(!world.physics_list().contains(id));
    }
    assert_eq!(world.display_list().len(), 3);
    assert_eq!(world.physics_list().len(), 3);
}

#[test]
fn test_offload_bounds() {
    let mut world = World::new();
    let mut emitter = seeded_emitter();
    let ids = emitter.create(5, &mut world);
    world.get_entity_by_id_mut(ids[2]).unwrap().position = Vector2F::new(500.0, 500.0);

    let removed = emitter.offload_bounds(&Rect2F::new(0.0, -10.0, 100.0, 20.0), &mut world);
    assert_eq!(removed, vec![ids[2]]);
    assert_eq!(emitter.len(), 4);
    assert_eq!(world.len(), 4);
}

#[test]
fn test_spawn_limit_and_stop() {
    let mut world = World::new();
    let mut emitter = seeded_emitter();
    emitter.keep_emitting(100.0, Some(2), &mut world.timers);

    for now in [100.0, 200.0, 300.0, 400.0, 500.0] {
        for action in world.timers.advance(now) {
            assert_eq!(action.action, TimerAction::SpawnParticle(1));
            emitter.on_spawn_tick(&mut world);
        }
    }
    assert_eq!(emitter.len(), 2);

    emitter.stop_emitting(&mut world.timers);
    assert!(world.timers.is_empty());
    assert_eq!(emitter.on_spawn_tick(&mut world), None);
}

#[test]
fn test_destroyed_particles_are_pruned_and_teardown_cancels_tasks() {
    let mut world = World::new();
    let mut emitter = seeded_emitter();
    emitter.start_aging(&mut world.timers);
    let ids = emitter.create(3, &mut world);
    world.destroy(ids[0]).unwrap();

    emitter.update(&mut world);
    assert_eq!(emitter.particles(), &ids[1..]);

    emitter.destroy(&mut world);
    assert!(emitter.is_empty());
    assert!(world.is_empty());
    assert!(world.timers.is_empty());
}

#[test]
fn test_container_kicks_back_inside() {
    let container = ParticleContainer::new(Rect2F::new(0.0, 0.0, 100.0, 100.0), 3.0);
    let mut body = PhysicsBody::circle(-1.0, 50.0, 2.0);
    body.particle = Some(ParticleState { age: 0.0, float_velocity: Vector2F::new(-1.0, 0.5), emitter: 0 });

    assert!(container.update(&mut body).unwrap());
    assert_eq!(body.velocity(), Vector2F::new(3.0, 0.0));
    assert_eq!(body.particle.unwrap().float_velocity, Vector2F::new(3.0, 0.5));

    body.position = Vector2F::new(50.0, 50.0);
    assert!(!container.update(&mut body).unwrap());
}
