use serde::{
    Deserialize,
    Serialize
};

use super::{
    body::PhysicsBody,
    collider::CollisionTargets,
    geometry::{segment_rect_intersect, Side},
    math::{Rect2F, Vector2F},
    world::{EntityId, World}
};

/// Ray probes reach this far past the hitbox edge.
const RAY_REACH: f32 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsServer {
    /// Added to the velocity of every non-static body on each tick.
    pub gravity: Vector2F,
    pub round_pixels: bool,
}

impl Default for PhysicsServer {
    fn default() -> Self {
        Self {
            gravity: Vector2F::zero(),
            round_pixels: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CollisionEvent {
    pub body: EntityId,
    pub other: EntityId,
    pub side: Side,
}

impl PhysicsServer {
    pub fn new(gravity: Vector2F, round_pixels: bool) -> Self {
        Self { gravity, round_pixels }
    }

    /// One step over every enabled, physics-enabled body in physics list order:
    /// integrate, resolve collisions against the collider targets, then probe
    /// the four directions for floor, ceiling and wall contacts.
    pub fn tick(&self, world: &mut World, dt: f32) -> Vec<CollisionEvent> {
        let ids = world.physics_list().filter_by(world.bodies(), |b| b.enabled && b.options.physics_enabled);
        let mut events = vec![];

        for id in ids {
            let Some(body) = world.get_entity_by_id_mut(id) else {
                continue;
            };
            body.integrate(dt, self.gravity, self.round_pixels);

            let Some(targets) = collision_targets(world, id) else {
                if let Some(body) = world.get_entity_by_id_mut(id) {
                    body.contacts = Default::default();
                }
                continue;
            };
            let Some(body) = world.get_entity_by_id_mut(id) else {
                continue;
            };
            let Some(hitbox) = body.hitbox_rect() else {
                continue;
            };
            let is_static = body.is_static();
            let Some(collider) = body.collider.as_mut() else {
                continue;
            };

            // Static bodies keep their place, they only probe.
            let resolution = if is_static {
                Default::default()
            } else {
                collider.update(hitbox, &targets)
            };
            collider.last_side = resolution.last_side();
            body.position += resolution.correction;

            let probed = probe(&hitbox_after(body), &targets);
            body.contacts.on_floor = probed.down;
            body.contacts.on_ceiling = probed.up;
            body.contacts.on_wall = probed.left || probed.right;
            body.contacts.colliding = probed.any() || !resolution.contacts.is_empty();
            body.contacts.side = resolution.last_side();

            events.extend(resolution.contacts.iter().map(|c| CollisionEvent { body: id, other: c.other, side: c.side }));
        }

        if !events.is_empty() {
            log::trace!("Physics tick resolved {} contacts", events.len());
        }
        events
    }
}

fn hitbox_after(body: &PhysicsBody) -> Rect2F {
    body.hitbox_rect().unwrap_or_else(|| body.bounding_rect())
}

/// Hitboxes of the bodies `id` collides with. `None` when the body has no
/// enabled collider or no hitbox. Missing, disabled and hitbox-less targets
/// are skipped.
fn collision_targets(world: &World, id: EntityId) -> Option<Vec<(EntityId, Rect2F)>> {
    let body = world.get_entity_by_id(id)?;
    body.hitbox.as_ref()?;
    let collider = body.collider.as_ref().filter(|c| c.enabled)?;

    let target_ids = match &collider.collides_with {
        CollisionTargets::Bodies(ids) => ids.clone(),
        CollisionTargets::Group(name) => match world.group(name) {
            Some(group) => group.to_vec(),
            None => {
                log::trace!("Entity {id} collides with unknown group '{name}'");
                vec![]
            }
        },
    };

    let targets = target_ids.into_iter()
        .filter(|other| *other != id)
        .filter_map(|other| {
            let other_body = world.get_entity_by_id(other).filter(|b| b.enabled)?;
            Some((other, other_body.hitbox_rect()?))
        })
        .collect();
    Some(targets)
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
struct Probe {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl Probe {
    fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// Casts four rays from the hitbox center to one unit past each edge.
fn probe(hitbox: &Rect2F, targets: &[(EntityId, Rect2F)]) -> Probe {
    let center = hitbox.center();
    let half = hitbox.half_extents();
    let cast = |direction: Vector2F, reach: f32| {
        let end = center + direction * (reach + RAY_REACH);
        targets.iter().any(|(_, rect)| segment_rect_intersect(center, end, rect))
    };

    Probe {
        up: cast(Vector2F::up(), half.y),
        down: cast(Vector2F::down(), half.y),
        left: cast(Vector2F::left(), half.x),
        right: cast(Vector2F::right(), half.x),
    }
}

#[cfg(test)]
use super::{
    body::{BodyType, Hitbox},
    collider::Collider
};

#[test]
fn test_kinematic_body_moves_once_per_tick() {
    let mut world = World::new();
    let id = world.create_entity(PhysicsBody::rect(0.0, 0.0, 10.0, 10.0));
    world.get_entity_by_id_mut(id).unwrap().set_velocity(Vector2F::new(5.0, 0.0)).unwrap();

    let server = PhysicsServer::default();
    server.tick(&mut world, 0.016);
    let body = world.get_entity_by_id(id).unwrap();
    assert_eq!(body.position.x, 5.0 * 0.016);
    assert_eq!(body.velocity(), Vector2F::zero());

    server.tick(&mut world, 0.016);
    assert_eq!(world.get_entity_by_id(id).unwrap().position.x, 5.0 * 0.016);
}

#[test]
fn test_kinematic_resolved_flush_against_static_from_left() {
    let mut world = World::new();
    let wall = world.create_entity(
        PhysicsBody::rect(12.0, 0.0, 10.0, 10.0)
            .with_body_type(BodyType::Static)
            .with_hitbox(Hitbox::auto())
    );
    let mut mover = PhysicsBody::rect(0.0, 0.0, 10.0, 10.0).with_hitbox(Hitbox::auto());
    mover.collider = Some(Collider::with_bodies(vec![wall]));
    let mover = world.create_entity(mover);
    world.get_entity_by_id_mut(mover).unwrap().set_velocity(Vector2F::new(5.0, 0.0)).unwrap();

    let events = PhysicsServer::default().tick(&mut world, 1.0);

    let body = world.get_entity_by_id(mover).unwrap();
    let wall_rect = world.get_entity_by_id(wall).unwrap().bounding_rect();
    assert_eq!(body.bounding_rect().right(), wall_rect.left());
    assert!(body.is_on_wall());
    assert!(body.is_colliding());
    assert!(!body.is_on_floor());
    assert_eq!(body.collider.as_ref().unwrap().last_side, Side::Right);
    assert_eq!(events, vec![CollisionEvent { body: mover, other: wall, side: Side::Right }]);
    assert_eq!(wall_rect.pos, Vector2F::new(12.0, 0.0));
}

#[test]
fn test_landing_on_group_floor_sets_on_floor() {
    let mut world = World::new();
    let floor = world.create_entity(
        PhysicsBody::rect(0.0, 100.0, 200.0, 20.0)
            .with_body_type(BodyType::Static)
            .with_hitbox(Hitbox::auto())
    );
    world.add_to_group("ground", floor).unwrap();
    let mut player = PhysicsBody::rect(95.0, 85.0, 10.0, 10.0).with_hitbox(Hitbox::auto());
    player.collider = Some(Collider::with_group("ground"));
    let player = world.create_entity(player);
    world.get_entity_by_id_mut(player).unwrap().set_velocity(Vector2F::new(0.0, 10.0)).unwrap();

    PhysicsServer::default().tick(&mut world, 1.0);

    let body = world.get_entity_by_id(player).unwrap();
    assert_eq!(body.position, Vector2F::new(95.0, 90.0));
    assert!(body.is_on_floor());
    assert!(!body.is_on_ceiling());
    assert_eq!(body.contacts.side, Side::Bottom);
}

#[test]
fn test_disabled_bodies_are_skipped_and_gravity_spares_static() {
    let mut world = World::new();
    let disabled = world.create_entity(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0));
    world.get_entity_by_id_mut(disabled).unwrap().enabled = false;
    let no_physics = world.create_entity(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0).with_physics(false));
    let fixed = world.create_entity(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0).with_body_type(BodyType::Static));
    let falling = world.create_entity(PhysicsBody::rect(0.0, 0.0, 1.0, 1.0).with_body_type(BodyType::Rigid));

    let server = PhysicsServer::new(Vector2F::new(0.0, 10.0), false);
    server.tick(&mut world, 1.0);
    server.tick(&mut world, 1.0);

    assert_eq!(world.get_entity_by_id(disabled).unwrap().velocity(), Vector2F::zero());
    assert_eq!(world.get_entity_by_id(no_physics).unwrap().velocity(), Vector2F::zero());
    assert_eq!(world.get_entity_by_id(fixed).unwrap().position, Vector2F::zero());
    assert_eq!(world.get_entity_by_id(falling).unwrap().position, Vector2F::new(0.0, 10.0));
}
