//! Small playground scene used by both binaries' modes.

use crate::{
    game::{
        body::{BodyType, Hitbox, PhysicsBody, Shape},
        collider::CollisionTargets,
        game_loop::Game,
        math::{Rect2F, Vector2F},
        particles::{EmitterConfig, EmitterId, ParticleContainer, ParticlePrototype, SpawnRange},
        scene::{Scene, SceneEvent, SceneScript, COLLISION_EVENT},
        world::EntityId
    },
    rendering::{BlendMode, Color}
};

pub const DEMO_SCENE: &str = "demo";
pub const WALLS_GROUP: &str = "walls";

const PLAYER_SPEED: f32 = 180.0;
const GRAVITY: f32 = 240.0;
/// Narrower than the player so landing always resolves upwards.
const FLOOR_TILE: f32 = 20.0;

/// Walls, a player pacing between them and a container full of sparks.
#[derive(Debug, Default)]
pub struct DemoScript {
    player: Option<EntityId>,
    sparks: Option<EmitterId>,
    elapsed: f32,
}

impl DemoScript {
    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    fn add_wall(scene: &mut Scene, name: &str, rect: Rect2F) {
        let wall = scene.add_body(PhysicsBody::rect(rect.pos.x, rect.pos.y, rect.size.x, rect.size.y)
            .with_name(name)
            .with_body_type(BodyType::Static)
            .with_hitbox(Hitbox::auto())
            .with_color(Color::rgb(90, 90, 110)));
        if let Err(e) = scene.add_to_group(WALLS_GROUP, wall) {
            log::warn!("Wall '{name}' not grouped: {e}");
        }
    }
}

impl SceneScript for DemoScript {
    fn init(&mut self, scene: &mut Scene) {
        scene.physics.gravity = Vector2F::new(0.0, GRAVITY);

        for i in 0..(800.0 / FLOOR_TILE) as usize {
            let x = -400.0 + i as f32 * FLOOR_TILE;
            Self::add_wall(scene, &format!("floor_{i}"), Rect2F::new(x, 200.0, FLOOR_TILE, 40.0));
        }
        Self::add_wall(scene, "left_wall", Rect2F::new(-440.0, -300.0, 40.0, 540.0));
        Self::add_wall(scene, "right_wall", Rect2F::new(400.0, -300.0, 40.0, 540.0));

        let player = scene.add_body(PhysicsBody::rect(-20.0, 100.0, 40.0, 40.0)
            .with_name("player")
            .with_color(Color::rgb(80, 200, 120))
            .with_z_index(10));
        let _ = scene.add_collider(player, CollisionTargets::Group(WALLS_GROUP.into()));
        scene.camera_mut().start_follow(player, 0.1, 0.1);
        self.player = Some(player);

        let sparks = scene.add_emitter(
            ParticlePrototype::new(Shape::Circle { r: 3.0 })
                .with_color(Color::rgba(255, 160, 40, 200))
                .with_blend_mode(BlendMode::Additive)
                .with_z_index(5),
            EmitterConfig {
                range_x: SpawnRange::new(-350.0, 350.0),
                range_y: SpawnRange::new(-250.0, -200.0),
                float_range_x: SpawnRange::new(-30.0, 30.0),
                float_range_y: SpawnRange::new(-240.0, -180.0),
                max_age: Some(6.0),
                ..Default::default()
            }
        );
        let container = ParticleContainer::new(Rect2F::new(-400.0, -300.0, 800.0, 500.0), 40.0);
        let _ = scene.set_container(sparks, Some(container));
        let _ = scene.keep_emitting(sparks, 40.0, Some(150));
        self.sparks = Some(sparks);

        scene.events.on(COLLISION_EVENT, |event: &SceneEvent| {
            if let SceneEvent::Collision(collision) = event {
                log::trace!("Body {} hit {} on {}", collision.body, collision.other, collision.side);
            }
        });
        log::info!("Demo scene ready");
    }

    fn update(&mut self, scene: &mut Scene, dt: f32) {
        self.elapsed += dt;
        let Some(player) = self.player else {
            return;
        };
        // Keep the vertical part so gravity still pulls the player down.
        let fall = scene.body(player).map(|b| b.velocity().y).unwrap_or(0.0);
        let velocity = Vector2F::new(PLAYER_SPEED * self.elapsed.sin(), fall);
        let _ = scene.set_velocity(player, velocity);
    }
}

/// Adds the demo scene to `game` and makes it current.
pub fn install(game: &mut Game) {
    game.create_scene(DEMO_SCENE).set_script(DemoScript::default());
    if let Err(e) = game.switch_scene(DEMO_SCENE) {
        log::error!("Demo scene missing after creation: {e}");
    }
}
