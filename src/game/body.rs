use serde::{
    Deserialize,
    Serialize
};

use crate::{
    assets::TextureHandle,
    error::EngineError,
    rendering::{BlendMode, Color, Drawable, Renderer}
};

use super::{
    animation::{AnimationManager, AnimationStateMachine},
    collider::Collider,
    geometry::{Circle, Footprint, Side},
    math::{Rect2F, Vector2F},
    particles::ParticleState,
    world::EntityId
};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    /// Moved by velocity, affected by gravity.
    #[default]
    Kinematic,
    /// Moved by velocity and forces, affected by gravity.
    Rigid,
    /// Never moves, ignores gravity and velocity changes.
    Static,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyOptions {
    pub body_type: BodyType,
    pub physics_enabled: bool,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            physics_enabled: true
        }
    }
}

/// Visual and collision shape. Rect-like shapes are positioned by their
/// top-left corner, circles by their center.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect { w: f32, h: f32 },
    Circle { r: f32 },
    RoundRect { w: f32, h: f32, radius: f32 },
    Sprite { w: f32, h: f32, texture: TextureHandle },
    SpriteSheet { w: f32, h: f32, texture: TextureHandle, frames: Vec<Rect2F>, frame: usize },
}

impl Shape {
    pub fn size(&self) -> Vector2F {
        match self {
            Shape::Rect { w, h }
            | Shape::RoundRect { w, h, .. }
            | Shape::Sprite { w, h, .. }
            | Shape::SpriteSheet { w, h, .. } => Vector2F::new(*w, *h),
            Shape::Circle { r } => Vector2F::splat(r * 2.0),
        }
    }

    pub fn is_circle(&self) -> bool {
        matches!(self, Shape::Circle { .. })
    }
}

/// Collision box owned by a body. The world rectangle is derived from the
/// owner's current position on every request.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub offset: Vector2F,
    /// `None` fits the box to the body's bounding rectangle.
    pub size: Option<Vector2F>,
}

impl Hitbox {
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn explicit(w: f32, h: f32) -> Self {
        Self { offset: Vector2F::zero(), size: Some(Vector2F::new(w, h)) }
    }

    pub fn with_offset(mut self, offset: Vector2F) -> Self {
        self.offset = offset;
        self
    }

    pub fn rect_for(&self, body_bounds: &Rect2F) -> Rect2F {
        Rect2F {
            pos: body_bounds.pos + self.offset,
            size: self.size.unwrap_or(body_bounds.size),
        }
    }
}

/// Results of the last physics tick: ray probes and collision sides.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Contacts {
    pub on_floor: bool,
    pub on_ceiling: bool,
    pub on_wall: bool,
    pub colliding: bool,
    pub side: Side,
}

#[derive(Debug, Clone)]
pub struct PhysicsBody {
    pub id: EntityId,
    pub name: String,
    pub shape: Shape,
    pub position: Vector2F,
    velocity: Vector2F,
    pub bounds: Rect2F,
    pub options: BodyOptions,
    pub hitbox: Option<Hitbox>,
    pub collider: Option<Collider>,
    pub z_index: i32,
    pub visible: bool,
    pub enabled: bool,
    pub color: Color,
    pub blend_mode: BlendMode,
    pub contacts: Contacts,
    pub particle: Option<ParticleState>,
    pub animation: Option<AnimationManager>,
    pub state_machine: Option<AnimationStateMachine>,
}

impl PhysicsBody {
    pub fn new(shape: Shape, position: Vector2F) -> Self {
        Self {
            id: 0,
            name: String::new(),
            shape,
            position,
            velocity: Vector2F::zero(),
            bounds: Rect2F::infinite(),
            options: BodyOptions::default(),
            hitbox: None,
            collider: None,
            z_index: 0,
            visible: true,
            enabled: true,
            color: Color::WHITE,
            blend_mode: BlendMode::Normal,
            contacts: Contacts::default(),
            particle: None,
            animation: None,
            state_machine: None,
        }
    }

    pub fn rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(Shape::Rect { w, h }, Vector2F::new(x, y))
    }

    pub fn circle(x: f32, y: f32, r: f32) -> Self {
        Self::new(Shape::Circle { r }, Vector2F::new(x, y))
    }

    pub fn round_rect(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Self {
        Self::new(Shape::RoundRect { w, h, radius }, Vector2F::new(x, y))
    }

    pub fn sprite(x: f32, y: f32, w: f32, h: f32, texture: TextureHandle) -> Self {
        Self::new(Shape::Sprite { w, h, texture }, Vector2F::new(x, y))
    }

    pub fn spritesheet(x: f32, y: f32, w: f32, h: f32, texture: TextureHandle, frames: Vec<Rect2F>) -> Self {
        Self::new(Shape::SpriteSheet { w, h, texture, frames, frame: 0 }, Vector2F::new(x, y))
    }

    pub fn with_name<S: AsRef<str>>(mut self, name: S) -> Self {
        self.name = name.as_ref().to_string();
        self
    }

    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.options.body_type = body_type;
        self
    }

    pub fn with_physics(mut self, physics_enabled: bool) -> Self {
        self.options.physics_enabled = physics_enabled;
        self
    }

    pub fn with_hitbox(mut self, hitbox: Hitbox) -> Self {
        self.hitbox = Some(hitbox);
        self
    }

    pub fn with_bounds(mut self, bounds: Rect2F) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_animation(mut self, animation: AnimationManager) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn is_static(&self) -> bool {
        self.options.body_type == BodyType::Static
    }

    pub fn size(&self) -> Vector2F {
        self.shape.size()
    }

    /// Axis aligned rectangle covering the visual shape.
    pub fn bounding_rect(&self) -> Rect2F {
        match self.shape {
            Shape::Circle { r } => Circle::new(self.position, r).bounding_rect(),
            _ => Rect2F { pos: self.position, size: self.size() },
        }
    }

    pub fn center(&self) -> Vector2F {
        self.bounding_rect().center()
    }

    pub fn footprint(&self) -> Footprint {
        match self.shape {
            Shape::Circle { r } => Footprint::Circle(Circle::new(self.position, r)),
            _ => Footprint::Rect(self.bounding_rect()),
        }
    }

    pub fn hitbox_rect(&self) -> Option<Rect2F> {
        self.hitbox.as_ref().map(|h| h.rect_for(&self.bounding_rect()))
    }

    pub fn velocity(&self) -> Vector2F {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector2F) -> Result<(), EngineError> {
        self.ensure_movable()?;
        self.velocity = velocity;
        Ok(())
    }

    pub fn set_velocity_x(&mut self, x: f32) -> Result<(), EngineError> {
        self.ensure_movable()?;
        self.velocity.x = x;
        Ok(())
    }

    pub fn set_velocity_y(&mut self, y: f32) -> Result<(), EngineError> {
        self.ensure_movable()?;
        self.velocity.y = y;
        Ok(())
    }

    pub fn add_velocity(&mut self, delta: Vector2F) -> Result<(), EngineError> {
        self.ensure_movable()?;
        self.velocity += delta;
        Ok(())
    }

    fn ensure_movable(&self) -> Result<(), EngineError> {
        if self.is_static() {
            Err(EngineError::StaticBodyMutation(self.id))
        } else {
            Ok(())
        }
    }

    pub fn is_on_floor(&self) -> bool {
        self.contacts.on_floor
    }

    pub fn is_on_ceiling(&self) -> bool {
        self.contacts.on_ceiling
    }

    pub fn is_on_wall(&self) -> bool {
        self.contacts.on_wall
    }

    pub fn is_colliding(&self) -> bool {
        self.contacts.colliding
    }

    /// One physics step: move by `velocity * dt`, clamp to bounds, reset the
    /// velocity, snap to pixels if asked, then add gravity for the next step.
    pub(crate) fn integrate(&mut self, dt: f32, gravity: Vector2F, round_pixels: bool) {
        if self.is_static() {
            self.velocity = Vector2F::zero();
            return;
        }

        if let Some(particle) = &self.particle {
            self.velocity += particle.float_velocity;
        }

        self.position += self.velocity * dt;
        self.clamp_to_bounds();
        self.velocity = Vector2F::zero();

        if round_pixels {
            self.position = self.position.round();
        }

        self.velocity += gravity;
    }

    /// Keeps the bounding rectangle inside `bounds`. A body bigger than its
    /// bounds ends up aligned to the right/bottom edge.
    pub fn clamp_to_bounds(&mut self) {
        let rect = self.bounding_rect();
        let anchor_offset = self.position - rect.pos;
        let x = rect.pos.x.max(self.bounds.left()).min(self.bounds.right() - rect.size.x);
        let y = rect.pos.y.max(self.bounds.top()).min(self.bounds.bottom() - rect.size.y);
        self.position = Vector2F::new(x, y) + anchor_offset;
    }

    /// Atlas frame currently shown by a spritesheet body.
    pub fn current_source_frame(&self) -> Option<Rect2F> {
        match &self.shape {
            Shape::SpriteSheet { frames, frame, .. } => frames.get(*frame).copied(),
            _ => None,
        }
    }

    pub(crate) fn set_sheet_frame(&mut self, index: usize) {
        if let Shape::SpriteSheet { frames, frame, .. } = &mut self.shape {
            if index < frames.len() {
                *frame = index;
            } else {
                log::warn!("Body {} has no sheet frame {index}", self.id);
            }
        }
    }
}

impl Drawable for PhysicsBody {
    fn draw(&self, renderer: &mut dyn Renderer) {
        renderer.set_blend_mode(self.blend_mode);
        renderer.set_fill_color(self.color);
        let Vector2F { x, y } = self.position;
        match &self.shape {
            Shape::Rect { w, h } => renderer.draw_rect(x, y, *w, *h),
            Shape::Circle { r } => renderer.draw_circle(x, y, *r),
            Shape::RoundRect { w, h, radius } => renderer.draw_round_rect(x, y, *w, *h, *radius),
            Shape::Sprite { texture, .. } => renderer.draw_sprite(texture, None, self.bounding_rect()),
            Shape::SpriteSheet { texture, .. } => renderer.draw_sprite(texture, self.current_source_frame(), self.bounding_rect()),
        }
    }
}

#[test]
fn test_kinematic_moves_once_and_resets_velocity() {
    let mut body = PhysicsBody::rect(0.0, 0.0, 10.0, 10.0);
    body.set_velocity(Vector2F::new(5.0, 0.0)).unwrap();
    body.integrate(0.5, Vector2F::zero(), false);
    assert_eq!(body.position, Vector2F::new(2.5, 0.0));
    assert_eq!(body.velocity(), Vector2F::zero());

    body.integrate(0.5, Vector2F::zero(), false);
    assert_eq!(body.position, Vector2F::new(2.5, 0.0));
}

#[test]
fn test_static_body_rejects_velocity() {
    let mut body = PhysicsBody::rect(0.0, 0.0, 10.0, 10.0).with_body_type(BodyType::Static);
    body.id = 7;
    assert!(matches!(body.set_velocity(Vector2F::new(1.0, 0.0)), Err(EngineError::StaticBodyMutation(7))));
    assert!(body.add_velocity(Vector2F::new(1.0, 0.0)).is_err());
    body.integrate(1.0, Vector2F::new(0.0, 100.0), false);
    assert_eq!(body.position, Vector2F::zero());
    assert_eq!(body.velocity(), Vector2F::zero());
}

#[test]
fn test_gravity_is_added_after_reset() {
    let mut body = PhysicsBody::rect(0.0, 0.0, 10.0, 10.0).with_body_type(BodyType::Rigid);
    body.integrate(1.0, Vector2F::new(0.0, 9.0), false);
    assert_eq!(body.position, Vector2F::zero());
    assert_eq!(body.velocity(), Vector2F::new(0.0, 9.0));

    body.integrate(0.5, Vector2F::new(0.0, 9.0), false);
    assert_eq!(body.position, Vector2F::new(0.0, 4.5));
}

#[test]
fn test_bounds_clamp_and_pixel_rounding() {
    let mut body = PhysicsBody::rect(0.0, 0.0, 10.0, 10.0)
        .with_bounds(Rect2F::new(0.0, 0.0, 100.0, 50.0));
    body.set_velocity(Vector2F::new(500.0, -30.0)).unwrap();
    body.integrate(1.0, Vector2F::zero(), false);
    assert_eq!(body.position, Vector2F::new(90.0, 0.0));

    let mut circle = PhysicsBody::circle(50.0, 25.0, 5.0)
        .with_bounds(Rect2F::new(0.0, 0.0, 100.0, 50.0));
    circle.set_velocity(Vector2F::new(0.0, 100.0)).unwrap();
    circle.integrate(1.0, Vector2F::zero(), false);
    assert_eq!(circle.position, Vector2F::new(50.0, 45.0));

    let mut rounded = PhysicsBody::rect(0.0, 0.0, 1.0, 1.0);
    rounded.set_velocity(Vector2F::new(1.6, 2.2)).unwrap();
    rounded.integrate(1.0, Vector2F::zero(), true);
    assert_eq!(rounded.position, Vector2F::new(2.0, 2.0));
}

#[test]
fn test_hitbox_follows_body() {
    let mut body = PhysicsBody::rect(10.0, 10.0, 20.0, 20.0)
        .with_hitbox(Hitbox::explicit(10.0, 5.0).with_offset(Vector2F::new(2.0, 3.0)));
    assert_eq!(body.hitbox_rect(), Some(Rect2F::new(12.0, 13.0, 10.0, 5.0)));
    body.position = Vector2F::new(0.0, 0.0);
    assert_eq!(body.hitbox_rect(), Some(Rect2F::new(2.0, 3.0, 10.0, 5.0)));

    let circle = PhysicsBody::circle(10.0, 10.0, 4.0).with_hitbox(Hitbox::auto());
    assert_eq!(circle.hitbox_rect(), Some(Rect2F::new(6.0, 6.0, 8.0, 8.0)));
}

#[test]
fn test_draw_dispatches_by_shape() {
    use crate::rendering::{DrawCommand, RecordingRenderer};

    let sheet = TextureHandle::placeholder("hero");
    let frames = vec![Rect2F::new(0.0, 0.0, 16.0, 16.0), Rect2F::new(16.0, 0.0, 16.0, 16.0)];
    let mut body = PhysicsBody::spritesheet(4.0, 5.0, 32.0, 32.0, sheet, frames.clone());
    body.set_sheet_frame(1);
    body.set_sheet_frame(9);

    let mut renderer = RecordingRenderer::new(100, 100);
    body.draw(&mut renderer);
    PhysicsBody::circle(1.0, 2.0, 3.0).draw(&mut renderer);

    assert_eq!(renderer.commands()[2], DrawCommand::Sprite {
        texture: "hero".into(),
        source: Some(frames[1]),
        destination: Rect2F::new(4.0, 5.0, 32.0, 32.0),
    });
    assert_eq!(renderer.commands()[5], DrawCommand::Circle { center: Vector2F::new(1.0, 2.0), r: 3.0 });
}
