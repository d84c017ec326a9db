//! Distance/FOV camera.
//!
//! The visible world rectangle is derived from the camera distance, the field
//! of view and the canvas aspect ratio. Every mutator recomputes it so that
//! `viewport.scale == canvas / viewport size` always holds, which is what
//! keeps [`Camera::screen_to_world`] and [`Camera::world_to_screen`] exact
//! inverses.

use serde::{
    Deserialize,
    Serialize
};

use crate::rendering::Renderer;

use super::{
    geometry::rect_intersect,
    math::{Rect2F, Vector2F},
    world::{EntityId, World}
};

pub const DEFAULT_DISTANCE: f32 = 1000.0;
pub const DEFAULT_FOV: f32 = std::f32::consts::FRAC_PI_4;

const MIN_DISTANCE: f32 = 1e-3;
const MIN_FOV: f32 = 1e-3;
const MAX_FOV: f32 = std::f32::consts::FRAC_PI_2 - 1e-3;

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub w: f32,
    pub h: f32,
    pub scale: Vector2F,
}

impl Viewport {
    pub fn rect(&self) -> Rect2F {
        Rect2F::new(self.left, self.top, self.w, self.h)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Follow {
    target: EntityId,
    lerp: Vector2F,
}

/// Smooth zoom owned by the camera, advanced from [`Camera::begin`].
#[derive(Debug, Copy, Clone, PartialEq)]
struct ZoomTransition {
    from: f32,
    to: f32,
    elapsed_ms: f32,
    duration_ms: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    distance: f32,
    field_of_view: f32,
    look_at: Vector2F,
    canvas: Vector2F,
    default_distance: f32,
    default_fov: f32,
    viewport: Viewport,
    follow: Option<Follow>,
    follow_bounds: Option<Rect2F>,
    transition: Option<ZoomTransition>,
}

impl Camera {
    pub fn new(canvas: Vector2F) -> Self {
        Self::with_view(canvas, DEFAULT_DISTANCE, DEFAULT_FOV)
    }

    /// `distance` and `field_of_view` also become the values [`Camera::reset`] returns to.
    pub fn with_view(canvas: Vector2F, distance: f32, field_of_view: f32) -> Self {
        let mut camera = Self {
            distance: distance.max(MIN_DISTANCE),
            field_of_view: field_of_view.clamp(MIN_FOV, MAX_FOV),
            look_at: Vector2F::zero(),
            canvas: sanitize_canvas(canvas),
            default_distance: distance,
            default_fov: field_of_view,
            viewport: Viewport::default(),
            follow: None,
            follow_bounds: None,
            transition: None,
        };
        camera.update_viewport();
        camera
    }

    pub fn default_zoom(&self) -> f32 {
        self.default_distance
    }

    pub fn default_fov(&self) -> f32 {
        self.default_fov
    }

    pub fn zoom(&self) -> f32 {
        self.distance
    }

    pub fn fov(&self) -> f32 {
        self.field_of_view
    }

    pub fn look_at(&self) -> Vector2F {
        self.look_at
    }

    pub fn canvas(&self) -> Vector2F {
        self.canvas
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_zoom(&mut self, distance: f32) {
        self.distance = distance.max(MIN_DISTANCE);
        self.update_viewport();
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.set_zoom(self.distance * factor);
    }

    pub fn set_fov(&mut self, field_of_view: f32) {
        self.field_of_view = field_of_view.clamp(MIN_FOV, MAX_FOV);
        self.update_viewport();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.look_at = Vector2F::new(x, y);
        self.update_viewport();
    }

    pub fn resize(&mut self, canvas: Vector2F) {
        self.canvas = sanitize_canvas(canvas);
        self.update_viewport();
    }

    /// Back to the construction zoom and FOV, drops any running zoom transition.
    pub fn reset(&mut self) {
        self.transition = None;
        self.distance = self.default_distance.max(MIN_DISTANCE);
        self.field_of_view = self.default_fov.clamp(MIN_FOV, MAX_FOV);
        self.update_viewport();
    }

    pub fn update_viewport(&mut self) {
        let aspect_ratio = self.canvas.x / self.canvas.y;
        let w = self.distance * self.field_of_view.tan();
        let h = w / aspect_ratio;
        let left = self.look_at.x - w / 2.0;
        let top = self.look_at.y - h / 2.0;

        self.viewport = Viewport {
            left,
            top,
            right: left + w,
            bottom: top + h,
            w,
            h,
            scale: Vector2F::new(self.canvas.x / w, self.canvas.y / h),
        };
    }

    pub fn start_follow(&mut self, target: EntityId, lerp_x: f32, lerp_y: f32) {
        self.follow = Some(Follow {
            target,
            lerp: Vector2F::new(lerp_x.clamp(0.0, 1.0), lerp_y.clamp(0.0, 1.0)),
        });
    }

    pub fn stop_follow(&mut self) {
        self.follow = None;
    }

    pub fn following(&self) -> Option<EntityId> {
        self.follow.map(|f| f.target)
    }

    /// With bounds set the camera only follows while the target overlaps them.
    pub fn set_follow_bounds(&mut self, bounds: Option<Rect2F>) {
        self.follow_bounds = bounds;
    }

    /// Starts moving the zoom linearly to `distance` over `duration_ms`.
    pub fn zoom_to(&mut self, distance: f32, duration_ms: f32) {
        if duration_ms <= 0.0 {
            self.transition = None;
            self.set_zoom(distance);
            return;
        }
        self.transition = Some(ZoomTransition {
            from: self.distance,
            to: distance,
            elapsed_ms: 0.0,
            duration_ms,
        });
    }

    pub fn cancel_transition(&mut self) {
        self.transition = None;
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn advance_transition(&mut self, dt_ms: f32) {
        let Some(mut transition) = self.transition else {
            return;
        };
        transition.elapsed_ms += dt_ms;
        let t = (transition.elapsed_ms / transition.duration_ms).min(1.0);
        self.set_zoom(transition.from + (transition.to - transition.from) * t);
        self.transition = if t < 1.0 { Some(transition) } else { None };
    }

    fn update_follow(&mut self, world: &World) {
        let Some(follow) = self.follow else {
            return;
        };
        let Some(target) = world.get_entity_by_id(follow.target) else {
            log::debug!("Camera target {} is gone, following stopped", follow.target);
            self.follow = None;
            return;
        };

        if let Some(bounds) = &self.follow_bounds {
            // Circles use the circle/rect test, everything else plain AABB.
            if !target.footprint().intersects_rect(bounds) {
                return;
            }
        }

        let center = target.center();
        self.look_at = Vector2F::new(
            (1.0 - follow.lerp.x) * self.look_at.x + follow.lerp.x * center.x,
            (1.0 - follow.lerp.y) * self.look_at.y + follow.lerp.y * center.y,
        );
        self.update_viewport();
    }

    /// Opens a world-space draw pass: advances the zoom transition, follows
    /// the target, then applies scale and translation on a saved transform.
    pub fn begin(&mut self, renderer: &mut dyn Renderer, world: &World, dt_ms: f32) {
        self.advance_transition(dt_ms);
        self.update_follow(world);

        renderer.save();
        renderer.scale(self.viewport.scale.x, self.viewport.scale.y);
        renderer.translate(-self.viewport.left, -self.viewport.top);
    }

    pub fn end(&self, renderer: &mut dyn Renderer) {
        renderer.restore();
    }

    pub fn screen_to_world(&self, screen: Vector2F) -> Vector2F {
        Vector2F::new(
            screen.x / self.viewport.scale.x + self.viewport.left,
            screen.y / self.viewport.scale.y + self.viewport.top,
        )
    }

    pub fn world_to_screen(&self, world: Vector2F) -> Vector2F {
        Vector2F::new(
            (world.x - self.viewport.left) * self.viewport.scale.x,
            (world.y - self.viewport.top) * self.viewport.scale.y,
        )
    }

    /// Frustum test used to skip drawing off-screen bodies.
    pub fn is_visible(&self, rect: &Rect2F) -> bool {
        rect_intersect(&self.viewport.rect(), rect)
    }
}

fn sanitize_canvas(canvas: Vector2F) -> Vector2F {
    Vector2F::new(canvas.x.max(1.0), canvas.y.max(1.0))
}

#[cfg(test)]
use crate::{
    game::body::PhysicsBody,
    rendering::{DrawCommand, RecordingRenderer}
};

#[cfg(test)]
fn assert_scale_invariant(camera: &Camera) {
    let viewport = camera.viewport();
    let expected = Vector2F::new(camera.canvas().x / viewport.w, camera.canvas().y / viewport.h);
    assert!(viewport.scale.approx_eq(expected, 1e-6), "scale={} expected={expected}", viewport.scale);
}

#[test]
fn test_default_zoom_and_fov() {
    let camera = Camera::new(Vector2F::new(800.0, 600.0));
    assert_eq!(camera.default_zoom(), 1000.0);
    assert_eq!(camera.default_fov(), std::f32::consts::PI / 4.0);

    let viewport = camera.viewport();
    assert!((viewport.w - 1000.0).abs() < 1e-2);
    assert!((viewport.h - 750.0).abs() < 1e-2);
    assert!((viewport.left + 500.0).abs() < 1e-2);
    assert_scale_invariant(&camera);
}

#[test]
fn test_mutators_keep_scale_invariant() {
    let mut camera = Camera::new(Vector2F::new(800.0, 600.0));
    camera.set_zoom(250.0);
    assert_scale_invariant(&camera);
    camera.set_fov(1.2);
    assert_scale_invariant(&camera);
    camera.move_to(40.0, -70.0);
    assert_scale_invariant(&camera);
    camera.resize(Vector2F::new(1920.0, 1080.0));
    assert_scale_invariant(&camera);
    camera.zoom_by(0.5);
    assert_scale_invariant(&camera);

    camera.set_zoom(0.0);
    camera.set_fov(10.0);
    assert!(camera.viewport().scale.is_finite());

    camera.reset();
    assert_eq!(camera.zoom(), 1000.0);
    assert_eq!(camera.fov(), DEFAULT_FOV);
}

#[test]
fn test_screen_world_round_trip() {
    let mut camera = Camera::new(Vector2F::new(800.0, 600.0));
    let states = [(1000.0, 0.0, 0.0), (120.0, 300.0, -50.0), (4321.0, -1e4, 2e3)];
    let points = [Vector2F::zero(), Vector2F::new(400.0, 300.0), Vector2F::new(799.0, 1.0)];

    for (distance, x, y) in states {
        camera.set_zoom(distance);
        camera.move_to(x, y);
        for point in points {
            let back = camera.world_to_screen(camera.screen_to_world(point));
            assert!(back.approx_eq(point, 1e-2), "state=({distance},{x},{y}) point={point} back={back}");
        }
    }
}

#[test]
fn test_follow_respects_bounds() {
    let mut world = World::new();
    let target = world.create_entity(PhysicsBody::rect(90.0, 90.0, 20.0, 20.0));
    let mut camera = Camera::new(Vector2F::new(800.0, 600.0));
    let mut renderer = RecordingRenderer::new(800, 600);

    camera.start_follow(target, 0.5, 1.0);
    camera.set_follow_bounds(Some(Rect2F::new(500.0, 500.0, 100.0, 100.0)));
    camera.begin(&mut renderer, &world, 16.0);
    camera.end(&mut renderer);
    assert_eq!(camera.look_at(), Vector2F::zero());

    camera.set_follow_bounds(Some(Rect2F::new(0.0, 0.0, 100.0, 100.0)));
    camera.begin(&mut renderer, &world, 16.0);
    camera.end(&mut renderer);
    assert_eq!(camera.look_at(), Vector2F::new(50.0, 100.0));

    world.destroy(target).unwrap();
    camera.begin(&mut renderer, &world, 16.0);
    assert_eq!(camera.following(), None);
}

#[test]
fn test_begin_end_bracket_transform() {
    let camera_canvas = Vector2F::new(800.0, 600.0);
    let mut camera = Camera::new(camera_canvas);
    let world = World::new();
    let mut renderer = RecordingRenderer::new(800, 600);

    camera.begin(&mut renderer, &world, 0.0);
    camera.end(&mut renderer);

    let viewport = *camera.viewport();
    assert_eq!(renderer.commands(), &[
        DrawCommand::Save,
        DrawCommand::Scale(viewport.scale.x, viewport.scale.y),
        DrawCommand::Translate(-viewport.left, -viewport.top),
        DrawCommand::Restore,
    ]);
}

#[test]
fn test_zoom_transition_and_culling() {
    let mut camera = Camera::new(Vector2F::new(800.0, 600.0));
    camera.zoom_to(500.0, 100.0);
    camera.advance_transition(50.0);
    assert!((camera.zoom() - 750.0).abs() < 1e-3);
    assert!(camera.is_transitioning());
    camera.advance_transition(80.0);
    assert_eq!(camera.zoom(), 500.0);
    assert!(!camera.is_transitioning());

    assert!(camera.is_visible(&Rect2F::new(0.0, 0.0, 10.0, 10.0)));
    assert!(!camera.is_visible(&Rect2F::new(5000.0, 0.0, 10.0, 10.0)));
}
