use super::{
    geometry::{rect_intersect, Side},
    math::{Rect2F, Vector2F},
    world::EntityId
};

/// What a collider tests against. Only ids or a group name are kept, the
/// collider never owns or outlives the bodies it refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionTargets {
    Bodies(Vec<EntityId>),
    Group(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub collides_with: CollisionTargets,
    pub enabled: bool,
    pub last_side: Side,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CollisionContact {
    pub other: EntityId,
    pub side: Side,
}

/// Outcome of resolving one hitbox against its targets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Resolution {
    /// Offset to add to the owning body's position.
    pub correction: Vector2F,
    pub contacts: Vec<CollisionContact>,
}

impl Resolution {
    pub fn last_side(&self) -> Side {
        self.contacts.last().map(|c| c.side).unwrap_or_default()
    }
}

impl Collider {
    pub fn new(collides_with: CollisionTargets) -> Self {
        Self {
            collides_with,
            enabled: true,
            last_side: Side::None,
        }
    }

    pub fn with_bodies(ids: Vec<EntityId>) -> Self {
        Self::new(CollisionTargets::Bodies(ids))
    }

    pub fn with_group<S: AsRef<str>>(group: S) -> Self {
        Self::new(CollisionTargets::Group(group.as_ref().to_string()))
    }

    /// Resolves `hitbox` against every target in order. Each overlapping pair
    /// is pushed apart on a single axis, later pairs see the already corrected
    /// box. Overlaps between three or more bodies are not iterated to
    /// convergence.
    pub fn update(&self, hitbox: Rect2F, others: &[(EntityId, Rect2F)]) -> Resolution {
        let mut resolution = Resolution::default();
        if !self.enabled {
            return resolution;
        }

        let mut own = hitbox;
        for (other_id, other) in others {
            if let Some((side, correction)) = resolve_pair(&own, other) {
                own.pos += correction;
                resolution.correction += correction;
                resolution.contacts.push(CollisionContact { other: *other_id, side });
                log::trace!("Hitbox {own} touched {other_id} on {side}");
            }
        }
        resolution
    }
}

/// Pushes `own` out of `other` and leaves the two boxes flush. The axis is
/// the one where the center delta, scaled by `own`'s half extent, is larger;
/// ties go to the vertical axis. Returns the side of `own` that touched.
pub fn resolve_pair(own: &Rect2F, other: &Rect2F) -> Option<(Side, Vector2F)> {
    if !rect_intersect(own, other) {
        return None;
    }

    let delta = other.center() - own.center();
    let normalized_x = delta.x.abs() / (own.size.x / 2.0).max(f32::EPSILON);
    let normalized_y = delta.y.abs() / (own.size.y / 2.0).max(f32::EPSILON);

    let resolved = if normalized_x > normalized_y {
        if delta.x > 0.0 {
            (Side::Right, Vector2F::new(other.left() - own.right(), 0.0))
        } else {
            (Side::Left, Vector2F::new(other.right() - own.left(), 0.0))
        }
    } else if delta.y > 0.0 {
        (Side::Bottom, Vector2F::new(0.0, other.top() - own.bottom()))
    } else {
        (Side::Top, Vector2F::new(0.0, other.bottom() - own.top()))
    };

    Some(resolved)
}

#[test]
fn test_overlap_from_left_is_pushed_flush() {
    let own = Rect2F::new(0.0, 0.0, 10.0, 10.0);
    let wall = Rect2F::new(8.0, 0.0, 10.0, 10.0);
    let (side, correction) = resolve_pair(&own, &wall).unwrap();
    assert_eq!(side, Side::Right);
    assert_eq!(own.right() + correction.x, wall.left());
    assert_eq!(correction.y, 0.0);
}

#[test]
fn test_axis_follows_center_delta_over_own_half_extent() {
    // The wide box overlaps more on x, but its center is far off to the right.
    let own = Rect2F::new(0.0, 0.0, 10.0, 10.0);
    let wide = Rect2F::new(0.0, 8.0, 1000.0, 20.0);
    let (side, correction) = resolve_pair(&own, &wide).unwrap();
    assert_eq!(side, Side::Right);
    assert_eq!(correction, Vector2F::new(-10.0, 0.0));
}

#[test]
fn test_body_centered_over_floor_is_pushed_up() {
    let own = Rect2F::new(0.0, 5.0, 10.0, 10.0);
    let floor = Rect2F::new(-2.0, 12.0, 14.0, 20.0);
    let (side, correction) = resolve_pair(&own, &floor).unwrap();
    assert_eq!(side, Side::Bottom);
    assert_eq!(correction, Vector2F::new(0.0, -3.0));
}

#[test]
fn test_separate_boxes_are_untouched() {
    let collider = Collider::with_bodies(vec![1]);
    let resolution = collider.update(
        Rect2F::new(0.0, 0.0, 10.0, 10.0),
        &[(1, Rect2F::new(20.0, 20.0, 10.0, 10.0))]
    );
    assert_eq!(resolution, Resolution::default());
    assert_eq!(resolution.last_side(), Side::None);
}

#[test]
fn test_resolution_accumulates_in_order() {
    let collider = Collider::with_group("solid");
    let resolution = collider.update(
        Rect2F::new(0.0, 5.0, 10.0, 10.0),
        &[
            (1, Rect2F::new(-95.0, 12.0, 200.0, 20.0)),
            (2, Rect2F::new(9.0, 0.0, 10.0, 12.0)),
        ]
    );
    assert_eq!(resolution.contacts.len(), 2);
    assert_eq!(resolution.contacts[0], CollisionContact { other: 1, side: Side::Bottom });
    assert_eq!(resolution.contacts[1], CollisionContact { other: 2, side: Side::Right });
    assert_eq!(resolution.correction, Vector2F::new(-1.0, -3.0));
    assert_eq!(resolution.last_side(), Side::Right);
}

#[test]
fn test_disabled_collider_does_nothing() {
    let mut collider = Collider::with_bodies(vec![1]);
    collider.enabled = false;
    let resolution = collider.update(
        Rect2F::new(0.0, 0.0, 10.0, 10.0),
        &[(1, Rect2F::new(5.0, 5.0, 10.0, 10.0))]
    );
    assert!(resolution.contacts.is_empty());
}
