//! Pure overlap predicates used by the collider, the camera and the particle containers.
//!
//! Rectangles are tested through their centers and half extents (Minkowski sum),
//! circles through the distance to the closest point of the rectangle. Every
//! predicate treats touching edges as overlapping.

use serde::{Deserialize, Serialize};

use super::math::{Rect2F, Vector2F};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vector2F,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vector2F, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn bounding_rect(&self) -> Rect2F {
        Rect2F::from_center(self.center, Vector2F::splat(self.radius * 2.0))
    }
}

/// Side of a body that touched something during collision resolution.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[default]
    None,
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::None => Side::None,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Side::None => "none",
            Side::Left => "left",
            Side::Right => "right",
            Side::Top => "top",
            Side::Bottom => "bottom",
        };
        write!(f, "{name}")
    }
}

/// Collision footprint of a body, either a box or a circle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Footprint {
    Rect(Rect2F),
    Circle(Circle),
}

impl Footprint {
    pub fn bounding_rect(&self) -> Rect2F {
        match self {
            Footprint::Rect(rect) => *rect,
            Footprint::Circle(circle) => circle.bounding_rect(),
        }
    }

    /// Overlap test against a rectangle, picking the right predicate for the footprint.
    pub fn intersects_rect(&self, rect: &Rect2F) -> bool {
        match self {
            Footprint::Rect(own) => rect_intersect(own, rect),
            Footprint::Circle(circle) => circle_rect_intersect(circle, rect),
        }
    }
}

/// AABB overlap via center deltas: `|dx| <= (aw + bw) / 2 && |dy| <= (ah + bh) / 2`.
pub fn rect_intersect(a: &Rect2F, b: &Rect2F) -> bool {
    let delta = b.center() - a.center();
    delta.x.abs() <= (a.size.x + b.size.x) / 2.0
        && delta.y.abs() <= (a.size.y + b.size.y) / 2.0
}

/// Circle against rectangle.
///
/// The corner test uses the distance to the nearest rectangle corner, which
/// depends only on |dx| and |dy|, so the result is independent of which side
/// of the rectangle the circle sits on.
pub fn circle_rect_intersect(circle: &Circle, rect: &Rect2F) -> bool {
    let half = rect.half_extents();
    let dx = (circle.center.x - rect.center().x).abs();
    let dy = (circle.center.y - rect.center().y).abs();

    if dx > half.x + circle.radius || dy > half.y + circle.radius {
        return false;
    }

    if dx <= half.x || dy <= half.y {
        return true;
    }

    let corner_dx = dx - half.x;
    let corner_dy = dy - half.y;
    corner_dx * corner_dx + corner_dy * corner_dy <= circle.radius * circle.radius
}

/// Argument-order flipped alias, gives the same answer as [`circle_rect_intersect`].
pub fn rect_circle_intersect(rect: &Rect2F, circle: &Circle) -> bool {
    circle_rect_intersect(circle, rect)
}

pub fn circle_intersect(a: &Circle, b: &Circle) -> bool {
    let radii = a.radius + b.radius;
    a.center.distance_squared(b.center) <= radii * radii
}

/// Line segment against line segment with the parametric cross-ratio test.
/// Returns the intersection point when both `u_a` and `u_b` lie in `[0, 1]`.
/// Parallel or degenerate segments never intersect.
pub fn segment_intersect(a1: Vector2F, a2: Vector2F, b1: Vector2F, b2: Vector2F) -> Option<Vector2F> {
    let denominator = (b2.y - b1.y) * (a2.x - a1.x) - (b2.x - b1.x) * (a2.y - a1.y);
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    let u_a = ((b2.x - b1.x) * (a1.y - b1.y) - (b2.y - b1.y) * (a1.x - b1.x)) / denominator;
    let u_b = ((a2.x - a1.x) * (a1.y - b1.y) - (a2.y - a1.y) * (a1.x - b1.x)) / denominator;

    if (0.0..=1.0).contains(&u_a) && (0.0..=1.0).contains(&u_b) {
        Some(Vector2F::new(a1.x + u_a * (a2.x - a1.x), a1.y + u_a * (a2.y - a1.y)))
    } else {
        None
    }
}

/// True when the segment crosses any of the four rectangle edges.
pub fn segment_rect_intersect(from: Vector2F, to: Vector2F, rect: &Rect2F) -> bool {
    let top_left = rect.pos;
    let top_right = Vector2F::new(rect.right(), rect.top());
    let bottom_left = Vector2F::new(rect.left(), rect.bottom());
    let bottom_right = Vector2F::new(rect.right(), rect.bottom());

    [
        (top_left, top_right),
        (top_right, bottom_right),
        (bottom_right, bottom_left),
        (bottom_left, top_left),
    ]
    .iter()
    .any(|(edge_from, edge_to)| segment_intersect(from, to, *edge_from, *edge_to).is_some())
}

#[test]
fn test_rect_intersect_scenarios() {
    let a = Rect2F::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect2F::new(5.0, 5.0, 10.0, 10.0);
    let c = Rect2F::new(20.0, 20.0, 10.0, 10.0);
    assert!(rect_intersect(&a, &b));
    assert!(!rect_intersect(&a, &c));
}

#[test]
fn test_rect_intersect_is_symmetric_and_inclusive() {
    let rects = [
        Rect2F::new(0.0, 0.0, 10.0, 10.0),
        Rect2F::new(10.0, 0.0, 10.0, 10.0),
        Rect2F::new(-3.0, 4.0, 2.0, 30.0),
        Rect2F::new(50.0, 50.0, 1.0, 1.0),
        Rect2F::new(-100.0, -100.0, 500.0, 500.0),
    ];
    for a in rects.iter() {
        for b in rects.iter() {
            assert_eq!(rect_intersect(a, b), rect_intersect(b, a), "a={a} b={b}");
        }
    }
    // Shared edge counts as touching.
    assert!(rect_intersect(&rects[0], &rects[1]));
}

#[test]
fn test_circle_rect_tangent_is_inclusive() {
    let rect = Rect2F::new(0.0, 0.0, 10.0, 10.0);
    let right_tangent = Circle::new(Vector2F::new(15.0, 5.0), 5.0);
    let below_tangent = Circle::new(Vector2F::new(5.0, 13.0), 3.0);
    let away = Circle::new(Vector2F::new(15.1, 5.0), 5.0);
    assert!(circle_rect_intersect(&right_tangent, &rect));
    assert!(circle_rect_intersect(&below_tangent, &rect));
    assert!(!circle_rect_intersect(&away, &rect));
}

#[test]
fn test_circle_rect_corner_is_symmetric() {
    let rect = Rect2F::new(0.0, 0.0, 10.0, 10.0);
    // Same distance to each of the four corners, mirrored around the rect.
    let corners = [
        Vector2F::new(13.0, 14.0),
        Vector2F::new(-3.0, 14.0),
        Vector2F::new(13.0, -4.0),
        Vector2F::new(-3.0, -4.0),
    ];
    for center in corners {
        assert!(circle_rect_intersect(&Circle::new(center, 5.0), &rect), "center={center}");
        assert!(!circle_rect_intersect(&Circle::new(center, 4.9), &rect), "center={center}");
        assert_eq!(
            circle_rect_intersect(&Circle::new(center, 5.0), &rect),
            rect_circle_intersect(&rect, &Circle::new(center, 5.0))
        );
    }
}

#[test]
fn test_segment_intersect() {
    let hit = segment_intersect(
        Vector2F::new(0.0, 0.0), Vector2F::new(10.0, 10.0),
        Vector2F::new(0.0, 10.0), Vector2F::new(10.0, 0.0),
    );
    assert_eq!(hit, Some(Vector2F::new(5.0, 5.0)));

    let parallel = segment_intersect(
        Vector2F::new(0.0, 0.0), Vector2F::new(10.0, 0.0),
        Vector2F::new(0.0, 1.0), Vector2F::new(10.0, 1.0),
    );
    assert_eq!(parallel, None);

    let degenerate = segment_intersect(
        Vector2F::new(3.0, 3.0), Vector2F::new(3.0, 3.0),
        Vector2F::new(0.0, 1.0), Vector2F::new(10.0, 1.0),
    );
    assert_eq!(degenerate, None);
}

#[test]
fn test_segment_rect_intersect() {
    let rect = Rect2F::new(0.0, 10.0, 20.0, 5.0);
    assert!(segment_rect_intersect(Vector2F::new(5.0, 0.0), Vector2F::new(5.0, 11.0), &rect));
    assert!(!segment_rect_intersect(Vector2F::new(5.0, 0.0), Vector2F::new(5.0, 9.0), &rect));
}
