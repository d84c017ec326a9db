use serde::{
    Deserialize,
    Serialize
};

pub type Vector2F = Vector2X<f32>;
pub type Vector2U = Vector2X<u32>;
pub type Vector2I = Vector2X<i32>;

/// Tolerance used by the approximate comparisons.
pub const EPSILON: f32 = 1e-4;

const UNBOUNDED_EXTENT: f32 = f32::MAX / 2.0;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vector2X<T> {
    pub x: T,
    pub y: T,
}

pub type Rect2F = Rect2X<f32>;

/// Axis aligned rectangle, `pos` is the top-left corner (y grows downwards).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rect2X<T> {
    pub pos: Vector2X<T>,
    pub size: Vector2X<T>,
}

impl<T: std::fmt::Display> std::fmt::Display for Vector2X<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Rect2X<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[({},{}), ({},{})]", self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

impl<T> Vector2X<T>
where
    T: Default
{
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    /// Every call hands out a fresh value, there is no shared "constant" to mutate.
    pub fn zero() -> Self {
        Self { x: T::default(), y: T::default() }
    }
}

impl<T> Vector2X<T>
where
    T: Into<f32> + Copy
{
    pub fn length_squared(&self) -> f32 {
        let xf: f32 = T::into(self.x);
        let yf: f32 = T::into(self.y);
        xf.powi(2) + yf.powi(2)
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. A zero vector normalizes to (1, 0).
    pub fn normal(&self) -> Vector2X<f32> {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return Vector2X { x: 1.0, y: 0.0 };
        }
        Vector2X {
            x: T::into(self.x) / len,
            y: T::into(self.y) / len,
        }
    }
}

impl Vector2X<f32> {
    pub fn up() -> Self {
        Self::new(0.0, -1.0)
    }

    pub fn down() -> Self {
        Self::new(0.0, 1.0)
    }

    pub fn left() -> Self {
        Self::new(-1.0, 0.0)
    }

    pub fn right() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn splat(value: f32) -> Self {
        Self::new(value, value)
    }

    pub fn dot(&self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// In-place normalization, chainable.
    pub fn normalize(&mut self) -> &mut Self {
        *self = self.normal();
        self
    }

    pub fn distance(&self, other: Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: Self) -> f32 {
        (other - *self).length_squared()
    }

    /// `(1 - t) * self + t * target`
    pub fn lerp(&self, target: Self, t: f32) -> Self {
        Self {
            x: (1.0 - t) * self.x + t * target.x,
            y: (1.0 - t) * self.y + t * target.y,
        }
    }

    /// Steps from `current` towards `target` by at most `max_delta`.
    pub fn move_towards(current: Self, target: Self, max_delta: f32) -> Self {
        let to_target = target - current;
        let sqr_distance = to_target.length_squared();
        if sqr_distance == 0.0 || (max_delta >= 0.0 && sqr_distance <= max_delta * max_delta) {
            return target;
        }
        let distance = sqr_distance.sqrt();
        current + to_target * (max_delta / distance)
    }

    pub fn approx_eq(&self, other: Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }

    pub fn round(&self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl<T> std::ops::Add for Vector2X<T>
where
    T: std::ops::Add<Output = T>
{
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y
        }

    }
}

impl<T> std::ops::AddAssign for Vector2X<T>
where
    T: std::ops::AddAssign
{
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl<T> std::ops::SubAssign for Vector2X<T>
where
    T: std::ops::SubAssign
{
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl<T> std::ops::Neg for Vector2X<T>
where
    T: std::ops::Neg<Output = T>
{
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self {
            x: T::neg(self.x),
            y: T::neg(self.y),
        }
    }
}

impl<T> std::ops::Mul<T> for Vector2X<T>
where
    T: std::ops::Mul<Output = T> + Copy
{
    type Output = Self;
    fn mul(self, rhs: T) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs
        }
    }
}

impl<T> std::ops::MulAssign<T> for Vector2X<T>
where
    T: std::ops::MulAssign + Copy
{
    fn mul_assign(&mut self, rhs: T) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

/// Component-wise product.
impl std::ops::Mul<Vector2X<f32>> for Vector2X<f32> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x * rhs.x,
            y: self.y * rhs.y
        }
    }
}

/// Scalar division, dividing by zero leaves the vector untouched.
impl std::ops::Div<f32> for Vector2X<f32> {
    type Output = Self;
    fn div(self, rhs: f32) -> Self::Output {
        if rhs == 0.0 {
            return self;
        }
        Self {
            x: self.x / rhs,
            y: self.y / rhs
        }
    }
}

/// Component-wise division, zero components of `rhs` leave that axis untouched.
impl std::ops::Div<Vector2X<f32>> for Vector2X<f32> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        Self {
            x: if rhs.x == 0.0 { self.x } else { self.x / rhs.x },
            y: if rhs.y == 0.0 { self.y } else { self.y / rhs.y },
        }
    }
}

impl std::ops::DivAssign<f32> for Vector2X<f32> {
    fn div_assign(&mut self, rhs: f32) {
        *self = *self / rhs;
    }
}

impl<T> std::ops::Sub for Vector2X<T>
where
    T: std::ops::Sub<Output = T>
{
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: T::sub(self.x, rhs.x),
            y: T::sub(self.y, rhs.y)
        }
    }
}

impl From<Vector2X<f32>> for Vector2X<u32> {
    fn from(value: Vector2X<f32>) -> Self {
        Self { x: value.x as u32, y: value.y as u32 }
    }
}

impl From<Vector2X<u32>> for Vector2X<f32> {
    fn from(value: Vector2X<u32>) -> Self {
        Self { x: value.x as f32, y: value.y as f32 }
    }
}

impl From<Vector2X<i32>> for Vector2X<f32> {
    fn from(value: Vector2X<i32>) -> Self {
        Self { x: value.x as f32, y: value.y as f32 }
    }
}

impl<T> Rect2X<T> {
    pub fn new(x: T, y: T, w: T, h: T) -> Self {
        Self { pos: Vector2X { x, y }, size: Vector2X { x: w, y: h } }
    }
}

impl<T> Rect2X<T>
where
    T: PartialOrd + std::ops::Add<Output = T> + Copy
{
    pub fn contains(&self, point: &Vector2X<T>) -> bool {
        point.x >= self.pos.x
            && point.y >= self.pos.y
            && point.x < self.pos.x + self.size.x
            && point.y < self.pos.y + self.size.y
    }
}

impl Rect2X<f32> {
    /// Rectangle spanning the whole plane, used as "no bounds".
    /// Kept finite so that `right()`/`bottom()` never produce NaN.
    pub fn infinite() -> Self {
        Self::new(-UNBOUNDED_EXTENT / 2.0, -UNBOUNDED_EXTENT / 2.0, UNBOUNDED_EXTENT, UNBOUNDED_EXTENT)
    }

    pub fn from_center(center: Vector2F, size: Vector2F) -> Self {
        Self { pos: center - size * 0.5, size }
    }

    pub fn left(&self) -> f32 {
        self.pos.x
    }

    pub fn top(&self) -> f32 {
        self.pos.y
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    pub fn center(&self) -> Vector2F {
        Vector2F::new(self.pos.x + self.size.x / 2.0, self.pos.y + self.size.y / 2.0)
    }

    pub fn half_extents(&self) -> Vector2F {
        self.size * 0.5
    }

    pub fn is_infinite(&self) -> bool {
        self.size.x >= UNBOUNDED_EXTENT || self.size.y >= UNBOUNDED_EXTENT
    }

    /// True when `other` lies completely inside (edges inclusive).
    pub fn encloses(&self, other: &Rect2F) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[test]
fn test_vector_creation() {
    let v1 = Vector2X::<f32>::new(1.0, 2.0);
    assert_eq!(v1.x, 1.0);
    assert_eq!(v1.y, 2.0);
}

#[test]
fn test_vector_add() {
    let v1 = Vector2X::<u32>::new(1, 2);
    let v2 = Vector2X::<u32>::new(10, 20);
    let v3 = v1 + v2;
    assert_eq!(v3.x, v1.x + v2.x);
    assert_eq!(v3.y, v1.y + v2.y);
}

#[test]
fn test_vector_add_sub_roundtrip() {
    let samples = [
        (Vector2F::new(1.5, -2.25), Vector2F::new(1000.0, 0.125)),
        (Vector2F::new(-300.0, 7.0), Vector2F::new(-0.001, 99.5)),
        (Vector2F::zero(), Vector2F::new(12.0, -12.0)),
    ];
    for (v, a) in samples {
        let mut w = v;
        w += a;
        w -= a;
        assert!(w.approx_eq(v, 1e-3), "v={v} a={a} w={w}");
    }
}

#[test]
fn test_vector_negation() {
    let v1 = Vector2X::<i32>::new(1, 2);
    let v1_neg = -v1;
    assert_eq!(v1_neg.x, -v1.x);
    assert_eq!(v1_neg.y, -v1.y);
}

#[test]
fn test_vector_mul_div() {
    let v1 = Vector2F::new(2.0, -4.0);
    assert_eq!(v1 * 2.0, Vector2F::new(4.0, -8.0));
    assert_eq!(v1 / 2.0, Vector2F::new(1.0, -2.0));
    assert_eq!(v1 * Vector2F::new(0.5, 0.25), Vector2F::new(1.0, -1.0));
    assert_eq!(v1 / Vector2F::new(0.0, 2.0), Vector2F::new(2.0, -2.0));
    assert_eq!(v1 / 0.0, v1);
}

#[test]
fn test_vector_casting() {
    let v1 = Vector2X::<f32>::new(1.2, 2.6);
    let v1_cast_u32 =  Vector2X::<u32>::from(v1);
    assert_eq!(v1_cast_u32.x, 1);
    assert_eq!(v1_cast_u32.y, 2);
}

#[test]
fn test_vector_dot() {
    let v1 = Vector2X::<f32>::new(1.0, 0.0);
    let v2 = Vector2X::<f32>::new(-1.0, 0.0);
    let v1_dot_v2 = v1.dot(v2);
    assert_eq!(v1_dot_v2, -1.0);
}

#[test]
fn test_normalize_zero_falls_back_to_unit_x() {
    let mut v = Vector2F::zero();
    v.normalize();
    assert_eq!(v, Vector2F::new(1.0, 0.0));
    assert!(v.is_finite());

    let n = Vector2F::new(3.0, 4.0).normal();
    assert!(n.approx_eq(Vector2F::new(0.6, 0.8), EPSILON));
}

#[test]
fn test_direction_factories_are_fresh() {
    let mut up = Vector2F::up();
    up.x = 100.0;
    assert_eq!(Vector2F::up(), Vector2F::new(0.0, -1.0));

    let mut zero = Vector2F::zero();
    zero += Vector2F::new(1.0, 1.0);
    assert_eq!(Vector2F::zero(), Vector2F::new(0.0, 0.0));
}

#[test]
fn test_move_towards() {
    let current = Vector2F::new(0.0, 0.0);
    let target = Vector2F::new(10.0, 0.0);

    assert_eq!(Vector2F::move_towards(current, target, 4.0), Vector2F::new(4.0, 0.0));
    assert_eq!(Vector2F::move_towards(current, target, 10.0), target);
    assert_eq!(Vector2F::move_towards(current, target, 25.0), target);
    assert_eq!(Vector2F::move_towards(target, target, 0.0), target);
}

#[test]
fn test_lerp_and_distance() {
    let a = Vector2F::new(0.0, 0.0);
    let b = Vector2F::new(10.0, 20.0);
    assert_eq!(a.lerp(b, 0.5), Vector2F::new(5.0, 10.0));
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(Vector2F::new(0.0, 0.0).distance(Vector2F::new(3.0, 4.0)), 5.0);
    assert_eq!(Vector2F::new(0.0, 0.0).distance_squared(Vector2F::new(3.0, 4.0)), 25.0);
}

#[test]
fn test_rect_creation() {
    let position = Vector2X::<f32>::new(1.0, 0.0);
    let size = Vector2X::<f32>::new(3.0, 5.0);
    let rect = Rect2X::new(position.x, position.y, size.x, size.y);
    assert_eq!(rect.pos, position);
    assert_eq!(rect.size, size);
    assert_eq!(rect.right(), 4.0);
    assert_eq!(rect.bottom(), 5.0);
    assert_eq!(rect.center(), Vector2F::new(2.5, 2.5));
}

#[test]
fn test_rect_containing() {
    let position = Vector2X::<f32>::new(1.0, 0.0);
    let size = Vector2X::<f32>::new(3.0, 5.0);
    let rect = Rect2X::new(position.x, position.y, size.x, size.y);

    let p1_inside = position;
    let p2_not_inside = position + Vector2X::new(size.x, 0.0);
    let p3_not_inside = position + Vector2X::new(0.0, size.y);
    let p4_not_inside = position + size;
    let p5_inside = position + Vector2X::new(size.x / 2.0, size.y / 2.0);

    assert!(rect.contains(&p1_inside));
    assert!(!rect.contains(&p2_not_inside));
    assert!(!rect.contains(&p3_not_inside));
    assert!(!rect.contains(&p4_not_inside));
    assert!(rect.contains(&p5_inside));
}

#[test]
fn test_rect_encloses() {
    let outer = Rect2F::new(0.0, 0.0, 100.0, 100.0);
    assert!(outer.encloses(&Rect2F::new(0.0, 0.0, 100.0, 100.0)));
    assert!(outer.encloses(&Rect2F::new(10.0, 10.0, 5.0, 5.0)));
    assert!(!outer.encloses(&Rect2F::new(98.0, 10.0, 5.0, 5.0)));
    assert!(Rect2F::infinite().encloses(&outer));
}
