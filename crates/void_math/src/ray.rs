//! Rays for picking and occlusion queries

use glam::Vec3;

use crate::bounds::AABB;

/// Half-line with a normalized direction.
///
/// The reciprocal direction is cached for the slab test, so the fields are
/// private and only set through the constructors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray; `direction` is normalized
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize_or_zero();
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    /// Ray from `start` through `end`
    #[inline]
    pub fn from_points(start: Vec3, end: Vec3) -> Self {
        Self::new(start, end - start)
    }

    /// Start point of the ray
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Unit direction; zero for a degenerate ray
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Component-wise `1 / direction`; infinite on axes the ray is parallel to
    #[inline]
    pub fn inverse_direction(&self) -> Vec3 {
        self.inv_direction
    }

    /// Point at distance `t` along the ray
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// False when the direction had zero length
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.direction.length_squared() > 1e-10
    }
}

/// Ray-AABB slab test returning the parametric interval inside the box.
///
/// The interval is `(enter, exit)` with `enter` clamped to zero when the
/// origin is inside. `None` when the box is missed or lies behind the origin.
/// Faces are part of the box, so a ray running along a face hits it.
pub fn ray_aabb_interval(ray: &Ray, aabb: &AABB) -> Option<(f32, f32)> {
    if !ray.is_valid() {
        return None;
    }
    let origin = ray.origin();
    let inv = ray.inverse_direction();
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        if inv[axis].is_infinite() {
            // Parallel to this slab: either always inside it or never
            if origin[axis] < aabb.min[axis] || origin[axis] > aabb.max[axis] {
                return None;
            }
            continue;
        }
        let t_lo = (aabb.min[axis] - origin[axis]) * inv[axis];
        let t_hi = (aabb.max[axis] - origin[axis]) * inv[axis];
        t_near = t_near.max(t_lo.min(t_hi));
        t_far = t_far.min(t_lo.max(t_hi));
    }

    if t_far < 0.0 || t_near > t_far {
        None
    } else {
        Some((t_near.max(0.0), t_far))
    }
}

/// Ray-AABB slab test.
///
/// Returns the entry distance, or the exit distance when the origin is
/// inside the box. `None` when the box is missed or lies behind the origin.
pub fn ray_aabb(ray: &Ray, aabb: &AABB) -> Option<f32> {
    ray_aabb_interval(ray, aabb).map(|(enter, exit)| if enter > 0.0 { enter } else { exit })
}
