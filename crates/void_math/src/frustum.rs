//! Planes and view frusta for visibility culling

use glam::{Mat4, Vec3, Vec4};

use crate::bounds::{Sphere, AABB};

/// Plane `normal . p + distance = 0`; the normal side is "in front"
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Build from a possibly unnormalized `(a, b, c, d)` equation.
    ///
    /// A degenerate normal yields the XZ plane.
    pub fn from_equation(equation: Vec4) -> Self {
        let normal = equation.truncate();
        let len = normal.length();
        if len > 1e-10 {
            Self {
                normal: normal / len,
                distance: equation.w / len,
            }
        } else {
            Self::default()
        }
    }

    /// Plane through `point` facing along `normal`
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Positive in front of the plane, negative behind
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Corner of `aabb` furthest along the normal
    #[inline]
    fn positive_vertex(&self, aabb: &AABB) -> Vec3 {
        Vec3::select(self.normal.cmpge(Vec3::ZERO), aabb.max, aabb.min)
    }

    /// Corner of `aabb` furthest against the normal
    #[inline]
    fn negative_vertex(&self, aabb: &AABB) -> Vec3 {
        Vec3::select(self.normal.cmpge(Vec3::ZERO), aabb.min, aabb.max)
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::Y,
            distance: 0.0,
        }
    }
}

/// Result of frustum containment test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrustumTestResult {
    /// Completely inside every plane
    Inside,
    /// Completely behind at least one plane
    Outside,
    /// Crosses at least one plane
    Intersecting,
}

impl FrustumTestResult {
    /// True for `Inside` and `Intersecting`
    #[inline]
    pub fn is_visible(&self) -> bool {
        *self != FrustumTestResult::Outside
    }
}

/// Depth range of the clip space a projection matrix maps into
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipDepth {
    /// `0 <= z <= w` (glam `*_rh`/`*_lh`, wgpu, Vulkan, D3D)
    #[default]
    ZeroToOne,
    /// `-w <= z <= w` (glam `*_gl`, OpenGL)
    NegativeOneToOne,
}

/// Six inward-facing planes: left, right, bottom, top, near, far
///
/// The same plane test serves perspective and orthographic projections;
/// the projection only shapes the extracted planes.
#[derive(Clone, Debug, PartialEq)]
pub struct FrustumPlanes {
    pub planes: [Plane; 6],
}

impl FrustumPlanes {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const BOTTOM: usize = 2;
    pub const TOP: usize = 3;
    pub const NEAR: usize = 4;
    pub const FAR: usize = 5;

    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Gribb/Hartmann plane extraction from a view-projection matrix
    pub fn from_view_projection(view_projection: &Mat4, depth: ClipDepth) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);

        let near = match depth {
            ClipDepth::ZeroToOne => r2,
            ClipDepth::NegativeOneToOne => r3 + r2,
        };

        Self {
            planes: [
                Plane::from_equation(r3 + r0),
                Plane::from_equation(r3 - r0),
                Plane::from_equation(r3 + r1),
                Plane::from_equation(r3 - r1),
                Plane::from_equation(near),
                Plane::from_equation(r3 - r2),
            ],
        }
    }

    /// Axis-aligned box volume as a frustum, handy for light volumes and tests
    pub fn from_aabb(aabb: &AABB) -> Self {
        Self {
            planes: [
                Plane::from_point_normal(aabb.min, Vec3::X),
                Plane::from_point_normal(aabb.max, Vec3::NEG_X),
                Plane::from_point_normal(aabb.min, Vec3::Y),
                Plane::from_point_normal(aabb.max, Vec3::NEG_Y),
                Plane::from_point_normal(aabb.min, Vec3::Z),
                Plane::from_point_normal(aabb.max, Vec3::NEG_Z),
            ],
        }
    }

    /// Classify an AABB against all six planes.
    ///
    /// `Outside` as soon as the box sits wholly behind any single plane.
    pub fn contains_aabb(&self, aabb: &AABB) -> FrustumTestResult {
        let mut result = FrustumTestResult::Inside;

        for plane in &self.planes {
            if plane.distance_to_point(plane.positive_vertex(aabb)) < 0.0 {
                return FrustumTestResult::Outside;
            }
            if plane.distance_to_point(plane.negative_vertex(aabb)) < 0.0 {
                result = FrustumTestResult::Intersecting;
            }
        }

        result
    }

    /// Three-way classification of a sphere
    pub fn contains_sphere(&self, sphere: &Sphere) -> FrustumTestResult {
        let mut result = FrustumTestResult::Inside;

        for plane in &self.planes {
            let dist = plane.distance_to_point(sphere.center);
            if dist < -sphere.radius {
                return FrustumTestResult::Outside;
            }
            if dist < sphere.radius {
                result = FrustumTestResult::Intersecting;
            }
        }

        result
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }
}
