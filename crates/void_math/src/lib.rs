//! # void_math - Bounding Volume Primitives
//!
//! The geometric vocabulary shared by the spatial index, the renderer and
//! picking code. Vector and matrix arithmetic comes from `glam`; this crate
//! only adds the volumes and tests built on top of it:
//!
//! - [`AABB`] and [`Sphere`] bounding volumes
//! - [`Obb`] oriented boxes with a separating-axis test against [`AABB`]
//! - [`Plane`] and [`FrustumPlanes`] for view-frustum culling
//! - [`Ray`] and the slab tests [`ray_aabb`] and [`ray_aabb_interval`]

pub mod bounds;
pub mod frustum;
pub mod obb;
pub mod ray;

pub use bounds::*;
pub use frustum::*;
pub use obb::*;
pub use ray::*;

pub use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

/// Common math constants
pub mod consts {
    /// Tolerance used by the separating-axis tests to absorb
    /// cross products of near-parallel edges.
    pub const EPSILON: f32 = 1e-6;
}

pub mod prelude {
    pub use crate::bounds::{Sphere, AABB};
    pub use crate::frustum::{ClipDepth, FrustumPlanes, FrustumTestResult, Plane};
    pub use crate::obb::Obb;
    pub use crate::ray::{ray_aabb, ray_aabb_interval, Ray};
    pub use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
}
