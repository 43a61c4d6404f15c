//! Oriented bounding boxes

use glam::{Mat3, Quat, Vec3};

use crate::bounds::AABB;
use crate::consts::EPSILON;

/// Box with arbitrary orientation
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Obb {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl Obb {
    /// Box centered at `center`, rotated by `rotation`
    #[inline]
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }

    /// Axis-aligned OBB covering the same region as `aabb`
    pub fn from_aabb(aabb: &AABB) -> Self {
        Self::new(aabb.center(), aabb.half_extents(), Quat::IDENTITY)
    }

    /// Local axes as matrix columns
    #[inline]
    pub fn axes(&self) -> Mat3 {
        Mat3::from_quat(self.rotation)
    }

    /// Express a world-space point in the box's local frame
    #[inline]
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.center)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.to_local(point).abs().cmple(self.half_extents + EPSILON).all()
    }

    /// True when all eight corners of `aabb` lie inside this box
    pub fn contains_aabb(&self, aabb: &AABB) -> bool {
        aabb.corners().iter().all(|&corner| self.contains_point(corner))
    }

    /// Tightest world-space AABB around the box
    pub fn to_aabb(&self) -> AABB {
        let axes = self.axes();
        let abs = Mat3::from_cols(axes.x_axis.abs(), axes.y_axis.abs(), axes.z_axis.abs());
        AABB::from_center_half_extents(self.center, abs * self.half_extents)
    }

    /// Separating-axis test against an axis-aligned box.
    ///
    /// Checks the three world axes, the three box axes and their nine
    /// cross products.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        let a = aabb.half_extents();
        let b = self.half_extents;
        let axes = self.axes();
        // r[i][j] = world axis i projected on box axis j
        let cols = [axes.x_axis, axes.y_axis, axes.z_axis];
        let mut r = [[0.0f32; 3]; 3];
        let mut abs_r = [[0.0f32; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = cols[j][i];
                abs_r[i][j] = r[i][j].abs() + EPSILON;
            }
        }

        let t = (self.center - aabb.center()).to_array();
        let a = a.to_array();
        let b = b.to_array();

        for i in 0..3 {
            let ra = a[i];
            let rb = b[0] * abs_r[i][0] + b[1] * abs_r[i][1] + b[2] * abs_r[i][2];
            if t[i].abs() > ra + rb {
                return false;
            }
        }

        for j in 0..3 {
            let ra = a[0] * abs_r[0][j] + a[1] * abs_r[1][j] + a[2] * abs_r[2][j];
            let rb = b[j];
            let proj = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if proj.abs() > ra + rb {
                return false;
            }
        }

        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = a[i1] * abs_r[i2][j] + a[i2] * abs_r[i1][j];
                let rb = b[j1] * abs_r[i][j2] + b[j2] * abs_r[i][j1];
                let proj = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                if proj.abs() > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}
