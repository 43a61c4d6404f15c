//! Morton (Z-order) keys for spatial sorting.
//!
//! Points are normalized against a scene extent, quantized to 21 bits per
//! axis and bit-interleaved into a 63-bit key. The key is only a locality
//! heuristic for construction and insertion; equal keys are legal.

use glam::Vec3;
use void_math::AABB;

/// Quantization resolution per axis
pub const BITS_PER_AXIS: u32 = 21;

const AXIS_MAX: f32 = ((1u32 << BITS_PER_AXIS) - 1) as f32;

#[inline]
fn split_by_3(a: u32) -> u64 {
    let mut x = a as u64 & 0x1f_ffff;
    x = (x | x << 32) & 0x1f_0000_0000_ffff;
    x = (x | x << 16) & 0x1f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}

/// Interleave three 21-bit coordinates, x in the lowest bit
#[inline]
pub fn interleave(x: u32, y: u32, z: u32) -> u64 {
    split_by_3(x) | split_by_3(y) << 1 | split_by_3(z) << 2
}

/// Quantize a coordinate already normalized to `[0, 1]`
#[inline]
fn quantize(unit: f32) -> u32 {
    // NaN saturates to 0 in the cast
    (unit * AXIS_MAX).round().clamp(0.0, AXIS_MAX) as u32
}

/// Maps points inside a fixed scene extent to Morton keys
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MortonEncoder {
    origin: Vec3,
    inv_size: Vec3,
}

impl MortonEncoder {
    /// Encoder normalizing against `extent`; flat axes map to the middle
    pub fn new(extent: &AABB) -> Self {
        if extent.is_empty() {
            return Self::default();
        }
        let size = extent.size();
        let inv = |w: f32| if w > f32::EPSILON { 1.0 / w } else { 0.0 };
        Self {
            origin: extent.min,
            inv_size: Vec3::new(inv(size.x), inv(size.y), inv(size.z)),
        }
    }

    /// Encoder over the bounding box of `points`
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        Self::new(&AABB::from_points(points))
    }

    /// Key for `point`; points outside the extent clamp to its faces
    pub fn encode(&self, point: Vec3) -> u64 {
        let unit = (point - self.origin) * self.inv_size;
        let unit = Vec3::select(self.inv_size.cmpeq(Vec3::ZERO), Vec3::splat(0.5), unit);
        interleave(quantize(unit.x), quantize(unit.y), quantize(unit.z))
    }
}

impl Default for MortonEncoder {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            inv_size: Vec3::ZERO,
        }
    }
}

/// Inclusive range of keys found in a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CodeRange {
    pub lo: u64,
    pub hi: u64,
}

impl CodeRange {
    #[inline]
    pub fn point(code: u64) -> Self {
        Self { lo: code, hi: code }
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Numeric distance from `code` to the range, 0 when inside
    #[inline]
    pub fn distance(&self, code: u64) -> u64 {
        if code < self.lo {
            self.lo - code
        } else {
            code.saturating_sub(self.hi)
        }
    }
}

/// Split position of a sorted key run by longest common prefix.
///
/// Returns the index of the last element of the left half, always in
/// `0..codes.len() - 1`. The left half holds every key whose highest bit
/// differing between the first and last key is clear. A run of identical
/// keys splits at the midpoint.
pub(crate) fn find_split(codes: &[u64]) -> usize {
    debug_assert!(codes.len() >= 2);
    let first = codes[0];
    let last = codes[codes.len() - 1];

    if first == last {
        return (codes.len() - 1) / 2;
    }

    let highest_differing_bit = 63 - (first ^ last).leading_zeros();
    let mask = 1u64 << highest_differing_bit;
    codes.partition_point(|code| code & mask == 0) - 1
}
