//! Objects tracked by the scene tree
//!
//! The tree never owns scene objects. It stores a cheap handle `O`
//! (a reference, an `Rc`/`Arc`, or an engine id type) and asks it for
//! its identity and current bounds when it needs them.

use core::fmt;
use std::rc::Rc;
use std::sync::Arc;

use void_math::AABB;

/// Stable identity of a scene object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Wrap a raw id
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl From<u64> for ObjectId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything with a stable id and an axis-aligned bounding box
pub trait SceneObject {
    fn id(&self) -> ObjectId;

    /// Current world-space bounds; trusted to be finite
    fn bounds(&self) -> AABB;

    /// Whether the object moved since the owner last cleared its flag.
    ///
    /// Only consulted when `BvhConfig::poll_dirty_flags` is set.
    fn is_dirty(&self) -> bool {
        false
    }
}

impl<T: SceneObject + ?Sized> SceneObject for &T {
    fn id(&self) -> ObjectId {
        (**self).id()
    }

    fn bounds(&self) -> AABB {
        (**self).bounds()
    }

    fn is_dirty(&self) -> bool {
        (**self).is_dirty()
    }
}

impl<T: SceneObject + ?Sized> SceneObject for Rc<T> {
    fn id(&self) -> ObjectId {
        (**self).id()
    }

    fn bounds(&self) -> AABB {
        (**self).bounds()
    }

    fn is_dirty(&self) -> bool {
        (**self).is_dirty()
    }
}

impl<T: SceneObject + ?Sized> SceneObject for Arc<T> {
    fn id(&self) -> ObjectId {
        (**self).id()
    }

    fn bounds(&self) -> AABB {
        (**self).bounds()
    }

    fn is_dirty(&self) -> bool {
        (**self).is_dirty()
    }
}

impl<T: SceneObject + ?Sized> SceneObject for Box<T> {
    fn id(&self) -> ObjectId {
        (**self).id()
    }

    fn bounds(&self) -> AABB {
        (**self).bounds()
    }

    fn is_dirty(&self) -> bool {
        (**self).is_dirty()
    }
}
