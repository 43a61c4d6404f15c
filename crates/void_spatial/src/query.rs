//! Read-only queries: frustum culling, ray picking and volume overlap
//!
//! Every query walks the hierarchy depth-first with an explicit stack,
//! left child first, and never mutates the tree. Several threads may run
//! queries at once as long as no mutation is in flight.

use void_math::{ray_aabb_interval, FrustumPlanes, FrustumTestResult, Obb, Ray, Sphere, AABB};

use crate::arena::{NodeHandle, NodeKind};
use crate::object::SceneObject;
use crate::tree::BvhTree;

/// One object hit by a ray
#[derive(Clone, Debug, PartialEq)]
pub struct RayHit<O> {
    /// The object whose bounds were hit
    pub object: O,
    /// Distance along the ray to where it enters the object's bounds;
    /// zero when the origin is inside them
    pub distance: f32,
}

/// A query volume tested against node bounds
pub trait VolumeQuery {
    /// Whether the volume and `aabb` share any point
    fn overlaps_aabb(&self, aabb: &AABB) -> bool;

    /// Whether `aabb` lies entirely inside the volume
    fn contains_aabb(&self, aabb: &AABB) -> bool;
}

impl VolumeQuery for Sphere {
    #[inline]
    fn overlaps_aabb(&self, aabb: &AABB) -> bool {
        self.intersects_aabb(aabb)
    }

    #[inline]
    fn contains_aabb(&self, aabb: &AABB) -> bool {
        Sphere::contains_aabb(self, aabb)
    }
}

impl VolumeQuery for AABB {
    #[inline]
    fn overlaps_aabb(&self, aabb: &AABB) -> bool {
        self.intersects(aabb)
    }

    #[inline]
    fn contains_aabb(&self, aabb: &AABB) -> bool {
        AABB::contains_aabb(self, aabb)
    }
}

impl VolumeQuery for Obb {
    #[inline]
    fn overlaps_aabb(&self, aabb: &AABB) -> bool {
        self.intersects_aabb(aabb)
    }

    #[inline]
    fn contains_aabb(&self, aabb: &AABB) -> bool {
        Obb::contains_aabb(self, aabb)
    }
}

impl<O: SceneObject + Clone> BvhTree<O> {
    /// Every materialized object, in membership order
    pub fn all_objects(&self) -> Vec<O> {
        self.all_objects.clone()
    }

    /// Materialized objects without cloning
    pub fn objects(&self) -> &[O] {
        &self.all_objects
    }

    /// Objects whose bounds are not provably outside the frustum.
    ///
    /// A subtree behind any one plane is skipped; a subtree inside all six
    /// is emitted without further plane tests.
    pub fn visible_objects(&self, frustum: &FrustumPlanes) -> Vec<O> {
        let mut visible = Vec::new();
        let mut stack: Vec<NodeHandle> = self.root.into_iter().collect();

        while let Some(handle) = stack.pop() {
            let node = &self.arena[handle];
            match frustum.contains_aabb(&node.bounds) {
                FrustumTestResult::Outside => {}
                FrustumTestResult::Inside => self.collect_subtree(handle, &mut visible),
                FrustumTestResult::Intersecting => match &node.kind {
                    NodeKind::Leaf { object } => visible.push(object.clone()),
                    NodeKind::Internal { left, right } => {
                        stack.push(*right);
                        stack.push(*left);
                    }
                },
            }
        }

        visible
    }

    /// Every object hit by `ray`, nearest first
    pub fn ray_intersections(&self, ray: &Ray) -> Vec<RayHit<O>> {
        self.ray_intersections_within(ray, f32::INFINITY)
    }

    /// Objects hit by `ray` no farther than `max_distance`, nearest first.
    ///
    /// Hits at equal distance keep traversal order.
    pub fn ray_intersections_within(&self, ray: &Ray, max_distance: f32) -> Vec<RayHit<O>> {
        let mut hits = Vec::new();
        if !ray.is_valid() {
            return hits;
        }
        let mut stack: Vec<NodeHandle> = self.root.into_iter().collect();

        while let Some(handle) = stack.pop() {
            let node = &self.arena[handle];
            let Some((enter, _)) = ray_aabb_interval(ray, &node.bounds) else {
                continue;
            };
            if enter > max_distance {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf { object } => hits.push(RayHit {
                    object: object.clone(),
                    distance: enter,
                }),
                NodeKind::Internal { left, right } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Objects whose bounds overlap `volume`, in no particular order
    pub fn volume_intersections<V: VolumeQuery + ?Sized>(&self, volume: &V) -> Vec<O> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeHandle> = self.root.into_iter().collect();

        while let Some(handle) = stack.pop() {
            let node = &self.arena[handle];
            if !volume.overlaps_aabb(&node.bounds) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf { object } => found.push(object.clone()),
                NodeKind::Internal { .. } if volume.contains_aabb(&node.bounds) => {
                    self.collect_subtree(handle, &mut found)
                }
                NodeKind::Internal { left, right } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        found
    }

    /// Objects whose bounds overlap `sphere`
    pub fn query_sphere(&self, sphere: &Sphere) -> Vec<O> {
        self.volume_intersections(sphere)
    }

    /// Objects whose bounds overlap `aabb`
    pub fn query_aabb(&self, aabb: &AABB) -> Vec<O> {
        self.volume_intersections(aabb)
    }

    /// Objects whose bounds overlap `obb`
    pub fn query_obb(&self, obb: &Obb) -> Vec<O> {
        self.volume_intersections(obb)
    }

    /// Push every leaf object below `start` without testing bounds
    fn collect_subtree(&self, start: NodeHandle, out: &mut Vec<O>) {
        let mut stack = vec![start];
        while let Some(handle) = stack.pop() {
            match &self.arena[handle].kind {
                NodeKind::Leaf { object } => out.push(object.clone()),
                NodeKind::Internal { left, right } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
    }
}
