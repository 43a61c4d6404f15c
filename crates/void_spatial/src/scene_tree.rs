//! Scene tree capability shared by every spatial index variant
//!
//! The scene manager talks to a `Box<dyn SceneTree<O>>` and picks the
//! variant once, through [`SceneTreeKind::create`]. [`LinearSceneTree`] is
//! the fallback: no hierarchy at all, every query is a scan over a cached
//! bounds list. It is also the reference the BVH is checked against.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use void_math::{ray_aabb_interval, FrustumPlanes, Obb, Ray, Sphere, AABB};

use crate::config::BvhConfig;
use crate::context::TreeContext;
use crate::error::Result;
use crate::object::{ObjectId, SceneObject};
use crate::query::{RayHit, VolumeQuery};
use crate::tree::{BvhTree, RestructureOutcome};

/// Operations the scene manager needs from a spatial index
pub trait SceneTree<O> {
    fn kind(&self) -> SceneTreeKind;

    /// Queue an object; false if its id is already tracked or queued
    fn add_object(&mut self, object: O) -> bool;

    fn add_objects(&mut self, objects: Vec<O>) -> usize {
        objects
            .into_iter()
            .map(|object| self.add_object(object))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Stop tracking an object; false if it was not tracked
    fn remove_object(&mut self, object: &O) -> bool;

    fn remove_objects(&mut self, objects: &[O]) -> usize {
        objects
            .iter()
            .filter(|object| self.remove_object(object))
            .count()
    }

    /// Apply queued insertions and moves
    fn restructure(&mut self) -> RestructureOutcome;

    /// Drop every object handle the index holds
    fn destroy(&mut self);

    fn contains_object(&self, object: &O, include_pending: bool) -> bool;

    /// Mark a tracked object as moved
    fn set_dirty(&mut self, id: ObjectId) -> bool;

    fn all_objects(&self) -> Vec<O>;

    fn visible_objects(&self, frustum: &FrustumPlanes) -> Vec<O>;

    /// Hits ordered nearest first
    fn ray_intersections(&self, ray: &Ray) -> Vec<RayHit<O>>;

    fn query_sphere(&self, sphere: &Sphere) -> Vec<O>;

    fn query_aabb(&self, aabb: &AABB) -> Vec<O>;

    fn query_obb(&self, obb: &Obb) -> Vec<O>;

    /// Number of materialized objects
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Available spatial index implementations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneTreeKind {
    /// Dynamic bounding volume hierarchy
    #[default]
    Bvh,
    /// Flat list scanned on every query
    Linear,
}

impl SceneTreeKind {
    /// Construct an empty index of this kind
    pub fn create<O>(self, context: TreeContext, config: BvhConfig) -> Result<Box<dyn SceneTree<O>>>
    where
        O: SceneObject + Clone + 'static,
    {
        log::debug!("[{}] creating {:?} scene tree", context.label(), self);
        let tree: Box<dyn SceneTree<O>> = match self {
            SceneTreeKind::Bvh => Box::new(BvhTree::with_config(context, config)?),
            SceneTreeKind::Linear => Box::new(LinearSceneTree::with_config(context, config)?),
        };
        Ok(tree)
    }
}

impl<O: SceneObject + Clone> SceneTree<O> for BvhTree<O> {
    fn kind(&self) -> SceneTreeKind {
        SceneTreeKind::Bvh
    }

    fn add_object(&mut self, object: O) -> bool {
        BvhTree::add_object(self, object)
    }

    fn add_objects(&mut self, objects: Vec<O>) -> usize {
        BvhTree::add_objects(self, objects)
    }

    fn remove_object(&mut self, object: &O) -> bool {
        BvhTree::remove_object(self, object)
    }

    fn restructure(&mut self) -> RestructureOutcome {
        BvhTree::restructure(self)
    }

    fn destroy(&mut self) {
        BvhTree::destroy(self)
    }

    fn contains_object(&self, object: &O, include_pending: bool) -> bool {
        BvhTree::contains_object(self, object, include_pending)
    }

    fn set_dirty(&mut self, id: ObjectId) -> bool {
        BvhTree::set_dirty(self, id)
    }

    fn all_objects(&self) -> Vec<O> {
        BvhTree::all_objects(self)
    }

    fn visible_objects(&self, frustum: &FrustumPlanes) -> Vec<O> {
        BvhTree::visible_objects(self, frustum)
    }

    fn ray_intersections(&self, ray: &Ray) -> Vec<RayHit<O>> {
        BvhTree::ray_intersections(self, ray)
    }

    fn query_sphere(&self, sphere: &Sphere) -> Vec<O> {
        BvhTree::query_sphere(self, sphere)
    }

    fn query_aabb(&self, aabb: &AABB) -> Vec<O> {
        BvhTree::query_aabb(self, aabb)
    }

    fn query_obb(&self, obb: &Obb) -> Vec<O> {
        BvhTree::query_obb(self, obb)
    }

    fn len(&self) -> usize {
        BvhTree::len(self)
    }
}

struct Entry<O> {
    object: O,
    bounds: AABB,
}

/// Brute-force index: a list of objects with their bounds as of the last
/// restructure
pub struct LinearSceneTree<O> {
    entries: Vec<Entry<O>>,
    slots: HashMap<ObjectId, usize>,
    pending: Vec<O>,
    pending_ids: HashSet<ObjectId>,
    dirty: HashSet<ObjectId>,
    config: BvhConfig,
    context: TreeContext,
}

impl<O: SceneObject + Clone> LinearSceneTree<O> {
    /// Empty linear tree with the default configuration
    pub fn new(context: TreeContext) -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
            pending: Vec::new(),
            pending_ids: HashSet::new(),
            dirty: HashSet::new(),
            config: BvhConfig::default(),
            context,
        }
    }

    /// Only `poll_dirty_flags` applies to a flat list; the rest is validated
    /// so either variant accepts the same settings
    pub fn with_config(context: TreeContext, config: BvhConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(context)
        })
    }

    fn scan(&self, mut keep: impl FnMut(&AABB) -> bool) -> Vec<O> {
        self.entries
            .iter()
            .filter(|entry| keep(&entry.bounds))
            .map(|entry| entry.object.clone())
            .collect()
    }

    fn volume_intersections<V: VolumeQuery + ?Sized>(&self, volume: &V) -> Vec<O> {
        self.scan(|bounds| volume.overlaps_aabb(bounds))
    }
}

impl<O: SceneObject + Clone> SceneTree<O> for LinearSceneTree<O> {
    fn kind(&self) -> SceneTreeKind {
        SceneTreeKind::Linear
    }

    fn add_object(&mut self, object: O) -> bool {
        let id = object.id();
        if self.slots.contains_key(&id) || !self.pending_ids.insert(id) {
            log::warn!("[{}] object {} is already tracked", self.context.label(), id);
            return false;
        }
        self.pending.push(object);
        true
    }

    fn remove_object(&mut self, object: &O) -> bool {
        let id = object.id();
        if self.pending_ids.remove(&id) {
            self.pending.retain(|queued| queued.id() != id);
            return true;
        }
        let Some(slot) = self.slots.remove(&id) else {
            return false;
        };
        self.entries.swap_remove(slot);
        if let Some(moved) = self.entries.get(slot) {
            self.slots.insert(moved.object.id(), slot);
        }
        self.dirty.remove(&id);
        log::trace!("[{}] removed object {}", self.context.label(), id);
        true
    }

    fn restructure(&mut self) -> RestructureOutcome {
        if self.config.poll_dirty_flags {
            let flagged: Vec<ObjectId> = self
                .entries
                .iter()
                .filter(|entry| entry.object.is_dirty())
                .map(|entry| entry.object.id())
                .collect();
            self.dirty.extend(flagged);
        }
        if self.pending.is_empty() && self.dirty.is_empty() {
            return RestructureOutcome::Unchanged;
        }

        let mut refit = 0;
        for id in std::mem::take(&mut self.dirty) {
            if let Some(&slot) = self.slots.get(&id) {
                let entry = &mut self.entries[slot];
                let bounds = entry.object.bounds();
                if bounds != entry.bounds {
                    entry.bounds = bounds;
                    refit += 1;
                }
            }
        }

        let pending = std::mem::take(&mut self.pending);
        self.pending_ids.clear();
        let inserted = pending.len();
        for object in pending {
            self.slots.insert(object.id(), self.entries.len());
            self.entries.push(Entry {
                bounds: object.bounds(),
                object,
            });
        }

        log::debug!(
            "[{}] linear restructure: {} inserted, {} refit",
            self.context.label(),
            inserted,
            refit
        );
        RestructureOutcome::Incremental {
            inserted,
            refit,
            reinserted: 0,
        }
    }

    fn destroy(&mut self) {
        log::debug!(
            "[{}] destroying linear tree with {} objects",
            self.context.label(),
            self.entries.len()
        );
        self.entries.clear();
        self.slots.clear();
        self.pending.clear();
        self.pending_ids.clear();
        self.dirty.clear();
    }

    fn contains_object(&self, object: &O, include_pending: bool) -> bool {
        let id = object.id();
        self.slots.contains_key(&id) || (include_pending && self.pending_ids.contains(&id))
    }

    fn set_dirty(&mut self, id: ObjectId) -> bool {
        if self.slots.contains_key(&id) {
            self.dirty.insert(id);
            return true;
        }
        self.pending_ids.contains(&id)
    }

    fn all_objects(&self) -> Vec<O> {
        self.entries.iter().map(|entry| entry.object.clone()).collect()
    }

    fn visible_objects(&self, frustum: &FrustumPlanes) -> Vec<O> {
        self.scan(|bounds| frustum.contains_aabb(bounds).is_visible())
    }

    fn ray_intersections(&self, ray: &Ray) -> Vec<RayHit<O>> {
        if !ray.is_valid() {
            return Vec::new();
        }
        let mut hits: Vec<RayHit<O>> = self
            .entries
            .iter()
            .filter_map(|entry| {
                ray_aabb_interval(ray, &entry.bounds).map(|(enter, _)| RayHit {
                    object: entry.object.clone(),
                    distance: enter,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn query_sphere(&self, sphere: &Sphere) -> Vec<O> {
        self.volume_intersections(sphere)
    }

    fn query_aabb(&self, aabb: &AABB) -> Vec<O> {
        self.volume_intersections(aabb)
    }

    fn query_obb(&self, obb: &Obb) -> Vec<O> {
        self.volume_intersections(obb)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[derive(Clone, Debug, PartialEq)]
    struct Cube(u64, Vec3);

    impl SceneObject for Cube {
        fn id(&self) -> ObjectId {
            ObjectId::new(self.0)
        }

        fn bounds(&self) -> AABB {
            AABB::from_center_half_extents(self.1, Vec3::splat(0.5))
        }
    }

    fn cubes() -> Vec<Cube> {
        (0..12).map(|i| Cube(i, Vec3::new(i as f32 * 2.0, 0.0, 0.0))).collect()
    }

    #[test]
    fn test_create_each_kind() {
        for kind in [SceneTreeKind::Bvh, SceneTreeKind::Linear] {
            let mut tree: Box<dyn SceneTree<Cube>> = kind
                .create(TreeContext::new("kind"), BvhConfig::default())
                .expect("default config is valid");
            assert_eq!(tree.kind(), kind);

            assert_eq!(tree.add_objects(cubes()), 12);
            assert!(tree.is_empty());
            tree.restructure();
            assert_eq!(tree.len(), 12);
        }
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let config = BvhConfig {
            rebuild_threshold: 0.0,
            ..Default::default()
        };
        assert!(SceneTreeKind::Linear
            .create::<Cube>(TreeContext::default(), config.clone())
            .is_err());
        assert!(SceneTreeKind::Bvh.create::<Cube>(TreeContext::default(), config).is_err());
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(serde_json::to_string(&SceneTreeKind::Linear).expect("serializes"), "\"linear\"");
        let kind: SceneTreeKind = serde_json::from_str("\"bvh\"").expect("parses");
        assert_eq!(kind, SceneTreeKind::Bvh);
    }

    #[test]
    fn test_linear_membership() {
        let mut tree = LinearSceneTree::new(TreeContext::new("linear"));
        let objects = cubes();
        tree.add_objects(objects.clone());
        assert!(!tree.add_object(objects[0].clone()));
        assert!(tree.contains_object(&objects[3], true));
        assert!(!tree.contains_object(&objects[3], false));

        tree.restructure();
        assert!(tree.contains_object(&objects[3], false));
        assert_eq!(tree.remove_objects(&objects[..4]), 4);
        assert_eq!(tree.len(), 8);
        assert!(!tree.remove_object(&objects[0]));

        let mut ids: Vec<u64> = tree.all_objects().iter().map(|c| c.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, (4..12).collect::<Vec<_>>());

        tree.destroy();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_linear_queries() {
        let mut tree = LinearSceneTree::new(TreeContext::new("linear"));
        tree.add_objects(cubes());
        tree.restructure();

        let hits = tree.ray_intersections(&Ray::new(Vec3::new(100.0, 0.0, 0.0), Vec3::NEG_X));
        let ids: Vec<u64> = hits.iter().map(|h| h.object.0).collect();
        assert_eq!(ids, (0..12).rev().collect::<Vec<_>>());

        let near = tree.query_sphere(&Sphere::new(Vec3::ZERO, 2.0));
        assert_eq!(near.iter().map(|c| c.0).collect::<Vec<_>>(), vec![0, 1]);

        let frustum = FrustumPlanes::from_aabb(&AABB::new(Vec3::new(3.0, -1.0, -1.0), Vec3::new(7.0, 1.0, 1.0)));
        let visible: Vec<u64> = tree.visible_objects(&frustum).iter().map(|c| c.0).collect();
        assert_eq!(visible, vec![2, 3]);
    }
}
