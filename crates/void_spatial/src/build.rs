//! Full top-down rebuild from Morton-sorted leaves (LBVH)

use void_math::AABB;

use crate::arena::{Node, NodeHandle, NodeKind};
use crate::morton::{find_split, MortonEncoder};
use crate::object::SceneObject;
use crate::tree::{BvhTree, Member};

impl<O: SceneObject + Clone> BvhTree<O> {
    /// Rebuild the hierarchy from every tracked and queued object.
    ///
    /// Keys are computed against the extent of all bound centers and
    /// stable-sorted, so objects with equal keys keep their membership
    /// order and identical inputs always produce identical trees.
    pub(crate) fn rebuild(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.pending_ids.clear();
        self.all_objects.extend(pending);

        self.arena.clear();
        self.root = None;
        self.dirty.clear();
        self.members.clear();

        let bounds: Vec<AABB> = self.all_objects.iter().map(|object| object.bounds()).collect();
        self.encoder = MortonEncoder::from_points(bounds.iter().map(AABB::center));

        let mut primitives: Vec<(u64, usize)> = bounds
            .iter()
            .enumerate()
            .map(|(slot, aabb)| (self.encoder.encode(aabb.center()), slot))
            .collect();
        primitives.sort_by_key(|&(code, _)| code);

        let mut leaves = Vec::with_capacity(primitives.len());
        let mut codes = Vec::with_capacity(primitives.len());
        for (code, slot) in primitives {
            let object = self.all_objects[slot].clone();
            let id = object.id();
            let leaf = self.arena.allocate(Node::leaf(object, bounds[slot], code));
            self.members.insert(id, Member { slot, leaf });
            leaves.push(leaf);
            codes.push(code);
        }

        if !leaves.is_empty() {
            self.root = Some(self.build_subtree(&leaves, &codes));
        }

        self.incremental_insertions = 0;
        self.rebuild_count += 1;
    }

    /// Recursively split a sorted run of leaves; returns the subtree root
    fn build_subtree(&mut self, leaves: &[NodeHandle], codes: &[u64]) -> NodeHandle {
        if leaves.len() == 1 {
            return leaves[0];
        }

        let split = find_split(codes);
        let left = self.build_subtree(&leaves[..=split], &codes[..=split]);
        let right = self.build_subtree(&leaves[split + 1..], &codes[split + 1..]);
        self.join(left, right)
    }

    /// Allocate an internal node over two detached subtrees and fit its
    /// bounds to theirs
    pub(crate) fn join(&mut self, left: NodeHandle, right: NodeHandle) -> NodeHandle {
        let (bounds, codes) = {
            let (l, r) = (&self.arena[left], &self.arena[right]);
            (l.bounds.union(&r.bounds), l.codes.union(r.codes))
        };
        let internal = self.arena.allocate(Node {
            bounds,
            parent: None,
            codes,
            kind: NodeKind::Internal { left, right },
        });
        self.arena[left].parent = Some(internal);
        self.arena[right].parent = Some(internal);
        internal
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::RestructureOutcome;
    use crate::{BvhTree, ObjectId, SceneObject, TreeContext};
    use glam::Vec3;
    use void_math::AABB;

    #[derive(Clone, Debug)]
    struct Cube(u64, Vec3);

    impl SceneObject for Cube {
        fn id(&self) -> ObjectId {
            ObjectId::new(self.0)
        }

        fn bounds(&self) -> AABB {
            AABB::from_center_half_extents(self.1, Vec3::splat(0.5))
        }
    }

    fn grid(n: u64) -> Vec<Cube> {
        (0..n)
            .map(|i| Cube(i, Vec3::new((i % 7) as f32 * 3.0, (i / 7) as f32 * 2.0, (i % 3) as f32)))
            .collect()
    }

    #[test]
    fn test_build_empty_tree() {
        let mut tree: BvhTree<Cube> = BvhTree::default();
        tree.request_rebuild();
        assert_eq!(tree.restructure(), RestructureOutcome::Rebuilt { objects: 0 });
        assert!(tree.root().is_none());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_build_single_object_is_root_leaf() {
        let mut tree = BvhTree::new(TreeContext::new("single"));
        tree.add_object(Cube(1, Vec3::ZERO));
        tree.restructure();

        let root = tree.root().expect("one object gives a root");
        assert_eq!(tree.leaf_of(ObjectId::new(1)), Some(root));
        assert!(tree.node(root).expect("live root").is_leaf());
    }

    #[test]
    fn test_build_node_counts() {
        let mut tree = BvhTree::default();
        tree.add_objects(grid(50));
        assert_eq!(tree.restructure(), RestructureOutcome::Rebuilt { objects: 50 });

        let stats = tree.stats();
        assert_eq!(stats.leaves, 50);
        assert_eq!(stats.internal_nodes, 49);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_build_identical_centers_stays_balanced() {
        let mut tree = BvhTree::default();
        tree.add_objects((0..64).map(|i| Cube(i, Vec3::ONE)));
        tree.restructure();

        // Degenerate keys split at the midpoint
        assert_eq!(tree.depth(), 7);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let build = || {
            let mut tree = BvhTree::default();
            tree.add_objects(grid(40));
            tree.restructure();
            tree
        };
        let (a, b) = (build(), build());
        assert_eq!(a.debug_layout(), b.debug_layout());
    }
}
