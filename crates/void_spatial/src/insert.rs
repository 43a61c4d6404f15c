//! Single-object insertion and leaf removal between rebuilds

use crate::arena::{Node, NodeHandle, NodeKind};
use crate::object::SceneObject;
use crate::tree::BvhTree;

impl<O: SceneObject + Clone> BvhTree<O> {
    /// Create a leaf for `object` and link it next to the leaf with the
    /// closest Morton key range
    pub(crate) fn insert_object(&mut self, object: O) -> NodeHandle {
        let bounds = object.bounds();
        let code = self.encoder.encode(bounds.center());
        log::trace!("[{}] inserting object {}", self.context.label(), object.id());
        let leaf = self.arena.allocate(Node::leaf(object, bounds, code));
        self.attach_leaf(leaf);
        leaf
    }

    /// Link a detached leaf into the hierarchy.
    ///
    /// The chosen leaf is replaced by a new internal node holding both
    /// leaves, ordered by key, and the ancestors are refit.
    pub(crate) fn attach_leaf(&mut self, leaf: NodeHandle) {
        let Some(root) = self.root else {
            self.arena[leaf].parent = None;
            self.root = Some(leaf);
            return;
        };

        let code = self.arena[leaf].codes.lo;
        let sibling = self.find_insertion_leaf(root, code);
        let parent = self.arena[sibling].parent;

        let internal = if self.arena[sibling].codes.lo <= code {
            self.join(sibling, leaf)
        } else {
            self.join(leaf, sibling)
        };
        self.arena[internal].parent = parent;

        match parent {
            Some(parent) => {
                self.replace_child(parent, sibling, internal);
                self.refit_upwards(parent);
            }
            None => self.root = Some(internal),
        }
    }

    /// Approximate nearest leaf by Morton key: at each internal node take
    /// the child whose key range is numerically closer, left on ties
    fn find_insertion_leaf(&self, mut node: NodeHandle, code: u64) -> NodeHandle {
        while let NodeKind::Internal { left, right } = self.arena[node].kind {
            let to_left = self.arena[left].codes.distance(code);
            let to_right = self.arena[right].codes.distance(code);
            node = if to_left <= to_right { left } else { right };
        }
        node
    }

    /// Unlink a leaf without freeing it.
    ///
    /// The leaf's parent is freed and the sibling is promoted into the
    /// parent's slot; ancestors are refit.
    pub(crate) fn detach_leaf(&mut self, leaf: NodeHandle) {
        let Some(parent) = self.arena[leaf].parent.take() else {
            if self.root == Some(leaf) {
                self.root = None;
            }
            return;
        };

        let sibling = match self.arena[parent].kind {
            NodeKind::Internal { left, right } if left == leaf => right,
            NodeKind::Internal { left, .. } => left,
            NodeKind::Leaf { .. } => unreachable!("leaf {parent:?} has a child"),
        };
        let grandparent = self.arena[parent].parent;
        self.arena.free(parent);
        self.arena[sibling].parent = grandparent;

        match grandparent {
            Some(grandparent) => {
                self.replace_child(grandparent, parent, sibling);
                self.refit_upwards(grandparent);
            }
            None => self.root = Some(sibling),
        }
    }

    /// Point `parent`'s link at `old` to `new`
    fn replace_child(&mut self, parent: NodeHandle, old: NodeHandle, new: NodeHandle) {
        if let NodeKind::Internal { left, right } = &mut self.arena[parent].kind {
            if *left == old {
                *left = new;
            } else if *right == old {
                *right = new;
            }
        }
    }
}
