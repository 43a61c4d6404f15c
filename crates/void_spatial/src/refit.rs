//! Bottom-up bounds maintenance for moved objects

use crate::arena::{NodeHandle, NodeKind};
use crate::morton::CodeRange;
use crate::object::SceneObject;
use crate::tree::BvhTree;

/// What happened to one dirty leaf
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefitAction {
    /// Leaf and ancestors were refit in place
    Refit,
    /// Leaf left its parent's slack margin and was moved elsewhere
    Reinserted,
    /// Bounds and key were already current
    Unchanged,
}

impl<O: SceneObject + Clone> BvhTree<O> {
    /// Re-read a leaf's object bounds and propagate the change upward
    pub(crate) fn refit_leaf(&mut self, leaf: NodeHandle) -> RefitAction {
        let Some(node) = self.arena.get(leaf) else {
            return RefitAction::Unchanged;
        };
        let NodeKind::Leaf { object } = &node.kind else {
            return RefitAction::Unchanged;
        };

        let bounds = object.bounds();
        let codes = CodeRange::point(self.encoder.encode(bounds.center()));
        if node.bounds == bounds && node.codes == codes {
            return RefitAction::Unchanged;
        }
        let parent = node.parent;

        if let (Some(slack), Some(parent)) = (self.config.reinsert_slack, parent) {
            if !self.arena[parent].bounds.expand(slack).contains_aabb(&bounds) {
                log::trace!(
                    "[{}] reinserting {:?}: left parent bounds",
                    self.context.label(),
                    leaf
                );
                self.detach_leaf(leaf);
                let node = &mut self.arena[leaf];
                node.bounds = bounds;
                node.codes = codes;
                self.attach_leaf(leaf);
                return RefitAction::Reinserted;
            }
        }

        let node = &mut self.arena[leaf];
        node.bounds = bounds;
        node.codes = codes;
        if let Some(parent) = parent {
            self.refit_upwards(parent);
        }
        RefitAction::Refit
    }

    /// Recompute internal nodes from `start` toward the root, stopping at
    /// the first ancestor whose bounds and key range did not change
    pub(crate) fn refit_upwards(&mut self, start: NodeHandle) {
        let mut current = Some(start);
        while let Some(handle) = current {
            let Some((left, right)) = self.arena[handle].children() else {
                break;
            };
            let bounds = self.arena[left].bounds.union(&self.arena[right].bounds);
            let codes = self.arena[left].codes.union(self.arena[right].codes);

            let node = &mut self.arena[handle];
            if node.bounds == bounds && node.codes == codes {
                break;
            }
            node.bounds = bounds;
            node.codes = codes;
            current = node.parent;
        }
    }
}
