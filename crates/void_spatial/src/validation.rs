//! Structural self-checks and debug dumps

use std::collections::HashSet;
use std::fmt::Write;

use crate::arena::{NodeHandle, NodeKind};
use crate::error::{Result, SpatialError};
use crate::object::SceneObject;
use crate::tree::BvhTree;

impl<O: SceneObject + Clone> BvhTree<O> {
    /// Check every structural invariant of the hierarchy.
    ///
    /// Verifies that each tracked object has exactly one leaf, that
    /// internal nodes number one less than leaves, that every internal
    /// node's bounds and key range are the exact union of its children,
    /// and that parent links and the object-to-leaf map agree with the
    /// tree. Reports the first violation found.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            if !self.arena.is_empty() {
                return Err(SpatialError::corrupt("root", "no root but nodes are allocated"));
            }
            if !self.all_objects.is_empty() || !self.members.is_empty() {
                return Err(SpatialError::corrupt("root", "no root but objects are tracked"));
            }
            return Ok(());
        };

        let Some(root_node) = self.arena.get(root) else {
            return Err(SpatialError::corrupt(root, "root handle is stale"));
        };
        if root_node.parent.is_some() {
            return Err(SpatialError::corrupt(root, "root has a parent"));
        }

        let mut visited: HashSet<NodeHandle> = HashSet::with_capacity(self.arena.len());
        let mut leaves = 0usize;
        let mut internal = 0usize;
        let mut stack = vec![root];

        while let Some(handle) = stack.pop() {
            if !visited.insert(handle) {
                return Err(SpatialError::corrupt(handle, "reached twice"));
            }
            let node = &self.arena[handle];

            match &node.kind {
                NodeKind::Leaf { object } => {
                    leaves += 1;
                    let id = object.id();
                    let Some(member) = self.members.get(&id) else {
                        return Err(SpatialError::corrupt(handle, format!("object {id} is not tracked")));
                    };
                    if member.leaf != handle {
                        return Err(SpatialError::corrupt(
                            handle,
                            format!("object {id} maps to {:?}", member.leaf),
                        ));
                    }
                    if self.all_objects.get(member.slot).map(|o| o.id()) != Some(id) {
                        return Err(SpatialError::corrupt(
                            handle,
                            format!("object {id} has a wrong membership slot"),
                        ));
                    }
                }
                NodeKind::Internal { left, right } => {
                    internal += 1;
                    let (Some(l), Some(r)) = (self.arena.get(*left), self.arena.get(*right)) else {
                        return Err(SpatialError::corrupt(handle, "stale child handle"));
                    };
                    if l.parent != Some(handle) || r.parent != Some(handle) {
                        return Err(SpatialError::corrupt(handle, "child does not link back"));
                    }
                    if node.bounds != l.bounds.union(&r.bounds) {
                        return Err(SpatialError::corrupt(
                            handle,
                            "bounds are not the union of the children",
                        ));
                    }
                    if node.codes != l.codes.union(r.codes) {
                        return Err(SpatialError::corrupt(
                            handle,
                            "key range is not the union of the children",
                        ));
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        if visited.len() != self.arena.len() {
            return Err(SpatialError::corrupt(
                "arena",
                format!("{} live nodes but {} reachable", self.arena.len(), visited.len()),
            ));
        }
        if leaves != self.all_objects.len() || leaves != self.members.len() {
            return Err(SpatialError::corrupt(
                "tree",
                format!(
                    "{} leaves for {} objects and {} map entries",
                    leaves,
                    self.all_objects.len(),
                    self.members.len()
                ),
            ));
        }
        if internal != leaves.saturating_sub(1) {
            return Err(SpatialError::corrupt(
                "tree",
                format!("{internal} internal nodes for {leaves} leaves"),
            ));
        }
        if let Some(stale) = self.dirty.iter().find(|leaf| !self.arena.contains(**leaf)) {
            return Err(SpatialError::corrupt(*stale, "dirty set holds a stale leaf"));
        }

        Ok(())
    }

    /// Indented pre-order dump of the hierarchy, one node per line
    pub fn debug_layout(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeHandle, usize)> = self.root.map(|root| (root, 0)).into_iter().collect();

        while let Some((handle, depth)) = stack.pop() {
            let node = &self.arena[handle];
            let indent = depth * 2;
            let (min, max) = (node.bounds.min, node.bounds.max);
            match &node.kind {
                NodeKind::Leaf { object } => {
                    let _ = writeln!(
                        out,
                        "{:indent$}leaf {} [{:.3} {:.3} {:.3}]..[{:.3} {:.3} {:.3}]",
                        "",
                        object.id(),
                        min.x,
                        min.y,
                        min.z,
                        max.x,
                        max.y,
                        max.z
                    );
                }
                NodeKind::Internal { left, right } => {
                    let _ = writeln!(
                        out,
                        "{:indent$}node {:#x}..{:#x} [{:.3} {:.3} {:.3}]..[{:.3} {:.3} {:.3}]",
                        "",
                        node.codes.lo,
                        node.codes.hi,
                        min.x,
                        min.y,
                        min.z,
                        max.x,
                        max.y,
                        max.z
                    );
                    stack.push((*right, depth + 1));
                    stack.push((*left, depth + 1));
                }
            }
        }

        out
    }
}
