//! Node storage addressed by generational handles
//!
//! Nodes never own each other. Children and parents are plain
//! [`NodeHandle`]s into the arena, and a handle whose slot has been freed
//! stops resolving because the slot's generation moved on.

use core::fmt;
use core::ops::{Index, IndexMut};

use void_math::AABB;

use crate::morton::CodeRange;

/// Opaque, validated reference to a tree node
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({}v{})", self.index, self.generation)
    }
}

/// Leaf or internal payload
#[derive(Debug, Clone)]
pub(crate) enum NodeKind<O> {
    Leaf { object: O },
    Internal { left: NodeHandle, right: NodeHandle },
}

#[derive(Debug, Clone)]
pub(crate) struct Node<O> {
    pub bounds: AABB,
    pub parent: Option<NodeHandle>,
    /// Morton keys of the leaves below; a single key for a leaf
    pub codes: CodeRange,
    pub kind: NodeKind<O>,
}

impl<O> Node<O> {
    pub fn leaf(object: O, bounds: AABB, code: u64) -> Self {
        Self {
            bounds,
            parent: None,
            codes: CodeRange::point(code),
            kind: NodeKind::Leaf { object },
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    #[inline]
    pub fn children(&self) -> Option<(NodeHandle, NodeHandle)> {
        match self.kind {
            NodeKind::Internal { left, right } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<O> {
    generation: u32,
    node: Option<Node<O>>,
}

/// Flat growable node storage with slot reuse
#[derive(Debug, Clone)]
pub(crate) struct NodeArena<O> {
    slots: Vec<Slot<O>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<O> NodeArena<O> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Store a node and get a handle to it
    pub fn allocate(&mut self, node: Node<O>) -> NodeHandle {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let Ok(index) = u32::try_from(self.slots.len()) else {
                panic!("node arena exhausted");
            };
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Release a node; the handle and every copy of it become stale
    pub fn free(&mut self, handle: NodeHandle) -> Option<Node<O>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.len -= 1;
        Some(node)
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&Node<O>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node<O>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free every node; outstanding handles all go stale
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free_list.push(index as u32);
        }
        self.len = 0;
    }

    /// Iterate over live nodes
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node<O>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }
}

impl<O> Default for NodeArena<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal traversal access; a stale handle here is a bug in the tree
impl<O> Index<NodeHandle> for NodeArena<O> {
    type Output = Node<O>;

    fn index(&self, handle: NodeHandle) -> &Node<O> {
        match self.get(handle) {
            Some(node) => node,
            None => panic!("stale node handle {handle:?}"),
        }
    }
}

impl<O> IndexMut<NodeHandle> for NodeArena<O> {
    fn index_mut(&mut self, handle: NodeHandle) -> &mut Node<O> {
        match self.get_mut(handle) {
            Some(node) => node,
            None => panic!("stale node handle {handle:?}"),
        }
    }
}
