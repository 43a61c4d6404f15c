//! The BVH scene tree and its restructure controller
//!
//! Owners only record intent between frames: [`BvhTree::add_object`] queues
//! an insertion and [`BvhTree::set_dirty`] marks a moved object. Once per
//! scene update, [`BvhTree::restructure`] decides between a full rebuild and
//! an incremental pass, and leaves the tree consistent for the frame's
//! queries. Removal is the exception: it unlinks the leaf immediately.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use void_math::AABB;

use crate::arena::{Node, NodeArena, NodeHandle, NodeKind};
use crate::config::BvhConfig;
use crate::context::TreeContext;
use crate::error::Result;
use crate::morton::MortonEncoder;
use crate::object::{ObjectId, SceneObject};
use crate::refit::RefitAction;

/// Lifecycle of a tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeState {
    /// No materialized objects
    Empty,
    /// Every tracked object is in the hierarchy with current bounds
    Built,
    /// Insertions or moves are waiting for the next restructure
    Dirty,
    /// A full rebuild is running (only observable from inside restructure)
    Rebuilding,
}

/// What a call to [`BvhTree::restructure`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestructureOutcome {
    /// Nothing was pending
    Unchanged,
    /// Pending objects were inserted and moved leaves refit in place
    Incremental {
        inserted: usize,
        refit: usize,
        reinserted: usize,
    },
    /// The hierarchy was rebuilt from every tracked object
    Rebuilt { objects: usize },
}

/// Counters for debug overlays and profiling
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BvhStats {
    pub objects: usize,
    pub pending: usize,
    pub dirty: usize,
    pub leaves: usize,
    pub internal_nodes: usize,
    pub depth: usize,
    pub rebuild_count: u64,
    pub incremental_insertions: usize,
    /// Duration of the last restructure, when the context profiles
    pub last_restructure: Option<Duration>,
}

/// Position of a tracked object in the membership list and its leaf
#[derive(Clone, Copy, Debug)]
pub(crate) struct Member {
    pub slot: usize,
    pub leaf: NodeHandle,
}

/// Dynamic bounding volume hierarchy over scene objects
pub struct BvhTree<O> {
    pub(crate) arena: NodeArena<O>,
    pub(crate) root: Option<NodeHandle>,
    /// Tracked object id to membership slot and leaf
    pub(crate) members: HashMap<ObjectId, Member>,
    /// Authoritative membership list used by full rebuilds
    pub(crate) all_objects: Vec<O>,
    pub(crate) pending: Vec<O>,
    pub(crate) pending_ids: HashSet<ObjectId>,
    pub(crate) dirty: BTreeSet<NodeHandle>,
    pub(crate) encoder: MortonEncoder,
    pub(crate) config: BvhConfig,
    pub(crate) context: TreeContext,
    pub(crate) state: TreeState,
    pub(crate) rebuild_requested: bool,
    pub(crate) incremental_insertions: usize,
    pub(crate) rebuild_count: u64,
    pub(crate) last_restructure: Option<Duration>,
}

impl<O: SceneObject + Clone> BvhTree<O> {
    /// Create an empty tree with the default configuration
    pub fn new(context: TreeContext) -> Self {
        Self {
            arena: NodeArena::new(),
            root: None,
            members: HashMap::new(),
            all_objects: Vec::new(),
            pending: Vec::new(),
            pending_ids: HashSet::new(),
            dirty: BTreeSet::new(),
            encoder: MortonEncoder::default(),
            config: BvhConfig::default(),
            context,
            state: TreeState::Empty,
            rebuild_requested: false,
            incremental_insertions: 0,
            rebuild_count: 0,
            last_restructure: None,
        }
    }

    /// Create with a validated configuration
    pub fn with_config(context: TreeContext, config: BvhConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(context)
        })
    }

    /// Active configuration
    pub fn config(&self) -> &BvhConfig {
        &self.config
    }

    /// Replace the configuration; takes effect at the next restructure
    pub fn set_config(&mut self, config: BvhConfig) -> Result<()> {
        if let Err(err) = config.validate() {
            log::warn!("[{}] rejected config: {}", self.context.label(), err);
            return Err(err);
        }
        log::debug!("[{}] config updated: {:?}", self.context.label(), config);
        self.config = config;
        Ok(())
    }

    /// Logging and profiling context the tree was created with
    pub fn context(&self) -> &TreeContext {
        &self.context
    }

    /// Current lifecycle state
    pub fn state(&self) -> TreeState {
        self.state
    }

    /// Number of materialized objects
    pub fn len(&self) -> usize {
        self.all_objects.len()
    }

    /// Whether no object is materialized
    pub fn is_empty(&self) -> bool {
        self.all_objects.is_empty()
    }

    /// Objects queued for the next restructure
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ==================== Membership ====================

    /// Queue an object for insertion at the next restructure.
    ///
    /// Returns false if an object with the same id is already tracked
    /// or queued.
    pub fn add_object(&mut self, object: O) -> bool {
        let id = object.id();
        if self.members.contains_key(&id) || !self.pending_ids.insert(id) {
            log::warn!("[{}] object {} is already tracked", self.context.label(), id);
            return false;
        }
        log::trace!("[{}] queued object {}", self.context.label(), id);
        self.pending.push(object);
        self.mark_dirty_state();
        true
    }

    /// Queue several objects; returns how many were accepted
    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = O>) -> usize {
        objects
            .into_iter()
            .map(|object| self.add_object(object))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Stop tracking an object. Returns false if it was not tracked.
    pub fn remove_object(&mut self, object: &O) -> bool {
        self.remove_by_id(object.id())
    }

    /// Remove several objects; returns how many were tracked
    pub fn remove_objects<'a>(&mut self, objects: impl IntoIterator<Item = &'a O>) -> usize
    where
        O: 'a,
    {
        objects
            .into_iter()
            .filter(|object| self.remove_object(object))
            .count()
    }

    /// Stop tracking the object with `id`.
    ///
    /// A queued object is simply dropped from the queue. A materialized
    /// one loses its leaf right away: the sibling takes the parent's place
    /// and the ancestors are refit.
    pub fn remove_by_id(&mut self, id: ObjectId) -> bool {
        if self.pending_ids.remove(&id) {
            self.pending.retain(|object| object.id() != id);
            log::trace!("[{}] dropped queued object {}", self.context.label(), id);
            return true;
        }

        let Some(member) = self.members.remove(&id) else {
            return false;
        };

        self.all_objects.swap_remove(member.slot);
        if let Some(moved) = self.all_objects.get(member.slot) {
            if let Some(entry) = self.members.get_mut(&moved.id()) {
                entry.slot = member.slot;
            }
        }

        self.dirty.remove(&member.leaf);
        self.detach_leaf(member.leaf);
        self.arena.free(member.leaf);
        log::trace!("[{}] removed object {}", self.context.label(), id);

        if self.root.is_none() && self.pending.is_empty() {
            self.state = TreeState::Empty;
        }
        true
    }

    /// Whether the object is tracked, optionally counting queued objects
    pub fn contains_object(&self, object: &O, include_pending: bool) -> bool {
        self.contains_id(object.id(), include_pending)
    }

    /// Id-based form of `contains_object`
    pub fn contains_id(&self, id: ObjectId, include_pending: bool) -> bool {
        self.members.contains_key(&id) || (include_pending && self.pending_ids.contains(&id))
    }

    /// Mark a tracked object as moved so its leaf is refit at the next
    /// restructure. Returns false for unknown ids.
    pub fn set_dirty(&mut self, id: ObjectId) -> bool {
        if let Some(member) = self.members.get(&id) {
            self.dirty.insert(member.leaf);
            self.mark_dirty_state();
            return true;
        }
        // Queued objects read their bounds when they are inserted
        self.pending_ids.contains(&id)
    }

    /// Make the next restructure a full rebuild
    pub fn request_rebuild(&mut self) {
        self.rebuild_requested = true;
        self.mark_dirty_state();
    }

    fn mark_dirty_state(&mut self) {
        if self.state == TreeState::Built {
            self.state = TreeState::Dirty;
        }
    }

    // ==================== Restructure ====================

    /// Apply queued insertions and moves.
    ///
    /// Rebuilds from scratch when the tree is empty, when a rebuild was
    /// requested, when incremental updates are disabled, when
    /// `pending + dirty` exceeds `rebuild_threshold` of the tracked objects,
    /// or when the incremental insertion cadence is used up. Otherwise
    /// inserts the queued objects one by one and refits moved leaves.
    pub fn restructure(&mut self) -> RestructureOutcome {
        let started = self.context.is_profiling().then(Instant::now);

        if self.config.poll_dirty_flags {
            self.collect_flagged_objects();
        }

        let pending = self.pending.len();
        let dirty = self.dirty.len();
        if pending == 0 && dirty == 0 && !self.rebuild_requested {
            return RestructureOutcome::Unchanged;
        }

        let outcome = if self.should_rebuild(pending, dirty) {
            self.state = TreeState::Rebuilding;
            self.rebuild();
            RestructureOutcome::Rebuilt {
                objects: self.all_objects.len(),
            }
        } else {
            let inserted = self.insert_pending();
            let (refit, reinserted) = self.refit_dirty();
            RestructureOutcome::Incremental {
                inserted,
                refit,
                reinserted,
            }
        };

        self.rebuild_requested = false;
        self.state = if self.root.is_some() {
            TreeState::Built
        } else {
            TreeState::Empty
        };
        self.last_restructure = started.map(|t| t.elapsed());

        match outcome {
            RestructureOutcome::Rebuilt { objects } => log::log!(
                self.context.rebuild_log_level(),
                "[{}] full rebuild: {} objects, {} nodes{}",
                self.context.label(),
                objects,
                self.arena.len(),
                self.timing_suffix()
            ),
            RestructureOutcome::Incremental {
                inserted,
                refit,
                reinserted,
            } => log::debug!(
                "[{}] incremental restructure: {} inserted, {} refit, {} reinserted{}",
                self.context.label(),
                inserted,
                refit,
                reinserted,
                self.timing_suffix()
            ),
            RestructureOutcome::Unchanged => {}
        }

        outcome
    }

    fn should_rebuild(&self, pending: usize, dirty: usize) -> bool {
        if self.root.is_none() || self.rebuild_requested || !self.config.incremental_updates {
            return true;
        }
        let tracked = self.all_objects.len() + pending;
        if (pending + dirty) as f32 > self.config.rebuild_threshold * tracked as f32 {
            return true;
        }
        let cadence = self.config.max_incremental_insertions;
        cadence > 0 && self.incremental_insertions + pending > cadence
    }

    /// Move queued objects into the hierarchy one at a time
    fn insert_pending(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        self.pending_ids.clear();
        let inserted = pending.len();

        for object in pending {
            let id = object.id();
            let slot = self.all_objects.len();
            self.all_objects.push(object.clone());
            let leaf = self.insert_object(object);
            self.members.insert(id, Member { slot, leaf });
        }

        self.incremental_insertions += inserted;
        inserted
    }

    /// Returns `(refit, reinserted)` counts
    fn refit_dirty(&mut self) -> (usize, usize) {
        let dirty = std::mem::take(&mut self.dirty);
        let mut refit = 0;
        let mut reinserted = 0;
        for leaf in dirty {
            match self.refit_leaf(leaf) {
                RefitAction::Refit => refit += 1,
                RefitAction::Reinserted => reinserted += 1,
                RefitAction::Unchanged => {}
            }
        }
        (refit, reinserted)
    }

    fn collect_flagged_objects(&mut self) {
        let flagged: Vec<NodeHandle> = self
            .all_objects
            .iter()
            .filter(|object| object.is_dirty())
            .filter_map(|object| self.members.get(&object.id()).map(|m| m.leaf))
            .collect();
        self.dirty.extend(flagged);
    }

    fn timing_suffix(&self) -> String {
        match self.last_restructure {
            Some(elapsed) => format!(" in {:.3}ms", elapsed.as_secs_f64() * 1000.0),
            None => String::new(),
        }
    }

    /// Forget every object and free the whole arena.
    ///
    /// The objects themselves are untouched; only the tree's handles to
    /// them are dropped.
    pub fn destroy(&mut self) {
        log::debug!(
            "[{}] destroying tree with {} objects",
            self.context.label(),
            self.all_objects.len()
        );
        self.arena.clear();
        self.root = None;
        self.members.clear();
        self.all_objects.clear();
        self.pending.clear();
        self.pending_ids.clear();
        self.dirty.clear();
        self.encoder = MortonEncoder::default();
        self.rebuild_requested = false;
        self.incremental_insertions = 0;
        self.state = TreeState::Empty;
    }

    // ==================== Inspection ====================

    /// Root node; `None` while the tree is empty
    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    /// Leaf currently holding the object with `id`
    pub fn leaf_of(&self, id: ObjectId) -> Option<NodeHandle> {
        self.members.get(&id).map(|member| member.leaf)
    }

    /// Read-only view of a node; `None` for stale handles
    pub fn node(&self, handle: NodeHandle) -> Option<NodeRef<'_, O>> {
        self.arena.get(handle).map(|node| NodeRef { handle, node })
    }

    /// Bounds of the whole tree
    pub fn root_bounds(&self) -> Option<AABB> {
        self.root.map(|root| self.arena[root].bounds)
    }

    /// Snapshot of counters and shape statistics
    pub fn stats(&self) -> BvhStats {
        let leaves = self.arena.iter().filter(|(_, node)| node.is_leaf()).count();
        BvhStats {
            objects: self.all_objects.len(),
            pending: self.pending.len(),
            dirty: self.dirty.len(),
            leaves,
            internal_nodes: self.arena.len() - leaves,
            depth: self.depth(),
            rebuild_count: self.rebuild_count,
            incremental_insertions: self.incremental_insertions,
            last_restructure: self.last_restructure,
        }
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(NodeHandle, usize)> = self.root.map(|root| (root, 1)).into_iter().collect();
        while let Some((handle, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some((left, right)) = self.arena[handle].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}

impl<O: SceneObject + Clone> Default for BvhTree<O> {
    fn default() -> Self {
        Self::new(TreeContext::default())
    }
}

/// Read-only view of one node
pub struct NodeRef<'a, O> {
    handle: NodeHandle,
    node: &'a Node<O>,
}

/// Payload of a node as seen through [`NodeRef`]
pub enum NodeKindRef<'a, O> {
    Leaf(&'a O),
    Internal { left: NodeHandle, right: NodeHandle },
}

impl<'a, O> NodeRef<'a, O> {
    /// Handle of this node
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    /// Bounds stored on the node
    pub fn bounds(&self) -> AABB {
        self.node.bounds
    }

    /// Parent handle; `None` at the root
    pub fn parent(&self) -> Option<NodeHandle> {
        self.node.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    /// Leaf object or child handles
    pub fn kind(&self) -> NodeKindRef<'a, O> {
        match &self.node.kind {
            NodeKind::Leaf { object } => NodeKindRef::Leaf(object),
            NodeKind::Internal { left, right } => NodeKindRef::Internal {
                left: *left,
                right: *right,
            },
        }
    }
}
