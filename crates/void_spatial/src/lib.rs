//! # void_spatial - Dynamic Scene Spatial Index
//!
//! A bounding volume hierarchy over externally owned scene objects, used by
//! the renderer for frustum culling and by picking and physics code for
//! ray and volume queries.
//!
//! ## Features
//!
//! - LBVH construction from Morton-sorted leaves
//! - Incremental insertion between rebuilds, guided by Morton key ranges
//! - Early-exit bottom-up refit of moved objects
//! - Immediate removal with sibling promotion
//! - Frustum, ray (nearest first) and sphere/AABB/OBB queries
//! - A brute-force [`LinearSceneTree`] behind the same [`SceneTree`] trait
//!
//! ## Example
//!
//! ```ignore
//! use void_spatial::prelude::*;
//!
//! let mut tree = BvhTree::new(TreeContext::new("main-scene"));
//! tree.add_objects(scene.meshes());
//! tree.restructure();
//!
//! for mesh in tree.visible_objects(&camera.frustum()) {
//!     renderer.draw(mesh);
//! }
//! ```
//!
//! ## Update model
//!
//! All mutation happens from the scene update step. Queries borrow the tree
//! immutably and may run from several threads between updates.

mod arena;
mod build;
mod insert;
mod morton;
mod refit;
mod validation;

pub mod config;
pub mod context;
pub mod error;
pub mod object;
pub mod query;
pub mod scene_tree;
pub mod tree;

pub use arena::NodeHandle;
pub use config::BvhConfig;
pub use context::TreeContext;
pub use error::{Result, SpatialError};
pub use morton::{interleave, MortonEncoder, BITS_PER_AXIS};
pub use object::{ObjectId, SceneObject};
pub use query::{RayHit, VolumeQuery};
pub use scene_tree::{LinearSceneTree, SceneTree, SceneTreeKind};
pub use tree::{BvhStats, BvhTree, NodeKindRef, NodeRef, RestructureOutcome, TreeState};

pub mod prelude {
    pub use crate::config::BvhConfig;
    pub use crate::context::TreeContext;
    pub use crate::object::{ObjectId, SceneObject};
    pub use crate::query::{RayHit, VolumeQuery};
    pub use crate::scene_tree::{LinearSceneTree, SceneTree, SceneTreeKind};
    pub use crate::tree::{BvhTree, RestructureOutcome, TreeState};
    pub use void_math::prelude::*;
}
