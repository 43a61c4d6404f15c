//! Scene tree configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpatialError};

/// Tuning knobs for [`BvhTree::restructure`](crate::BvhTree::restructure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// Rebuild from scratch when `pending + dirty` exceeds this fraction
    /// of the tracked objects
    pub rebuild_threshold: f32,

    /// Allow incremental insertion and refitting between rebuilds
    pub incremental_updates: bool,

    /// Incremental insertions since the last rebuild that force the next
    /// restructure to rebuild (0 disables the cadence)
    pub max_incremental_insertions: usize,

    /// Reinsert a moved leaf instead of refitting when its new bounds leave
    /// its parent's bounds grown by this margin
    pub reinsert_slack: Option<f32>,

    /// Also refit objects whose [`SceneObject::is_dirty`](crate::SceneObject::is_dirty)
    /// reports true
    pub poll_dirty_flags: bool,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            rebuild_threshold: 0.25,
            incremental_updates: true,
            max_incremental_insertions: 1024,
            reinsert_slack: None,
            poll_dirty_flags: false,
        }
    }
}

impl BvhConfig {
    /// Rebuild on every change; highest query quality, highest update cost
    pub fn always_rebuild() -> Self {
        Self {
            incremental_updates: false,
            ..Default::default()
        }
    }

    /// Favour incremental updates for scenes with many moving objects
    pub fn dynamic() -> Self {
        Self {
            rebuild_threshold: 0.5,
            max_incremental_insertions: 4096,
            reinsert_slack: Some(1.0),
            ..Default::default()
        }
    }

    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field against its valid range
    pub fn validate(&self) -> Result<()> {
        if !(self.rebuild_threshold > 0.0 && self.rebuild_threshold <= 1.0) {
            return Err(SpatialError::InvalidConfig(format!(
                "rebuild_threshold must be in (0, 1], got {}",
                self.rebuild_threshold
            )));
        }
        if let Some(slack) = self.reinsert_slack {
            if !(slack >= 0.0 && slack.is_finite()) {
                return Err(SpatialError::InvalidConfig(format!(
                    "reinsert_slack must be a finite non-negative margin, got {slack}"
                )));
            }
        }
        Ok(())
    }
}
