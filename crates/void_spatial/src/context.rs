//! Per-tree logging and timing context
//!
//! Trees never consult an engine-wide context: the owner hands one in at
//! construction so that several trees (one per scene, one per light, ...)
//! can be told apart in logs and profiled independently.

use log::Level;

#[derive(Debug, Clone)]
pub struct TreeContext {
    label: String,
    rebuild_log_level: Level,
    profile: bool,
}

impl TreeContext {
    /// Context with the given log label, info-level rebuild logs and no profiling
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Level used to report full rebuilds
    pub fn with_rebuild_log_level(mut self, level: Level) -> Self {
        self.rebuild_log_level = level;
        self
    }

    /// Time every restructure and expose it through `BvhStats`
    pub fn with_profiling(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// Prefix used on every log line of the tree
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Level used for full-rebuild summaries
    pub fn rebuild_log_level(&self) -> Level {
        self.rebuild_log_level
    }

    /// Whether restructures are timed
    pub fn is_profiling(&self) -> bool {
        self.profile
    }
}

impl Default for TreeContext {
    fn default() -> Self {
        Self {
            label: "scene".to_string(),
            rebuild_log_level: Level::Info,
            profile: false,
        }
    }
}
