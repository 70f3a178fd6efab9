// SPDX-License-Identifier: MIT OR Apache-2.0
//! Workspace tuning parameters.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default snapping radius in workspace units
pub const DEFAULT_SNAP_RADIUS: f64 = 48.0;

/// Default distance a bumped block is pushed away
pub const DEFAULT_BUMP_DISTANCE: i32 = 48;

/// Settings that drive snapping and bumping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Maximum distance at which a dropped block snaps to a connection
    pub snap_radius: f64,
    /// How far overlapping blocks are pushed apart
    pub bump_distance: i32,
    /// Whether dropped blocks push unconnected neighbours away
    pub bump_neighbours: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            snap_radius: DEFAULT_SNAP_RADIUS,
            bump_distance: DEFAULT_BUMP_DISTANCE,
            bump_neighbours: true,
        }
    }
}

impl WorkspaceConfig {
    /// Parse from a RON string
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }
}

/// Error loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.snap_radius, DEFAULT_SNAP_RADIUS);
        assert_eq!(config.bump_distance, DEFAULT_BUMP_DISTANCE);
        assert!(config.bump_neighbours);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = WorkspaceConfig::from_ron("(snap_radius: 30.0)").expect("valid config");
        assert_eq!(config.snap_radius, 30.0);
        assert_eq!(config.bump_distance, DEFAULT_BUMP_DISTANCE);
    }

    #[test]
    fn test_invalid_ron() {
        assert!(matches!(
            WorkspaceConfig::from_ron("(snap_radius: \"far\")"),
            Err(ConfigError::Parse(_))
        ));
    }
}
