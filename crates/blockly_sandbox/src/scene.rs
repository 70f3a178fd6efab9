// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene files for the sandbox.
//!
//! A scene describes:
//! - Workspace settings
//! - Block definitions
//! - Blocks placed at startup, addressed by a scene-local name
//! - A script of drags to replay

use blockly_core::{BlockDefinition, ModelError, WorkspaceConfig, WorkspaceError, WorkspacePoint};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current scene format version
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// A block placed when the scene loads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneBlock {
    /// Name used by drag steps
    pub name: String,
    /// Registered definition to instantiate
    pub definition: String,
    /// Origin in workspace coordinates
    #[serde(default)]
    pub position: WorkspacePoint,
    /// Whether the block is a shadow
    #[serde(default)]
    pub shadow: bool,
}

/// One drag gesture: pick up a block, move it, drop it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragStep {
    /// Name of the block to drag
    pub block: String,
    /// Total horizontal movement
    pub dx: i32,
    /// Total vertical movement
    pub dy: i32,
}

/// A sandbox scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Scene format version
    pub version: u32,
    /// Workspace settings
    #[serde(default)]
    pub config: WorkspaceConfig,
    /// Block definitions to register
    #[serde(default)]
    pub definitions: Vec<BlockDefinition>,
    /// Blocks to place
    #[serde(default)]
    pub blocks: Vec<SceneBlock>,
    /// Drags to replay, in order
    #[serde(default)]
    pub drags: Vec<DragStep>,
}

impl Scene {
    /// Parse a scene from RON
    pub fn from_ron(source: &str) -> Result<Self, SceneError> {
        let scene: Scene = ron::from_str(source)?;

        // Version check
        if scene.version > SCENE_FORMAT_VERSION {
            return Err(SceneError::UnsupportedVersion(scene.version));
        }

        Ok(scene)
    }

    /// Load a scene file
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }
}

/// Scene errors
#[derive(Debug, Error)]
pub enum SceneError {
    /// File could not be read
    #[error("Failed to read scene: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Failed to parse scene: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Written by a newer sandbox
    #[error("Scene version {0} is newer than supported version {SCENE_FORMAT_VERSION}")]
    UnsupportedVersion(u32),

    /// Two blocks share a name
    #[error("Duplicate block name: {0}")]
    DuplicateBlock(String),

    /// A drag refers to a block that was never placed
    #[error("Unknown block name: {0}")]
    UnknownBlock(String),

    /// Block model lookup failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Workspace rejected an operation
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
