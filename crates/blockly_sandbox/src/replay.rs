// SPDX-License-Identifier: MIT OR Apache-2.0
//! Replays a scene's drag script against a workspace.

use crate::scene::{Scene, SceneError};
use blockly_core::{BlockId, DropOutcome, Workspace};
use indexmap::IndexMap;

/// Result of dropping one dragged block
#[derive(Debug, Clone)]
pub struct DropRecord {
    /// Scene name of the dragged block
    pub block: String,
    /// What the workspace did on drop
    pub outcome: DropOutcome,
}

/// A workspace built from a scene, with its blocks addressable by name
#[derive(Debug)]
pub struct Replay {
    workspace: Workspace,
    names: IndexMap<String, BlockId>,
}

impl Replay {
    /// Register the scene's definitions and place its blocks
    pub fn new(scene: &Scene) -> Result<Self, SceneError> {
        let mut workspace = Workspace::new(scene.config.clone());
        for definition in &scene.definitions {
            workspace.registry_mut().register(definition.clone());
        }

        let mut names = IndexMap::new();
        for block in &scene.blocks {
            if names.contains_key(&block.name) {
                return Err(SceneError::DuplicateBlock(block.name.clone()));
            }
            let id = workspace.add_block(&block.definition, block.position, block.shadow)?;
            names.insert(block.name.clone(), id);
        }

        Ok(Self { workspace, names })
    }

    /// The underlying workspace
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Look up a block by scene name
    pub fn block(&self, name: &str) -> Result<BlockId, SceneError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::UnknownBlock(name.to_string()))
    }

    /// Scene name of a block
    pub fn name_of(&self, id: BlockId) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, block)| **block == id)
            .map(|(name, _)| name.as_str())
    }

    /// Play every drag of the scene, moving in `steps` increments each
    pub fn run(&mut self, scene: &Scene, steps: u32) -> Result<Vec<DropRecord>, SceneError> {
        let mut records = Vec::with_capacity(scene.drags.len());
        for drag in &scene.drags {
            let block = self.block(&drag.block)?;
            let outcome = self.drag(block, drag.dx, drag.dy, steps)?;
            tracing::info!(
                "Dropped {}: snapped={}, bumped={}",
                drag.block,
                outcome.snapped.is_some(),
                outcome.bumped
            );
            records.push(DropRecord {
                block: drag.block.clone(),
                outcome,
            });
        }
        Ok(records)
    }

    fn drag(&mut self, block: BlockId, dx: i32, dy: i32, steps: u32) -> Result<DropOutcome, SceneError> {
        let steps = steps.max(1);
        self.workspace.begin_drag(block)?;

        let (mut moved_x, mut moved_y) = (0, 0);
        for step in 1..=steps {
            // Spread the movement so that the last step lands exactly
            let target_x = partial(dx, step, steps);
            let target_y = partial(dy, step, steps);
            self.workspace
                .drag_by(block, target_x - moved_x, target_y - moved_y)?;
            moved_x = target_x;
            moved_y = target_y;

            if let Some((mine, theirs)) = self.workspace.snap_target(block)? {
                tracing::trace!("Step {}: {} would snap to {}", step, mine, theirs);
            }
        }

        Ok(self.workspace.drop_block(block)?)
    }

    /// One line per block, roots first with their trees indented below
    pub fn summary(&self) -> Result<Vec<String>, SceneError> {
        let store = self.workspace.store();
        let mut lines = Vec::new();
        for &root in self.names.values() {
            if store.parent_block(root)?.is_some() {
                continue;
            }
            for member in store.descendants(root)? {
                let Some(block) = store.block(member) else {
                    continue;
                };
                lines.push(format!(
                    "{}{} [{}] at {}",
                    "  ".repeat(self.depth(member, root)?),
                    self.name_of(member).unwrap_or("?"),
                    block.definition,
                    block.position
                ));
            }
        }
        Ok(lines)
    }

    fn depth(&self, block: BlockId, root: BlockId) -> Result<usize, SceneError> {
        let store = self.workspace.store();
        let mut depth = 0;
        let mut current = block;
        while current != root {
            let Some(parent) = store.parent_block(current)? else {
                break;
            };
            current = parent;
            depth += 1;
        }
        Ok(depth)
    }
}

/// `total * step / steps`, computed wide so that large drags cannot overflow
fn partial(total: i32, step: u32, steps: u32) -> i32 {
    let value = i64::from(total) * i64::from(step) / i64::from(steps);
    // |value| <= |total| for step <= steps
    i32::try_from(value).unwrap_or(total)
}
