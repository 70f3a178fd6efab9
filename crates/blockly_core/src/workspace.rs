// SPDX-License-Identifier: MIT OR Apache-2.0
//! Workspace: blocks, their connection index and the drag lifecycle.
//!
//! A drag goes through three steps:
//! 1. [`Workspace::begin_drag`] detaches the block from its parent and marks
//!    its group as dragging
//! 2. [`Workspace::drag_by`] moves the group; the index defers re-sorting
//! 3. [`Workspace::drop_block`] picks the best connection in range, reindexes
//!    the group, snaps it into place and bumps overlapping neighbours away

use crate::block::{BlockId, BlockRegistry};
use crate::config::WorkspaceConfig;
use crate::connection::{Connection, ConnectionCheck, ConnectionId, ConnectionType, WorkspacePoint};
use crate::connection_manager::{ConnectionManager, ConnectionManagerError};
use crate::store::{BlockStore, ModelError};
use std::collections::HashSet;

/// Result type for workspace operations
pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// What happened when a dragged block was dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropOutcome {
    /// The (dropped block connection, target) pair that was connected
    pub snapped: Option<(ConnectionId, ConnectionId)>,
    /// Number of block groups pushed away
    pub bumped: usize,
}

/// A workspace of blocks
#[derive(Debug, Default)]
pub struct Workspace {
    config: WorkspaceConfig,
    registry: BlockRegistry,
    store: BlockStore,
    connections: ConnectionManager,
}

impl Workspace {
    /// Create an empty workspace
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config,
            registry: BlockRegistry::new(),
            store: BlockStore::new(),
            connections: ConnectionManager::new(),
        }
    }

    /// Current settings
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Available block definitions
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Mutable access to block definitions
    pub fn registry_mut(&mut self) -> &mut BlockRegistry {
        &mut self.registry
    }

    /// Block and connection records
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Connection index
    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connections
    }

    fn connection(&self, id: ConnectionId) -> Result<&Connection> {
        Ok(self
            .store
            .connection(id)
            .ok_or(ModelError::UnknownConnection(id))?)
    }

    fn block_connections(&self, block: BlockId) -> Result<Vec<ConnectionId>> {
        let block = self.store.block(block).ok_or(ModelError::UnknownBlock(block))?;
        Ok(block.connections().collect())
    }

    /// Instantiate a registered definition and index its connections
    pub fn add_block(&mut self, definition: &str, position: WorkspacePoint, shadow: bool) -> Result<BlockId> {
        let definition = self
            .registry
            .get(definition)
            .ok_or_else(|| ModelError::UnknownDefinition(definition.to_string()))?;
        let id = self.store.add_block(definition, position, shadow);
        for conn in self.block_connections(id)? {
            self.connections.add_connection(&self.store, conn)?;
        }
        tracing::debug!("Added block {} ({}) at {}", id, definition.name, position);
        Ok(id)
    }

    /// Remove a block, and with `recursive` everything attached below it.
    ///
    /// Without `recursive`, children stay in the workspace as new roots.
    pub fn remove_block(&mut self, block: BlockId, recursive: bool) -> Result<()> {
        let blocks = if recursive {
            self.store.descendants(block)?
        } else {
            vec![block]
        };
        for id in blocks {
            for conn in self.block_connections(id)? {
                self.connections.remove_connection(&self.store, conn)?;
            }
            self.store.remove_block(id)?;
            tracing::debug!("Removed block {}", id);
        }
        Ok(())
    }

    /// Remove every block
    pub fn clear(&mut self) {
        self.store = BlockStore::new();
        self.connections.clear();
    }

    /// Connect two connections, disconnecting whatever is in the way.
    ///
    /// A block displaced from the parent side is reattached below the
    /// newly connected stack when possible and bumped away otherwise.
    pub fn connect(&mut self, a: ConnectionId, b: ConnectionId) -> Result<()> {
        let reason = self.connection(a)?.can_connect_with_reason(self.connection(b)?);
        if !reason.is_offerable() {
            return Err(ModelError::IncompatibleConnections { a, b, reason }.into());
        }
        if self.store.would_cycle(a, b)? {
            return Err(ModelError::IncompatibleConnections {
                a,
                b,
                reason: ConnectionCheck::WouldCycle,
            }
            .into());
        }

        let (parent, child) = if self.connection(a)?.connection_type.is_parent_side() {
            (a, b)
        } else {
            (b, a)
        };
        self.store.disconnect(child)?;
        let orphan = self.store.disconnect(parent)?;
        self.store.connect(parent, child)?;
        tracing::info!("Connected {} to {}", child, parent);

        if let Some(orphan) = orphan {
            self.reattach_orphan(child, orphan)?;
        }
        Ok(())
    }

    /// Find a home for a block that was displaced by `child`
    fn reattach_orphan(&mut self, child: ConnectionId, orphan: ConnectionId) -> Result<()> {
        let orphan_block = self.connection(orphan)?.block;

        if self.connection(orphan)?.connection_type == ConnectionType::Previous {
            let child_block = self.connection(child)?.block;
            if let Some(slot) = self.last_free_next(child_block)? {
                if self.connection(slot)?.can_connect(self.connection(orphan)?) {
                    let target = self.connection(slot)?.position;
                    let source = self.connection(orphan)?.position;
                    self.move_group(orphan_block, target.x - source.x, target.y - source.y)?;
                    self.store.connect(slot, orphan)?;
                    tracing::debug!("Reattached block {} below the inserted stack", orphan_block);
                    return Ok(());
                }
            }
        }

        self.bump_group(child, orphan, orphan_block)
    }

    /// The free next connection at the bottom of the stack starting at `block`
    fn last_free_next(&self, block: BlockId) -> Result<Option<ConnectionId>> {
        let mut current = block;
        loop {
            let next = self
                .store
                .block(current)
                .ok_or(ModelError::UnknownBlock(current))?
                .next;
            let Some(next) = next else {
                return Ok(None);
            };
            match self.connection(next)?.target {
                Some(target) => current = self.connection(target)?.block,
                None => return Ok(Some(next)),
            }
        }
    }

    /// Move a block and everything attached below it
    fn move_group(&mut self, root: BlockId, dx: i32, dy: i32) -> Result<()> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        for id in self.store.descendants(root)? {
            let block = self.store.block_mut(id).ok_or(ModelError::UnknownBlock(id))?;
            block.position = block.position.offset(dx, dy);
            let conns: Vec<_> = block.connections().collect();
            for conn in conns {
                let position = self.connection(conn)?.position.offset(dx, dy);
                self.connections
                    .move_connection_to(&mut self.store, conn, position)?;
            }
        }
        Ok(())
    }

    /// Start dragging a block together with everything below it
    pub fn begin_drag(&mut self, block: BlockId) -> Result<()> {
        let upstream = self
            .store
            .block(block)
            .ok_or(ModelError::UnknownBlock(block))?
            .upstream_connection();
        if let Some(upstream) = upstream {
            if let Some(parent) = self.store.disconnect(upstream)? {
                tracing::debug!("Detached block {} from {}", block, parent);
            }
        }
        for id in self.store.descendants(block)? {
            self.store.set_drag_mode(id, true)?;
        }
        Ok(())
    }

    /// Move a block group by a delta
    pub fn drag_by(&mut self, block: BlockId, dx: i32, dy: i32) -> Result<()> {
        self.move_group(block, dx, dy)
    }

    /// Stop dragging and restore index order for the group
    pub fn end_drag(&mut self, block: BlockId) -> Result<()> {
        for id in self.store.descendants(block)? {
            self.store.set_drag_mode(id, false)?;
            for conn in self.block_connections(id)? {
                self.connections.remove_connection(&self.store, conn)?;
                self.connections.add_connection(&self.store, conn)?;
            }
        }
        Ok(())
    }

    /// The (block connection, target) pair the block would snap to if
    /// dropped now.
    ///
    /// Meant to be asked mid-drag, while the block's own group is masked
    /// out of the index.
    pub fn snap_target(&self, block: BlockId) -> Result<Option<(ConnectionId, ConnectionId)>> {
        Ok(self
            .connections
            .find_best_connection(&self.store, block, self.config.snap_radius)?)
    }

    /// Move a group so that `mine` sits on `theirs`, then connect them
    fn snap_to(&mut self, block: BlockId, mine: ConnectionId, theirs: ConnectionId) -> Result<()> {
        let target = self.connection(theirs)?.position;
        let source = self.connection(mine)?.position;
        self.move_group(block, target.x - source.x, target.y - source.y)?;
        self.connect(mine, theirs)
    }

    /// Push every other block group that overlaps `block`'s tree away.
    ///
    /// Returns the number of groups moved.
    pub fn bump_neighbours(&mut self, block: BlockId) -> Result<usize> {
        let root = self.store.root_block(block)?;
        let group: HashSet<_> = self.store.descendants(root)?.into_iter().collect();
        let mut bumped = HashSet::new();
        let mut neighbours = Vec::new();

        for id in self.store.descendants(root)? {
            for conn in self.block_connections(id)? {
                self.connections.get_neighbors(
                    &self.store,
                    conn,
                    self.config.snap_radius,
                    &mut neighbours,
                )?;
                for &neighbour in &neighbours {
                    let other_root = self.store.root_block(self.connection(neighbour)?.block)?;
                    if group.contains(&other_root) || !bumped.insert(other_root) {
                        continue;
                    }
                    self.bump_group(conn, neighbour, other_root)?;
                }
            }
        }
        Ok(bumped.len())
    }

    /// Move the group rooted at `root` so that `impinging` ends up clear
    /// of `fixed`
    fn bump_group(&mut self, fixed: ConnectionId, impinging: ConnectionId, root: BlockId) -> Result<()> {
        let fixed = self.connection(fixed)?.position;
        let impinging = self.connection(impinging)?.position;
        let distance = self.config.bump_distance;
        let dx = fixed.x + distance - impinging.x;
        let dy = fixed.y + distance * 2 - impinging.y;
        self.move_group(root, dx, dy)?;
        tracing::info!("Bumped block {} by ({}, {})", root, dx, dy);
        Ok(())
    }

    /// Finish a drag: snap to the best connection in range, then bump
    /// neighbours if enabled
    pub fn drop_block(&mut self, block: BlockId) -> Result<DropOutcome> {
        // Search before the group stops dragging so it cannot match itself
        let snapped = self.snap_target(block)?;
        self.end_drag(block)?;
        if let Some((mine, theirs)) = snapped {
            self.snap_to(block, mine, theirs)?;
        }
        let bumped = if self.config.bump_neighbours {
            self.bump_neighbours(block)?
        } else {
            0
        };
        Ok(DropOutcome { snapped, bumped })
    }
}

/// Error from workspace operations
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Block model error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Connection index error
    #[error(transparent)]
    Index(#[from] ConnectionManagerError),
}
