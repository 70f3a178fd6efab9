// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arena of blocks and connections.

use crate::block::{Block, BlockDefinition, BlockId, BlockInput, ConnectorDefinition};
use crate::connection::{Connection, ConnectionCheck, ConnectionId, ConnectionType, WorkspacePoint};
use crate::connection_manager::ConnectionModel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Owns every block and connection record of a workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockStore {
    /// Blocks by ID
    blocks: IndexMap<BlockId, Block>,
    /// Connections by ID
    connections: IndexMap<ConnectionId, Connection>,
}

impl BlockStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            blocks: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }

    /// Instantiate a definition at `position`.
    ///
    /// Connections are placed at the block origin plus their offsets.
    pub fn add_block(
        &mut self,
        definition: &BlockDefinition,
        position: WorkspacePoint,
        shadow: bool,
    ) -> BlockId {
        let id = BlockId::new();
        let output = definition
            .output
            .as_ref()
            .map(|c| self.create_connection(id, ConnectionType::Output, position, c));
        let previous = definition
            .previous
            .as_ref()
            .map(|c| self.create_connection(id, ConnectionType::Previous, position, c));
        let inputs = definition
            .inputs
            .iter()
            .map(|input| BlockInput {
                name: input.name.clone(),
                kind: input.kind,
                connection: self.create_connection(
                    id,
                    input.kind.connection_type(),
                    position,
                    &input.connector,
                ),
            })
            .collect();
        let next = definition
            .next
            .as_ref()
            .map(|c| self.create_connection(id, ConnectionType::Next, position, c));

        self.blocks.insert(
            id,
            Block {
                id,
                definition: definition.name.clone(),
                position,
                shadow,
                output,
                previous,
                next,
                inputs,
            },
        );
        id
    }

    fn create_connection(
        &mut self,
        block: BlockId,
        connection_type: ConnectionType,
        origin: WorkspacePoint,
        connector: &ConnectorDefinition,
    ) -> ConnectionId {
        let position = origin.offset(connector.offset.x, connector.offset.y);
        let connection =
            Connection::new(connection_type, block, position).with_checks(connector.checks.clone());
        let id = connection.id;
        self.connections.insert(id, connection);
        id
    }

    /// Remove a block, disconnecting all of its connections first
    pub fn remove_block(&mut self, block_id: BlockId) -> Result<Block, ModelError> {
        let ids: Vec<_> = self.block_ref(block_id)?.connections().collect();
        for id in &ids {
            self.disconnect(*id)?;
        }
        for id in &ids {
            self.connections.swap_remove(id);
        }
        self.blocks
            .swap_remove(&block_id)
            .ok_or(ModelError::UnknownBlock(block_id))
    }

    /// Get a block by ID
    pub fn block(&self, block_id: BlockId) -> Option<&Block> {
        self.blocks.get(&block_id)
    }

    /// Get a mutable block by ID
    pub fn block_mut(&mut self, block_id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&block_id)
    }

    fn block_ref(&self, block_id: BlockId) -> Result<&Block, ModelError> {
        self.blocks
            .get(&block_id)
            .ok_or(ModelError::UnknownBlock(block_id))
    }

    /// Get all blocks
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Get the number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get a mutable connection by ID
    pub fn connection_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&connection_id)
    }

    fn connection_ref(&self, connection_id: ConnectionId) -> Result<&Connection, ModelError> {
        self.connections
            .get(&connection_id)
            .ok_or(ModelError::UnknownConnection(connection_id))
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Pair two free, compatible connections
    pub fn connect(&mut self, a: ConnectionId, b: ConnectionId) -> Result<(), ModelError> {
        let reason = self
            .connection_ref(a)?
            .can_connect_with_reason(self.connection_ref(b)?);
        if reason != ConnectionCheck::CanConnect {
            return Err(ModelError::IncompatibleConnections { a, b, reason });
        }
        if self.would_cycle(a, b)? {
            return Err(ModelError::IncompatibleConnections {
                a,
                b,
                reason: ConnectionCheck::WouldCycle,
            });
        }

        if let Some(conn) = self.connections.get_mut(&a) {
            conn.target = Some(b);
        }
        if let Some(conn) = self.connections.get_mut(&b) {
            conn.target = Some(a);
        }
        Ok(())
    }

    /// Whether pairing `a` with `b` would hang a block underneath itself.
    ///
    /// True when the block on the child side is the parent-side block or
    /// one of its ancestors.
    pub fn would_cycle(&self, a: ConnectionId, b: ConnectionId) -> Result<bool, ModelError> {
        let a = self.connection_ref(a)?;
        let b = self.connection_ref(b)?;
        let (parent, child) = if a.connection_type.is_parent_side() {
            (a.block, b.block)
        } else {
            (b.block, a.block)
        };

        let mut current = Some(parent);
        while let Some(block) = current {
            if block == child {
                return Ok(true);
            }
            current = self.parent_block(block)?;
        }
        Ok(false)
    }

    /// Unpair a connection from its target.
    ///
    /// Returns the former target, or `None` if it was not connected.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Result<Option<ConnectionId>, ModelError> {
        let conn = self
            .connections
            .get_mut(&connection_id)
            .ok_or(ModelError::UnknownConnection(connection_id))?;
        let Some(target) = conn.target.take() else {
            return Ok(None);
        };
        if let Some(other) = self.connections.get_mut(&target) {
            other.target = None;
        }
        Ok(Some(target))
    }

    /// The block this block is attached underneath, if any
    pub fn parent_block(&self, block_id: BlockId) -> Result<Option<BlockId>, ModelError> {
        let Some(upstream) = self.block_ref(block_id)?.upstream_connection() else {
            return Ok(None);
        };
        match self.connection_ref(upstream)?.target {
            Some(target) => Ok(Some(self.connection_ref(target)?.block)),
            None => Ok(None),
        }
    }

    /// The top-most ancestor of a block (the block itself if unparented)
    pub fn root_block(&self, block_id: BlockId) -> Result<BlockId, ModelError> {
        let mut current = block_id;
        while let Some(parent) = self.parent_block(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// A block followed by every block hanging off its inputs and next
    pub fn descendants(&self, block_id: BlockId) -> Result<Vec<BlockId>, ModelError> {
        let mut result = Vec::new();
        let mut stack = vec![block_id];
        while let Some(current) = stack.pop() {
            result.push(current);
            let block = self.block_ref(current)?;
            // Reverse so that children come out in connection order
            let children: Vec<_> = block.child_connections().collect();
            for conn in children.into_iter().rev() {
                if let Some(target) = self.connection_ref(conn)?.target {
                    stack.push(self.connection_ref(target)?.block);
                }
            }
        }
        Ok(result)
    }

    /// Mark every connection of a block as dragging or not
    pub fn set_drag_mode(&mut self, block_id: BlockId, dragging: bool) -> Result<(), ModelError> {
        let ids: Vec<_> = self.block_ref(block_id)?.connections().collect();
        for id in ids {
            if let Some(conn) = self.connections.get_mut(&id) {
                conn.dragging = dragging;
            }
        }
        Ok(())
    }
}

impl ConnectionModel for BlockStore {
    fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }
}

/// Error from the block model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Block not found
    #[error("Block not found: {0}")]
    UnknownBlock(BlockId),

    /// Connection not found
    #[error("Connection not found: {0}")]
    UnknownConnection(ConnectionId),

    /// Definition not registered
    #[error("Block definition not registered: {0}")]
    UnknownDefinition(String),

    /// The pair cannot be connected
    #[error("Cannot connect {a} to {b}: {reason:?}")]
    IncompatibleConnections {
        /// First connection
        a: ConnectionId,
        /// Second connection
        b: ConnectionId,
        /// Why the pairing was refused
        reason: ConnectionCheck,
    },
}
