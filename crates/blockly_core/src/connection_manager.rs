// SPDX-License-Identifier: MIT OR Apache-2.0
//! Spatial index of every connection in a workspace.
//!
//! The manager keeps one [`YSortedList`] per connection type and answers the
//! questions a drag controller asks while a block moves:
//! - which free connection is nearest to a connector, for snapping
//! - which connections overlap a connector, for bumping
//!
//! It never owns blocks or connections. Every operation reads and writes the
//! block model through [`ConnectionModel`].

use crate::block::{Block, BlockId};
use crate::connection::{Connection, ConnectionId, ConnectionType, WorkspacePoint};
use crate::y_sorted_list::YSortedList;

/// Result type for connection manager operations
pub type Result<T> = std::result::Result<T, ConnectionManagerError>;

/// Read/write access to the connection and block records the index refers to
pub trait ConnectionModel {
    /// Get a connection by ID
    fn connection(&self, id: ConnectionId) -> Option<&Connection>;

    /// Get a mutable connection by ID
    fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection>;

    /// Get a block by ID
    fn block(&self, id: BlockId) -> Option<&Block>;
}

pub(crate) fn lookup<M: ConnectionModel + ?Sized>(model: &M, id: ConnectionId) -> Result<&Connection> {
    model
        .connection(id)
        .ok_or(ConnectionManagerError::UnknownConnection(id))
}

fn lookup_block<M: ConnectionModel + ?Sized>(model: &M, id: BlockId) -> Result<&Block> {
    model.block(id).ok_or(ConnectionManagerError::UnknownBlock(id))
}

/// Connections of one type are searched against the list of this type.
///
/// Kept separate from [`ConnectionType::opposite`]; a test checks that both
/// agree.
fn matching_type(connection_type: ConnectionType) -> ConnectionType {
    match connection_type {
        ConnectionType::Previous => ConnectionType::Next,
        ConnectionType::Next => ConnectionType::Previous,
        ConnectionType::Input => ConnectionType::Output,
        ConnectionType::Output => ConnectionType::Input,
    }
}

/// Spatial index over all connections of a workspace
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    /// One list per connection type, by [`ConnectionType::index`]
    lists: [YSortedList; 4],
}

impl ConnectionManager {
    /// Create a new empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// The list holding connections of `connection_type`
    pub fn list(&self, connection_type: ConnectionType) -> &YSortedList {
        &self.lists[connection_type.index()]
    }

    fn list_mut(&mut self, connection_type: ConnectionType) -> &mut YSortedList {
        &mut self.lists[connection_type.index()]
    }

    /// Number of indexed connections of a type
    pub fn size(&self, connection_type: ConnectionType) -> usize {
        self.list(connection_type).len()
    }

    /// Whether any list holds `id`
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lists.iter().any(|list| list.contains(id))
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(YSortedList::is_empty)
    }

    /// Index a connection under its type.
    ///
    /// Adding a connection that is already indexed is a bookkeeping bug in
    /// the caller and fails with [`ConnectionManagerError::DuplicateConnection`].
    pub fn add_connection<M: ConnectionModel + ?Sized>(&mut self, model: &M, id: ConnectionId) -> Result<()> {
        let connection_type = lookup(model, id)?.connection_type;
        self.list_mut(connection_type).add_connection(model, id)?;
        tracing::trace!("Indexed {:?} connection {}", connection_type, id);
        Ok(())
    }

    /// Drop a connection from the index. Absent connections are ignored.
    pub fn remove_connection<M: ConnectionModel + ?Sized>(&mut self, model: &M, id: ConnectionId) -> Result<()> {
        let connection_type = lookup(model, id)?.connection_type;
        if self.list_mut(connection_type).remove_connection(model, id)? {
            tracing::trace!("Removed {:?} connection {}", connection_type, id);
        }
        Ok(())
    }

    /// Move a connection and keep the index in step.
    ///
    /// A dragging connection only has its position updated; it is reindexed
    /// by a later move once dragging has stopped.
    pub fn move_connection_to<M: ConnectionModel + ?Sized>(
        &mut self,
        model: &mut M,
        id: ConnectionId,
        position: WorkspacePoint,
    ) -> Result<()> {
        let conn = lookup(model, id)?;
        if conn.position == position {
            return Ok(());
        }

        if conn.in_drag_mode() {
            set_position(model, id, position)?;
            return Ok(());
        }

        self.remove_connection(model, id)?;
        set_position(model, id, position)?;
        self.add_connection(model, id)
    }

    /// Empty every list
    pub fn clear(&mut self) {
        for list in &mut self.lists {
            list.clear();
        }
    }

    /// Nearest connection `id` may attach to within `max_radius`.
    ///
    /// A connection that is already connected never looks for a new match.
    pub fn closest_connection<M: ConnectionModel + ?Sized>(
        &self,
        model: &M,
        id: ConnectionId,
        max_radius: f64,
    ) -> Result<Option<ConnectionId>> {
        let conn = lookup(model, id)?;
        if conn.is_connected() {
            return Ok(None);
        }
        self.list(matching_type(conn.connection_type))
            .search_for_closest(model, id, max_radius)
    }

    /// Collect every connection within `max_radius` of `id` that should be
    /// considered when bumping blocks apart.
    ///
    /// `neighbours` is cleared first. Shadow blocks are not special here, and
    /// pairs where both sides are already connected are left out.
    pub fn get_neighbors<M: ConnectionModel + ?Sized>(
        &self,
        model: &M,
        id: ConnectionId,
        max_radius: f64,
        neighbours: &mut Vec<ConnectionId>,
    ) -> Result<()> {
        neighbours.clear();
        let connection_type = lookup(model, id)?.connection_type;
        self.list(matching_type(connection_type))
            .get_neighbours(model, id, max_radius, neighbours)
    }

    /// Whether `candidate` may be offered as a match for `moving`.
    ///
    /// Pairings that would need a disconnect first are accepted; whoever
    /// commits the connection has to perform that disconnect.
    pub fn is_connection_allowed<M: ConnectionModel + ?Sized>(
        model: &M,
        moving: ConnectionId,
        candidate: ConnectionId,
        max_radius: f64,
        allow_shadow_parent: bool,
    ) -> Result<bool> {
        Self::connection_allowed(
            model,
            lookup(model, moving)?,
            lookup(model, candidate)?,
            max_radius,
            allow_shadow_parent,
        )
    }

    pub(crate) fn connection_allowed<M: ConnectionModel + ?Sized>(
        model: &M,
        moving: &Connection,
        candidate: &Connection,
        max_radius: f64,
        allow_shadow_parent: bool,
    ) -> Result<bool> {
        if moving.distance_from(candidate) > max_radius {
            return Ok(false);
        }

        if !moving.can_connect_with_reason(candidate).is_offerable() {
            return Ok(false);
        }

        // An occupied Output or Previous would orphan its current parent link
        if matches!(
            candidate.connection_type,
            ConnectionType::Output | ConnectionType::Previous
        ) && candidate.is_connected()
        {
            return Ok(false);
        }

        if !allow_shadow_parent {
            let (parent, child) = if candidate.connection_type.is_parent_side() {
                (moving.block, candidate.block)
            } else {
                (candidate.block, moving.block)
            };
            if lookup_block(model, parent)?.shadow && !lookup_block(model, child)?.shadow {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// The closest (block connection, match) pair over all of a block's
    /// connections within `radius`.
    ///
    /// Every match found narrows the radius for the connections searched
    /// after it, so the result is the global minimum.
    pub fn find_best_connection<M: ConnectionModel + ?Sized>(
        &self,
        model: &M,
        block: BlockId,
        radius: f64,
    ) -> Result<Option<(ConnectionId, ConnectionId)>> {
        let block = lookup_block(model, block)?;
        let mut best = None;
        let mut best_radius = radius;

        for id in block.connections() {
            if let Some(found) = self.closest_connection(model, id, best_radius)? {
                best_radius = lookup(model, id)?.distance_from(lookup(model, found)?);
                best = Some((id, found));
            }
        }

        Ok(best)
    }
}

fn set_position<M: ConnectionModel + ?Sized>(model: &mut M, id: ConnectionId, position: WorkspacePoint) -> Result<()> {
    model
        .connection_mut(id)
        .ok_or(ConnectionManagerError::UnknownConnection(id))?
        .set_position(position.x, position.y);
    Ok(())
}

/// Error from the connection index
#[derive(Debug, thiserror::Error)]
pub enum ConnectionManagerError {
    /// The connection is already indexed
    #[error("Connection already indexed: {0}")]
    DuplicateConnection(ConnectionId),

    /// The model has no such connection
    #[error("Connection not found: {0}")]
    UnknownConnection(ConnectionId),

    /// The model has no such block
    #[error("Block not found: {0}")]
    UnknownBlock(BlockId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockDefinition, ConnectorDefinition, InputKind};
    use crate::store::BlockStore;

    struct Fixture {
        store: BlockStore,
        manager: ConnectionManager,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: BlockStore::new(),
                manager: ConnectionManager::new(),
            }
        }

        /// Add a block and index all of its connections
        fn add(&mut self, def: &BlockDefinition, x: i32, y: i32, shadow: bool) -> BlockId {
            let id = self.store.add_block(def, WorkspacePoint::new(x, y), shadow);
            let conns: Vec<_> = self.store.block(id).expect("just added").connections().collect();
            for conn in conns {
                self.manager.add_connection(&self.store, conn).expect("fresh connection");
            }
            id
        }

        fn block(&self, id: BlockId) -> &Block {
            self.store.block(id).expect("known block")
        }

        fn position(&self, id: ConnectionId) -> WorkspacePoint {
            self.store.connection(id).expect("known connection").position
        }
    }

    fn output_at(fx: &mut Fixture, x: i32, y: i32) -> ConnectionId {
        let id = fx.add(&BlockDefinition::value("value"), x, y, false);
        fx.block(id).output.expect("value has output")
    }

    fn input_block() -> BlockDefinition {
        BlockDefinition::new("slot").with_input("IN", InputKind::Value, ConnectorDefinition::at(0, 0))
    }

    #[test]
    fn test_matching_type_agrees_with_model() {
        for ty in ConnectionType::ALL {
            assert_eq!(matching_type(ty), ty.opposite());
        }
    }

    #[test]
    fn test_add_routes_by_type() {
        let mut fx = Fixture::new();
        fx.add(&BlockDefinition::statement("statement", 20), 0, 0, false);
        fx.add(&BlockDefinition::value("value"), 0, 0, false);

        assert_eq!(fx.manager.size(ConnectionType::Previous), 1);
        assert_eq!(fx.manager.size(ConnectionType::Next), 1);
        assert_eq!(fx.manager.size(ConnectionType::Output), 1);
        assert_eq!(fx.manager.size(ConnectionType::Input), 0);

        fx.manager.clear();
        assert!(fx.manager.is_empty());
    }

    #[test]
    fn test_round_trip_and_idempotent_remove() {
        let mut fx = Fixture::new();
        let conn = output_at(&mut fx, 3, 4);
        assert!(fx.manager.contains(conn));

        fx.manager.remove_connection(&fx.store, conn).expect("known");
        assert!(!fx.manager.contains(conn));
        fx.manager.remove_connection(&fx.store, conn).expect("absent is fine");
        assert_eq!(fx.manager.size(ConnectionType::Output), 0);
    }

    #[test]
    fn test_duplicate_add_fails() {
        let mut fx = Fixture::new();
        let conn = output_at(&mut fx, 0, 0);
        let err = fx.manager.add_connection(&fx.store, conn).expect_err("duplicate");
        assert!(matches!(err, ConnectionManagerError::DuplicateConnection(_)));
        assert_eq!(fx.manager.size(ConnectionType::Output), 1);
    }

    #[test]
    fn test_unknown_connection_propagates() {
        let mut fx = Fixture::new();
        let missing = ConnectionId::new();
        assert!(matches!(
            fx.manager.add_connection(&fx.store, missing),
            Err(ConnectionManagerError::UnknownConnection(id)) if id == missing
        ));
        assert!(fx.manager.closest_connection(&fx.store, missing, 10.0).is_err());
    }

    #[test]
    fn test_sorted_after_mixed_operations() {
        let mut fx = Fixture::new();
        let ids: Vec<_> = [50, 10, 30, 10, -5, 70, 30]
            .iter()
            .map(|&y| output_at(&mut fx, y % 7, y))
            .collect();
        for id in ids.iter().step_by(2) {
            fx.manager.remove_connection(&fx.store, *id).expect("known");
        }
        fx.manager
            .move_connection_to(&mut fx.store, ids[1], WorkspacePoint::new(0, 90))
            .expect("known");
        fx.manager
            .move_connection_to(&mut fx.store, ids[3], WorkspacePoint::new(0, -40))
            .expect("known");

        let list = fx.manager.list(ConnectionType::Output);
        let ys: Vec<_> = list.iter().map(|id| fx.position(id).y).collect();
        assert_eq!(ys, [-40, 70, 90]);
    }

    #[test]
    fn test_closest_connection() {
        let mut fx = Fixture::new();
        let outputs: Vec<_> = [0, 5, 10, 100].iter().map(|&y| output_at(&mut fx, 0, y)).collect();
        let slot = fx.add(&input_block(), 0, 6, false);
        let input = fx.block(slot).input("IN").expect("input");

        assert_eq!(fx.manager.closest_connection(&fx.store, input, 20.0).expect("known"), Some(outputs[1]));
        assert_eq!(fx.manager.closest_connection(&fx.store, input, 0.5).expect("known"), None);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut fx = Fixture::new();
        let outputs: Vec<_> = [0, 5, 50, 200].iter().map(|&y| output_at(&mut fx, 0, y)).collect();
        let slot = fx.add(&input_block(), 0, 6, false);
        let input = fx.block(slot).input("IN").expect("input");

        let found = fx.manager.closest_connection(&fx.store, input, 100.0).expect("known");
        assert_eq!(found, Some(outputs[1]));
        assert_eq!(found.map(|id| fx.position(id)), Some(WorkspacePoint::new(0, 5)));
    }

    #[test]
    fn test_connected_connection_finds_nothing() {
        let mut fx = Fixture::new();
        let near = output_at(&mut fx, 0, 1);
        let slot = fx.add(&input_block(), 0, 0, false);
        let input = fx.block(slot).input("IN").expect("input");
        let other = output_at(&mut fx, 500, 500);
        fx.store.connect(input, other).expect("connects");

        assert_eq!(fx.manager.closest_connection(&fx.store, input, 50.0).expect("known"), None);
        assert!(fx.manager.contains(near));
    }

    #[test]
    fn test_occupied_output_not_offered() {
        let mut fx = Fixture::new();
        let occupied = output_at(&mut fx, 0, 0);
        let holder = fx.add(&input_block(), 900, 900, false);
        let holder_input = fx.block(holder).input("IN").expect("input");
        fx.store.connect(holder_input, occupied).expect("connects");

        let slot = fx.add(&input_block(), 0, 2, false);
        let input = fx.block(slot).input("IN").expect("input");
        assert_eq!(fx.manager.closest_connection(&fx.store, input, 50.0).expect("known"), None);
    }

    #[test]
    fn test_occupied_input_is_offered() {
        let mut fx = Fixture::new();
        let parent = fx.add(&input_block(), 0, 0, false);
        let parent_input = fx.block(parent).input("IN").expect("input");
        let child = output_at(&mut fx, 800, 800);
        fx.store.connect(parent_input, child).expect("connects");

        let moving = output_at(&mut fx, 0, 3);
        assert_eq!(
            fx.manager.closest_connection(&fx.store, moving, 50.0).expect("known"),
            Some(parent_input)
        );
    }

    #[test]
    fn test_shadow_parent_rule() {
        let mut fx = Fixture::new();
        let statement = BlockDefinition::statement("statement", 20);
        let shadow = fx.add(&statement, 0, 0, true);
        let shadow_previous = fx.block(shadow).previous.expect("previous");
        // Next connector of the moving block sits two units above the shadow
        let moving = fx.add(&statement, 0, -22, false);
        let moving_next = fx.block(moving).next.expect("next");

        assert!(!ConnectionManager::is_connection_allowed(&fx.store, moving_next, shadow_previous, 50.0, false)
            .expect("known"));
        assert!(ConnectionManager::is_connection_allowed(&fx.store, moving_next, shadow_previous, 50.0, true)
            .expect("known"));

        assert_eq!(fx.manager.closest_connection(&fx.store, moving_next, 50.0).expect("known"), None);

        let mut neighbours = vec![ConnectionId::new()];
        fx.manager
            .get_neighbors(&fx.store, moving_next, 50.0, &mut neighbours)
            .expect("known");
        assert_eq!(neighbours, vec![shadow_previous]);
    }

    #[test]
    fn test_neighbours_skip_connected_pairs() {
        let mut fx = Fixture::new();
        let statement = BlockDefinition::statement("statement", 20);
        let a = fx.add(&statement, 0, 0, false);
        let b = fx.add(&statement, 0, 20, false);
        let a_next = fx.block(a).next.expect("next");
        let b_previous = fx.block(b).previous.expect("previous");
        // A loose block whose previous overlaps the stack's joint
        let c = fx.add(&statement, 3, 21, false);
        let c_previous = fx.block(c).previous.expect("previous");
        fx.store.connect(a_next, b_previous).expect("connects");

        let mut neighbours = Vec::new();
        fx.manager.get_neighbors(&fx.store, a_next, 10.0, &mut neighbours).expect("known");
        assert_eq!(neighbours, vec![c_previous]);
    }

    #[test]
    fn test_find_best_connection_takes_global_minimum() {
        let mut fx = Fixture::new();
        // Output first, next later in iteration order
        let def = BlockDefinition::value("value").with_next(ConnectorDefinition::at(0, 40));
        let moving = fx.add(&def, 0, 0, false);
        let moving_output = fx.block(moving).output.expect("output");
        let moving_next = fx.block(moving).next.expect("next");

        // Input 8 units from the output, previous 2 units from the next
        let slot = fx.add(&input_block(), 8, 0, false);
        let slot_input = fx.block(slot).input("IN").expect("input");
        let below = fx.add(&BlockDefinition::statement("statement", 20), 2, 40, false);
        let below_previous = fx.block(below).previous.expect("previous");

        assert_eq!(
            fx.manager.closest_connection(&fx.store, moving_output, 25.0).expect("known"),
            Some(slot_input)
        );
        assert_eq!(
            fx.manager.find_best_connection(&fx.store, moving, 25.0).expect("known"),
            Some((moving_next, below_previous))
        );
        assert_eq!(fx.manager.find_best_connection(&fx.store, moving, 1.0).expect("known"), None);
    }

    #[test]
    fn test_readd_after_drag_move_fails() {
        let mut fx = Fixture::new();
        let conn = output_at(&mut fx, 0, 0);
        fx.store.connection_mut(conn).expect("known").dragging = true;
        fx.manager
            .move_connection_to(&mut fx.store, conn, WorkspacePoint::new(0, 100))
            .expect("known");

        let err = fx.manager.add_connection(&fx.store, conn).expect_err("already indexed");
        assert!(matches!(err, ConnectionManagerError::DuplicateConnection(id) if id == conn));
        assert_eq!(fx.manager.size(ConnectionType::Output), 1);

        fx.manager.remove_connection(&fx.store, conn).expect("known");
        assert!(fx.manager.is_empty());
    }

    #[test]
    fn test_drag_moves_defer_reindexing() {
        let mut fx = Fixture::new();
        let ids: Vec<_> = [0, 10, 20].iter().map(|&y| output_at(&mut fx, 0, y)).collect();
        let dragged = ids[0];
        fx.store.connection_mut(dragged).expect("known").dragging = true;

        fx.manager
            .move_connection_to(&mut fx.store, dragged, WorkspacePoint::new(0, 15))
            .expect("known");
        let list = fx.manager.list(ConnectionType::Output);
        assert_eq!(list.get(0), Some(dragged));
        assert!(list.is_sorted());
        assert_eq!(fx.position(dragged), WorkspacePoint::new(0, 15));

        // Dropped: the next move goes through a full reindex
        fx.store.connection_mut(dragged).expect("known").dragging = false;
        fx.manager
            .move_connection_to(&mut fx.store, dragged, WorkspacePoint::new(0, 16))
            .expect("known");
        let order: Vec<_> = fx.manager.list(ConnectionType::Output).iter().collect();
        assert_eq!(order, vec![ids[1], dragged, ids[2]]);
    }

    #[test]
    fn test_move_to_same_position_is_noop() {
        let mut fx = Fixture::new();
        let conn = output_at(&mut fx, 4, 4);
        fx.manager
            .move_connection_to(&mut fx.store, conn, WorkspacePoint::new(4, 4))
            .expect("known");
        assert_eq!(fx.manager.size(ConnectionType::Output), 1);
    }
}
