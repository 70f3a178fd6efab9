// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (connector) definitions for the block model.

use crate::block::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a connector on its block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Top of a statement block
    Previous,
    /// Bottom of a statement block
    Next,
    /// Value or statement input slot
    Input,
    /// Left plug of a value block
    Output,
}

impl ConnectionType {
    /// Every connection type, in index order
    pub const ALL: [ConnectionType; 4] = [
        ConnectionType::Previous,
        ConnectionType::Next,
        ConnectionType::Input,
        ConnectionType::Output,
    ];

    /// Stable index of this type, usable for per-type tables
    pub fn index(self) -> usize {
        match self {
            Self::Previous => 0,
            Self::Next => 1,
            Self::Input => 2,
            Self::Output => 3,
        }
    }

    /// The type a connection of this type pairs with
    pub fn opposite(self) -> Self {
        match self {
            Self::Previous => Self::Next,
            Self::Next => Self::Previous,
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }

    /// Whether a connection of this type holds a child block when connected.
    ///
    /// Input and Next connections are parent side; Previous and Output
    /// connections attach their own block underneath a parent.
    pub fn is_parent_side(self) -> bool {
        matches!(self, Self::Input | Self::Next)
    }
}

/// Integer position in workspace coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspacePoint {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl WorkspacePoint {
    /// Create a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// This point shifted by a delta
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to another point
    pub fn distance_to(self, other: WorkspacePoint) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for WorkspacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Outcome of asking whether two connections may be paired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionCheck {
    /// The pair can be connected right away
    CanConnect,
    /// Both connections belong to the same block
    SelfConnection,
    /// The types are not opposites of each other
    WrongType,
    /// Type checks share no common name
    ChecksFailed,
    /// Compatible, but one side has to be disconnected first
    MustDisconnect,
    /// The child block already sits above the parent block
    WouldCycle,
}

impl ConnectionCheck {
    /// Whether a search may offer this pairing
    pub fn is_offerable(self) -> bool {
        matches!(self, Self::CanConnect | Self::MustDisconnect)
    }
}

/// A connector on a block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Role of this connector
    pub connection_type: ConnectionType,
    /// Owning block
    pub block: BlockId,
    /// Position in workspace coordinates
    pub position: WorkspacePoint,
    /// Connection this one is paired with
    pub target: Option<ConnectionId>,
    /// Whether the owning block is mid-drag
    pub dragging: bool,
    /// Accepted type-check names, `None` accepts anything
    pub checks: Option<Vec<String>>,
}

impl Connection {
    /// Create a new unconnected connection
    pub fn new(connection_type: ConnectionType, block: BlockId, position: WorkspacePoint) -> Self {
        Self {
            id: ConnectionId::new(),
            connection_type,
            block,
            position,
            target: None,
            dragging: false,
            checks: None,
        }
    }

    /// Set the type checks
    pub fn with_checks(mut self, checks: Option<Vec<String>>) -> Self {
        self.checks = checks;
        self
    }

    /// Whether this connection is paired with another
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    /// Whether the owning block is being dragged
    pub fn in_drag_mode(&self) -> bool {
        self.dragging
    }

    /// Move this connection
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.position = WorkspacePoint::new(x, y);
    }

    /// Euclidean distance to another connection
    pub fn distance_from(&self, other: &Connection) -> f64 {
        self.position.distance_to(other.position)
    }

    /// Whether the type checks of both sides overlap
    pub fn checks_match(&self, other: &Connection) -> bool {
        match (&self.checks, &other.checks) {
            (Some(mine), Some(theirs)) => mine.iter().any(|check| theirs.contains(check)),
            _ => true,
        }
    }

    /// Check whether this connection can pair with `target`
    pub fn can_connect_with_reason(&self, target: &Connection) -> ConnectionCheck {
        if self.block == target.block {
            return ConnectionCheck::SelfConnection;
        }
        if target.connection_type != self.connection_type.opposite() {
            return ConnectionCheck::WrongType;
        }
        if !self.checks_match(target) {
            return ConnectionCheck::ChecksFailed;
        }
        if self.is_connected() || target.is_connected() {
            return ConnectionCheck::MustDisconnect;
        }
        ConnectionCheck::CanConnect
    }

    /// Check if the pair can be connected without disconnecting anything
    pub fn can_connect(&self, target: &Connection) -> bool {
        self.can_connect_with_reason(target) == ConnectionCheck::CanConnect
    }
}
