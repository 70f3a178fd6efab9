// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block model and connection index for a Blockly-style visual editor.
//!
//! Blocks carry typed connectors (previous, next, input, output). While a
//! block is dragged, the editor has to find the nearest connector it may
//! snap to among potentially thousands of candidates, and afterwards push
//! overlapping blocks apart.
//!
//! ## Architecture
//!
//! - [`BlockStore`] owns blocks and connections, addressed by stable IDs
//! - [`ConnectionManager`] indexes every connection in y-sorted lists, one
//!   per connection type, and answers nearest-match and neighbour queries
//! - [`Workspace`] ties both together with a [`WorkspaceConfig`] and drives
//!   the drag, snap and bump lifecycle

pub mod block;
pub mod config;
pub mod connection;
pub mod connection_manager;
pub mod store;
pub mod workspace;
pub mod y_sorted_list;

pub use block::{Block, BlockDefinition, BlockId, BlockRegistry, InputKind};
pub use config::WorkspaceConfig;
pub use connection::{Connection, ConnectionCheck, ConnectionId, ConnectionType, WorkspacePoint};
pub use connection_manager::{ConnectionManager, ConnectionManagerError, ConnectionModel};
pub use store::{BlockStore, ModelError};
pub use workspace::{DropOutcome, Workspace, WorkspaceError};
pub use y_sorted_list::YSortedList;
