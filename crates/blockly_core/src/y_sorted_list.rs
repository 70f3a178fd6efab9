// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connections of a single type, kept sorted by their y coordinate.
//!
//! Entries remember the y they were indexed at. For connections that are
//! not dragging this always equals the live position. A dragging
//! connection may move without being re-sorted; its entry then keeps the
//! stale y so that the list itself never goes out of order, and it is
//! skipped as a search candidate until it is reindexed.

use crate::connection::{Connection, ConnectionId};
use crate::connection_manager::{lookup, ConnectionManager, ConnectionManagerError, ConnectionModel};

/// Result type for list operations
pub type Result<T> = std::result::Result<T, ConnectionManagerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    /// y at the time of insertion
    y: i32,
    id: ConnectionId,
}

/// Connections sorted ascending by y. Order among equal y is unspecified.
#[derive(Debug, Clone, Default)]
pub struct YSortedList {
    entries: Vec<Entry>,
}

impl YSortedList {
    /// Create a new empty list
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of connections in the list
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Connection at `index`
    pub fn get(&self, index: usize) -> Option<ConnectionId> {
        self.entries.get(index).map(|entry| entry.id)
    }

    /// Whether the list holds `id`
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Connections in list order
    pub fn iter(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }

    /// Whether indexed y values are non-decreasing
    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|pair| pair[0].y <= pair[1].y)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Index at which `id` could be inserted without breaking y order.
    ///
    /// Stops at the first exact y match, which may be anywhere inside a
    /// run of equal y values.
    pub fn find_position_for_connection<M: ConnectionModel + ?Sized>(
        &self,
        model: &M,
        id: ConnectionId,
    ) -> Result<usize> {
        Ok(self.find_position_for_y(lookup(model, id)?.position.y))
    }

    fn find_position_for_y(&self, y: i32) -> usize {
        let mut min = 0;
        let mut max = self.entries.len();
        while min < max {
            let mid = (min + max) / 2;
            let mid_y = self.entries[mid].y;
            if mid_y < y {
                min = mid + 1;
            } else if mid_y > y {
                max = mid;
            } else {
                return mid;
            }
        }
        min
    }

    /// Index of `id` within the run of entries indexed at `y`
    fn find_in_run(&self, y: i32, id: ConnectionId) -> Option<usize> {
        let start = self.find_position_for_y(y);

        let mut index = start;
        while index < self.entries.len() && self.entries[index].y == y {
            if self.entries[index].id == id {
                return Some(index);
            }
            index += 1;
        }

        let mut index = start;
        while index > 0 {
            index -= 1;
            if self.entries[index].y != y {
                break;
            }
            if self.entries[index].id == id {
                return Some(index);
            }
        }
        None
    }

    /// Insert a connection at its live y.
    ///
    /// Fails with [`ConnectionManagerError::DuplicateConnection`] if the
    /// connection is already indexed; the list is left untouched.
    pub fn add_connection<M: ConnectionModel + ?Sized>(
        &mut self,
        model: &M,
        id: ConnectionId,
    ) -> Result<()> {
        let conn = lookup(model, id)?;
        let y = conn.position.y;
        // A dragging connection may still be indexed at an older y
        let present = self.find_in_run(y, id).is_some() || (conn.in_drag_mode() && self.contains(id));
        if present {
            return Err(ConnectionManagerError::DuplicateConnection(id));
        }
        let index = self.find_position_for_y(y);
        self.entries.insert(index, Entry { y, id });
        debug_assert!(self.is_sorted());
        Ok(())
    }

    /// Remove a connection. Returns `false` if it was not in the list.
    pub fn remove_connection<M: ConnectionModel + ?Sized>(
        &mut self,
        model: &M,
        id: ConnectionId,
    ) -> Result<bool> {
        let y = lookup(model, id)?.position.y;
        // A connection moved while dragging is still indexed at its old y
        let index = self
            .find_in_run(y, id)
            .or_else(|| self.entries.iter().position(|entry| entry.id == id));
        match index {
            Some(index) => {
                self.entries.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Nearest connection that `id` may connect to within `max_radius`.
    ///
    /// Scans outward in both directions at once; every match found tightens
    /// the vertical band for both scans.
    pub fn search_for_closest<M: ConnectionModel + ?Sized>(
        &self,
        model: &M,
        id: ConnectionId,
        max_radius: f64,
    ) -> Result<Option<ConnectionId>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let conn = lookup(model, id)?;
        let y = conn.position.y;
        let start = self.find_position_for_y(y);

        let mut best: Option<ConnectionId> = None;
        let mut best_radius = max_radius;
        let mut lower = start;
        let mut upper = start;
        let mut scan_down = true;
        let mut scan_up = true;

        while scan_down || scan_up {
            if scan_down {
                if lower > 0 && in_y_range(self.entries[lower - 1].y, y, best_radius) {
                    lower -= 1;
                    self.consider(model, conn, lower, &mut best, &mut best_radius)?;
                } else {
                    scan_down = false;
                }
            }
            if scan_up {
                if upper < self.entries.len() && in_y_range(self.entries[upper].y, y, best_radius) {
                    self.consider(model, conn, upper, &mut best, &mut best_radius)?;
                    upper += 1;
                } else {
                    scan_up = false;
                }
            }
        }

        Ok(best)
    }

    fn consider<M: ConnectionModel + ?Sized>(
        &self,
        model: &M,
        conn: &Connection,
        index: usize,
        best: &mut Option<ConnectionId>,
        best_radius: &mut f64,
    ) -> Result<()> {
        let candidate = lookup(model, self.entries[index].id)?;
        if candidate.in_drag_mode() {
            return Ok(());
        }
        if ConnectionManager::connection_allowed(model, conn, candidate, *best_radius, false)? {
            *best = Some(candidate.id);
            *best_radius = conn.distance_from(candidate);
        }
        Ok(())
    }

    /// Collect every connection within `max_radius` that `id` could
    /// overlap with, for bumping.
    ///
    /// Shadow parents are allowed and pairs where both sides are already
    /// connected are skipped.
    pub fn get_neighbours<M: ConnectionModel + ?Sized>(
        &self,
        model: &M,
        id: ConnectionId,
        max_radius: f64,
        neighbours: &mut Vec<ConnectionId>,
    ) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let conn = lookup(model, id)?;
        let y = conn.position.y;
        let start = self.find_position_for_y(y);

        let mut collect = |index: usize| -> Result<()> {
            let candidate = lookup(model, self.entries[index].id)?;
            if candidate.in_drag_mode() || (conn.is_connected() && candidate.is_connected()) {
                return Ok(());
            }
            if ConnectionManager::connection_allowed(model, conn, candidate, max_radius, true)? {
                neighbours.push(candidate.id);
            }
            Ok(())
        };

        let mut index = start;
        while index > 0 && in_y_range(self.entries[index - 1].y, y, max_radius) {
            index -= 1;
            collect(index)?;
        }

        let mut index = start;
        while index < self.entries.len() && in_y_range(self.entries[index].y, y, max_radius) {
            collect(index)?;
            index += 1;
        }
        Ok(())
    }
}

fn in_y_range(entry_y: i32, y: i32, radius: f64) -> bool {
    f64::from(entry_y.abs_diff(y)) <= radius
}
