//! Ship definitions: the placement a client submits and the placed ship the board tracks.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::common::Coord;

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One entry of a `submit_placement` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub length: u8,
    pub orientation: Orientation,
    pub anchor: Coord,
}

impl ShipPlacement {
    pub const fn new(length: u8, orientation: Orientation, anchor: Coord) -> Self {
        Self {
            length,
            orientation,
            anchor,
        }
    }

    /// Cells covered by the ship, or `None` if any of them leaves a `size`×`size` grid.
    pub fn cells(&self, size: u8) -> Option<Vec<Coord>> {
        if self.length == 0 {
            return None;
        }
        let mut cells = Vec::with_capacity(self.length as usize);
        for i in 0..self.length as u16 {
            let (r, c) = match self.orientation {
                Orientation::Horizontal => (self.anchor.row as u16, self.anchor.col as u16 + i),
                Orientation::Vertical => (self.anchor.row as u16 + i, self.anchor.col as u16),
            };
            if r >= size as u16 || c >= size as u16 {
                return None;
            }
            cells.push(Coord::new(r as u8, c as u8));
        }
        Some(cells)
    }
}

/// A ship placed on a board, with hits counted.
#[derive(Clone, PartialEq, Eq)]
pub struct Ship {
    id: usize,
    length: u8,
    orientation: Orientation,
    cells: Vec<Coord>,
    hits: u8,
}

impl Ship {
    /// Build a placed ship from already validated cells.
    pub(crate) fn new(id: usize, orientation: Orientation, cells: Vec<Coord>) -> Self {
        Ship {
            id,
            length: cells.len() as u8,
            orientation,
            cells,
            hits: 0,
        }
    }

    /// Register a hit on one of this ship's cells.
    pub(crate) fn register_hit(&mut self) {
        if self.hits < self.length {
            self.hits += 1;
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Occupied cells, ordered from the anchor outwards.
    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    pub fn hit_count(&self) -> u8 {
        self.hits
    }

    /// Check if the ship is sunk (all segments hit).
    pub fn is_sunk(&self) -> bool {
        self.hits == self.length
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ id: {}, length: {}, orientation: {:?}, anchor: {:?}, hits: {} }}",
            self.id,
            self.length,
            self.orientation,
            self.cells.first(),
            self.hits,
        )
    }
}
