//! Board model: fleet placement validation, shot resolution and defeat detection.
//!
//! Pure logic, no I/O. A `Board` only exists fully populated: the single way to
//! build one is `Board::validate_and_place`, so every board in a match already
//! satisfies the bounds, overlap and spacing rules.

use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::{Coord, PlacementError, ShotError};
use crate::config::Profile;
use crate::ship::{Orientation, Ship, ShipPlacement};

/// How a resolved shot landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotMark {
    Hit,
    Miss,
}

/// Result of `Board::apply_shot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotOutcome {
    pub coord: Coord,
    pub hit: bool,
    /// The hit ship has now taken as many hits as its length.
    pub sunk: bool,
    /// Every ship of the fleet is sunk.
    pub fleet_defeated: bool,
}

/// One cell of a board as shown to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Water,
    Ship,
    Hit,
    Miss,
}

/// Owner's view of a board: row-major cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub size: u8,
    pub cells: Vec<Cell>,
}

impl BoardView {
    pub fn cell(&self, coord: Coord) -> Option<Cell> {
        if !coord.in_bounds(self.size) {
            return None;
        }
        self.cells
            .get(coord.row as usize * self.size as usize + coord.col as usize)
            .copied()
    }
}

/// A player's grid with a placed fleet and the shots it has received.
#[derive(Debug, Clone)]
pub struct Board {
    size: u8,
    ships: Vec<Ship>,
    index: HashMap<Coord, usize>,
    shots: HashMap<Coord, ShotMark>,
    sunk: usize,
}

impl Board {
    /// Validate a fleet against `profile` and build the board.
    ///
    /// The ship lengths must equal the profile's list as a multiset. Ships are
    /// checked in request order: each must fit on the grid, must not reuse a
    /// cell of an earlier ship and must not touch one, diagonals included.
    pub fn validate_and_place(
        profile: &Profile,
        fleet: &[ShipPlacement],
    ) -> Result<Board, PlacementError> {
        let mut expected = profile.ship_lengths.clone();
        let mut got: Vec<u8> = fleet.iter().map(|s| s.length).collect();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        got.sort_unstable_by(|a, b| b.cmp(a));
        if expected != got {
            return Err(PlacementError::WrongFleet { expected, got });
        }

        let size = profile.board_size;
        let mut index = HashMap::with_capacity(profile.fleet_cells());
        let mut ships = Vec::with_capacity(fleet.len());
        for (id, placement) in fleet.iter().enumerate() {
            let cells = placement
                .cells(size)
                .ok_or(PlacementError::OutOfBounds { ship: id })?;
            check_spacing(&index, size, id, &cells)?;
            for cell in &cells {
                index.insert(*cell, id);
            }
            ships.push(Ship::new(id, placement.orientation, cells));
        }

        Ok(Board {
            size,
            ships,
            index,
            shots: HashMap::new(),
            sunk: 0,
        })
    }

    /// Resolve a shot fired at this board.
    ///
    /// A repeated coordinate is an error rather than a no-op; the board is
    /// left untouched in that case.
    pub fn apply_shot(&mut self, coord: Coord) -> Result<ShotOutcome, ShotError> {
        if !coord.in_bounds(self.size) {
            return Err(ShotError::OutOfBounds(coord));
        }
        if self.shots.contains_key(&coord) {
            return Err(ShotError::AlreadyShot(coord));
        }

        match self.index.get(&coord) {
            Some(&id) => {
                self.shots.insert(coord, ShotMark::Hit);
                let ship = &mut self.ships[id];
                ship.register_hit();
                let sunk = ship.is_sunk();
                if sunk {
                    self.sunk += 1;
                }
                Ok(ShotOutcome {
                    coord,
                    hit: true,
                    sunk,
                    fleet_defeated: self.all_sunk(),
                })
            }
            None => {
                self.shots.insert(coord, ShotMark::Miss);
                Ok(ShotOutcome {
                    coord,
                    hit: false,
                    sunk: false,
                    fleet_defeated: false,
                })
            }
        }
    }

    /// Generate a legal fleet for `profile`, in profile order.
    pub fn random_fleet<R: Rng>(
        rng: &mut R,
        profile: &Profile,
    ) -> Result<Vec<ShipPlacement>, PlacementError> {
        let size = profile.board_size;
        'restart: for _ in 0..100 {
            let mut index = HashMap::new();
            let mut fleet = Vec::with_capacity(profile.ship_lengths.len());
            for (id, &length) in profile.ship_lengths.iter().enumerate() {
                if length == 0 || length > size {
                    return Err(PlacementError::UnableToPlace);
                }
                let mut placed = false;
                for _ in 0..200 {
                    let orientation = if rng.random() {
                        Orientation::Horizontal
                    } else {
                        Orientation::Vertical
                    };
                    let (max_r, max_c) = match orientation {
                        Orientation::Horizontal => (size - 1, size - length),
                        Orientation::Vertical => (size - length, size - 1),
                    };
                    let anchor = Coord::new(rng.random_range(0..=max_r), rng.random_range(0..=max_c));
                    let placement = ShipPlacement::new(length, orientation, anchor);
                    let Some(cells) = placement.cells(size) else {
                        continue;
                    };
                    if check_spacing(&index, size, id, &cells).is_ok() {
                        for cell in cells {
                            index.insert(cell, id);
                        }
                        fleet.push(placement);
                        placed = true;
                        break;
                    }
                }
                if !placed {
                    continue 'restart;
                }
            }
            return Ok(fleet);
        }
        Err(PlacementError::UnableToPlace)
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Ship occupying `coord`, if any.
    pub fn ship_at(&self, coord: Coord) -> Option<&Ship> {
        self.index.get(&coord).map(|&id| &self.ships[id])
    }

    /// Outcome previously recorded at `coord`.
    pub fn shot_at(&self, coord: Coord) -> Option<ShotMark> {
        self.shots.get(&coord).copied()
    }

    pub fn shots_received(&self) -> usize {
        self.shots.len()
    }

    /// Returns `true` when all ships are sunk.
    pub fn all_sunk(&self) -> bool {
        self.sunk == self.ships.len()
    }

    /// Occupied cells according to the coordinate index.
    pub fn occupied_cells(&self) -> BTreeSet<Coord> {
        self.index.keys().copied().collect()
    }

    /// Render the board for its owner.
    pub fn view(&self) -> BoardView {
        let n = self.size as usize;
        let mut cells = vec![Cell::Water; n * n];
        for &coord in self.index.keys() {
            cells[coord.row as usize * n + coord.col as usize] = Cell::Ship;
        }
        for (&coord, mark) in &self.shots {
            cells[coord.row as usize * n + coord.col as usize] = match mark {
                ShotMark::Hit => Cell::Hit,
                ShotMark::Miss => Cell::Miss,
            };
        }
        BoardView {
            size: self.size,
            cells,
        }
    }
}

/// Reject `cells` if any of them is taken or touches a cell already in `index`.
fn check_spacing(
    index: &HashMap<Coord, usize>,
    size: u8,
    ship: usize,
    cells: &[Coord],
) -> Result<(), PlacementError> {
    for &cell in cells {
        if index.contains_key(&cell) {
            return Err(PlacementError::Overlap { ship, cell });
        }
        for dr in -1i16..=1 {
            for dc in -1i16..=1 {
                let r = cell.row as i16 + dr;
                let c = cell.col as i16 + dc;
                if r < 0 || c < 0 || r >= size as i16 || c >= size as i16 {
                    continue;
                }
                if index.contains_key(&Coord::new(r as u8, c as u8)) {
                    return Err(PlacementError::Adjacent { ship, cell });
                }
            }
        }
    }
    Ok(())
}
