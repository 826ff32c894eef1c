//! Common types for the match server: grid coordinates and the rejection taxonomy.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::game::Phase;
use crate::protocol::ErrorCode;

/// A cell on the grid, 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Whether the coordinate lies on a `size`×`size` grid.
    pub fn in_bounds(&self, size: u8) -> bool {
        self.row < size && self.col < size
    }

    /// Chebyshev distance; two cells with distance 1 touch, diagonals included.
    pub fn chebyshev(&self, other: &Coord) -> u8 {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        dr.max(dc)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(u8, u8)> for Coord {
    fn from((row, col): (u8, u8)) -> Self {
        Coord { row, col }
    }
}

/// Errors returned when a submitted fleet is not legal for the match profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Ship lengths do not match the profile's list as a multiset.
    WrongFleet { expected: Vec<u8>, got: Vec<u8> },
    /// Ship at this index leaves the grid.
    OutOfBounds { ship: usize },
    /// Ship at this index reuses a cell of an earlier ship.
    Overlap { ship: usize, cell: Coord },
    /// Ship at this index touches another ship (8-neighbourhood).
    Adjacent { ship: usize, cell: Coord },
    /// Random placement gave up.
    UnableToPlace,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::WrongFleet { expected, got } => write!(
                f,
                "Fleet does not match the required ship lengths: expected {:?}, got {:?}",
                expected, got
            ),
            PlacementError::OutOfBounds { ship } => {
                write!(f, "Ship #{} does not fit on the board", ship)
            }
            PlacementError::Overlap { ship, cell } => {
                write!(f, "Ship #{} overlaps another ship at {}", ship, cell)
            }
            PlacementError::Adjacent { ship, cell } => {
                write!(f, "Ship #{} touches another ship at {}", ship, cell)
            }
            PlacementError::UnableToPlace => write!(f, "Unable to place fleet"),
        }
    }
}

impl std::error::Error for PlacementError {}

/// Errors returned by `Board::apply_shot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotError {
    OutOfBounds(Coord),
    AlreadyShot(Coord),
}

impl fmt::Display for ShotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShotError::OutOfBounds(c) => write!(f, "Shot at {} is outside the board", c),
            ShotError::AlreadyShot(c) => write!(f, "Cell {} was already shot", c),
        }
    }
}

impl std::error::Error for ShotError {}

/// Requests that are well-formed but not allowed right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    VersionMismatch { expected: u32, got: u32 },
    InvalidName,
    AlreadyJoined,
    NotJoined,
    WrongPhase(Phase),
    NotYourTurn,
    AlreadyReady,
    RestartAlreadyRequested,
    NoRestartPending,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::VersionMismatch { expected, got } => write!(
                f,
                "Protocol version mismatch: expected {}, got {}",
                expected, got
            ),
            ProtocolError::InvalidName => write!(f, "Player name must be 1 to 24 characters"),
            ProtocolError::AlreadyJoined => write!(f, "Already joined this match"),
            ProtocolError::NotJoined => write!(f, "Join the match first"),
            ProtocolError::WrongPhase(phase) => {
                write!(f, "Request not allowed while the match is in {:?}", phase)
            }
            ProtocolError::NotYourTurn => write!(f, "Not your turn"),
            ProtocolError::AlreadyReady => write!(f, "Fleet already placed"),
            ProtocolError::RestartAlreadyRequested => write!(f, "Restart already requested"),
            ProtocolError::NoRestartPending => write!(f, "No restart request to decline"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Everything the match can refuse. Only the offending connection hears about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Protocol(ProtocolError),
    Placement(PlacementError),
    Shot(ShotError),
}

impl Rejection {
    /// Wire code reported in the `error` message.
    pub fn code(&self) -> ErrorCode {
        match self {
            Rejection::Protocol(ProtocolError::VersionMismatch { .. }) => ErrorCode::VersionMismatch,
            Rejection::Protocol(ProtocolError::InvalidName) => ErrorCode::InvalidName,
            Rejection::Protocol(ProtocolError::NotYourTurn) => ErrorCode::NotYourTurn,
            Rejection::Protocol(_) => ErrorCode::ProtocolViolation,
            Rejection::Placement(_) => ErrorCode::InvalidPlacement,
            Rejection::Shot(ShotError::OutOfBounds(_)) => ErrorCode::ShotOutOfBounds,
            Rejection::Shot(ShotError::AlreadyShot(_)) => ErrorCode::AlreadyShot,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Protocol(e) => e.fmt(f),
            Rejection::Placement(e) => e.fmt(f),
            Rejection::Shot(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Rejection {}

impl From<ProtocolError> for Rejection {
    fn from(err: ProtocolError) -> Self {
        Rejection::Protocol(err)
    }
}

impl From<PlacementError> for Rejection {
    fn from(err: PlacementError) -> Self {
        Rejection::Placement(err)
    }
}

impl From<ShotError> for Rejection {
    fn from(err: ShotError) -> Self {
        Rejection::Shot(err)
    }
}
