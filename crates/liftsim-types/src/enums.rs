//! Enumeration types for elevator state.
//!
//! Status, direction, and door state are each one tagged enum. They are
//! serialized by variant name over JSON and stored as the same names in
//! `PostgreSQL`, so no layer ever interprets a bare number.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a stored or transmitted name matches no variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Elevator status
// ---------------------------------------------------------------------------

/// Operational status of an elevator.
///
/// `Idle` covers both "parked with doors closed" and "waiting with doors
/// open"; the [`DoorStatus`] tells the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ElevatorStatus {
    /// Not travelling and not cycling the doors.
    Idle,
    /// Travelling towards a higher floor.
    MovingUp,
    /// Travelling towards a lower floor.
    MovingDown,
    /// Stopped at a floor while the doors open.
    OpeningDoors,
    /// Stopped at a floor while the doors close.
    ClosingDoors,
}

impl ElevatorStatus {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Idle,
        Self::MovingUp,
        Self::MovingDown,
        Self::OpeningDoors,
        Self::ClosingDoors,
    ];

    /// Stable name used for storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::MovingUp => "MovingUp",
            Self::MovingDown => "MovingDown",
            Self::OpeningDoors => "OpeningDoors",
            Self::ClosingDoors => "ClosingDoors",
        }
    }

    /// Direction of travel while moving; [`Direction::None`] otherwise.
    pub const fn heading(self) -> Direction {
        match self {
            Self::MovingUp => Direction::Up,
            Self::MovingDown => Direction::Down,
            Self::Idle | Self::OpeningDoors | Self::ClosingDoors => Direction::None,
        }
    }

    /// The moving status that corresponds to a travel direction.
    ///
    /// [`Direction::None`] maps to [`ElevatorStatus::Idle`].
    pub const fn moving(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::MovingUp,
            Direction::Down => Self::MovingDown,
            Direction::None => Self::Idle,
        }
    }
}

impl fmt::Display for ElevatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElevatorStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "ElevatorStatus",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Committed direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Direction {
    /// Serving floors above the current one.
    Up,
    /// Serving floors below the current one.
    Down,
    /// No committed direction.
    None,
}

impl Direction {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 3] = [Self::Up, Self::Down, Self::None];

    /// Stable name used for storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::None => "None",
        }
    }

    /// Direction that leads from `from` to `to`, or `None` when equal.
    pub const fn between(from: u32, to: u32) -> Self {
        if to > from {
            Self::Up
        } else if to < from {
            Self::Down
        } else {
            Self::None
        }
    }

    /// The neighbouring floor in this direction, clamped to `0..=top`.
    pub fn step(self, floor: u32, top: u32) -> u32 {
        match self {
            Self::Up => floor.saturating_add(1).min(top),
            Self::Down => floor.saturating_sub(1).min(top),
            Self::None => floor.min(top),
        }
    }

    /// Whether `floor` lies ahead of (or at) `current` in this direction.
    ///
    /// Every floor counts as ahead for [`Direction::None`].
    pub const fn is_ahead(self, current: u32, floor: u32) -> bool {
        match self {
            Self::Up => floor >= current,
            Self::Down => floor <= current,
            Self::None => true,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "Direction",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Door status
// ---------------------------------------------------------------------------

/// Physical state of the cab doors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DoorStatus {
    /// Fully closed; the cab may move.
    Closed,
    /// Opening; counts ticks towards the open duration.
    Opening,
    /// Fully open; passengers board and alight.
    Open,
    /// Closing; counts ticks towards the close duration.
    Closing,
}

impl DoorStatus {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 4] = [Self::Closed, Self::Opening, Self::Open, Self::Closing];

    /// Stable name used for storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::Opening => "Opening",
            Self::Open => "Open",
            Self::Closing => "Closing",
        }
    }
}

impl fmt::Display for DoorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoorStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "DoorStatus",
                value: s.to_owned(),
            })
    }
}
