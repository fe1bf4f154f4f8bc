//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity has a strongly-typed ID so a call id can never be passed
//! where an elevator id is expected. All IDs use UUID v7 (time-ordered):
//! sorting elevators by id gives the scheduler a stable processing order
//! that matches creation order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a building.
    BuildingId
}

define_id! {
    /// Unique identifier for the elevator of a building.
    ElevatorId
}

define_id! {
    /// Unique identifier for a call (hall request or in-cab selection).
    CallId
}

define_id! {
    /// Unique identifier for an assignment audit record.
    AssignmentId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let building = BuildingId::new();
        let elevator = ElevatorId::new();
        assert_ne!(building.into_inner(), Uuid::nil());
        assert_ne!(elevator.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_parses_from_display() {
        let id = CallId::new();
        let parsed: Result<CallId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = BuildingId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", id.into_inner()));
    }
}
