//! Shipment status and its forward-only transition graph.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Where a shipment stands in its lifecycle.
///
/// Progress is forward-only: `Created → Accepted → InTransit → Delivered`,
/// with `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Submitted by the client, waiting for a carrier.
    Created,

    /// A carrier has taken the job.
    Accepted,

    /// Picked up and on the road.
    InTransit,

    /// Handed over at the destination. Terminal.
    Delivered,

    /// Withdrawn before delivery. Terminal.
    Cancelled,
}

/// Returned when a status string names no known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shipment status '{0}' (expected one of: CREATED, ACCEPTED, IN_TRANSIT, DELIVERED, CANCELLED)")]
pub struct UnknownStatus(pub String);

impl ShipmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::Accepted,
        Self::InTransit,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The state every new shipment starts in.
    pub const INITIAL: Self = Self::Created;

    /// Canonical name, as stored and displayed.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Accepted => "ACCEPTED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether `self → next` is an edge of the transition graph.
    ///
    /// Self-loops are not edges.
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (from, Self::Cancelled) => !from.is_terminal(),
            (Self::Created, Self::Accepted)
            | (Self::Accepted, Self::InTransit)
            | (Self::InTransit, Self::Delivered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = UnknownStatus;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
