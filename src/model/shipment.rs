//! Shipment types: the record, the request that creates it, and the
//! filter and patch shapes storage understands.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Location, ShipmentStatus};

/// A consignment submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,

    /// Identity of the client who created the shipment. Never changes.
    pub client_id: String,

    pub description: String,
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub pickup: Location,

    /// Filled in at creation or later via `set_delivery`.
    pub delivery: Option<Location>,

    /// Opaque photo URIs, in submission order.
    pub photos: Vec<String>,

    pub policy_accepted: bool,
    pub status: ShipmentStatus,

    /// Weak reference to the trip carrying this shipment.
    pub trip_id: Option<Uuid>,

    pub created_at: Timestamp,
}

/// The payload a client submits to create a shipment.
///
/// Deliberately has no owner field: ownership comes from the caller identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShipment {
    pub description: String,
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub pickup: Location,
    pub delivery: Option<Location>,
    pub photos: Vec<String>,
    pub policy_accepted: bool,
}

impl NewShipment {
    /// Checks the request shape. Content policy is screened separately.
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("description is empty".to_string());
        }
        if !(self.weight_kg.is_finite() && self.weight_kg > 0.0) {
            return Err(format!("weight must be positive, got {}", self.weight_kg));
        }
        if !(self.volume_m3.is_finite() && self.volume_m3 > 0.0) {
            return Err(format!("volume must be positive, got {}", self.volume_m3));
        }
        self.pickup.validate().map_err(|e| format!("pickup: {e}"))?;
        if let Some(delivery) = &self.delivery {
            delivery.validate().map_err(|e| format!("delivery: {e}"))?;
        }
        Ok(())
    }

    /// Builds the stored record in its initial state.
    pub fn into_shipment(self, client_id: &str, created_at: Timestamp) -> Shipment {
        Shipment {
            id: Uuid::new_v4(),
            client_id: client_id.to_string(),
            description: self.description,
            weight_kg: self.weight_kg,
            volume_m3: self.volume_m3,
            pickup: self.pickup,
            delivery: self.delivery,
            photos: self.photos,
            policy_accepted: self.policy_accepted,
            status: ShipmentStatus::INITIAL,
            trip_id: None,
            created_at,
        }
    }
}

/// Selects shipments in `find_many`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentFilter {
    pub client_id: Option<String>,
    pub status: Option<ShipmentStatus>,
}

impl ShipmentFilter {
    pub fn owned_by(client_id: &str) -> Self {
        Self {
            client_id: Some(client_id.to_string()),
            status: None,
        }
    }
}

/// Partial update applied by `update`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentPatch {
    pub status: Option<ShipmentStatus>,
    pub trip_id: Option<Uuid>,
    pub delivery: Option<Location>,

    /// Precondition: the stored status must still be this one when the
    /// update is applied. Checked in the same transaction as the write.
    pub expected_status: Option<ShipmentStatus>,
}

impl ShipmentPatch {
    /// Whether the patch changes nothing. The precondition does not count.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.trip_id.is_none() && self.delivery.is_none()
    }
}
