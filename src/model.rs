//! Core data model for waybill.
//!
//! Shipments, their lifecycle status, and the request and patch shapes
//! that flow between the CLI, the lifecycle service, and storage.

mod location;
mod shipment;
mod status;

pub use location::Location;
pub use shipment::{NewShipment, Shipment, ShipmentFilter, ShipmentPatch};
pub use status::ShipmentStatus;
