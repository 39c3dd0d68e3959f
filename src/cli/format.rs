//! Output formatting for CLI display.

use uuid::Uuid;

use crate::model::Shipment;

/// First eight hex digits of an id, enough to type back as a prefix.
pub(super) fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// One-line summary for `shipment list`.
pub(super) fn format_shipment_line(shipment: &Shipment) -> String {
    let destination = shipment
        .delivery
        .as_ref()
        .map_or("?", |d| d.address.as_str());
    let trip = shipment
        .trip_id
        .map(|t| format!("  trip {}", short_id(t)))
        .unwrap_or_default();
    format!(
        "{}  [{}]  {} kg  {} → {}{trip}  {}",
        short_id(shipment.id),
        shipment.status,
        shipment.weight_kg,
        shipment.pickup.address,
        destination,
        shipment.description,
    )
}
