//! Shipment storage: insert, find, and patch shipment rows.

use rusqlite::{Connection, OptionalExtension, Row, ffi};
use uuid::Uuid;

use crate::model::{Location, Shipment, ShipmentFilter, ShipmentPatch, ShipmentStatus};

use super::{RecordStore, Result, Storage, StorageError};

const COLUMNS: &str = "id, client_id, description, weight_kg, volume_m3, \
     pickup_lat, pickup_lng, pickup_address, \
     delivery_lat, delivery_lng, delivery_address, \
     photos, policy_accepted, status, trip_id, created_at";

impl RecordStore for Storage {
    fn insert(&self, shipment: &Shipment) -> Result<()> {
        let (delivery_lat, delivery_lng, delivery_address) = split_location(shipment.delivery.as_ref());
        let photos = serde_json::to_string(&shipment.photos)?;
        let result = self.conn.execute(
            &format!(
                "INSERT INTO shipment ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            rusqlite::params![
                shipment.id.to_string(),
                &shipment.client_id,
                &shipment.description,
                shipment.weight_kg,
                shipment.volume_m3,
                shipment.pickup.lat,
                shipment.pickup.lng,
                &shipment.pickup.address,
                delivery_lat,
                delivery_lng,
                delivery_address,
                photos,
                shipment.policy_accepted,
                shipment.status.as_str(),
                shipment.trip_id.map(|t| t.to_string()),
                shipment.created_at.to_string(),
            ],
        );
        match result {
            Ok(_) => {
                tracing::debug!(id = %shipment.id, "inserted shipment row");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(StorageError::AlreadyExists(shipment.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_many(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM shipment
             WHERE (?1 IS NULL OR client_id = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![&filter.client_id, filter.status.map(ShipmentStatus::as_str)],
            ShipmentRow::read,
        )?;

        let mut shipments = Vec::new();
        for row in rows {
            shipments.push(row?.decode()?);
        }
        // Stable: ties keep insertion order.
        shipments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(shipments)
    }

    fn find_one(&self, id: Uuid) -> Result<Option<Shipment>> {
        find_row(&self.conn, id)
    }

    fn update(&self, id: Uuid, patch: &ShipmentPatch) -> Result<Option<Shipment>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(mut shipment) = find_row(&tx, id)? else {
            return Ok(None);
        };
        if let Some(expected) = patch.expected_status
            && shipment.status != expected
        {
            return Err(StorageError::StatusConflict {
                id,
                expected,
                actual: shipment.status,
            });
        }
        if patch.is_empty() {
            return Ok(Some(shipment));
        }

        if let Some(status) = patch.status {
            shipment.status = status;
        }
        if let Some(trip_id) = patch.trip_id {
            shipment.trip_id = Some(trip_id);
        }
        if let Some(delivery) = &patch.delivery {
            shipment.delivery = Some(delivery.clone());
        }

        let (delivery_lat, delivery_lng, delivery_address) = split_location(shipment.delivery.as_ref());
        tx.execute(
            "UPDATE shipment
             SET status = ?1, trip_id = ?2, delivery_lat = ?3, delivery_lng = ?4, delivery_address = ?5
             WHERE id = ?6",
            rusqlite::params![
                shipment.status.as_str(),
                shipment.trip_id.map(|t| t.to_string()),
                delivery_lat,
                delivery_lng,
                delivery_address,
                id.to_string(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(%id, ?patch, "updated shipment row");
        Ok(Some(shipment))
    }
}

fn find_row(conn: &Connection, id: Uuid) -> Result<Option<Shipment>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM shipment WHERE id = ?1"),
        [id.to_string()],
        ShipmentRow::read,
    )
    .optional()?
    .map(ShipmentRow::decode)
    .transpose()
}

/// Splits an optional location into its three nullable columns.
fn split_location(location: Option<&Location>) -> (Option<f64>, Option<f64>, Option<&str>) {
    match location {
        Some(l) => (Some(l.lat), Some(l.lng), Some(l.address.as_str())),
        None => (None, None, None),
    }
}

/// Raw column values, before parsing ids, timestamps, and enums.
struct ShipmentRow {
    id: String,
    client_id: String,
    description: String,
    weight_kg: f64,
    volume_m3: f64,
    pickup_lat: f64,
    pickup_lng: f64,
    pickup_address: String,
    delivery_lat: Option<f64>,
    delivery_lng: Option<f64>,
    delivery_address: Option<String>,
    photos: String,
    policy_accepted: bool,
    status: String,
    trip_id: Option<String>,
    created_at: String,
}

impl ShipmentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            client_id: row.get(1)?,
            description: row.get(2)?,
            weight_kg: row.get(3)?,
            volume_m3: row.get(4)?,
            pickup_lat: row.get(5)?,
            pickup_lng: row.get(6)?,
            pickup_address: row.get(7)?,
            delivery_lat: row.get(8)?,
            delivery_lng: row.get(9)?,
            delivery_address: row.get(10)?,
            photos: row.get(11)?,
            policy_accepted: row.get(12)?,
            status: row.get(13)?,
            trip_id: row.get(14)?,
            created_at: row.get(15)?,
        })
    }

    fn decode(self) -> Result<Shipment> {
        let id = self
            .id
            .parse::<Uuid>()
            .map_err(|e| StorageError::Corrupt(format!("invalid shipment id: {e}")))?;
        let status = self
            .status
            .parse::<ShipmentStatus>()
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        let trip_id = self
            .trip_id
            .map(|t| t.parse::<Uuid>())
            .transpose()
            .map_err(|e| StorageError::Corrupt(format!("invalid trip id: {e}")))?;
        let created_at = self
            .created_at
            .parse::<jiff::Timestamp>()
            .map_err(|e| StorageError::Corrupt(format!("invalid created_at: {e}")))?;
        let photos: Vec<String> = serde_json::from_str(&self.photos)
            .map_err(|e| StorageError::Corrupt(format!("invalid photos: {e}")))?;

        let delivery = match (self.delivery_lat, self.delivery_lng, self.delivery_address) {
            (Some(lat), Some(lng), Some(address)) => Some(Location { lat, lng, address }),
            (None, None, None) => None,
            _ => {
                return Err(StorageError::Corrupt(format!(
                    "shipment {id} has a partial delivery location"
                )));
            }
        };

        Ok(Shipment {
            id,
            client_id: self.client_id,
            description: self.description,
            weight_kg: self.weight_kg,
            volume_m3: self.volume_m3,
            pickup: Location {
                lat: self.pickup_lat,
                lng: self.pickup_lng,
                address: self.pickup_address,
            },
            delivery,
            photos,
            policy_accepted: self.policy_accepted,
            status,
            trip_id,
            created_at,
        })
    }
}
