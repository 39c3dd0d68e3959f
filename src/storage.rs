//! Local persistence for shipments.
//!
//! All shipments live in one `SQLite` database:
//!
//! ```text
//! ~/.waybill/waybill.sqlite
//!   shipment    # one row per shipment, status constrained to the lifecycle
//! ```
//!
//! The lifecycle service talks to storage only through [`RecordStore`].

mod shipment;

use std::{fs, path::PathBuf};

use rusqlite::Connection;
use uuid::Uuid;

use crate::model::{Shipment, ShipmentFilter, ShipmentPatch, ShipmentStatus};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("shipment already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("shipment {id} is {actual}, expected {expected}")]
    StatusConflict {
        id: Uuid,
        expected: ShipmentStatus,
        actual: ShipmentStatus,
    },

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Durable keyed storage for shipments.
///
/// Every call is atomic and immediately visible to the next one.
pub trait RecordStore {
    /// Appends a new record.
    fn insert(&self, shipment: &Shipment) -> Result<()>;

    /// Returns matching records, oldest first.
    fn find_many(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>>;

    /// Looks up one record by id.
    fn find_one(&self, id: Uuid) -> Result<Option<Shipment>>;

    /// Applies a partial update and returns the updated record,
    /// or `None` if no record has that id.
    ///
    /// Fails with [`StorageError::StatusConflict`] and writes nothing when
    /// the patch's `expected_status` no longer matches.
    fn update(&self, id: Uuid, patch: &ShipmentPatch) -> Result<Option<Shipment>>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS shipment (
        id               TEXT PRIMARY KEY NOT NULL,
        client_id        TEXT NOT NULL,
        description      TEXT NOT NULL,
        weight_kg        REAL NOT NULL,
        volume_m3        REAL NOT NULL,
        pickup_lat       REAL NOT NULL,
        pickup_lng       REAL NOT NULL,
        pickup_address   TEXT NOT NULL,
        delivery_lat     REAL,
        delivery_lng     REAL,
        delivery_address TEXT,
        photos           TEXT NOT NULL DEFAULT '[]',
        policy_accepted  INTEGER NOT NULL CHECK (policy_accepted IN (0, 1)),
        status           TEXT NOT NULL
            CHECK (status IN ('CREATED', 'ACCEPTED', 'IN_TRANSIT', 'DELIVERED', 'CANCELLED')),
        trip_id          TEXT,
        created_at       TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS shipment_client_id ON shipment (client_id);
";

/// `SQLite`-backed record store.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the database at `path` and applies the schema.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        tracing::debug!(path = %path.display(), "opened shipment store");
        Self::with_connection(conn)
    }

    /// Returns the default database path: `~/.waybill/waybill.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".waybill").join("waybill.sqlite"))
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}
