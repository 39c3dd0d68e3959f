//! The shipment lifecycle service.
//!
//! Validates and screens new shipments, persists them, scopes reads to the
//! requester, and moves shipments through their status graph. Holds no
//! mutable state of its own: everything lives in the [`RecordStore`].
//!
//! Trust boundary: callers of [`ShipmentService::update_status`],
//! [`ShipmentService::assign_trip`], and [`ShipmentService::set_delivery`]
//! are assumed to be authorized by the request gateway in front of it.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Location, NewShipment, Shipment, ShipmentFilter, ShipmentPatch, ShipmentStatus};
use crate::policy::{ContentPolicy, Violation};
use crate::storage::{RecordStore, StorageError};

/// How `update_status` treats the requested transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionMode {
    /// Only edges of the status graph are accepted.
    #[default]
    Strict,

    /// Any status overwrites any other. Kept for clients that still rely on
    /// unconditional overwrites.
    Permissive,
}

impl fmt::Display for TransitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Permissive => f.write_str("permissive"),
        }
    }
}

/// Errors surfaced by the lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum ShipmentError {
    #[error("policy violation: {0}")]
    PolicyViolation(Violation),

    #[error("invalid shipment request: {0}")]
    InvalidRequest(String),

    #[error("shipment not found: {0}")]
    NotFound(Uuid),

    #[error("shipment {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: Uuid,
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("shipment {id} moved from {expected} to {actual} during the update; retry")]
    Conflict {
        id: Uuid,
        expected: ShipmentStatus,
        actual: ShipmentStatus,
    },

    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
}

impl ShipmentError {
    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StoreUnavailable(_))
    }
}

pub type Result<T> = core::result::Result<T, ShipmentError>;

/// Shipment lifecycle operations over a record store and a content policy.
pub struct ShipmentService<'a, S, P> {
    store: &'a S,
    policy: P,
    mode: TransitionMode,
}

impl<'a, S: RecordStore, P: ContentPolicy> ShipmentService<'a, S, P> {
    pub fn new(store: &'a S, policy: P, mode: TransitionMode) -> Self {
        Self {
            store,
            policy,
            mode,
        }
    }

    /// Creates a shipment owned by `requester_id`.
    ///
    /// Nothing is written if the request is malformed or the description
    /// violates the content policy.
    pub fn create(&self, request: NewShipment, requester_id: &str) -> Result<Shipment> {
        request.validate().map_err(ShipmentError::InvalidRequest)?;

        if let Some(violation) = self.policy.screen(&request.description) {
            tracing::warn!(
                requester = requester_id,
                keyword = %violation.keyword,
                "rejected shipment on content policy"
            );
            return Err(ShipmentError::PolicyViolation(violation));
        }

        let shipment = request.into_shipment(requester_id, Timestamp::now());
        self.store.insert(&shipment)?;

        tracing::info!(id = %shipment.id, requester = requester_id, "created shipment");
        Ok(shipment)
    }

    /// Lists the requester's shipments, oldest first, optionally by status.
    pub fn list_for_requester(
        &self,
        requester_id: &str,
        status: Option<ShipmentStatus>,
    ) -> Result<Vec<Shipment>> {
        let filter = ShipmentFilter {
            status,
            ..ShipmentFilter::owned_by(requester_id)
        };
        Ok(self.store.find_many(&filter)?)
    }

    /// Fetches a shipment the requester owns.
    ///
    /// Someone else's shipment is reported as not found, so ids cannot be
    /// probed.
    pub fn get_by_id(&self, id: Uuid, requester_id: &str) -> Result<Shipment> {
        match self.store.find_one(id)? {
            Some(shipment) if shipment.client_id == requester_id => Ok(shipment),
            _ => Err(ShipmentError::NotFound(id)),
        }
    }

    /// Moves a shipment to `new_status`.
    ///
    /// In strict mode the move must be an edge of the status graph, and the
    /// store re-checks the status it was validated against before writing.
    pub fn update_status(&self, id: Uuid, new_status: ShipmentStatus) -> Result<Shipment> {
        let current = self
            .store
            .find_one(id)?
            .ok_or(ShipmentError::NotFound(id))?;

        let strict = self.mode == TransitionMode::Strict;
        if strict && !current.status.can_transition_to(new_status) {
            tracing::warn!(%id, from = %current.status, to = %new_status, "rejected status transition");
            return Err(ShipmentError::IllegalTransition {
                id,
                from: current.status,
                to: new_status,
            });
        }

        let patch = ShipmentPatch {
            status: Some(new_status),
            expected_status: strict.then_some(current.status),
            ..ShipmentPatch::default()
        };
        let updated = match self.store.update(id, &patch) {
            Ok(Some(shipment)) => shipment,
            Ok(None) => return Err(ShipmentError::NotFound(id)),
            Err(StorageError::StatusConflict {
                expected, actual, ..
            }) => {
                tracing::warn!(%id, %expected, %actual, "status changed under a transition");
                return Err(ShipmentError::Conflict {
                    id,
                    expected,
                    actual,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(%id, from = %current.status, to = %new_status, "updated shipment status");
        Ok(updated)
    }

    /// Records which trip carries the shipment.
    pub fn assign_trip(&self, id: Uuid, trip_id: Uuid) -> Result<Shipment> {
        let patch = ShipmentPatch {
            trip_id: Some(trip_id),
            ..ShipmentPatch::default()
        };
        let updated = self.patch(id, &patch)?;
        tracing::info!(%id, %trip_id, "assigned shipment to trip");
        Ok(updated)
    }

    /// Sets or replaces the delivery location.
    pub fn set_delivery(&self, id: Uuid, delivery: Location) -> Result<Shipment> {
        delivery
            .validate()
            .map_err(|e| ShipmentError::InvalidRequest(format!("delivery: {e}")))?;
        let patch = ShipmentPatch {
            delivery: Some(delivery),
            ..ShipmentPatch::default()
        };
        self.patch(id, &patch)
    }

    fn patch(&self, id: Uuid, patch: &ShipmentPatch) -> Result<Shipment> {
        self.store
            .update(id, patch)?
            .ok_or(ShipmentError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use tempfile::TempDir;

    use crate::policy::KeywordDenylist;
    use crate::storage::Storage;

    use ShipmentStatus::*;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path().join("waybill.sqlite")).unwrap();
        (dir, storage)
    }

    fn service(storage: &Storage, mode: TransitionMode) -> ShipmentService<'_, Storage, KeywordDenylist> {
        ShipmentService::new(storage, KeywordDenylist::default(), mode)
    }

    fn request(description: &str) -> NewShipment {
        NewShipment {
            description: description.into(),
            weight_kg: 3.0,
            volume_m3: 0.02,
            pickup: Location {
                lat: 41.902,
                lng: 12.496,
                address: "Piazza Venezia, Rome".into(),
            },
            delivery: None,
            photos: vec![],
            policy_accepted: true,
        }
    }

    fn count_all(storage: &Storage) -> usize {
        storage.find_many(&ShipmentFilter::default()).unwrap().len()
    }

    #[test]
    fn create_clean_description_succeeds_in_initial_state() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);

        let shipment = svc
            .create(request("Fragile glassware, handle with care"), "alice")
            .unwrap();

        assert_eq!(shipment.status, ShipmentStatus::INITIAL);
        assert_eq!(shipment.client_id, "alice");
        assert_eq!(shipment.trip_id, None);
        assert_eq!(storage.find_one(shipment.id).unwrap().unwrap(), shipment);
    }

    #[test]
    fn create_denylisted_description_fails_without_writing() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);

        let err = svc
            .create(request("I need to ship a BOMB disposal kit"), "alice")
            .unwrap_err();

        assert!(matches!(&err, ShipmentError::PolicyViolation(v) if v.keyword == "bomb"));
        assert_eq!(count_all(&storage), 0);
    }

    #[test]
    fn create_rejects_every_keyword_in_any_case() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);

        for description in [
            "bomb",
            "Spare WEAPON parts",
            "no drugs allowed",
            "ExPlOsIvEs, lots",
            "bombastic poetry",
        ] {
            let err = svc.create(request(description), "alice").unwrap_err();
            assert!(
                matches!(err, ShipmentError::PolicyViolation(_)),
                "{description}"
            );
        }
        assert_eq!(count_all(&storage), 0);
    }

    #[test]
    fn create_malformed_request_fails_without_writing() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);

        let mut req = request("Books");
        req.weight_kg = -1.0;
        let err = svc.create(req, "alice").unwrap_err();

        assert!(matches!(err, ShipmentError::InvalidRequest(_)));
        assert_eq!(count_all(&storage), 0);
    }

    #[test]
    fn create_uses_pluggable_policy() {
        struct RejectAll;
        impl ContentPolicy for RejectAll {
            fn screen(&self, _: &str) -> Option<Violation> {
                Some(Violation {
                    keyword: "*".into(),
                })
            }
        }

        let (_dir, storage) = test_storage();
        let svc = ShipmentService::new(&storage, RejectAll, TransitionMode::Strict);

        let err = svc.create(request("Books"), "alice").unwrap_err();
        assert!(matches!(err, ShipmentError::PolicyViolation(_)));
    }

    #[test]
    fn list_returns_only_requesters_shipments() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        svc.create(request("Lamp"), "alice").unwrap();
        svc.create(request("Chair"), "bob").unwrap();
        svc.create(request("Desk"), "alice").unwrap();

        let alice = svc.list_for_requester("alice", None).unwrap();
        let bob = svc.list_for_requester("bob", None).unwrap();

        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|s| s.client_id == "alice"));
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].description, "Chair");
    }

    #[test]
    fn list_empty_history_is_empty() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);

        assert!(svc.list_for_requester("nobody", None).unwrap().is_empty());
    }

    #[test]
    fn list_filters_by_status() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let lamp = svc.create(request("Lamp"), "alice").unwrap();
        svc.create(request("Desk"), "alice").unwrap();
        svc.update_status(lamp.id, Cancelled).unwrap();

        let cancelled = svc.list_for_requester("alice", Some(Cancelled)).unwrap();

        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, lamp.id);
    }

    #[test]
    fn get_by_id_hides_other_owners() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();

        assert_eq!(svc.get_by_id(shipment.id, "alice").unwrap().id, shipment.id);
        let err = svc.get_by_id(shipment.id, "mallory").unwrap_err();
        assert!(matches!(err, ShipmentError::NotFound(id) if id == shipment.id));
    }

    #[test]
    fn update_status_missing_id_is_not_found() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Permissive);

        let err = svc.update_status(Uuid::new_v4(), Accepted).unwrap_err();

        assert!(matches!(err, ShipmentError::NotFound(_)));
        assert_eq!(count_all(&storage), 0);
    }

    #[test]
    fn strict_mode_walks_the_happy_path() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();

        for status in [Accepted, InTransit, Delivered] {
            let updated = svc.update_status(shipment.id, status).unwrap();
            assert_eq!(updated.status, status);
            assert_eq!(svc.get_by_id(shipment.id, "alice").unwrap().status, status);
        }
    }

    #[test]
    fn strict_mode_rejects_illegal_transition_without_writing() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();

        let err = svc.update_status(shipment.id, Delivered).unwrap_err();

        assert!(matches!(
            err,
            ShipmentError::IllegalTransition {
                from: Created,
                to: Delivered,
                ..
            }
        ));
        assert_eq!(svc.get_by_id(shipment.id, "alice").unwrap().status, Created);
    }

    #[test]
    fn strict_mode_keeps_terminal_states_terminal() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();
        svc.update_status(shipment.id, Cancelled).unwrap();

        let err = svc.update_status(shipment.id, Accepted).unwrap_err();
        assert!(matches!(err, ShipmentError::IllegalTransition { .. }));
    }

    #[test]
    fn permissive_mode_overwrites_any_status() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Permissive);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();

        for status in [Delivered, Created, Cancelled, InTransit, Accepted] {
            svc.update_status(shipment.id, status).unwrap();
            assert_eq!(svc.get_by_id(shipment.id, "alice").unwrap().status, status);
        }
    }

    #[test]
    fn assign_trip_sets_reference() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();
        let trip = Uuid::new_v4();

        let updated = svc.assign_trip(shipment.id, trip).unwrap();

        assert_eq!(updated.trip_id, Some(trip));
        assert_eq!(updated.client_id, "alice");
    }

    #[test]
    fn assign_trip_missing_id_is_not_found() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);

        let err = svc.assign_trip(Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ShipmentError::NotFound(_)));
    }

    #[test]
    fn set_delivery_validates_location() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();

        let bad = Location {
            lat: -100.0,
            lng: 0.0,
            address: "Somewhere".into(),
        };
        let err = svc.set_delivery(shipment.id, bad).unwrap_err();
        assert!(matches!(err, ShipmentError::InvalidRequest(_)));

        let good = Location {
            lat: 45.464,
            lng: 9.190,
            address: "Piazza del Duomo, Milan".into(),
        };
        let updated = svc.set_delivery(shipment.id, good.clone()).unwrap();
        assert_eq!(updated.delivery, Some(good));
    }

    /// Serves reads from a snapshot taken before another writer moved the
    /// shipment on; writes go to the real store.
    struct StaleReads<'a> {
        inner: &'a Storage,
        snapshot: Shipment,
    }

    impl RecordStore for StaleReads<'_> {
        fn insert(&self, shipment: &Shipment) -> crate::storage::Result<()> {
            self.inner.insert(shipment)
        }
        fn find_many(&self, filter: &ShipmentFilter) -> crate::storage::Result<Vec<Shipment>> {
            self.inner.find_many(filter)
        }
        fn find_one(&self, _: Uuid) -> crate::storage::Result<Option<Shipment>> {
            Ok(Some(self.snapshot.clone()))
        }
        fn update(&self, id: Uuid, patch: &ShipmentPatch) -> crate::storage::Result<Option<Shipment>> {
            self.inner.update(id, patch)
        }
    }

    #[test]
    fn strict_mode_rechecks_status_at_write_time() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Strict);
        let shipment = svc.create(request("Lamp"), "alice").unwrap();
        svc.update_status(shipment.id, Accepted).unwrap();
        let snapshot = svc.update_status(shipment.id, InTransit).unwrap();
        svc.update_status(shipment.id, Delivered).unwrap();

        // A second writer still sees IN_TRANSIT and tries to cancel.
        let stale = StaleReads {
            inner: &storage,
            snapshot,
        };
        let racing = ShipmentService::new(&stale, KeywordDenylist::default(), TransitionMode::Strict);
        let err = racing.update_status(shipment.id, Cancelled).unwrap_err();

        assert!(matches!(
            err,
            ShipmentError::Conflict {
                expected: InTransit,
                actual: Delivered,
                ..
            }
        ));
        assert!(err.is_client_error());
        assert_eq!(svc.get_by_id(shipment.id, "alice").unwrap().status, Delivered);
    }

    #[test]
    fn permissive_mode_ignores_stale_reads() {
        let (_dir, storage) = test_storage();
        let svc = service(&storage, TransitionMode::Permissive);
        let snapshot = svc.create(request("Lamp"), "alice").unwrap();
        svc.update_status(snapshot.id, Delivered).unwrap();

        let stale = StaleReads {
            inner: &storage,
            snapshot: snapshot.clone(),
        };
        let racing = ShipmentService::new(&stale, KeywordDenylist::default(), TransitionMode::Permissive);
        racing.update_status(snapshot.id, Cancelled).unwrap();

        assert_eq!(svc.get_by_id(snapshot.id, "alice").unwrap().status, Cancelled);
    }

    /// A store whose every call fails, counting inserts.
    struct DownStore {
        inserts: Cell<usize>,
    }

    impl RecordStore for DownStore {
        fn insert(&self, _: &Shipment) -> crate::storage::Result<()> {
            self.inserts.set(self.inserts.get() + 1);
            Err(StorageError::Corrupt("disk on fire".into()))
        }
        fn find_many(&self, _: &ShipmentFilter) -> crate::storage::Result<Vec<Shipment>> {
            Err(StorageError::Corrupt("disk on fire".into()))
        }
        fn find_one(&self, _: Uuid) -> crate::storage::Result<Option<Shipment>> {
            Err(StorageError::Corrupt("disk on fire".into()))
        }
        fn update(&self, _: Uuid, _: &ShipmentPatch) -> crate::storage::Result<Option<Shipment>> {
            Err(StorageError::Corrupt("disk on fire".into()))
        }
    }

    #[test]
    fn store_failures_propagate_as_server_errors() {
        let store = DownStore {
            inserts: Cell::new(0),
        };
        let svc = ShipmentService::new(&store, KeywordDenylist::default(), TransitionMode::Strict);

        let err = svc.create(request("Lamp"), "alice").unwrap_err();
        assert!(matches!(err, ShipmentError::StoreUnavailable(_)));
        assert!(!err.is_client_error());
        assert_eq!(store.inserts.get(), 1, "no retry");

        let err = svc.update_status(Uuid::new_v4(), Accepted).unwrap_err();
        assert!(matches!(err, ShipmentError::StoreUnavailable(_)));
    }

    #[test]
    fn policy_rejection_never_reaches_store() {
        let store = DownStore {
            inserts: Cell::new(0),
        };
        let svc = ShipmentService::new(&store, KeywordDenylist::default(), TransitionMode::Strict);

        let err = svc.create(request("weapons crate"), "alice").unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(store.inserts.get(), 0);
    }

    #[test]
    fn transition_mode_parses_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: TransitionMode,
        }
        let w: Wrapper = toml::from_str("mode = \"permissive\"").unwrap();
        assert_eq!(w.mode, TransitionMode::Permissive);
        assert_eq!(TransitionMode::default(), TransitionMode::Strict);
    }
}
