//! Registry of live telemetry objects.
//!
//! Pure in-memory state: routes messages to per-entity objects (creating
//! them on first sight), evicts objects whose expiry has passed, and hands
//! out read-only snapshots. Produces `ObjectEvent`s for the caller to forward
//! to whatever tracks object existence (UI, webhook, log).
//!
//! All state sits behind one mutex. Message rates are low, and a single lock
//! makes look-up-or-create-then-apply atomic per object id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::message::TelemetryMessage;
use crate::object::{StateObserver, TelemetryObject};
use crate::types::*;

/// Name reported when something tries to delete the registry itself.
pub const ROOT_NAME: &str = "telemetry root";

// ---------------------------------------------------------------------------
// Object events (output)
// ---------------------------------------------------------------------------

/// Lifecycle events for observers of object existence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ObjectEvent {
    /// First message for this id; the object now exists.
    Created {
        object_id: ObjectId,
        kind: &'static str,
        timestamp: Timestamp,
    },
    /// A message was applied to an existing object.
    Updated {
        object_id: ObjectId,
        timestamp: Timestamp,
    },
    /// The object went stale and was evicted.
    Expired {
        object_id: ObjectId,
        timestamp: Timestamp,
    },
}

impl ObjectEvent {
    pub fn object_id(&self) -> &str {
        match self {
            ObjectEvent::Created { object_id, .. }
            | ObjectEvent::Updated { object_id, .. }
            | ObjectEvent::Expired { object_id, .. } => object_id,
        }
    }
}

/// Counters since the registry was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub resident: usize,
    pub received: u64,
    pub rejected: u64,
    pub created: u64,
    pub expired: u64,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Inner {
    objects: HashMap<ObjectId, Box<dyn TelemetryObject>>,
    received: u64,
    rejected: u64,
    created: u64,
    expired: u64,
}

/// Owns every telemetry object of one session.
///
/// Dropping the registry drops all its objects.
pub struct TelemetryRegistry {
    inner: Mutex<Inner>,
    observer: Arc<dyn StateObserver>,
}

impl TelemetryRegistry {
    /// `observer` is handed to every object the registry constructs.
    pub fn new(observer: Arc<dyn StateObserver>) -> Self {
        TelemetryRegistry {
            inner: Mutex::new(Inner {
                objects: HashMap::new(),
                received: 0,
                rejected: 0,
                created: 0,
                expired: 0,
            }),
            observer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Objects never panic mid-update while holding the lock, so a
        // poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Route a message to its object, constructing the object on first sight.
    ///
    /// A rejected message leaves the registry untouched: no object is
    /// created and the existing object (if any) is unchanged.
    pub fn receive(&self, message: &TelemetryMessage) -> Result<ObjectEvent> {
        let mut inner = self.lock();
        inner.received += 1;

        let result = Self::apply(&mut inner, message, &self.observer);
        match &result {
            Ok(ObjectEvent::Created { object_id, kind, .. }) => {
                inner.created += 1;
                debug!(object_id = %object_id, kind, "new telemetry object");
            }
            Ok(_) => {}
            Err(e) => {
                inner.rejected += 1;
                warn!(kind = message.kind(), error = %e, "rejected telemetry message");
            }
        }
        result
    }

    fn apply(
        inner: &mut Inner,
        message: &TelemetryMessage,
        observer: &Arc<dyn StateObserver>,
    ) -> Result<ObjectEvent> {
        message.validate()?;
        let object_id = message.object_id();
        let timestamp = message.timestamp();

        if let Some(obj) = inner.objects.get_mut(&object_id) {
            obj.receive(message)?;
            return Ok(ObjectEvent::Updated {
                object_id,
                timestamp,
            });
        }

        let mut obj = (message.object_constructor())(object_id.clone(), Arc::clone(observer));
        obj.receive(message)?;
        let kind = obj.kind();
        inner.objects.insert(object_id.clone(), obj);
        Ok(ObjectEvent::Created {
            object_id,
            kind,
            timestamp,
        })
    }

    /// Evict every object whose expiry is at or before `now`.
    ///
    /// Returns the evicted ids, sorted. The whole pass runs under the lock,
    /// so objects created after it starts are not considered.
    pub fn sweep_expired(&self, now: Timestamp) -> Vec<ObjectId> {
        let mut inner = self.lock();
        let mut expired: Vec<ObjectId> = inner
            .objects
            .iter()
            .filter(|(_, obj)| obj.expiry() <= now)
            .map(|(k, _)| k.clone())
            .collect();
        expired.sort();

        for id in &expired {
            inner.objects.remove(id);
        }
        inner.expired += expired.len() as u64;

        if !expired.is_empty() {
            info!(count = expired.len(), resident = inner.objects.len(), "evicted stale telemetry objects");
        }
        expired
    }

    /// Snapshot of every resident object, most recently heard first.
    ///
    /// This includes objects whose expiry has passed but which no sweep has
    /// evicted yet. Use `list_active` for the live, non-expired view.
    pub fn list_objects(&self) -> Vec<ObjectSnapshot> {
        let inner = self.lock();
        let mut snapshots: Vec<ObjectSnapshot> =
            inner.objects.values().map(|obj| obj.snapshot()).collect();
        sort_recent_first(&mut snapshots);
        snapshots
    }

    /// Snapshot of every resident, non-expired object as of `now`, most
    /// recently heard first. This is the registry's listing operation;
    /// callers never see an object past its expiry, swept or not.
    pub fn list_active(&self, now: Timestamp) -> Vec<ObjectSnapshot> {
        let inner = self.lock();
        let mut snapshots: Vec<ObjectSnapshot> = inner
            .objects
            .values()
            .filter(|obj| obj.expiry() > now)
            .map(|obj| obj.snapshot())
            .collect();
        sort_recent_first(&mut snapshots);
        snapshots
    }

    pub fn get(&self, object_id: &str) -> Option<ObjectSnapshot> {
        self.lock().objects.get(object_id).map(|obj| obj.snapshot())
    }

    pub fn contains(&self, object_id: &str) -> bool {
        self.lock().objects.contains_key(object_id)
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.lock();
        RegistryStats {
            resident: inner.objects.len(),
            received: inner.received,
            rejected: inner.rejected,
            created: inner.created,
            expired: inner.expired,
        }
    }

    /// Handle an external request to delete `target` (an object id, or the
    /// registry itself when `None`).
    ///
    /// Objects leave the registry only by expiring, so this always fails
    /// with `IllegalDeletion` and changes nothing.
    pub fn request_deletion(&self, target: Option<&str>) -> Result<()> {
        let target = target.unwrap_or(ROOT_NAME).to_string();
        warn!(target = %target, "refused deletion of managed telemetry entity");
        Err(TelemetryError::IllegalDeletion(target))
    }
}

fn sort_recent_first(snapshots: &mut [ObjectSnapshot]) {
    snapshots.sort_by(|a, b| {
        b.last_heard
            .partial_cmp(&a.last_heard)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
