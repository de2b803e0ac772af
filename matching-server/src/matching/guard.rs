//! Session registry with per-trip serialization.
//!
//! The map lock is held only to look up, insert or remove a slot. Each slot
//! carries its own locks, so work on one trip never blocks another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::debug;

use crate::domain::TripId;

use super::session::MatchingSession;

/// Everything the engine keeps for one trip.
pub(crate) struct SessionSlot {
    /// Current session state. Status readers take this lock only briefly
    /// and never wait for an attempt to finish.
    pub(crate) session: RwLock<MatchingSession>,
    /// Held for the whole duration of a `find_match` call.
    pub(crate) in_flight: Arc<Mutex<()>>,
    cancel: watch::Sender<bool>,
}

impl SessionSlot {
    fn new(session: MatchingSession) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            session: RwLock::new(session),
            in_flight: Arc::new(Mutex::new(())),
            cancel,
        }
    }

    /// Receiver that observes cancellation of this trip.
    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    /// Wake any in-flight attempt loop.
    pub(crate) fn notify_cancelled(&self) {
        self.cancel.send_replace(true);
    }
}

/// Registry of matching sessions keyed by trip.
#[derive(Default)]
pub(crate) struct ConcurrencyGuard {
    slots: RwLock<HashMap<TripId, Arc<SessionSlot>>>,
}

impl ConcurrencyGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn get(&self, trip_id: &TripId) -> Option<Arc<SessionSlot>> {
        self.slots.read().await.get(trip_id).cloned()
    }

    /// Slot for `trip_id`, creating a fresh `Searching` session if absent.
    pub(crate) async fn get_or_create(&self, trip_id: &TripId, now: DateTime<Utc>) -> Arc<SessionSlot> {
        if let Some(slot) = self.get(trip_id).await {
            return slot;
        }

        let mut slots = self.slots.write().await;
        slots
            .entry(trip_id.clone())
            .or_insert_with(|| {
                debug!(trip_id = %trip_id, "session created");
                Arc::new(SessionSlot::new(MatchingSession::new(trip_id.clone(), now)))
            })
            .clone()
    }

    /// True if `slot` is still the registered slot for `trip_id`.
    pub(crate) async fn holds(&self, trip_id: &TripId, slot: &Arc<SessionSlot>) -> bool {
        self.slots
            .read()
            .await
            .get(trip_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    pub(crate) async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Number of sessions still searching.
    pub(crate) async fn active(&self) -> usize {
        let slots: Vec<Arc<SessionSlot>> = self.slots.read().await.values().cloned().collect();
        let mut active = 0;
        for slot in slots {
            if !slot.session.read().await.is_terminal() {
                active += 1;
            }
        }
        active
    }

    /// Drop sessions idle for at least `retention` before `now`.
    ///
    /// Slots with a search in flight, or whose session is locked at the time
    /// of the sweep, are kept until the next one.
    pub(crate) async fn evict_expired(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|trip_id, slot| {
            let Ok(_idle) = slot.in_flight.try_lock() else {
                return true;
            };
            let Ok(session) = slot.session.try_read() else {
                return true;
            };
            if !session.is_expired(now, retention) {
                return true;
            }
            if !session.is_terminal() {
                debug!(trip_id = %trip_id, attempts = session.attempts(), "abandoned session evicted");
            }
            false
        });
        before - slots.len()
    }
}
