//! Application state: the profile and readings log shared by every screen.
//!
//! One `AppState` owns both records and is the only writer to the store. Screens get
//! a [`SharedAppState`] handle for reads and mutations, and can watch an
//! [`AppSnapshot`] channel instead of polling.

use crate::error::ValidationError;
use crate::model::{HealthReading, Measurement, ProfilePatch, ReadingKind, UserProfile};
use crate::store::{PersistentStore, RecordKey};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info};

/// Most-recent-first readings are capped at this many entries.
pub const READINGS_CAPACITY: usize = 50;

/// Placeholder shown for a reading type with no entries.
pub const NO_READING: &str = "--";

/// Point-in-time copy of the persisted state, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    pub profile: UserProfile,
    pub readings: Vec<HealthReading>,
}

/// Thread-safe handle passed to each view controller.
pub type SharedAppState = Arc<RwLock<AppState>>;

pub struct AppState {
    store: PersistentStore,
    profile: UserProfile,
    readings: Vec<HealthReading>,
    /// Session-only: a prescription script has been uploaded. Not persisted.
    script_uploaded: bool,
    events: watch::Sender<AppSnapshot>,
}

impl AppState {
    /// Load both records; absent or corrupt data yields the defaults
    /// (empty readings, un-onboarded profile).
    pub fn open(store: PersistentStore) -> Self {
        let profile = store.load_or(RecordKey::Profile, UserProfile::default());
        let mut readings: Vec<HealthReading> = store.load_or(RecordKey::Readings, Vec::new());
        readings.truncate(READINGS_CAPACITY);
        let (events, _) = watch::channel(AppSnapshot {
            profile: profile.clone(),
            readings: readings.clone(),
        });
        Self {
            store,
            profile,
            readings,
            script_uploaded: false,
            events,
        }
    }

    pub fn into_shared(self) -> SharedAppState {
        Arc::new(RwLock::new(self))
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Most recent first.
    pub fn readings(&self) -> &[HealthReading] {
        &self.readings
    }

    pub fn needs_onboarding(&self) -> bool {
        !self.profile.onboarded
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            profile: self.profile.clone(),
            readings: self.readings.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AppSnapshot> {
        self.events.subscribe()
    }

    /// Merge a partial update. Persists and notifies only when something changed,
    /// so repeating a patch is a no-op.
    pub fn set_profile(&mut self, patch: &ProfilePatch) {
        if patch.apply_to(&mut self.profile) {
            self.persist_profile();
            self.publish();
        }
    }

    /// Gate for leaving onboarding. A blank name leaves the state untouched.
    pub fn complete_onboarding(&mut self) -> Result<(), ValidationError> {
        if self.profile.onboarded {
            return Ok(());
        }
        if self.profile.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.profile.onboarded = true;
        info!(province = %self.profile.province, "onboarding complete");
        self.persist_profile();
        self.publish();
        Ok(())
    }

    /// Prepend and keep the newest [`READINGS_CAPACITY`]. The value is stored as given.
    pub fn add_reading(&mut self, reading: HealthReading) {
        self.readings.insert(0, reading);
        self.readings.truncate(READINGS_CAPACITY);
        if let Err(e) = self.store.save(RecordKey::Readings, &self.readings) {
            error!(error = %e, "failed to persist readings");
        }
        self.publish();
    }

    pub fn latest_reading(&self, kind: ReadingKind) -> Option<&HealthReading> {
        self.readings.iter().find(|r| r.kind == kind)
    }

    /// Latest value as display text, or [`NO_READING`].
    pub fn latest_value(&self, kind: ReadingKind) -> String {
        self.latest_reading(kind)
            .map(|r| r.value.clone())
            .unwrap_or_else(|| NO_READING.to_string())
    }

    /// Up to `limit` most recent parseable weight readings, oldest first, for charting.
    pub fn weight_series(&self, limit: usize) -> Vec<(DateTime<Utc>, f64)> {
        let mut series: Vec<(DateTime<Utc>, f64)> = self
            .readings
            .iter()
            .filter(|r| r.kind == ReadingKind::Weight)
            .filter_map(|r| match r.measurement() {
                Some(Measurement::Scalar(v)) => Some((r.date, v)),
                _ => None,
            })
            .take(limit)
            .collect();
        series.reverse();
        series
    }

    pub fn script_uploaded(&self) -> bool {
        self.script_uploaded
    }

    /// Only the fact of the upload is kept; the file itself is never read or stored.
    pub fn mark_script_uploaded(&mut self) {
        self.script_uploaded = true;
    }

    fn persist_profile(&self) {
        if let Err(e) = self.store.save(RecordKey::Profile, &self.profile) {
            error!(error = %e, "failed to persist profile");
        }
    }

    fn publish(&self) {
        // No receivers is fine; the snapshot is still retained for later subscribers.
        self.events.send_replace(self.snapshot());
    }
}
