//! Geofence registry: owns the monitored set and turns crossings into
//! notification events.
//!
//! Display order is insertion order. Lookups by id are O(1). Transition
//! handling never mutates state, so duplicate or out-of-order deliveries
//! are harmless.

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::types::{Added, Geofence, GeofenceError, NotificationEvent, TransitionKind};
use crate::monitor::{AuthorizationStatus, CircularRegion, LocationMonitor};

struct Entry {
    geofence: Geofence,
    monitored: bool,
}

pub struct GeofenceRegistry<M> {
    monitor: M,
    order: Vec<String>,
    entries: HashMap<String, Entry>,
}

impl<M: LocationMonitor> GeofenceRegistry<M> {
    pub fn new(monitor: M) -> Self {
        Self {
            monitor,
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    /// Register a geofence with the monitor and append it.
    ///
    /// The radius is clamped to the monitor's maximum. Missing `Always`
    /// authorization does not block the add; it comes back as
    /// [`Added::warning`].
    pub fn add(&mut self, mut geofence: Geofence) -> Result<Added, GeofenceError> {
        if !self.monitor.is_monitoring_available() {
            return Err(GeofenceError::UnsupportedPlatform);
        }
        if !geofence.center.is_valid() {
            return Err(GeofenceError::InvalidCoordinate {
                lat: geofence.center.lat,
                lon: geofence.center.lon,
            });
        }
        if !(geofence.radius.is_finite() && geofence.radius > 0.0) {
            return Err(GeofenceError::InvalidRadius(geofence.radius));
        }
        if self.entries.contains_key(geofence.id()) {
            return Err(GeofenceError::DuplicateId(geofence.id().to_string()));
        }

        let max = self.monitor.max_monitoring_radius();
        let clamped = geofence.radius > max;
        if clamped {
            debug!(id = geofence.id(), requested = geofence.radius, max, "radius clamped");
            geofence.radius = max;
        }

        let status = self.monitor.authorization_status();
        let warning = if status != AuthorizationStatus::Always {
            warn!(id = geofence.id(), %status, "geofence saved; activates once location access is granted");
            Some(GeofenceError::PermissionPending(status))
        } else {
            None
        };

        self.monitor.start_monitoring(CircularRegion::from(&geofence))?;

        let id = geofence.id().to_string();
        let radius = geofence.radius;
        info!(
            id = %id,
            center = %geofence.center,
            radius,
            trigger = %geofence.trigger_on,
            "geofence added: {}",
            geofence.title()
        );
        self.order.push(id.clone());
        self.entries.insert(
            id.clone(),
            Entry {
                geofence,
                monitored: true,
            },
        );

        Ok(Added {
            id,
            radius,
            clamped,
            warning,
        })
    }

    /// Deregister and drop a geofence.
    pub fn remove(&mut self, id: &str) -> Result<Geofence, GeofenceError> {
        let entry = self
            .entries
            .remove(id)
            .ok_or_else(|| GeofenceError::NotFound(id.to_string()))?;
        self.order.retain(|o| o != id);
        if entry.monitored {
            self.monitor.stop_monitoring(id);
        }
        info!(id, "geofence removed: {}", entry.geofence.title());
        Ok(entry.geofence)
    }

    /// Translate a raw crossing into a notification event.
    ///
    /// Unknown or stopped regions and mismatched triggers yield `None`.
    pub fn handle_transition(&self, region_id: &str, kind: TransitionKind) -> Option<NotificationEvent> {
        let Some(entry) = self.entries.get(region_id) else {
            warn!(region = region_id, %kind, "transition for unknown region ignored");
            return None;
        };
        if !entry.monitored {
            debug!(region = region_id, %kind, "transition for stopped region ignored");
            return None;
        }
        if !entry.geofence.trigger_on.matches(kind) {
            debug!(
                region = region_id,
                %kind,
                trigger = %entry.geofence.trigger_on,
                "transition does not match trigger"
            );
            return None;
        }

        Some(NotificationEvent {
            geofence_id: region_id.to_string(),
            note: entry.geofence.note.clone(),
            kind,
            at: Utc::now(),
        })
    }

    /// Stop every region the monitor is watching, including ones this
    /// registry did not add. The in-memory list is kept.
    pub fn stop_all(&mut self) -> usize {
        let regions = self.monitor.monitored_regions();
        for id in &regions {
            self.monitor.stop_monitoring(id);
        }
        for entry in self.entries.values_mut() {
            entry.monitored = false;
        }
        info!(stopped = regions.len(), "stopped monitoring all regions");
        regions.len()
    }

    /// Re-register every stopped geofence, in display order.
    ///
    /// Stops at the first monitor failure. Geofences resumed before it stay
    /// monitored; the failing one and those after it stay stopped, so a later
    /// call picks up where this one left off.
    pub fn resume_all(&mut self) -> Result<usize, GeofenceError> {
        if !self.monitor.is_monitoring_available() {
            return Err(GeofenceError::UnsupportedPlatform);
        }
        let mut resumed = 0;
        for id in &self.order {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            if entry.monitored {
                continue;
            }
            if let Err(e) = self.monitor.start_monitoring(CircularRegion::from(&entry.geofence)) {
                warn!(id = %id, resumed, error = %e, "resume stopped");
                return Err(e.into());
            }
            entry.monitored = true;
            resumed += 1;
        }
        info!(resumed, "resumed monitoring");
        Ok(resumed)
    }

    pub fn get(&self, id: &str) -> Option<&Geofence> {
        self.entries.get(id).map(|e| &e.geofence)
    }

    pub fn is_monitored(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(|e| e.monitored)
    }

    /// Geofences in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Geofence> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id)).map(|e| &e.geofence)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn title(&self) -> String {
        format!("Geotifications: {}", self.len())
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut M {
        &mut self.monitor
    }
}
