//! Geofence controller: owns a registry and a notification sink and answers
//! the monitoring service's callbacks.
//!
//! Authorization is read from the monitor on demand; the controller keeps no
//! copy of its own.

use tracing::{error, info, warn};

use crate::config::GeofenceSpec;
use crate::geofence::{Added, Coordinate, Geofence, GeofenceError, GeofenceRegistry, NotificationEvent, TransitionKind};
use crate::monitor::{AuthorizationStatus, LocationMonitor, MonitorError, MonitorEvents, NotificationSink, SimulatedMonitor};

pub struct GeofenceController<M, S> {
    registry: GeofenceRegistry<M>,
    sink: S,
}

impl<M: LocationMonitor, S: NotificationSink> GeofenceController<M, S> {
    pub fn new(monitor: M, sink: S) -> Self {
        Self {
            registry: GeofenceRegistry::new(monitor),
            sink,
        }
    }

    /// Ask for `Always` access if undecided, stop whatever the monitor is
    /// still watching from a previous run, then add the given geofences.
    /// One result per entry, in order.
    pub fn startup(&mut self, specs: &[GeofenceSpec]) -> Vec<Result<Added, GeofenceError>> {
        if self.authorization() == AuthorizationStatus::NotDetermined {
            self.registry.monitor_mut().request_always_authorization();
        }
        let status = self.authorization();
        if status != AuthorizationStatus::Always {
            warn!(%status, "geofences activate once always-on location access is granted");
        }
        self.registry.stop_all();
        specs.iter().map(|s| self.add(s.to_geofence())).collect()
    }

    pub fn add(&mut self, geofence: Geofence) -> Result<Added, GeofenceError> {
        self.registry.add(geofence)
    }

    pub fn remove(&mut self, id: &str) -> Result<Geofence, GeofenceError> {
        self.registry.remove(id)
    }

    pub fn stop_all(&mut self) -> usize {
        self.registry.stop_all()
    }

    /// Re-arm geofences stopped by [`stop_all`](Self::stop_all).
    pub fn resume(&mut self) -> Result<usize, GeofenceError> {
        self.registry.resume_all()
    }

    /// Resolve a crossing and, when it produces an event, deliver it to the sink.
    pub fn handle(&mut self, region_id: &str, kind: TransitionKind) -> Option<NotificationEvent> {
        let event = self.registry.handle_transition(region_id, kind)?;
        self.sink.notify(&event);
        Some(event)
    }

    pub fn authorization(&self) -> AuthorizationStatus {
        self.registry.monitor().authorization_status()
    }

    pub fn registry(&self) -> &GeofenceRegistry<M> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut GeofenceRegistry<M> {
        &mut self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: NotificationSink> GeofenceController<SimulatedMonitor, S> {
    /// Feed a device position to the simulated monitor and deliver every
    /// crossing it reports through the callback interface. Returns the
    /// events that fired. A rejected fix goes to `on_location_error`.
    pub fn step(&mut self, position: Coordinate) -> Vec<NotificationEvent> {
        let transitions = match self.registry.monitor_mut().update_location(position) {
            Ok(t) => t,
            Err(e) => {
                self.on_location_error(&e);
                return Vec::new();
            }
        };
        transitions.iter().filter_map(|t| t.deliver(self)).collect()
    }

    /// Change the simulated authorization and report it through the callback.
    pub fn set_authorization(&mut self, status: AuthorizationStatus) {
        self.registry.monitor_mut().set_authorization(status);
        self.on_authorization_changed(status);
    }
}

impl<M: LocationMonitor, S: NotificationSink> MonitorEvents for GeofenceController<M, S> {
    fn on_enter(&mut self, region_id: &str) -> Option<NotificationEvent> {
        self.handle(region_id, TransitionKind::Entry)
    }

    fn on_exit(&mut self, region_id: &str) -> Option<NotificationEvent> {
        self.handle(region_id, TransitionKind::Exit)
    }

    fn on_authorization_changed(&mut self, status: AuthorizationStatus) {
        match status {
            AuthorizationStatus::Always | AuthorizationStatus::WhenInUse => {
                info!(%status, "location access approved");
            }
            AuthorizationStatus::NotDetermined => {
                self.registry.monitor_mut().request_always_authorization();
            }
            _ => warn!(%status, "location access not granted"),
        }
    }

    fn on_monitoring_failed(&mut self, region_id: Option<&str>, error: &MonitorError) {
        warn!(region = region_id.unwrap_or("<none>"), %error, "monitoring failed for region");
    }

    fn on_location_error(&mut self, error: &MonitorError) {
        error!(%error, "location manager failed");
    }
}
