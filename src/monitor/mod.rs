//! Location-monitoring collaborators.
//!
//! The registry talks to the platform through [`LocationMonitor`] and hands
//! notifications to a [`NotificationSink`]. Platform callbacks arrive through
//! [`MonitorEvents`], one method per event kind.

pub mod simulated;
pub mod sinks;

pub use simulated::{SimulatedMonitor, Transition};
pub use sinks::{LogSink, RecordingSink};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::geofence::{Coordinate, Geofence, NotificationEvent, TransitionKind, TriggerOn};

/// Location authorization granted to the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Restricted,
    Denied,
    WhenInUse,
    Always,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        matches!(self, Self::WhenInUse | Self::Always)
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDetermined => write!(f, "not determined"),
            Self::Restricted => write!(f, "restricted"),
            Self::Denied => write!(f, "denied"),
            Self::WhenInUse => write!(f, "when in use"),
            Self::Always => write!(f, "always"),
        }
    }
}

impl std::str::FromStr for AuthorizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "not_determined" => Ok(Self::NotDetermined),
            "restricted" => Ok(Self::Restricted),
            "denied" => Ok(Self::Denied),
            "when_in_use" => Ok(Self::WhenInUse),
            "always" => Ok(Self::Always),
            _ => Err(format!(
                "Unknown authorization '{}'. Use always, when-in-use, not-determined, restricted or denied.",
                s
            )),
        }
    }
}

/// Errors reported by a monitoring service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("region limit reached ({limit} regions)")]
    RegionLimitReached { limit: usize },

    #[error("region radius is out of the monitorable range")]
    RadiusOutOfRange,

    #[error("region monitoring is unavailable")]
    Unavailable,

    #[error("device location is unknown")]
    LocationUnknown,
}

/// The region handed to the monitoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularRegion {
    pub id: String,
    pub center: Coordinate,
    pub radius: f64,
    pub notify_on_entry: bool,
    pub notify_on_exit: bool,
}

impl CircularRegion {
    pub fn contains(&self, position: &Coordinate) -> bool {
        self.center.distance_to(position) <= self.radius
    }

    pub fn notifies(&self, kind: TransitionKind) -> bool {
        match kind {
            TransitionKind::Entry => self.notify_on_entry,
            TransitionKind::Exit => self.notify_on_exit,
        }
    }
}

impl From<&Geofence> for CircularRegion {
    fn from(g: &Geofence) -> Self {
        let notify_on_entry = g.trigger_on == TriggerOn::OnEntry;
        Self {
            id: g.id().to_string(),
            center: g.center,
            radius: g.radius,
            notify_on_entry,
            notify_on_exit: !notify_on_entry,
        }
    }
}

/// Platform region-monitoring capability.
pub trait LocationMonitor {
    fn start_monitoring(&mut self, region: CircularRegion) -> Result<(), MonitorError>;
    fn stop_monitoring(&mut self, region_id: &str);
    /// Ids of every region the service is currently watching, ours or not.
    fn monitored_regions(&self) -> Vec<String>;
    fn is_monitoring_available(&self) -> bool;
    /// Largest radius the service will monitor, meters.
    fn max_monitoring_radius(&self) -> f64;
    fn authorization_status(&self) -> AuthorizationStatus;
    /// Ask the user for `Always` access. The answer arrives later through
    /// [`MonitorEvents::on_authorization_changed`].
    fn request_always_authorization(&mut self);
}

/// Delivery of notifications to the user. Best-effort.
pub trait NotificationSink {
    fn notify(&mut self, event: &NotificationEvent);
}

/// Callbacks from the monitoring service.
///
/// Enter/exit handlers return the notification they produced, if any.
pub trait MonitorEvents {
    fn on_enter(&mut self, region_id: &str) -> Option<NotificationEvent>;
    fn on_exit(&mut self, region_id: &str) -> Option<NotificationEvent>;
    fn on_authorization_changed(&mut self, status: AuthorizationStatus);
    fn on_monitoring_failed(&mut self, region_id: Option<&str>, error: &MonitorError);
    fn on_location_error(&mut self, error: &MonitorError);
}
