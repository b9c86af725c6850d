//! Core types for the geofence subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;

use crate::monitor::{AuthorizationStatus, MonitorError};

const DEG: f64 = PI / 180.0;
/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

// ─── Coordinate ──────────────────────────────────────────────────

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let d_lat = (other.lat - self.lat) * DEG;
        let d_lon = (other.lon - self.lon) * DEG;
        let a = (d_lat / 2.0).sin().powi(2)
            + (self.lat * DEG).cos() * (other.lat * DEG).cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

// ─── Trigger / transition ────────────────────────────────────────

/// Which boundary crossing a geofence reports. A region watches exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOn {
    OnEntry,
    OnExit,
}

impl TriggerOn {
    pub fn matches(self, kind: TransitionKind) -> bool {
        matches!(
            (self, kind),
            (Self::OnEntry, TransitionKind::Entry) | (Self::OnExit, TransitionKind::Exit)
        )
    }
}

impl fmt::Display for TriggerOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnEntry => write!(f, "Being Entry"),
            Self::OnExit => write!(f, "Being Exit"),
        }
    }
}

/// A boundary crossing reported by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Entry,
    Exit,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

// ─── Geofence ────────────────────────────────────────────────────

/// A circular region plus a note and a trigger condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    id: String,
    pub center: Coordinate,
    /// Meters. Clamped to the monitor's maximum when added to a registry.
    pub radius: f64,
    pub note: String,
    pub trigger_on: TriggerOn,
}

impl Geofence {
    /// Create a geofence with a fresh UUID identifier.
    pub fn new(center: Coordinate, radius: f64, note: impl Into<String>, trigger_on: TriggerOn) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), center, radius, note, trigger_on)
    }

    /// Create a geofence with a caller-chosen identifier.
    pub fn with_id(
        id: impl Into<String>,
        center: Coordinate,
        radius: f64,
        note: impl Into<String>,
        trigger_on: TriggerOn,
    ) -> Self {
        Self {
            id: id.into(),
            center,
            radius,
            note: note.into(),
            trigger_on,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Label shown on the map pin and in notifications.
    pub fn title(&self) -> &str {
        if self.note.is_empty() {
            "No Note"
        } else {
            &self.note
        }
    }

    pub fn summary(&self) -> String {
        format!("Radius: {}m -> {}", self.radius, self.trigger_on)
    }
}

// ─── Notification ────────────────────────────────────────────────

/// Produced when a monitored geofence reports its configured crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub geofence_id: String,
    pub note: String,
    pub kind: TransitionKind,
    pub at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn message(&self) -> &str {
        if self.note.is_empty() {
            "No Note"
        } else {
            &self.note
        }
    }
}

// ─── Add result / errors ─────────────────────────────────────────

/// Outcome of a successful add.
#[derive(Debug, Clone)]
pub struct Added {
    pub id: String,
    /// Radius actually stored, after clamping.
    pub radius: f64,
    pub clamped: bool,
    /// Non-fatal condition, currently only `PermissionPending`.
    pub warning: Option<GeofenceError>,
}

/// Geofence registry errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    #[error("Geofencing is not supported on this device")]
    UnsupportedPlatform,

    #[error("Geofence not found: '{0}'")]
    NotFound(String),

    #[error("Geofence is saved but will only be activated once location access is granted (authorization: {0})")]
    PermissionPending(AuthorizationStatus),

    #[error("Geofence id already registered: '{0}'")]
    DuplicateId(String),

    #[error("Invalid radius: {0} (must be a positive number of meters)")]
    InvalidRadius(f64),

    #[error("Invalid coordinates: lat {lat}, lon {lon} (lat -90..90, lon -180..180)")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Monitoring failed: {0}")]
    Monitoring(#[from] MonitorError),
}
