//! Monitor configuration at ~/.region-monitor/config.json.
//!
//! Every field is optional; missing fields take the defaults below. The
//! default geofence set is the two-campus demo.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geofence::{Coordinate, Geofence, TriggerOn};
use crate::monitor::simulated::{DEFAULT_DISTANCE_FILTER, DEFAULT_MAX_RADIUS, DEFAULT_MAX_REGIONS};
use crate::monitor::{AuthorizationStatus, SimulatedMonitor};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// A geofence as written in the config file. Ids are generated when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    #[serde(default)]
    pub note: String,
    pub trigger_on: TriggerOn,
}

impl GeofenceSpec {
    pub fn to_geofence(&self) -> Geofence {
        let center = Coordinate::new(self.lat, self.lon);
        match &self.id {
            Some(id) => Geofence::with_id(id.clone(), center, self.radius, self.note.clone(), self.trigger_on),
            None => Geofence::new(center, self.radius, self.note.clone(), self.trigger_on),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub max_monitoring_radius: f64,
    pub max_regions: usize,
    pub distance_filter: f64,
    pub authorization: AuthorizationStatus,
    pub monitoring_available: bool,
    pub geofences: Vec<GeofenceSpec>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_monitoring_radius: DEFAULT_MAX_RADIUS,
            max_regions: DEFAULT_MAX_REGIONS,
            distance_filter: DEFAULT_DISTANCE_FILTER,
            authorization: AuthorizationStatus::Always,
            monitoring_available: true,
            geofences: demo_geofences(),
        }
    }
}

impl MonitorConfig {
    /// Load from the default path.
    pub fn load() -> Self {
        Self::load_or_default(&Self::default_path())
    }

    /// Defaults when the file is missing, unreadable or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load and validate a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the monitor limits. Geofence entries are checked when added.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_monitoring_radius.is_finite() && self.max_monitoring_radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_monitoring_radius must be a positive number of meters, got {}",
                self.max_monitoring_radius
            )));
        }
        if !(self.distance_filter.is_finite() && self.distance_filter >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "distance_filter must be zero or more meters, got {}",
                self.distance_filter
            )));
        }
        if self.max_regions == 0 {
            return Err(ConfigError::Invalid("max_regions must be at least 1".into()));
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".region-monitor")
            .join("config.json")
    }

    pub fn build_monitor(&self) -> SimulatedMonitor {
        SimulatedMonitor::new()
            .with_available(self.monitoring_available)
            .with_max_radius(self.max_monitoring_radius)
            .with_max_regions(self.max_regions)
            .with_distance_filter(self.distance_filter)
            .with_authorization(self.authorization)
    }
}

/// Apple Park (notify on exit) and the Googleplex (notify on entry), 1 km each.
pub fn demo_geofences() -> Vec<GeofenceSpec> {
    vec![
        GeofenceSpec {
            id: None,
            lat: 37.3349285,
            lon: -122.011033,
            radius: 1000.0,
            note: "Left Apple Company!".into(),
            trigger_on: TriggerOn::OnExit,
        },
        GeofenceSpec {
            id: None,
            lat: 37.422,
            lon: -122.084058,
            radius: 1000.0,
            note: "Enter Google Company!".into(),
            trigger_on: TriggerOn::OnEntry,
        },
    ]
}
