//! Region Monitor: geofence lifecycle and region-transition handling.
//!
//! A [`geofence::GeofenceRegistry`] owns the monitored geofences and talks to
//! a [`monitor::LocationMonitor`]. A [`controller::GeofenceController`] wires
//! the registry to a [`monitor::NotificationSink`] and answers monitoring
//! callbacks.

pub mod config;
pub mod controller;
pub mod geofence;
pub mod monitor;
pub mod server;
