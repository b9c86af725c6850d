//! Geofence subsystem: value types and the registry that owns them.

pub mod registry;
pub mod types;

pub use registry::GeofenceRegistry;
pub use types::{Added, Coordinate, Geofence, GeofenceError, NotificationEvent, TransitionKind, TriggerOn};
