use std::sync::{Mutex, MutexGuard};

use crate::controller::GeofenceController;
use crate::monitor::{RecordingSink, SimulatedMonitor};

pub type SimController = GeofenceController<SimulatedMonitor, RecordingSink>;

pub struct AppState {
    pub controller: Mutex<SimController>,
}

impl AppState {
    /// Lock the controller. Each request runs to completion under the lock.
    pub fn controller(&self) -> MutexGuard<'_, SimController> {
        self.controller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
