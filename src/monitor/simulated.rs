//! In-memory region-monitoring service.
//!
//! Stands in for the platform location manager: regions are registered,
//! device positions are fed in, and boundary crossings come out.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::{AuthorizationStatus, CircularRegion, LocationMonitor, MonitorError, MonitorEvents};
use crate::geofence::{Coordinate, NotificationEvent, TransitionKind};

pub const DEFAULT_MAX_RADIUS: f64 = 10_000.0;
/// Platform cap on simultaneously monitored regions per app.
pub const DEFAULT_MAX_REGIONS: usize = 20;
/// Minimum movement, meters, before a new fix is processed.
pub const DEFAULT_DISTANCE_FILTER: f64 = 10.0;

/// A boundary crossing detected by the simulated monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub region_id: String,
    pub kind: TransitionKind,
}

impl Transition {
    /// Deliver this crossing to an event handler.
    pub fn deliver<E: MonitorEvents + ?Sized>(&self, events: &mut E) -> Option<NotificationEvent> {
        match self.kind {
            TransitionKind::Entry => events.on_enter(&self.region_id),
            TransitionKind::Exit => events.on_exit(&self.region_id),
        }
    }
}

pub struct SimulatedMonitor {
    regions: Vec<CircularRegion>,
    inside: HashMap<String, bool>,
    last_fix: Option<Coordinate>,
    available: bool,
    max_radius: f64,
    max_regions: usize,
    distance_filter: f64,
    authorization: AuthorizationStatus,
    /// What the simulated user answers to an authorization prompt.
    prompt_response: Option<AuthorizationStatus>,
    authorization_requests: usize,
    accepted_fixes: usize,
}

impl Default for SimulatedMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMonitor {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            inside: HashMap::new(),
            last_fix: None,
            available: true,
            max_radius: DEFAULT_MAX_RADIUS,
            max_regions: DEFAULT_MAX_REGIONS,
            distance_filter: DEFAULT_DISTANCE_FILTER,
            authorization: AuthorizationStatus::Always,
            prompt_response: None,
            authorization_requests: 0,
            accepted_fixes: 0,
        }
    }

    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn with_max_radius(mut self, meters: f64) -> Self {
        self.max_radius = meters;
        self
    }

    pub fn with_max_regions(mut self, n: usize) -> Self {
        self.max_regions = n;
        self
    }

    pub fn with_distance_filter(mut self, meters: f64) -> Self {
        self.distance_filter = meters;
        self
    }

    pub fn with_authorization(mut self, status: AuthorizationStatus) -> Self {
        self.authorization = status;
        self
    }

    /// Answer given when the app asks for `Always` access while the status
    /// is still undetermined. `None` leaves the prompt unanswered.
    pub fn with_prompt_response(mut self, response: Option<AuthorizationStatus>) -> Self {
        self.prompt_response = response;
        self
    }

    pub fn set_authorization(&mut self, status: AuthorizationStatus) {
        self.authorization = status;
    }

    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests
    }

    /// Fixes that passed validation and the distance filter.
    pub fn accepted_fixes(&self) -> usize {
        self.accepted_fixes
    }

    /// Last accepted device position.
    pub fn position(&self) -> Option<Coordinate> {
        self.last_fix
    }

    pub fn region(&self, id: &str) -> Option<&CircularRegion> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Feed a device position. Returns the crossings the registered regions
    /// asked to be told about, in registration order.
    ///
    /// The first fix only establishes inside/outside state. Fixes closer than
    /// the distance filter to the previous one are dropped. Invalid fixes are
    /// rejected with `LocationUnknown` and leave all state untouched.
    pub fn update_location(&mut self, position: Coordinate) -> Result<Vec<Transition>, MonitorError> {
        if !position.is_valid() {
            return Err(MonitorError::LocationUnknown);
        }
        if let Some(last) = self.last_fix {
            if last.distance_to(&position) < self.distance_filter {
                return Ok(Vec::new());
            }
        }
        self.last_fix = Some(position);
        self.accepted_fixes += 1;

        let mut out = Vec::new();
        for region in &self.regions {
            let now = region.contains(&position);
            let prev = self.inside.insert(region.id.clone(), now);
            let kind = match prev {
                Some(false) if now => TransitionKind::Entry,
                Some(true) if !now => TransitionKind::Exit,
                _ => continue,
            };
            if region.notifies(kind) {
                debug!(region = %region.id, %kind, "boundary crossed");
                out.push(Transition {
                    region_id: region.id.clone(),
                    kind,
                });
            }
        }
        Ok(out)
    }
}

impl LocationMonitor for SimulatedMonitor {
    fn start_monitoring(&mut self, region: CircularRegion) -> Result<(), MonitorError> {
        if !self.available {
            return Err(MonitorError::Unavailable);
        }
        if !(region.radius > 0.0 && region.radius <= self.max_radius) {
            return Err(MonitorError::RadiusOutOfRange);
        }

        // Registering an existing identifier replaces the old region.
        let state = self.last_fix.map(|p| region.contains(&p));
        if let Some(existing) = self.regions.iter_mut().find(|r| r.id == region.id) {
            *existing = region.clone();
        } else {
            if self.regions.len() >= self.max_regions {
                return Err(MonitorError::RegionLimitReached {
                    limit: self.max_regions,
                });
            }
            self.regions.push(region.clone());
        }

        match state {
            Some(inside) => {
                self.inside.insert(region.id, inside);
            }
            None => {
                self.inside.remove(&region.id);
            }
        }
        Ok(())
    }

    fn stop_monitoring(&mut self, region_id: &str) {
        self.regions.retain(|r| r.id != region_id);
        self.inside.remove(region_id);
    }

    fn monitored_regions(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.id.clone()).collect()
    }

    fn is_monitoring_available(&self) -> bool {
        self.available
    }

    fn max_monitoring_radius(&self) -> f64 {
        self.max_radius
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        self.authorization
    }

    fn request_always_authorization(&mut self) {
        self.authorization_requests += 1;
        if self.authorization == AuthorizationStatus::NotDetermined {
            if let Some(answer) = self.prompt_response {
                self.authorization = answer;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, lat: f64, lon: f64, radius: f64, on_entry: bool) -> CircularRegion {
        CircularRegion {
            id: id.into(),
            center: Coordinate::new(lat, lon),
            radius,
            notify_on_entry: on_entry,
            notify_on_exit: !on_entry,
        }
    }

    fn fix(m: &mut SimulatedMonitor, lat: f64, lon: f64) -> Vec<Transition> {
        m.update_location(Coordinate::new(lat, lon)).unwrap()
    }

    #[test]
    fn test_first_fix_emits_nothing() {
        let mut m = SimulatedMonitor::new();
        m.start_monitoring(region("a", 0.0, 0.0, 1000.0, true)).unwrap();
        assert!(fix(&mut m, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_entry_detected() {
        let mut m = SimulatedMonitor::new();
        m.start_monitoring(region("a", 0.0, 0.0, 1000.0, true)).unwrap();
        fix(&mut m, 0.1, 0.0); // ~11 km out
        let t = fix(&mut m, 0.0, 0.0);
        assert_eq!(t, vec![Transition { region_id: "a".into(), kind: TransitionKind::Entry }]);
    }

    #[test]
    fn test_exit_not_reported_for_entry_region() {
        let mut m = SimulatedMonitor::new();
        m.start_monitoring(region("a", 0.0, 0.0, 1000.0, true)).unwrap();
        fix(&mut m, 0.0, 0.0);
        assert!(fix(&mut m, 0.1, 0.0).is_empty());
    }

    #[test]
    fn test_exit_detected() {
        let mut m = SimulatedMonitor::new();
        m.start_monitoring(region("a", 0.0, 0.0, 1000.0, false)).unwrap();
        fix(&mut m, 0.0, 0.0);
        let t = fix(&mut m, 0.1, 0.0);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].kind, TransitionKind::Exit);
    }

    #[test]
    fn test_invalid_fix_rejected_without_crossing() {
        let mut m = SimulatedMonitor::new();
        m.start_monitoring(region("a", 0.0, 0.0, 1000.0, false)).unwrap();
        fix(&mut m, 0.0, 0.0);

        for bad in [
            Coordinate::new(f64::NAN, 0.0),
            Coordinate::new(0.0, f64::INFINITY),
            Coordinate::new(95.0, 0.0),
        ] {
            assert_eq!(m.update_location(bad), Err(MonitorError::LocationUnknown));
        }
        assert_eq!(m.position(), Some(Coordinate::new(0.0, 0.0)));
        assert_eq!(m.accepted_fixes(), 1);

        // Still inside: a nearby valid fix reports nothing.
        assert!(fix(&mut m, 0.001, 0.0).is_empty());
    }

    #[test]
    fn test_registering_while_inside_is_silent() {
        let mut m = SimulatedMonitor::new();
        fix(&mut m, 0.0, 0.0);
        m.start_monitoring(region("a", 0.0, 0.0, 1000.0, false)).unwrap();
        // Still inside: no crossing. Then leave.
        assert!(fix(&mut m, 0.001, 0.0).is_empty());
        assert_eq!(fix(&mut m, 0.1, 0.0).len(), 1);
    }

    #[test]
    fn test_distance_filter() {
        let mut m = SimulatedMonitor::new().with_distance_filter(50.0);
        m.start_monitoring(region("a", 0.0, 0.0, 100.0, true)).unwrap();
        fix(&mut m, 0.0012, 0.0); // ~133 m, outside
        // ~22 m closer: dropped, still outside anyway
        assert!(fix(&mut m, 0.0010, 0.0).is_empty());
        assert_eq!(m.position(), Some(Coordinate::new(0.0012, 0.0)));
        assert_eq!(m.accepted_fixes(), 1);
        let t = fix(&mut m, 0.0, 0.0);
        assert_eq!(t.len(), 1);
        assert_eq!(m.accepted_fixes(), 2);
    }

    #[test]
    fn test_region_limit() {
        let mut m = SimulatedMonitor::new().with_max_regions(2);
        m.start_monitoring(region("a", 0.0, 0.0, 10.0, true)).unwrap();
        m.start_monitoring(region("b", 0.0, 0.0, 10.0, true)).unwrap();
        assert_eq!(
            m.start_monitoring(region("c", 0.0, 0.0, 10.0, true)),
            Err(MonitorError::RegionLimitReached { limit: 2 })
        );
        // Same id replaces rather than counting again.
        assert!(m.start_monitoring(region("b", 1.0, 1.0, 10.0, false)).is_ok());
        assert_eq!(m.monitored_regions(), vec!["a".to_string(), "b".to_string()]);
        assert!(m.region("b").unwrap().notify_on_exit);
    }

    #[test]
    fn test_radius_out_of_range() {
        let mut m = SimulatedMonitor::new().with_max_radius(500.0);
        assert_eq!(
            m.start_monitoring(region("a", 0.0, 0.0, 501.0, true)),
            Err(MonitorError::RadiusOutOfRange)
        );
        assert_eq!(
            m.start_monitoring(region("a", 0.0, 0.0, 0.0, true)),
            Err(MonitorError::RadiusOutOfRange)
        );
    }

    #[test]
    fn test_unavailable() {
        let mut m = SimulatedMonitor::new().with_available(false);
        assert!(!m.is_monitoring_available());
        assert_eq!(
            m.start_monitoring(region("a", 0.0, 0.0, 10.0, true)),
            Err(MonitorError::Unavailable)
        );
    }

    #[test]
    fn test_stop_monitoring_forgets_region() {
        let mut m = SimulatedMonitor::new();
        m.start_monitoring(region("a", 0.0, 0.0, 1000.0, true)).unwrap();
        fix(&mut m, 0.1, 0.0);
        m.stop_monitoring("a");
        assert!(m.monitored_regions().is_empty());
        assert!(fix(&mut m, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_authorization_prompt() {
        let mut m = SimulatedMonitor::new()
            .with_authorization(AuthorizationStatus::NotDetermined)
            .with_prompt_response(Some(AuthorizationStatus::Always));
        m.request_always_authorization();
        assert_eq!(m.authorization_status(), AuthorizationStatus::Always);
        assert_eq!(m.authorization_requests(), 1);

        // A decided status is not changed by another prompt.
        let mut m = SimulatedMonitor::new()
            .with_authorization(AuthorizationStatus::Denied)
            .with_prompt_response(Some(AuthorizationStatus::Always));
        m.request_always_authorization();
        assert_eq!(m.authorization_status(), AuthorizationStatus::Denied);
    }

    #[test]
    fn test_unanswered_prompt() {
        let mut m = SimulatedMonitor::new().with_authorization(AuthorizationStatus::NotDetermined);
        m.request_always_authorization();
        assert_eq!(m.authorization_status(), AuthorizationStatus::NotDetermined);
    }
}
