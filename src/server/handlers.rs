use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::geofence::{Coordinate, Geofence, GeofenceError, NotificationEvent, TriggerOn};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<GeofenceError> for ApiError {
    fn from(e: GeofenceError) -> Self {
        let status = match &e {
            GeofenceError::UnsupportedPlatform => StatusCode::SERVICE_UNAVAILABLE,
            GeofenceError::NotFound(_) => StatusCode::NOT_FOUND,
            GeofenceError::DuplicateId(_) => StatusCode::CONFLICT,
            GeofenceError::InvalidRadius(_) | GeofenceError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
            GeofenceError::PermissionPending(_) | GeofenceError::Monitoring(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        ApiError(status, e.to_string())
    }
}

// ─── Views ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GeofenceView {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub note: String,
    pub title: String,
    pub subtitle: String,
    pub trigger_on: TriggerOn,
    pub monitored: bool,
}

impl GeofenceView {
    fn new(g: &Geofence, monitored: bool) -> Self {
        Self {
            id: g.id().to_string(),
            lat: g.center.lat,
            lon: g.center.lon,
            radius: g.radius,
            note: g.note.clone(),
            title: g.title().to_string(),
            subtitle: g.summary(),
            trigger_on: g.trigger_on,
            monitored,
        }
    }
}

// ─── GET /api/geofences ──────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GeofenceListResponse {
    pub title: String,
    pub geofences: Vec<GeofenceView>,
}

pub async fn list_geofences(State(state): State<Arc<AppState>>) -> Json<GeofenceListResponse> {
    let controller = state.controller();
    let registry = controller.registry();
    Json(GeofenceListResponse {
        title: registry.title(),
        geofences: registry
            .iter()
            .map(|g| GeofenceView::new(g, registry.is_monitored(g.id())))
            .collect(),
    })
}

// ─── POST /api/geofences ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    #[serde(default)]
    pub note: String,
    pub trigger_on: TriggerOn,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub id: String,
    pub radius: f64,
    pub clamped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub async fn add_geofence(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddRequest>,
) -> Result<(StatusCode, Json<AddResponse>), ApiError> {
    let center = Coordinate::new(req.lat, req.lon);
    let geofence = match req.id {
        Some(id) => Geofence::with_id(id, center, req.radius, req.note, req.trigger_on),
        None => Geofence::new(center, req.radius, req.note, req.trigger_on),
    };

    let added = state.controller().add(geofence)?;
    info!("POST /api/geofences -> {} (radius {}m)", added.id, added.radius);

    Ok((
        StatusCode::CREATED,
        Json(AddResponse {
            id: added.id,
            radius: added.radius,
            clamped: added.clamped,
            warning: added.warning.map(|w| w.to_string()),
        }),
    ))
}

// ─── DELETE /api/geofences/{id} ──────────────────────────────────

pub async fn remove_geofence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GeofenceView>, ApiError> {
    let removed = state.controller().remove(&id)?;
    info!("DELETE /api/geofences/{}", id);
    Ok(Json(GeofenceView::new(&removed, false)))
}

// ─── POST /api/location ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub position: Coordinate,
    /// False when the fix was dropped by the distance filter.
    pub accepted: bool,
    /// Last position the monitor accepted.
    pub device: Option<Coordinate>,
    pub fired: Vec<NotificationEvent>,
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<LocationResponse>, ApiError> {
    let start = Instant::now();
    let position = Coordinate::new(req.lat, req.lon);
    if !position.is_valid() {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "Invalid coordinates. Lat: -90..90, Lon: -180..180".into(),
        ));
    }

    let (fired, accepted, device) = {
        let mut controller = state.controller();
        let before = controller.registry().monitor().accepted_fixes();
        let fired = controller.step(position);
        let monitor = controller.registry().monitor();
        (fired, monitor.accepted_fixes() > before, monitor.position())
    };
    info!(
        "POST /api/location {} -> {} notification(s){} ({:.1}ms)",
        position,
        fired.len(),
        if accepted { "" } else { ", filtered" },
        start.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(Json(LocationResponse {
        position,
        accepted,
        device,
        fired,
    }))
}

// ─── GET /api/notifications ──────────────────────────────────────

pub async fn notifications(State(state): State<Arc<AppState>>) -> Json<Vec<NotificationEvent>> {
    Json(state.controller().sink().events().to_vec())
}

// ─── POST /api/stop ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: usize,
}

pub async fn stop_all(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    let stopped = state.controller().stop_all();
    info!("POST /api/stop -> {} region(s)", stopped);
    Json(StopResponse { stopped })
}

// ─── POST /api/resume ────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub resumed: usize,
}

pub async fn resume(State(state): State<Arc<AppState>>) -> Result<Json<ResumeResponse>, ApiError> {
    let resumed = state.controller().resume()?;
    info!("POST /api/resume -> {} region(s)", resumed);
    Ok(Json(ResumeResponse { resumed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::demo_geofences;
    use crate::controller::GeofenceController;
    use crate::monitor::{RecordingSink, SimulatedMonitor};
    use std::sync::Mutex;

    fn state() -> Arc<AppState> {
        let mut controller = GeofenceController::new(
            SimulatedMonitor::new().with_max_radius(2_000.0),
            RecordingSink::new(),
        );
        controller.startup(&demo_geofences());
        Arc::new(AppState {
            controller: Mutex::new(controller),
        })
    }

    #[tokio::test]
    async fn test_list_geofences() {
        let Json(resp) = list_geofences(State(state())).await;
        assert_eq!(resp.title, "Geotifications: 2");
        assert_eq!(resp.geofences[0].title, "Left Apple Company!");
        assert_eq!(resp.geofences[0].subtitle, "Radius: 1000m -> Being Exit");
        assert!(resp.geofences.iter().all(|g| g.monitored));
    }

    #[tokio::test]
    async fn test_add_clamped_and_remove() {
        let s = state();
        let req = AddRequest {
            id: Some("office".into()),
            lat: 59.33,
            lon: 18.07,
            radius: 9_000.0,
            note: "Office".into(),
            trigger_on: TriggerOn::OnEntry,
        };
        let (status, Json(added)) = add_geofence(State(s.clone()), Json(req)).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(added.clamped);
        assert_eq!(added.radius, 2_000.0);
        assert!(added.warning.is_none());

        let Json(removed) = remove_geofence(State(s.clone()), Path("office".into())).await.unwrap();
        assert_eq!(removed.id, "office");

        let err = remove_geofence(State(s), Path("office".into())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_invalid_radius() {
        let req = AddRequest {
            id: None,
            lat: 0.0,
            lon: 0.0,
            radius: -5.0,
            note: String::new(),
            trigger_on: TriggerOn::OnExit,
        };
        let err = add_geofence(State(state()), Json(req)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_location_fires_and_records() {
        let s = state();
        let apple = LocationRequest { lat: 37.3349285, lon: -122.011033 };
        let Json(first) = update_location(State(s.clone()), Json(apple)).await.unwrap();
        assert!(first.fired.is_empty());
        assert!(first.accepted);

        // A few meters away: below the distance filter.
        let near = LocationRequest { lat: 37.33493, lon: -122.011033 };
        let Json(filtered) = update_location(State(s.clone()), Json(near)).await.unwrap();
        assert!(!filtered.accepted);
        assert_eq!(filtered.device, Some(Coordinate::new(37.3349285, -122.011033)));

        let away = LocationRequest { lat: 37.36, lon: -122.03 };
        let Json(second) = update_location(State(s.clone()), Json(away)).await.unwrap();
        assert_eq!(second.fired.len(), 1);
        assert_eq!(second.fired[0].note, "Left Apple Company!");

        let Json(all) = notifications(State(s)).await;
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_location_invalid() {
        let req = LocationRequest { lat: 120.0, lon: 0.0 };
        let err = update_location(State(state()), Json(req)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stop_all() {
        let s = state();
        let Json(resp) = stop_all(State(s.clone())).await;
        assert_eq!(resp.stopped, 2);
        let Json(list) = list_geofences(State(s)).await;
        assert_eq!(list.geofences.len(), 2);
        assert!(list.geofences.iter().all(|g| !g.monitored));
    }

    #[tokio::test]
    async fn test_resume_after_stop() {
        let s = state();
        stop_all(State(s.clone())).await;
        let Json(resp) = resume(State(s.clone())).await.unwrap();
        assert_eq!(resp.resumed, 2);
        let Json(list) = list_geofences(State(s.clone())).await;
        assert!(list.geofences.iter().all(|g| g.monitored));

        let Json(again) = resume(State(s)).await.unwrap();
        assert_eq!(again.resumed, 0);
    }

    #[tokio::test]
    async fn test_resume_unavailable() {
        let controller = GeofenceController::new(
            SimulatedMonitor::new().with_available(false),
            RecordingSink::new(),
        );
        let s = Arc::new(AppState {
            controller: Mutex::new(controller),
        });
        let err = resume(State(s)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_build_router() {
        let controller = GeofenceController::new(SimulatedMonitor::new(), RecordingSink::new());
        let _ = crate::server::build_router(controller);
    }
}
