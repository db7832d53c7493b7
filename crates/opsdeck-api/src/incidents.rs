use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};

use opsdeck_types::api::{ImportRequest, ImportResponse, IncidentMetrics, NewIncident};
use opsdeck_types::models::Incident;

use crate::auth::AppState;
use crate::middleware::Claims;

pub async fn list_incidents(
    State(state): State<AppState>,
) -> Result<Json<Vec<Incident>>, StatusCode> {
    let incidents = state.db.list_incidents().map_err(|e| {
        error!("Failed to list incidents: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(incidents))
}

pub async fn create_incident(
    State(state): State<AppState>,
    Json(req): Json<NewIncident>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.insert_incident(&req).map_err(|e| {
        error!("Failed to insert incident: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::CREATED)
}

pub async fn update_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NewIncident>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.update_incident(id, &req).map_err(|e| {
        error!("Failed to update incident {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.delete_incident(id).map_err(|e| {
        error!("Failed to delete incident {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn incident_metrics(
    State(state): State<AppState>,
) -> Result<Json<IncidentMetrics>, StatusCode> {
    let metrics = build_metrics(&state).map_err(|e| {
        error!("Failed to compute incident metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(metrics))
}

fn build_metrics(state: &AppState) -> anyhow::Result<IncidentMetrics> {
    Ok(IncidentMetrics {
        total: state.db.count_incidents()?,
        open: state.db.count_open_incidents()?,
        by_category: state.db.incidents_by_category()?,
        by_severity: state.db.incidents_by_severity()?,
        by_status: state.db.incidents_by_status()?,
    })
}

/// Bulk import from a server-side CSV. The whole call fails, inserting
/// nothing, when the source is missing or malformed.
pub async fn import_incidents(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, StatusCode> {
    let path = match req.path {
        Some(p) => p.into(),
        None => state.data_dir.join("cyber_incidents.csv"),
    };

    let inserted = state.db.import_incidents_csv(&path).map_err(|e| {
        warn!("Incident import from {} failed: {}", path.display(), e);
        StatusCode::BAD_REQUEST
    })?;

    info!("{} imported {} incidents", claims.username, inserted);
    Ok(Json(ImportResponse { inserted }))
}
