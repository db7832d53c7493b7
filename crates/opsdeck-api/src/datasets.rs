use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};

use opsdeck_types::api::{DatasetMetrics, ImportRequest, ImportResponse, NewDataset};
use opsdeck_types::models::DatasetRecord;

use crate::auth::AppState;
use crate::middleware::Claims;

pub async fn list_datasets(
    State(state): State<AppState>,
) -> Result<Json<Vec<DatasetRecord>>, StatusCode> {
    let datasets = state.db.list_datasets().map_err(|e| {
        error!("Failed to list datasets: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(datasets))
}

pub async fn create_dataset(
    State(state): State<AppState>,
    Json(req): Json<NewDataset>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.insert_dataset(&req).map_err(|e| {
        error!("Failed to insert dataset: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::CREATED)
}

pub async fn update_dataset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NewDataset>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.update_dataset(id, &req).map_err(|e| {
        error!("Failed to update dataset {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_dataset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.delete_dataset(id).map_err(|e| {
        error!("Failed to delete dataset {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn dataset_metrics(
    State(state): State<AppState>,
) -> Result<Json<DatasetMetrics>, StatusCode> {
    let metrics = build_metrics(&state).map_err(|e| {
        error!("Failed to compute dataset metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(metrics))
}

fn build_metrics(state: &AppState) -> anyhow::Result<DatasetMetrics> {
    Ok(DatasetMetrics {
        total: state.db.count_datasets()?,
        total_rows: state.db.total_dataset_rows()?,
        by_uploader: state.db.datasets_by_uploader()?,
    })
}

pub async fn import_datasets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, StatusCode> {
    let path = match req.path {
        Some(p) => p.into(),
        None => state.data_dir.join("datasets_metadata.csv"),
    };

    let inserted = state.db.import_datasets_csv(&path).map_err(|e| {
        warn!("Dataset import from {} failed: {}", path.display(), e);
        StatusCode::BAD_REQUEST
    })?;

    info!("{} imported {} datasets", claims.username, inserted);
    Ok(Json(ImportResponse { inserted }))
}
