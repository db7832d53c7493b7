use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};

use opsdeck_types::api::{ImportRequest, ImportResponse, NewTicket, TicketMetrics};
use opsdeck_types::models::Ticket;

use crate::auth::AppState;
use crate::middleware::Claims;

pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<Vec<Ticket>>, StatusCode> {
    let tickets = state.db.list_tickets().map_err(|e| {
        error!("Failed to list tickets: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(tickets))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Json(req): Json<NewTicket>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.insert_ticket(&req).map_err(|e| {
        error!("Failed to insert ticket: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::CREATED)
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NewTicket>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.update_ticket(id, &req).map_err(|e| {
        error!("Failed to update ticket {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    state.db.delete_ticket(id).map_err(|e| {
        error!("Failed to delete ticket {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ticket_metrics(
    State(state): State<AppState>,
) -> Result<Json<TicketMetrics>, StatusCode> {
    let metrics = build_metrics(&state).map_err(|e| {
        error!("Failed to compute ticket metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(metrics))
}

fn build_metrics(state: &AppState) -> anyhow::Result<TicketMetrics> {
    Ok(TicketMetrics {
        total: state.db.count_tickets()?,
        open: state.db.count_open_tickets()?,
        avg_resolution_hours: state.db.avg_resolution_hours()?,
        by_priority: state.db.tickets_by_priority()?,
        by_status: state.db.tickets_by_status()?,
        by_assignee: state.db.assignee_summary()?,
        slowest_assignee: state.db.slowest_assignee()?,
    })
}

pub async fn import_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, StatusCode> {
    let path = match req.path {
        Some(p) => p.into(),
        None => state.data_dir.join("it_tickets.csv"),
    };

    let inserted = state.db.import_tickets_csv(&path).map_err(|e| {
        warn!("Ticket import from {} failed: {}", path.display(), e);
        StatusCode::BAD_REQUEST
    })?;

    info!("{} imported {} tickets", claims.username, inserted);
    Ok(Json(ImportResponse { inserted }))
}
