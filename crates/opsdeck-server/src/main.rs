use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use opsdeck_api::auth::{self, AppState, AppStateInner};
use opsdeck_api::middleware::require_auth;
use opsdeck_api::{advisor, datasets, incidents, tickets};
use opsdeck_auth::AuthManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsdeck=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("OPSDECK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("OPSDECK_DB_PATH").unwrap_or_else(|_| "opsdeck.db".into());
    let data_dir: PathBuf = std::env::var("OPSDECK_DATA_DIR")
        .unwrap_or_else(|_| "./data".into())
        .into();
    let host = std::env::var("OPSDECK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("OPSDECK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database; schema creation is idempotent
    let db = Arc::new(opsdeck_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        auth: AuthManager::new(db),
        advisor: advisor::Advisor::from_env(),
        jwt_secret,
        data_dir,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/incidents", get(incidents::list_incidents))
        .route("/incidents", post(incidents::create_incident))
        .route("/incidents/{id}", put(incidents::update_incident))
        .route("/incidents/{id}", delete(incidents::delete_incident))
        .route("/incidents/metrics", get(incidents::incident_metrics))
        .route("/incidents/import", post(incidents::import_incidents))
        .route("/datasets", get(datasets::list_datasets))
        .route("/datasets", post(datasets::create_dataset))
        .route("/datasets/{id}", put(datasets::update_dataset))
        .route("/datasets/{id}", delete(datasets::delete_dataset))
        .route("/datasets/metrics", get(datasets::dataset_metrics))
        .route("/datasets/import", post(datasets::import_datasets))
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets/{id}", put(tickets::update_ticket))
        .route("/tickets/{id}", delete(tickets::delete_ticket))
        .route("/tickets/metrics", get(tickets::ticket_metrics))
        .route("/tickets/import", post(tickets::import_tickets))
        .route("/advisor/ask", post(advisor::ask))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Opsdeck server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
