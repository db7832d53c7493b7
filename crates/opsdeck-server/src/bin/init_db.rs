//! One-shot database bootstrap: creates the schema, seeds a default
//! admin account, and loads the bundled sample CSVs. Safe to re-run;
//! the admin seed is skipped when the username already exists and the
//! imports append.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use opsdeck_auth::AuthManager;
use opsdeck_db::Database;
use opsdeck_types::models::Role;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsdeck=info".into()),
        )
        .init();

    let db_path = std::env::var("OPSDECK_DB_PATH").unwrap_or_else(|_| "opsdeck.db".into());
    let data_dir: PathBuf = std::env::var("OPSDECK_DATA_DIR")
        .unwrap_or_else(|_| "./data".into())
        .into();

    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    let auth = AuthManager::new(db.clone());
    if auth.register("admin", "adminpass", Role::Admin)? {
        info!("Seeded default admin user (admin/adminpass); change this password");
    } else {
        info!("Admin user already exists, skipped");
    }

    let incidents = data_dir.join("cyber_incidents.csv");
    match db.import_incidents_csv(&incidents) {
        Ok(n) => info!("Loaded {} incidents from {}", n, incidents.display()),
        Err(e) => warn!("Skipping {}: {}", incidents.display(), e),
    }

    let datasets = data_dir.join("datasets_metadata.csv");
    match db.import_datasets_csv(&datasets) {
        Ok(n) => info!("Loaded {} datasets from {}", n, datasets.display()),
        Err(e) => warn!("Skipping {}: {}", datasets.display(), e),
    }

    let tickets = data_dir.join("it_tickets.csv");
    match db.import_tickets_csv(&tickets) {
        Ok(n) => info!("Loaded {} tickets from {}", n, tickets.display()),
        Err(e) => warn!("Skipping {}: {}", tickets.display(), e),
    }

    Ok(())
}
