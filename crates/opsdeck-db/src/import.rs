use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::info;

use opsdeck_types::api::{NewDataset, NewIncident, NewTicket};

use crate::Database;

/// Deserialize every record of a headered CSV before touching the store.
/// A missing file, missing column, or malformed value fails the whole
/// call with zero rows inserted.
fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open CSV at {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let row =
            result.with_context(|| format!("malformed CSV record {} in {}", idx + 1, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

impl Database {
    pub fn import_incidents_csv(&self, path: &Path) -> Result<usize> {
        let records: Vec<NewIncident> = read_csv(path)?;
        for record in &records {
            self.insert_incident(record)?;
        }
        info!("Imported {} incidents from {}", records.len(), path.display());
        Ok(records.len())
    }

    pub fn import_datasets_csv(&self, path: &Path) -> Result<usize> {
        let records: Vec<NewDataset> = read_csv(path)?;
        for record in &records {
            self.insert_dataset(record)?;
        }
        info!("Imported {} datasets from {}", records.len(), path.display());
        Ok(records.len())
    }

    pub fn import_tickets_csv(&self, path: &Path) -> Result<usize> {
        let records: Vec<NewTicket> = read_csv(path)?;
        for record in &records {
            self.insert_ticket(record)?;
        }
        info!("Imported {} tickets from {}", records.len(), path.display());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn incident_import_inserts_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "cyber_incidents.csv",
            "incident_id,timestamp,severity,category,status,description\n\
             1001,2024-01-15 10:00:00,High,Phishing,Open,credential harvesting email\n\
             1002,2024-01-16 11:30:00,Low,Malware,Closed,quarantined attachment\n\
             1003,2024-01-17 09:15:00,Critical,DDoS,In Progress,volumetric flood\n",
        );

        let db = Database::open_in_memory().unwrap();
        let inserted = db.import_incidents_csv(&path).unwrap();
        assert_eq!(inserted, 3);

        let all = db.list_incidents().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].incident_id, 1003);
        assert_eq!(all[2].description, "credential harvesting email");
    }

    #[test]
    fn missing_column_aborts_without_inserting() {
        let dir = tempfile::tempdir().unwrap();
        // No severity column
        let path = write(
            &dir,
            "bad.csv",
            "incident_id,timestamp,category,status,description\n\
             1001,2024-01-15 10:00:00,Phishing,Open,first\n\
             1002,2024-01-16 11:30:00,Malware,Closed,second\n",
        );

        let db = Database::open_in_memory().unwrap();
        assert!(db.import_incidents_csv(&path).is_err());
        assert_eq!(db.count_incidents().unwrap(), 0);
    }

    #[test]
    fn malformed_numeric_aborts_without_inserting() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "bad_rows.csv",
            "dataset_id,name,rows,columns,uploaded_by,upload_date\n\
             1,Sales_2025,fifty,15,alice,2025-01-15\n",
        );

        let db = Database::open_in_memory().unwrap();
        assert!(db.import_datasets_csv(&path).is_err());
        assert_eq!(db.count_datasets().unwrap(), 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .import_tickets_csv(Path::new("/nonexistent/it_tickets.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to open CSV"));
    }

    #[test]
    fn ticket_import_coerces_numeric_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "it_tickets.csv",
            "ticket_id,priority,description,status,assigned_to,created_at,resolution_time_hours\n\
             2000,High,email outage,Open,IT_Support_A,2024-01-15 10:00:00,0\n\
             2001,Low,password reset,Resolved,IT_Support_B,2024-01-14 09:00:00,3\n",
        );

        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.import_tickets_csv(&path).unwrap(), 2);

        let all = db.list_tickets().unwrap();
        assert_eq!(all[0].ticket_id, 2000);
        assert_eq!(all[1].resolution_time_hours, 3);
    }
}
