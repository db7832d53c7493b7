use anyhow::Result;
use rusqlite::Row;

use opsdeck_types::api::{LabelCount, NewIncident};
use opsdeck_types::models::Incident;

use crate::{Database, column_enum, label_counts};

fn map_incident(row: &Row<'_>) -> rusqlite::Result<Incident> {
    Ok(Incident {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        timestamp: row.get(2)?,
        severity: column_enum(3, row.get(3)?)?,
        category: column_enum(4, row.get(4)?)?,
        status: column_enum(5, row.get(5)?)?,
        description: row.get(6)?,
    })
}

impl Database {
    pub fn insert_incident(&self, incident: &NewIncident) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO cyber_incidents
                    (incident_id, timestamp, severity, category, status, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    incident.incident_id,
                    incident.timestamp,
                    incident.severity.as_str(),
                    incident.category.as_str(),
                    incident.status.as_str(),
                    incident.description,
                ],
            )?;
            Ok(())
        })
    }

    /// Full-row replace by primary id; silently a no-op when the id does
    /// not exist.
    pub fn update_incident(&self, id: i64, incident: &NewIncident) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE cyber_incidents
                 SET incident_id = ?1, timestamp = ?2, severity = ?3,
                     category = ?4, status = ?5, description = ?6
                 WHERE id = ?7",
                rusqlite::params![
                    incident.incident_id,
                    incident.timestamp,
                    incident.severity.as_str(),
                    incident.category.as_str(),
                    incident.status.as_str(),
                    incident.description,
                    id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_incident(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM cyber_incidents WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// All incidents, newest first.
    pub fn list_incidents(&self) -> Result<Vec<Incident>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, incident_id, timestamp, severity, category, status, description
                 FROM cyber_incidents ORDER BY timestamp DESC",
            )?;
            let rows = stmt
                .query_map([], map_incident)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_incidents(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM cyber_incidents", [], |r| r.get(0))?;
            Ok(count)
        })
    }

    /// Incidents still being worked: status Open or In Progress.
    pub fn count_open_incidents(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM cyber_incidents WHERE status IN ('Open', 'In Progress')",
                [],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn incidents_by_category(&self) -> Result<Vec<LabelCount>> {
        self.with_conn(|conn| {
            Ok(label_counts(
                conn,
                "SELECT category, COUNT(*) FROM cyber_incidents GROUP BY category ORDER BY category",
            )?)
        })
    }

    pub fn incidents_by_severity(&self) -> Result<Vec<LabelCount>> {
        self.with_conn(|conn| {
            Ok(label_counts(
                conn,
                "SELECT severity, COUNT(*) FROM cyber_incidents GROUP BY severity ORDER BY severity",
            )?)
        })
    }

    pub fn incidents_by_status(&self) -> Result<Vec<LabelCount>> {
        self.with_conn(|conn| {
            Ok(label_counts(
                conn,
                "SELECT status, COUNT(*) FROM cyber_incidents GROUP BY status ORDER BY status",
            )?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_types::models::{IncidentCategory, IncidentStatus, Severity};

    fn incident(incident_id: i64, severity: Severity, status: IncidentStatus) -> NewIncident {
        NewIncident {
            incident_id,
            timestamp: format!("2024-01-{:02} 10:00:00", incident_id % 28 + 1),
            severity,
            category: IncidentCategory::Phishing,
            status,
            description: "suspicious login email".to_string(),
        }
    }

    #[test]
    fn create_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let new = incident(1001, Severity::High, IncidentStatus::Open);
        db.insert_incident(&new).unwrap();

        let all = db.list_incidents().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].incident_id, 1001);
        assert_eq!(all[0].severity, Severity::High);
        assert_eq!(all[0].category, IncidentCategory::Phishing);
        assert_eq!(all[0].description, "suspicious login email");
    }

    #[test]
    fn update_replaces_the_row() {
        let db = Database::open_in_memory().unwrap();
        db.insert_incident(&incident(1, Severity::Low, IncidentStatus::Open))
            .unwrap();
        let id = db.list_incidents().unwrap()[0].id;

        let mut edited = incident(1, Severity::Critical, IncidentStatus::Resolved);
        edited.description = "escalated after triage".to_string();
        db.update_incident(id, &edited).unwrap();

        let all = db.list_incidents().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].severity, Severity::Critical);
        assert_eq!(all[0].status, IncidentStatus::Resolved);
        assert_eq!(all[0].description, "escalated after triage");
    }

    #[test]
    fn update_of_missing_id_is_a_noop() {
        let db = Database::open_in_memory().unwrap();
        db.update_incident(999, &incident(1, Severity::Low, IncidentStatus::Open))
            .unwrap();
        assert!(db.list_incidents().unwrap().is_empty());
    }

    #[test]
    fn delete_removes_the_row() {
        let db = Database::open_in_memory().unwrap();
        db.insert_incident(&incident(1, Severity::Low, IncidentStatus::Open))
            .unwrap();
        let id = db.list_incidents().unwrap()[0].id;

        db.delete_incident(id).unwrap();
        assert!(db.list_incidents().unwrap().is_empty());

        // Absent id: still fine
        db.delete_incident(id).unwrap();
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for (iid, ts) in [(1, "2024-01-05 09:00:00"), (2, "2024-03-01 09:00:00"), (3, "2024-02-11 09:00:00")] {
            let mut new = incident(iid, Severity::Low, IncidentStatus::Open);
            new.timestamp = ts.to_string();
            db.insert_incident(&new).unwrap();
        }

        let ids: Vec<i64> = db.list_incidents().unwrap().iter().map(|i| i.incident_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn severity_counts_and_open_count() {
        let db = Database::open_in_memory().unwrap();
        for (severity, status) in [
            (Severity::High, IncidentStatus::Open),
            (Severity::Critical, IncidentStatus::Closed),
            (Severity::Low, IncidentStatus::InProgress),
            (Severity::High, IncidentStatus::Resolved),
        ] {
            db.insert_incident(&incident(1, severity, status)).unwrap();
        }

        assert_eq!(db.count_incidents().unwrap(), 4);
        assert_eq!(db.count_open_incidents().unwrap(), 2);

        let by_severity = db.incidents_by_severity().unwrap();
        let get = |label: &str| {
            by_severity
                .iter()
                .find(|c| c.label == label)
                .map(|c| c.count)
                .unwrap_or(0)
        };
        assert_eq!(get("High"), 2);
        assert_eq!(get("Critical"), 1);
        assert_eq!(get("Low"), 1);
        assert_eq!(get("Medium"), 0);
    }

    #[test]
    fn aggregates_do_not_mutate() {
        let db = Database::open_in_memory().unwrap();
        db.insert_incident(&incident(1, Severity::Low, IncidentStatus::Open))
            .unwrap();
        db.incidents_by_category().unwrap();
        db.incidents_by_status().unwrap();
        db.count_open_incidents().unwrap();
        assert_eq!(db.count_incidents().unwrap(), 1);
    }
}
