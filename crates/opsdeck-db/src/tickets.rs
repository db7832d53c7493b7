use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use opsdeck_types::api::{AssigneeAverage, AssigneeSummary, LabelCount, NewTicket};
use opsdeck_types::models::Ticket;

use crate::{Database, column_enum, label_counts};

fn map_ticket(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        priority: column_enum(2, row.get(2)?)?,
        description: row.get(3)?,
        status: column_enum(4, row.get(4)?)?,
        assigned_to: row.get(5)?,
        created_at: row.get(6)?,
        resolution_time_hours: row.get(7)?,
    })
}

/// Match the dashboard's display precision for averages.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl Database {
    pub fn insert_ticket(&self, ticket: &NewTicket) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO it_tickets
                    (ticket_id, priority, description, status, assigned_to, created_at,
                     resolution_time_hours)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    ticket.ticket_id,
                    ticket.priority.as_str(),
                    ticket.description,
                    ticket.status.as_str(),
                    ticket.assigned_to,
                    ticket.created_at,
                    ticket.resolution_time_hours,
                ],
            )?;
            Ok(())
        })
    }

    pub fn update_ticket(&self, id: i64, ticket: &NewTicket) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE it_tickets
                 SET ticket_id = ?1, priority = ?2, description = ?3, status = ?4,
                     assigned_to = ?5, created_at = ?6, resolution_time_hours = ?7
                 WHERE id = ?8",
                rusqlite::params![
                    ticket.ticket_id,
                    ticket.priority.as_str(),
                    ticket.description,
                    ticket.status.as_str(),
                    ticket.assigned_to,
                    ticket.created_at,
                    ticket.resolution_time_hours,
                    id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_ticket(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM it_tickets WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// All tickets, most recently opened first.
    pub fn list_tickets(&self) -> Result<Vec<Ticket>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ticket_id, priority, description, status, assigned_to, created_at,
                        resolution_time_hours
                 FROM it_tickets ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], map_ticket)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_tickets(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM it_tickets", [], |r| r.get(0))?;
            Ok(count)
        })
    }

    /// Tickets still being worked: status Open or In Progress. Waiting for
    /// User is parked on the requester, so it does not count here.
    pub fn count_open_tickets(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM it_tickets WHERE status IN ('Open', 'In Progress')",
                [],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// Mean resolution time across all tickets, rounded to one decimal;
    /// 0.0 when the table is empty.
    pub fn avg_resolution_hours(&self) -> Result<f64> {
        self.with_conn(|conn| {
            let avg: Option<f64> = conn.query_row(
                "SELECT AVG(resolution_time_hours) FROM it_tickets",
                [],
                |r| r.get(0),
            )?;
            Ok(avg.map(round1).unwrap_or(0.0))
        })
    }

    pub fn tickets_by_priority(&self) -> Result<Vec<LabelCount>> {
        self.with_conn(|conn| {
            Ok(label_counts(
                conn,
                "SELECT priority, COUNT(*) FROM it_tickets GROUP BY priority ORDER BY priority",
            )?)
        })
    }

    pub fn tickets_by_status(&self) -> Result<Vec<LabelCount>> {
        self.with_conn(|conn| {
            Ok(label_counts(
                conn,
                "SELECT status, COUNT(*) FROM it_tickets GROUP BY status ORDER BY status",
            )?)
        })
    }

    /// Ticket count and mean resolution per assignee, busiest first.
    pub fn assignee_summary(&self) -> Result<Vec<AssigneeSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT assigned_to, COUNT(*), AVG(resolution_time_hours)
                 FROM it_tickets GROUP BY assigned_to
                 ORDER BY COUNT(*) DESC, assigned_to",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AssigneeSummary {
                        assigned_to: row.get(0)?,
                        ticket_count: row.get(1)?,
                        avg_resolution_hours: round1(row.get(2)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The assignee with the highest mean resolution time. Ties go to the
    /// lexicographically first assignee name so the answer is stable.
    pub fn slowest_assignee(&self) -> Result<Option<AssigneeAverage>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT assigned_to, AVG(resolution_time_hours) AS avg_res
                     FROM it_tickets GROUP BY assigned_to
                     ORDER BY avg_res DESC, assigned_to ASC LIMIT 1",
                    [],
                    |row| {
                        Ok(AssigneeAverage {
                            assigned_to: row.get(0)?,
                            avg_resolution_hours: round1(row.get(1)?),
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_types::models::{Severity, TicketStatus};

    fn ticket(
        ticket_id: i64,
        assigned_to: &str,
        status: TicketStatus,
        resolution_time_hours: i64,
    ) -> NewTicket {
        NewTicket {
            ticket_id,
            priority: Severity::Medium,
            description: "printer offline".to_string(),
            status,
            assigned_to: assigned_to.to_string(),
            created_at: format!("2024-02-{:02} 08:30:00", ticket_id % 28 + 1),
            resolution_time_hours,
        }
    }

    #[test]
    fn create_update_delete_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.insert_ticket(&ticket(2000, "IT_Support_A", TicketStatus::Open, 0))
            .unwrap();

        let all = db.list_tickets().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ticket_id, 2000);
        assert_eq!(all[0].resolution_time_hours, 0);
        let id = all[0].id;

        db.update_ticket(id, &ticket(2000, "IT_Support_B", TicketStatus::Resolved, 6))
            .unwrap();
        let all = db.list_tickets().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].assigned_to, "IT_Support_B");
        assert_eq!(all[0].status, TicketStatus::Resolved);
        assert_eq!(all[0].resolution_time_hours, 6);

        db.delete_ticket(id).unwrap();
        assert!(db.list_tickets().unwrap().is_empty());
    }

    #[test]
    fn open_count_excludes_waiting_and_resolved() {
        let db = Database::open_in_memory().unwrap();
        db.insert_ticket(&ticket(1, "a", TicketStatus::Open, 0)).unwrap();
        db.insert_ticket(&ticket(2, "a", TicketStatus::InProgress, 0)).unwrap();
        db.insert_ticket(&ticket(3, "a", TicketStatus::WaitingForUser, 0)).unwrap();
        db.insert_ticket(&ticket(4, "a", TicketStatus::Resolved, 4)).unwrap();

        assert_eq!(db.count_tickets().unwrap(), 4);
        assert_eq!(db.count_open_tickets().unwrap(), 2);
    }

    #[test]
    fn avg_resolution_rounds_to_one_decimal() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.avg_resolution_hours().unwrap(), 0.0);

        db.insert_ticket(&ticket(1, "a", TicketStatus::Resolved, 1)).unwrap();
        db.insert_ticket(&ticket(2, "a", TicketStatus::Resolved, 2)).unwrap();
        db.insert_ticket(&ticket(3, "a", TicketStatus::Resolved, 2)).unwrap();
        // 5 / 3 = 1.666...
        assert_eq!(db.avg_resolution_hours().unwrap(), 1.7);
    }

    #[test]
    fn assignee_summary_orders_by_load() {
        let db = Database::open_in_memory().unwrap();
        db.insert_ticket(&ticket(1, "IT_Support_A", TicketStatus::Resolved, 2)).unwrap();
        db.insert_ticket(&ticket(2, "IT_Support_A", TicketStatus::Resolved, 4)).unwrap();
        db.insert_ticket(&ticket(3, "IT_Support_B", TicketStatus::Resolved, 10)).unwrap();

        let summary = db.assignee_summary().unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].assigned_to, "IT_Support_A");
        assert_eq!(summary[0].ticket_count, 2);
        assert_eq!(summary[0].avg_resolution_hours, 3.0);
        assert_eq!(summary[1].assigned_to, "IT_Support_B");
        assert_eq!(summary[1].avg_resolution_hours, 10.0);
    }

    #[test]
    fn slowest_assignee_breaks_ties_by_name() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.slowest_assignee().unwrap().is_none());

        db.insert_ticket(&ticket(1, "zoe", TicketStatus::Resolved, 8)).unwrap();
        db.insert_ticket(&ticket(2, "amy", TicketStatus::Resolved, 8)).unwrap();
        db.insert_ticket(&ticket(3, "bob", TicketStatus::Resolved, 2)).unwrap();

        let slowest = db.slowest_assignee().unwrap().unwrap();
        assert_eq!(slowest.assigned_to, "amy");
        assert_eq!(slowest.avg_resolution_hours, 8.0);
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for (tid, ts) in [(1, "2024-02-01 08:00:00"), (2, "2024-04-01 08:00:00"), (3, "2024-03-01 08:00:00")] {
            let mut t = ticket(tid, "a", TicketStatus::Open, 0);
            t.created_at = ts.to_string();
            db.insert_ticket(&t).unwrap();
        }
        let ids: Vec<i64> = db.list_tickets().unwrap().iter().map(|t| t.ticket_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
