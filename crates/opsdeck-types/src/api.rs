use serde::{Deserialize, Serialize};

use crate::models::{IncidentCategory, IncidentStatus, Role, Severity, TicketStatus};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by both register and login: the identity plus a bearer token
/// the client presents on every later call.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Record payloads --
//
// The New* types double as POST/PUT bodies and as CSV import rows; their
// serde field names are exactly the bulk-import column headers.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncident {
    pub incident_id: i64,
    pub timestamp: String,
    pub severity: Severity,
    pub category: IncidentCategory,
    pub status: IncidentStatus,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDataset {
    pub dataset_id: i64,
    pub name: String,
    #[serde(rename = "rows")]
    pub row_count: i64,
    #[serde(rename = "columns")]
    pub column_count: i64,
    pub uploaded_by: String,
    pub upload_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
    pub ticket_id: i64,
    pub priority: Severity,
    pub description: String,
    pub status: TicketStatus,
    pub assigned_to: String,
    pub created_at: String,
    pub resolution_time_hours: i64,
}

// -- Bulk import --

#[derive(Debug, Default, Deserialize)]
pub struct ImportRequest {
    /// CSV path override; when absent the entity's sample file under the
    /// configured data directory is used.
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub inserted: usize,
}

// -- Aggregates --

/// One bucket of a grouped count (by category, severity, status, priority).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploaderSummary {
    pub uploaded_by: String,
    pub dataset_count: i64,
    pub total_rows: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeSummary {
    pub assigned_to: String,
    pub ticket_count: i64,
    pub avg_resolution_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeAverage {
    pub assigned_to: String,
    pub avg_resolution_hours: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IncidentMetrics {
    pub total: i64,
    pub open: i64,
    pub by_category: Vec<LabelCount>,
    pub by_severity: Vec<LabelCount>,
    pub by_status: Vec<LabelCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetMetrics {
    pub total: i64,
    pub total_rows: i64,
    pub by_uploader: Vec<UploaderSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketMetrics {
    pub total: i64,
    pub open: i64,
    pub avg_resolution_hours: f64,
    pub by_priority: Vec<LabelCount>,
    pub by_status: Vec<LabelCount>,
    pub by_assignee: Vec<AssigneeSummary>,
    pub slowest_assignee: Option<AssigneeAverage>,
}

// -- Advisor --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AskRequest {
    pub prompt: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}
