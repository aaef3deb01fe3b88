use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use aduan_core::ids::ReportId;
use aduan_core::labels::CaseLabels;
use aduan_core::turns::{ChatTurn, Role};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Consent given, details still being collected.
    Draft,
    /// Handed to the Satgas queue; no further label updates expected.
    Submitted,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Submitted => write!(f, "submitted"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            other => Err(format!("unknown report status: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: ReportId,
    pub session_id: String,
    pub status: ReportStatus,
    pub labels: CaseLabels,
    pub cumulative_score: u32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone)]
pub struct ReportRepo {
    db: Database,
}

impl ReportRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a draft report for a consented session.
    #[instrument(skip(self, labels), fields(session_id))]
    pub fn create(
        &self,
        session_id: &str,
        labels: &CaseLabels,
        cumulative_score: u32,
    ) -> Result<ReportRow, StoreError> {
        let id = ReportId::new();
        let now = Utc::now().to_rfc3339();
        let labels_json = serde_json::to_string(labels)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, session_id, status, labels, cumulative_score, created_at, updated_at)
                 VALUES (?1, ?2, 'draft', ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.as_str(),
                    session_id,
                    labels_json,
                    cumulative_score,
                    now,
                    now,
                ],
            )?;

            Ok(ReportRow {
                id,
                session_id: session_id.to_string(),
                status: ReportStatus::Draft,
                labels: labels.clone(),
                cumulative_score,
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    /// Get a report by ID.
    #[instrument(skip(self), fields(report_id = %id))]
    pub fn get(&self, id: &ReportId) -> Result<ReportRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, status, labels, cumulative_score, created_at, updated_at
                 FROM reports WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_report(row),
                None => Err(StoreError::NotFound(format!("report {id}"))),
            }
        })
    }

    /// The most recent report for a session, if any. Used when a restored
    /// session claims consent so an existing draft is reused instead of
    /// duplicated.
    #[instrument(skip(self), fields(session_id))]
    pub fn latest_for_session(&self, session_id: &str) -> Result<Option<ReportRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, status, labels, cumulative_score, created_at, updated_at
                 FROM reports WHERE session_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
            )?;
            let mut rows = stmt.query([session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_report(row)?)),
                None => Ok(None),
            }
        })
    }

    /// List recent reports, newest first.
    #[instrument(skip(self))]
    pub fn list_recent(&self, limit: u32) -> Result<Vec<ReportRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, status, labels, cumulative_score, created_at, updated_at
                 FROM reports ORDER BY created_at DESC LIMIT ?1",
            )?;
            let mut rows = stmt.query([limit])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_report(row)?);
            }
            Ok(results)
        })
    }

    /// Replace the stored labels and score after a fresh extraction.
    #[instrument(skip(self, labels), fields(report_id = %id))]
    pub fn update_labels(
        &self,
        id: &ReportId,
        labels: &CaseLabels,
        cumulative_score: u32,
    ) -> Result<(), StoreError> {
        let labels_json = serde_json::to_string(labels)?;
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE reports SET labels = ?1, cumulative_score = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![labels_json, cumulative_score, now, id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("report {id}")));
            }
            Ok(())
        })
    }

    /// Mark a report as submitted to the Satgas queue.
    #[instrument(skip(self), fields(report_id = %id))]
    pub fn submit(&self, id: &ReportId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE reports SET status = 'submitted', updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("report {id}")));
            }
            Ok(())
        })
    }

    /// Append transcript turns to a report, continuing its sequence.
    #[instrument(skip(self, turns), fields(report_id = %id, count = turns.len()))]
    pub fn append_turns(&self, id: &ReportId, turns: &[ChatTurn]) -> Result<(), StoreError> {
        if turns.is_empty() {
            return Ok(());
        }
        self.db.with_conn(|conn| {
            let next_seq: i64 = conn.query_row(
                "SELECT COALESCE(MAX(seq), -1) + 1 FROM report_messages WHERE report_id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "INSERT INTO report_messages (report_id, seq, role, content, at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (i, turn) in turns.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    id.as_str(),
                    next_seq + i as i64,
                    turn.role.to_string(),
                    turn.content,
                    turn.at.to_rfc3339(),
                ])?;
            }
            Ok(())
        })
    }

    /// Full stored transcript for a report, in order.
    #[instrument(skip(self), fields(report_id = %id))]
    pub fn turns_for(&self, id: &ReportId) -> Result<Vec<ChatTurn>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT role, content, at FROM report_messages
                 WHERE report_id = ?1 ORDER BY seq",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            let mut turns = Vec::new();
            while let Some(row) = rows.next()? {
                let role_str: String = row_helpers::get(row, 0, "report_messages", "role")?;
                let role: Role = row_helpers::parse_enum(&role_str, "report_messages", "role")?;
                let content: String = row_helpers::get(row, 1, "report_messages", "content")?;
                let at_str: String = row_helpers::get(row, 2, "report_messages", "at")?;
                let at = row_helpers::parse_timestamp(&at_str, "report_messages", "at")?;
                turns.push(ChatTurn { role, content, at });
            }
            Ok(turns)
        })
    }
}

fn row_to_report(row: &rusqlite::Row<'_>) -> Result<ReportRow, StoreError> {
    let status_str: String = row_helpers::get(row, 2, "reports", "status")?;
    let labels_raw: String = row_helpers::get(row, 3, "reports", "labels")?;

    Ok(ReportRow {
        id: ReportId::from_raw(row_helpers::get::<String>(row, 0, "reports", "id")?),
        session_id: row_helpers::get(row, 1, "reports", "session_id")?,
        status: row_helpers::parse_enum(&status_str, "reports", "status")?,
        labels: row_helpers::parse_json(&labels_raw, "reports", "labels")?,
        cumulative_score: row_helpers::get::<i64>(row, 4, "reports", "cumulative_score")? as u32,
        created_at: row_helpers::get(row, 5, "reports", "created_at")?,
        updated_at: row_helpers::get(row, 6, "reports", "updated_at")?,
    })
}
