use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use aduan_core::emergency::{EmergencyKind, Severity};
use aduan_core::ids::EmergencyLogId;

use crate::database::Database;
use crate::error::StoreError;
use crate::hashing::SessionHasher;
use crate::row_helpers;

/// Excerpt limits keep the log useful for follow-up without storing whole
/// disclosures.
pub const TRIGGER_MAX_CHARS: usize = 200;
pub const CONTEXT_MAX_CHARS: usize = 500;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmergencyRow {
    pub id: EmergencyLogId,
    pub session_hash: String,
    pub kind: EmergencyKind,
    pub severity: Severity,
    pub trigger_excerpt: String,
    pub context_excerpt: Option<String>,
    pub followed_up: bool,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Clone)]
pub struct EmergencyRepo {
    db: Database,
    hasher: Arc<SessionHasher>,
    retention: Duration,
}

impl EmergencyRepo {
    pub fn new(db: Database, hasher: Arc<SessionHasher>, retention: Duration) -> Self {
        Self {
            db,
            hasher,
            retention,
        }
    }

    /// Record a crisis detection. The session id is stored only as its
    /// monthly-salted hash.
    #[instrument(skip(self, session_id, trigger, context), fields(kind = %kind, severity = %severity))]
    pub fn log(
        &self,
        session_id: &str,
        kind: EmergencyKind,
        severity: Severity,
        trigger: &str,
        context: Option<&str>,
    ) -> Result<EmergencyRow, StoreError> {
        let id = EmergencyLogId::new();
        let session_hash = self.hasher.hash(session_id);
        let now = Utc::now();
        let created_at = now.to_rfc3339();
        let expires_at = (now + self.retention).to_rfc3339();
        let trigger_excerpt = truncate_chars(trigger, TRIGGER_MAX_CHARS);
        let context_excerpt = context.map(|c| truncate_chars(c, CONTEXT_MAX_CHARS));

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO emergency_log
                    (id, session_hash, kind, severity, trigger_excerpt, context_excerpt,
                     followed_up, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
                rusqlite::params![
                    id.as_str(),
                    session_hash,
                    kind.to_string(),
                    severity.to_string(),
                    trigger_excerpt,
                    context_excerpt,
                    created_at,
                    expires_at,
                ],
            )?;

            Ok(EmergencyRow {
                id,
                session_hash,
                kind,
                severity,
                trigger_excerpt,
                context_excerpt,
                followed_up: false,
                created_at,
                expires_at,
            })
        })
    }

    /// Unhandled, unexpired entries: most urgent first, then most recent.
    #[instrument(skip(self))]
    pub fn pending_followups(&self) -> Result<Vec<EmergencyRow>, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_hash, kind, severity, trigger_excerpt, context_excerpt,
                        followed_up, created_at, expires_at
                 FROM emergency_log
                 WHERE followed_up = 0 AND expires_at > ?1
                 ORDER BY CASE severity
                     WHEN 'critical' THEN 0
                     WHEN 'high' THEN 1
                     WHEN 'medium' THEN 2
                     ELSE 3 END,
                     created_at DESC",
            )?;
            let mut rows = stmt.query([now])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_emergency(row)?);
            }
            Ok(results)
        })
    }

    #[instrument(skip(self), fields(log_id = %id))]
    pub fn mark_followed_up(&self, id: &EmergencyLogId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE emergency_log SET followed_up = 1 WHERE id = ?1",
                [id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("emergency log {id}")));
            }
            Ok(())
        })
    }

    /// Delete unhandled entries past their retention window; followed-up
    /// entries are exempt. Returns how many rows were removed.
    #[instrument(skip(self))]
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM emergency_log WHERE followed_up = 0 AND expires_at <= ?1",
                [now],
            )?;
            Ok(removed)
        })
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn row_to_emergency(row: &rusqlite::Row<'_>) -> Result<EmergencyRow, StoreError> {
    let kind_str: String = row_helpers::get(row, 2, "emergency_log", "kind")?;
    let severity_str: String = row_helpers::get(row, 3, "emergency_log", "severity")?;

    Ok(EmergencyRow {
        id: EmergencyLogId::from_raw(row_helpers::get::<String>(row, 0, "emergency_log", "id")?),
        session_hash: row_helpers::get(row, 1, "emergency_log", "session_hash")?,
        kind: row_helpers::parse_enum(&kind_str, "emergency_log", "kind")?,
        severity: row_helpers::parse_enum(&severity_str, "emergency_log", "severity")?,
        trigger_excerpt: row_helpers::get(row, 4, "emergency_log", "trigger_excerpt")?,
        context_excerpt: row_helpers::get_opt(row, 5, "emergency_log", "context_excerpt")?,
        followed_up: row_helpers::get::<i64>(row, 6, "emergency_log", "followed_up")? != 0,
        created_at: row_helpers::get(row, 7, "emergency_log", "created_at")?,
        expires_at: row_helpers::get(row, 8, "emergency_log", "expires_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn setup_with_retention(retention: Duration) -> (EmergencyRepo, PathBuf) {
        let dir = std::env::temp_dir().join(format!("aduan-emergency-test-{}", uuid::Uuid::now_v7()));
        let hasher = Arc::new(SessionHasher::open(&dir.join("salt.json")).unwrap());
        let repo = EmergencyRepo::new(Database::in_memory().unwrap(), hasher, retention);
        (repo, dir)
    }

    fn setup() -> (EmergencyRepo, PathBuf) {
        setup_with_retention(Duration::hours(720))
    }

    #[test]
    fn log_stores_hash_not_session_id() {
        let (repo, dir) = setup();
        let row = repo
            .log(
                "browser-session-1",
                EmergencyKind::Suicide,
                Severity::High,
                "aku ingin mengakhiri hidupku",
                None,
            )
            .unwrap();

        assert!(row.id.as_str().starts_with("emg_"));
        assert!(!row.session_hash.contains("browser-session-1"));
        assert_eq!(row.kind, EmergencyKind::Suicide);
        assert!(!row.followed_up);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn same_session_links_within_month() {
        let (repo, dir) = setup();
        let a = repo
            .log("sess-1", EmergencyKind::SelfHarm, Severity::Medium, "melukai diriku", None)
            .unwrap();
        let b = repo
            .log("sess-1", EmergencyKind::Suicide, Severity::High, "ingin mati", None)
            .unwrap();
        let c = repo
            .log("sess-2", EmergencyKind::Suicide, Severity::High, "ingin mati", None)
            .unwrap();

        assert_eq!(a.session_hash, b.session_hash);
        assert_ne!(a.session_hash, c.session_hash);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn excerpts_are_truncated_on_char_boundaries() {
        let (repo, dir) = setup();
        let long_trigger = "é".repeat(250);
        let long_context = "kalimat panjang sekali ".repeat(40);
        let row = repo
            .log(
                "sess-1",
                EmergencyKind::Danger,
                Severity::High,
                &long_trigger,
                Some(&long_context),
            )
            .unwrap();

        assert_eq!(row.trigger_excerpt.chars().count(), TRIGGER_MAX_CHARS);
        assert_eq!(
            row.context_excerpt.as_ref().unwrap().chars().count(),
            CONTEXT_MAX_CHARS
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn pending_orders_by_severity_then_recency() {
        let (repo, dir) = setup();
        repo.log("s1", EmergencyKind::SelfHarm, Severity::Medium, "m", None).unwrap();
        repo.log("s2", EmergencyKind::Suicide, Severity::Critical, "c", None).unwrap();
        repo.log("s3", EmergencyKind::Danger, Severity::High, "h", None).unwrap();

        let pending = repo.pending_followups().unwrap();
        let severities: Vec<_> = pending.iter().map(|r| r.severity).collect();
        assert_eq!(severities, vec![Severity::Critical, Severity::High, Severity::Medium]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mark_followed_up_clears_pending() {
        let (repo, dir) = setup();
        let row = repo
            .log("s1", EmergencyKind::Suicide, Severity::High, "ingin mati", None)
            .unwrap();

        repo.mark_followed_up(&row.id).unwrap();
        assert!(repo.pending_followups().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mark_missing_entry_fails() {
        let (repo, dir) = setup();
        let result = repo.mark_followed_up(&EmergencyLogId::new());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn expired_entries_hidden_and_purged() {
        let (repo, dir) = setup_with_retention(Duration::hours(-1));
        repo.log("s1", EmergencyKind::Suicide, Severity::High, "ingin mati", None).unwrap();

        assert!(repo.pending_followups().unwrap().is_empty());
        assert_eq!(repo.purge_expired().unwrap(), 1);
        assert_eq!(repo.purge_expired().unwrap(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn followed_up_entries_survive_purge() {
        let (repo, dir) = setup_with_retention(Duration::hours(-1));
        let row = repo
            .log("s1", EmergencyKind::Suicide, Severity::High, "ingin mati", None)
            .unwrap();
        repo.mark_followed_up(&row.id).unwrap();

        assert_eq!(repo.purge_expired().unwrap(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unexpired_entries_survive_purge() {
        let (repo, dir) = setup();
        repo.log("s1", EmergencyKind::Danger, Severity::High, "dia di depan kosku", None).unwrap();

        assert_eq!(repo.purge_expired().unwrap(), 0);
        assert_eq!(repo.pending_followups().unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
