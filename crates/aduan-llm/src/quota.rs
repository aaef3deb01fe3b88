use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Stop handing requests to a credential once it has burned this share of
/// its daily allowance. The remainder is headroom for retries already in
/// flight when the threshold is crossed.
pub const CRITICAL_USAGE: f64 = 0.95;

/// Consecutive-ish error count that takes a credential out of rotation for
/// the rest of the day. Successes walk the counter back down.
pub const ERROR_DISABLE_THRESHOLD: u32 = 3;

/// Which of the two configured credentials a request was (or should be)
/// billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Primary,
    Secondary,
}

impl CredentialKind {
    pub fn other(&self) -> CredentialKind {
        match self {
            CredentialKind::Primary => CredentialKind::Secondary,
            CredentialKind::Secondary => CredentialKind::Primary,
        }
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialKind::Primary => write!(f, "primary"),
            CredentialKind::Secondary => write!(f, "secondary"),
        }
    }
}

/// One credential's counters for the current day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDay {
    #[serde(default)]
    pub requests_today: u64,
    #[serde(default)]
    pub tokens_today: u64,
    #[serde(default)]
    pub errors_today: u32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub last_error: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,
}

fn default_available() -> bool {
    true
}

impl Default for CredentialDay {
    fn default() -> Self {
        Self {
            requests_today: 0,
            tokens_today: 0,
            errors_today: 0,
            is_available: true,
            last_error: None,
            last_success: None,
        }
    }
}

/// Full ledger state, persisted as one JSON document. The date field makes
/// the snapshot self-describing: anything loaded with a stale date is
/// discarded wholesale rather than patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub date: NaiveDate,
    #[serde(default)]
    pub primary: CredentialDay,
    #[serde(default)]
    pub secondary: CredentialDay,
    #[serde(default)]
    pub fallbacks_today: u64,
}

impl LedgerSnapshot {
    pub fn fresh(date: NaiveDate) -> Self {
        Self {
            date,
            primary: CredentialDay::default(),
            secondary: CredentialDay::default(),
            fallbacks_today: 0,
        }
    }

    fn day(&self, kind: CredentialKind) -> &CredentialDay {
        match kind {
            CredentialKind::Primary => &self.primary,
            CredentialKind::Secondary => &self.secondary,
        }
    }

    fn day_mut(&mut self, kind: CredentialKind) -> &mut CredentialDay {
        match kind {
            CredentialKind::Primary => &mut self.primary,
            CredentialKind::Secondary => &mut self.secondary,
        }
    }
}

/// Where ledger snapshots go between process restarts. Persistence is
/// advisory: a store that fails to save must not take the chat down.
pub trait QuotaStore: Send + Sync {
    fn load(&self) -> Option<LedgerSnapshot>;
    fn save(&self, snapshot: &LedgerSnapshot);
}

/// JSON file store with write-to-temp-then-rename saves so a crash mid-write
/// leaves the previous snapshot intact.
pub struct FileQuotaStore {
    path: PathBuf,
}

impl FileQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuotaStore for FileQuotaStore {
    fn load(&self) -> Option<LedgerSnapshot> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable quota snapshot");
                None
            }
        }
    }

    fn save(&self, snapshot: &LedgerSnapshot) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = self.path.with_extension("json.tmp");
            let body = serde_json::to_string_pretty(snapshot).unwrap_or_default();
            std::fs::write(&tmp, body)?;
            std::fs::rename(&tmp, &self.path)
        })();
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failed to persist quota snapshot");
        }
    }
}

/// In-memory store for tests. Cloning shares the underlying slot so one
/// "file" can be handed to multiple ledger instances.
#[derive(Clone, Default)]
pub struct MemoryQuotaStore {
    inner: Arc<Mutex<Option<LedgerSnapshot>>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preloaded(snapshot: LedgerSnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(snapshot))),
        }
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn load(&self) -> Option<LedgerSnapshot> {
        self.inner.lock().clone()
    }

    fn save(&self, snapshot: &LedgerSnapshot) {
        *self.inner.lock() = Some(snapshot.clone());
    }
}

/// Daily request accounting for the two credentials, plus the rules for
/// which credential a new request should use.
///
/// - A credential is selectable while it is under [`CRITICAL_USAGE`] of its
///   limit and has not been disabled.
/// - A rate-limit response disables the credential immediately for the rest
///   of the day; other errors disable it after [`ERROR_DISABLE_THRESHOLD`].
/// - Each success walks the error counter back down by one and re-enables
///   the credential.
/// - On the first operation of a new day the whole ledger resets.
pub struct QuotaLedger {
    primary_limit: Option<u64>,
    secondary_limit: Option<u64>,
    store: Box<dyn QuotaStore>,
    state: Mutex<LedgerSnapshot>,
}

impl QuotaLedger {
    pub fn new(
        primary_limit: Option<u64>,
        secondary_limit: Option<u64>,
        store: Box<dyn QuotaStore>,
    ) -> Self {
        let today = Utc::now().date_naive();
        let state = store.load().unwrap_or_else(|| LedgerSnapshot::fresh(today));
        Self {
            primary_limit,
            secondary_limit,
            store,
            state: Mutex::new(state),
        }
    }

    fn limit_for(&self, kind: CredentialKind) -> Option<u64> {
        match kind {
            CredentialKind::Primary => self.primary_limit,
            CredentialKind::Secondary => self.secondary_limit,
        }
    }

    fn roll_day(&self, snapshot: &mut LedgerSnapshot) {
        let today = Utc::now().date_naive();
        if snapshot.date != today {
            info!(from = %snapshot.date, to = %today, "daily quota reset");
            *snapshot = LedgerSnapshot::fresh(today);
            self.store.save(snapshot);
        }
    }

    fn selectable(&self, snapshot: &LedgerSnapshot, kind: CredentialKind) -> bool {
        let Some(limit) = self.limit_for(kind) else {
            return false;
        };
        let day = snapshot.day(kind);
        day.is_available && (day.requests_today as f64) < (limit as f64) * CRITICAL_USAGE
    }

    /// The credential a new request should use, primary first.
    pub fn active(&self) -> Option<CredentialKind> {
        let mut state = self.state.lock();
        self.roll_day(&mut state);
        if self.selectable(&state, CredentialKind::Primary) {
            Some(CredentialKind::Primary)
        } else if self.selectable(&state, CredentialKind::Secondary) {
            Some(CredentialKind::Secondary)
        } else {
            None
        }
    }

    /// Like [`active`](Self::active) but skipping a credential that just
    /// failed, so a rate-limited retry lands on the other one.
    pub fn active_avoiding(&self, avoid: CredentialKind) -> Option<CredentialKind> {
        let mut state = self.state.lock();
        self.roll_day(&mut state);
        let other = avoid.other();
        if self.selectable(&state, other) {
            Some(other)
        } else {
            None
        }
    }

    pub fn record_success(&self, kind: CredentialKind, tokens: u64) {
        let mut state = self.state.lock();
        self.roll_day(&mut state);
        let day = state.day_mut(kind);
        day.requests_today += 1;
        day.tokens_today += tokens;
        day.errors_today = day.errors_today.saturating_sub(1);
        day.is_available = true;
        day.last_success = Some(Utc::now());
        self.store.save(&state);
    }

    pub fn record_error(&self, kind: CredentialKind, rate_limited: bool) {
        let mut state = self.state.lock();
        self.roll_day(&mut state);
        let day = state.day_mut(kind);
        day.requests_today += 1;
        day.last_error = Some(Utc::now());
        if rate_limited {
            day.is_available = false;
            warn!(credential = %kind, "credential disabled for the day after rate limit");
        } else {
            day.errors_today += 1;
            if day.errors_today >= ERROR_DISABLE_THRESHOLD {
                day.is_available = false;
                warn!(
                    credential = %kind,
                    errors = day.errors_today,
                    "credential disabled for the day after repeated errors"
                );
            }
        }
        self.store.save(&state);
    }

    /// Counts a turn that had to be answered with canned text because no
    /// credential was usable.
    pub fn record_fallback(&self) {
        let mut state = self.state.lock();
        self.roll_day(&mut state);
        state.fallbacks_today += 1;
        self.store.save(&state);
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut state = self.state.lock();
        self.roll_day(&mut state);
        state.clone()
    }
}
