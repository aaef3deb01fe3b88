use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use aduan_core::session::SessionContext;

/// In-memory registry of live sessions. Each entry carries its own async
/// mutex, so turns within one session serialize while distinct sessions
/// proceed in parallel.
pub struct SessionVault {
    sessions: DashMap<String, Arc<Mutex<SessionContext>>>,
    idle_timeout: Duration,
}

impl SessionVault {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Fetch the handle for a session, creating a fresh context on first use.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<SessionContext>> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionContext::new(session_id))))
            .clone()
    }

    /// Replace whatever was held for a session with a rebuilt context.
    pub fn install(&self, session: SessionContext) -> Arc<Mutex<SessionContext>> {
        let handle = Arc::new(Mutex::new(session.clone()));
        self.sessions.insert(session.session_id, handle.clone());
        handle
    }

    /// Drop a session entirely. The next message starts from scratch.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Remove sessions idle past the timeout. Entries currently locked are
    /// mid-turn and skipped; they will be re-checked on the next sweep.
    pub fn evict_idle(&self) -> usize {
        let now = Utc::now();
        let max_idle = chrono::Duration::from_std(self.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(1));

        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                if let Ok(session) = entry.value().try_lock() {
                    if session.idle_since(now) > max_idle {
                        return Some(session.session_id.clone());
                    }
                }
                None
            })
            .collect();

        let mut removed = 0;
        for id in stale {
            if self.sessions.remove(&id).is_some() {
                removed += 1;
                tracing::info!(session_id = %id, "Evicted idle session");
            }
        }
        removed
    }
}

/// Start a background task that periodically evicts idle sessions.
pub fn start_eviction_task(
    vault: Arc<SessionVault>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = vault.evict_idle();
            if removed > 0 {
                tracing::info!(removed = removed, "Idle session sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> SessionVault {
        SessionVault::new(Duration::from_secs(1800))
    }

    #[tokio::test]
    async fn get_or_create_returns_same_handle() {
        let vault = vault();
        let a = vault.get_or_create("sess-1");
        let b = vault.get_or_create("sess-1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(vault.count(), 1);

        let c = vault.get_or_create("sess-2");
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(vault.count(), 2);
    }

    #[tokio::test]
    async fn fresh_session_starts_empty() {
        let vault = vault();
        let handle = vault.get_or_create("sess-1");
        let session = handle.lock().await;
        assert_eq!(session.session_id, "sess-1");
        assert_eq!(session.message_count, 0);
    }

    #[tokio::test]
    async fn remove_forgets_state() {
        let vault = vault();
        {
            let handle = vault.get_or_create("sess-1");
            handle.lock().await.push_user("halo");
        }
        assert!(vault.remove("sess-1"));
        assert!(!vault.contains("sess-1"));

        let handle = vault.get_or_create("sess-1");
        assert_eq!(handle.lock().await.message_count, 0);
    }

    #[tokio::test]
    async fn remove_missing_is_false() {
        let vault = vault();
        assert!(!vault.remove("nope"));
    }

    #[tokio::test]
    async fn install_replaces_existing_handle() {
        let vault = vault();
        {
            let handle = vault.get_or_create("sess-1");
            handle.lock().await.push_user("satu");
        }

        let mut rebuilt = SessionContext::new("sess-1");
        rebuilt.push_user("a");
        rebuilt.push_user("b");
        let handle = vault.install(rebuilt);

        assert_eq!(handle.lock().await.message_count, 2);
        assert_eq!(vault.count(), 1);
        assert!(Arc::ptr_eq(&handle, &vault.get_or_create("sess-1")));
    }

    #[tokio::test]
    async fn evict_idle_removes_stale_sessions() {
        let vault = SessionVault::new(Duration::from_secs(60));
        {
            let handle = vault.get_or_create("stale");
            let mut session = handle.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::minutes(5);
        }
        vault.get_or_create("fresh");

        let removed = vault.evict_idle();
        assert_eq!(removed, 1);
        assert!(!vault.contains("stale"));
        assert!(vault.contains("fresh"));
    }

    #[tokio::test]
    async fn evict_idle_skips_locked_sessions() {
        let vault = SessionVault::new(Duration::from_secs(60));
        let handle = vault.get_or_create("busy");
        {
            let mut session = handle.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::minutes(5);
        }

        let guard = handle.lock().await;
        assert_eq!(vault.evict_idle(), 0);
        drop(guard);

        assert_eq!(vault.evict_idle(), 1);
    }
}
