use skymarshal_client::AuthManager;
use skymarshal_core::deletion::DeletionEngine;
use skymarshal_core::store::ContentStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Per-login service bundle: one authenticated client plus the engines that
/// ride on it.
pub struct UserSession {
    pub session_id: String,
    pub handle: String,
    pub did: String,
    pub auth: Arc<AuthManager>,
    pub store: Arc<ContentStore>,
    pub deletion: Arc<DeletionEngine>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub used_regular_password: bool,
    pub json_path: Mutex<Option<PathBuf>>,
    pub car_path: Mutex<Option<PathBuf>>,
    last_accessed: Mutex<Instant>,
}

impl UserSession {
    pub fn touch(&self) {
        *self.last_accessed.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    pub fn last_accessed(&self) -> Instant {
        *self.last_accessed.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.last_accessed().elapsed() > ttl
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub unique_handles: usize,
}

/// Thread-safe session map keyed by random hex ids. Every `get` touches the
/// session; expired entries are swept opportunistically and by the periodic
/// cleanup task.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<UserSession>>>,
    ttl: Duration,
    last_cleanup: Mutex<Instant>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        handle: &str,
        did: &str,
        auth: Arc<AuthManager>,
        store: Arc<ContentStore>,
        deletion: Arc<DeletionEngine>,
        used_regular_password: bool,
    ) -> Arc<UserSession> {
        let session = Arc::new(UserSession {
            session_id: skymarshal_common::get_random_hex(32),
            handle: handle.to_string(),
            did: did.to_string(),
            auth,
            store,
            deletion,
            created_at: chrono::Utc::now(),
            used_regular_password,
            json_path: Mutex::new(None),
            car_path: Mutex::new(None),
            last_accessed: Mutex::new(Instant::now()),
        });
        let mut sessions = self.lock();
        sessions.insert(session.session_id.clone(), Arc::clone(&session));
        drop(sessions);
        self.maybe_cleanup();
        session
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<UserSession>> {
        let mut sessions = self.lock();
        let session = sessions.get(session_id).cloned()?;
        if session.is_expired(self.ttl) {
            sessions.remove(session_id);
            return None;
        }
        session.touch();
        Some(session)
    }

    pub fn touch(&self, session_id: &str) {
        if let Some(session) = self.lock().get(session_id) {
            session.touch();
        }
    }

    pub fn clear(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    /// The most recently accessed live session for a handle.
    pub fn get_by_handle(&self, handle: &str) -> Option<Arc<UserSession>> {
        let sessions = self.lock();
        sessions
            .values()
            .filter(|session| session.handle == handle && !session.is_expired(self.ttl))
            .max_by_key(|session| session.last_accessed())
            .cloned()
    }

    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.lock();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| session.is_expired(self.ttl))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        *self.last_cleanup.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        if !expired.is_empty() {
            tracing::info!("cleaned up {} expired sessions", expired.len());
        }
        expired.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let sessions = self.lock();
        let active = sessions
            .values()
            .filter(|session| !session.is_expired(self.ttl))
            .count();
        let unique: std::collections::HashSet<&str> = sessions
            .values()
            .map(|session| session.handle.as_str())
            .collect();
        RegistryStats {
            total_sessions: sessions.len(),
            active_sessions: active,
            unique_handles: unique.len(),
        }
    }

    fn maybe_cleanup(&self) {
        let due = {
            let last = self.last_cleanup.lock().unwrap_or_else(|e| e.into_inner());
            last.elapsed() >= CLEANUP_INTERVAL
        };
        if due {
            self.cleanup_expired();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<UserSession>>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        SessionRegistry::new(DEFAULT_SESSION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skymarshal_client::XrpcClient;
    use skymarshal_core::models::UserSettings;

    fn make_session(registry: &SessionRegistry, handle: &str) -> Arc<UserSession> {
        let dir = std::env::temp_dir().join(format!(
            "skymarshal-session-test-{}",
            skymarshal_common::get_random_hex(8)
        ));
        let client = Arc::new(XrpcClient::new("http://localhost:1"));
        let auth = Arc::new(AuthManager::new(Arc::clone(&client), &dir));
        let store = Arc::new(ContentStore::new(
            Arc::clone(&client),
            UserSettings::default(),
            &dir,
            None,
        ));
        let deletion = Arc::new(DeletionEngine::new(Arc::clone(&client)));
        registry.create(handle, "did:plc:test", auth, store, deletion, false)
    }

    #[test]
    fn test_create_and_get_touches() {
        let registry = SessionRegistry::default();
        let session = make_session(&registry, "alice.bsky.social");
        assert_eq!(session.session_id.len(), 32);

        let fetched = registry.get(&session.session_id).unwrap();
        assert_eq!(fetched.handle, "alice.bsky.social");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_expired_sessions_are_dropped_on_get() {
        let registry = SessionRegistry::new(Duration::from_secs(0));
        let session = make_session(&registry, "alice.bsky.social");
        std::thread::sleep(Duration::from_millis(5));
        assert!(registry.get(&session.session_id).is_none());
        assert_eq!(registry.stats().total_sessions, 0);
    }

    #[test]
    fn test_get_by_handle_prefers_most_recent() {
        let registry = SessionRegistry::default();
        let first = make_session(&registry, "alice.bsky.social");
        let second = make_session(&registry, "alice.bsky.social");
        std::thread::sleep(Duration::from_millis(5));
        second.touch();

        let found = registry.get_by_handle("alice.bsky.social").unwrap();
        assert_eq!(found.session_id, second.session_id);
        assert_ne!(found.session_id, first.session_id);
    }

    #[test]
    fn test_clear_and_cleanup() {
        let registry = SessionRegistry::default();
        let session = make_session(&registry, "alice.bsky.social");
        registry.clear(&session.session_id);
        assert!(registry.get(&session.session_id).is_none());

        let short = SessionRegistry::new(Duration::from_secs(0));
        make_session(&short, "bob.bsky.social");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(short.cleanup_expired(), 1);
    }
}
