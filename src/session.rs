//! Session registry
//!
//! Each session owns one [`HistoryManager`]. Sessions live in memory only and
//! are dropped when discarded, when idle past the configured timeout, or when
//! the store is full and they are the least recently used.

use crate::memory::{HistoryConfig, HistoryManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Shared handle to one session's history. The mutex serializes requests
/// for the same session across the whole pipeline run.
pub type SessionHandle = Arc<Mutex<HistoryManager>>;

/// Bounds on how many sessions are kept and for how long
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_timeout: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

struct SessionEntry {
    handle: SessionHandle,
    last_used: Instant,
    /// Access order; larger is more recent
    last_tick: u64,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<Uuid, SessionEntry>,
    tick: u64,
}

impl Sessions {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Touch an existing session, returning its handle
    fn touch(&mut self, session_id: &Uuid) -> Option<SessionHandle> {
        let tick = self.next_tick();
        self.entries.get_mut(session_id).map(|entry| {
            entry.last_used = Instant::now();
            entry.last_tick = tick;
            entry.handle.clone()
        })
    }

    fn insert(&mut self, session_id: Uuid, handle: SessionHandle) {
        let tick = self.next_tick();
        self.entries.insert(
            session_id,
            SessionEntry {
                handle,
                last_used: Instant::now(),
                last_tick: tick,
            },
        );
    }

    fn evict_idle(&mut self, idle_timeout: Duration) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.last_used.elapsed() < idle_timeout);

        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s)", evicted);
        }
    }

    /// Drop least recently used sessions until one more fits under `max_sessions`
    fn make_room(&mut self, max_sessions: usize) {
        while !self.entries.is_empty() && self.entries.len() >= max_sessions {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_tick)
                .map(|(id, _)| *id);

            match oldest {
                Some(id) => {
                    self.entries.remove(&id);
                    debug!("Session {} evicted, store at capacity", id);
                }
                None => break,
            }
        }
    }
}

/// In-memory session store
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<Sessions>>,
    history_config: HistoryConfig,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(history_config: HistoryConfig) -> Self {
        Self::with_limits(history_config, SessionLimits::default())
    }

    pub fn with_limits(history_config: HistoryConfig, limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            history_config,
            limits,
        }
    }

    /// Start a new session with an empty history
    pub async fn create(&self) -> Uuid {
        let session_id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        self.admit(&mut sessions, session_id);

        info!("Session {} created", session_id);
        session_id
    }

    /// Look up a live session and mark it as used
    pub async fn get(&self, session_id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        sessions.evict_idle(self.limits.idle_timeout);
        sessions.touch(&session_id)
    }

    pub async fn get_or_create(&self, session_id: Uuid) -> SessionHandle {
        let mut sessions = self.sessions.write().await;
        sessions.evict_idle(self.limits.idle_timeout);

        if let Some(handle) = sessions.touch(&session_id) {
            return handle;
        }

        info!("Session {} created on first use", session_id);
        self.admit(&mut sessions, session_id)
    }

    /// End a session and drop its history. Returns false if it did not exist.
    pub async fn discard(&self, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.entries.remove(&session_id).is_some();

        if removed {
            info!("Session {} discarded", session_id);
        }

        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.entries.is_empty()
    }

    pub fn history_config(&self) -> &HistoryConfig {
        &self.history_config
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    fn admit(&self, sessions: &mut Sessions, session_id: Uuid) -> SessionHandle {
        sessions.evict_idle(self.limits.idle_timeout);
        sessions.make_room(self.limits.max_sessions);

        let handle = Arc::new(Mutex::new(HistoryManager::with_config(self.history_config)));
        sessions.insert(session_id, handle.clone());
        handle
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ConversationTurn;

    #[tokio::test]
    async fn test_create_get_discard() {
        let store = SessionStore::default();
        assert!(store.is_empty().await);

        let id = store.create().await;
        assert_eq!(store.len().await, 1);
        assert!(store.get(id).await.is_some());

        assert!(store.discard(id).await);
        assert!(store.get(id).await.is_none());
        assert!(!store.discard(id).await);
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_history() {
        let store = SessionStore::default();
        let id = Uuid::new_v4();

        {
            let handle = store.get_or_create(id).await;
            handle.lock().await.append(ConversationTurn::new("q", "a"));
        }

        let handle = store.get_or_create(id).await;
        assert_eq!(handle.lock().await.len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(HistoryConfig::default().with_window(1));
        let a = store.create().await;
        let b = store.create().await;

        let handle_a = store.get(a).await.unwrap();
        handle_a.lock().await.append(ConversationTurn::new("q1", "a1"));
        handle_a.lock().await.append(ConversationTurn::new("q2", "a2"));

        assert_eq!(handle_a.lock().await.len(), 1);
        assert!(store.get(b).await.unwrap().lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_idle_session_dropped() {
        let store = SessionStore::with_limits(
            HistoryConfig::default(),
            SessionLimits {
                idle_timeout: Duration::from_millis(20),
                max_sessions: 10,
            },
        );

        let idle = store.create().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        let fresh = store.create().await;

        assert!(store.get(idle).await.is_none());
        assert!(store.get(fresh).await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_least_recently_used_dropped_at_capacity() {
        let store = SessionStore::with_limits(
            HistoryConfig::default(),
            SessionLimits {
                idle_timeout: Duration::from_secs(60),
                max_sessions: 2,
            },
        );

        let a = store.create().await;
        let b = store.create().await;
        // Touch a so b becomes the least recently used
        assert!(store.get(a).await.is_some());

        let c = store.get_or_create(Uuid::new_v4()).await;
        drop(c);

        assert_eq!(store.len().await, 2);
        assert!(store.get(a).await.is_some());
        assert!(store.get(b).await.is_none());
    }

    #[tokio::test]
    async fn test_anonymous_traffic_stays_bounded() {
        let store = SessionStore::with_limits(
            HistoryConfig::default(),
            SessionLimits {
                idle_timeout: Duration::from_secs(60),
                max_sessions: 5,
            },
        );

        for _ in 0..50 {
            store.get_or_create(Uuid::new_v4()).await;
        }

        assert_eq!(store.len().await, 5);
    }
}
