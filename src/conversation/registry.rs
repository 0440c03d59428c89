//! Per-session conversation managers.
//!
//! The map lock is held only to look up or insert; each manager sits behind
//! its own async mutex, so turns for one session run one at a time while
//! other sessions proceed.
//!
//! Session ids are always minted here. A client-supplied id that the
//! registry does not know gets a fresh id rather than a session under the
//! client's choice. Sessions idle past the TTL are dropped, and past
//! `max_sessions` the least recently used one goes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::outbox::Outbox;

use super::interpreter::Interpreter;
use super::manager::ConversationManager;

pub type SharedManager = Arc<AsyncMutex<ConversationManager>>;

const DEFAULT_MAX_SESSIONS: usize = 1000;
const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3600);

struct Session {
    manager: SharedManager,
    last_used: Instant,
}

pub struct SessionRegistry {
    interpreter: Interpreter,
    outbox: Outbox,
    max_history: usize,
    max_sessions: usize,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new(interpreter: Interpreter, outbox: Outbox, max_history: usize) -> Self {
        Self {
            interpreter,
            outbox,
            max_history,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: DEFAULT_IDLE_TTL,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, max_sessions: usize, idle_ttl: Duration) -> Self {
        self.max_sessions = max_sessions.max(1);
        self.idle_ttl = idle_ttl;
        self
    }

    /// The manager for a known `id`, or a new session under a freshly
    /// minted id.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SharedManager) {
        let now = Instant::now();
        let mut sessions = self.lock();

        if let Some(id) = id {
            if let Some(session) = sessions.get_mut(&id) {
                session.last_used = now;
                return (id, session.manager.clone());
            }
        }

        self.evict(&mut sessions, now);

        let id = Uuid::new_v4();
        info!(session_id = %id, live = sessions.len() + 1, "new conversation session");
        let manager = Arc::new(AsyncMutex::new(ConversationManager::new(
            id,
            self.interpreter.clone(),
            self.outbox.clone(),
            self.max_history,
        )));
        sessions.insert(id, Session { manager: manager.clone(), last_used: now });
        (id, manager)
    }

    /// Look up without creating. Counts as use.
    pub fn get(&self, id: Uuid) -> Option<SharedManager> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id)?;
        session.last_used = Instant::now();
        Some(session.manager.clone())
    }

    /// Clear a session's conversation. Returns `false` if it does not exist.
    pub async fn reset(&self, id: Uuid) -> bool {
        match self.get(id) {
            Some(m) => {
                m.lock().await.reset();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn provider_name(&self) -> &'static str {
        self.interpreter.provider().name()
    }

    /// Drop idle sessions, then the least recently used until there is room
    /// for one more.
    fn evict(&self, sessions: &mut HashMap<Uuid, Session>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_used) < self.idle_ttl);

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_used)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, live = sessions.len(), "evicted conversation sessions");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
