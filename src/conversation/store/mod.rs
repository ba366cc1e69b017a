#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{ConversationBuffer, ConversationConfig};

#[derive(Debug)]
struct Session {
    buffer: ConversationBuffer,
    last_access: Instant,
    /// Breaks ties between sessions touched at the same instant
    access_seq: u64,
}

/// Conversation buffers keyed by session id.
///
/// Sessions are created on first use. Once `max_sessions` is reached the
/// least recently used session is dropped to make room, and sessions idle
/// for longer than `idle_ttl_secs` are dropped on the next access.
#[derive(Debug)]
pub struct ConversationStore {
    config: ConversationConfig,
    sessions: HashMap<String, Session>,
    access_counter: u64,
}

impl Default for ConversationStore {
    #[inline]
    fn default() -> Self {
        Self::new(ConversationConfig::default())
    }
}

impl ConversationStore {
    #[inline]
    pub fn new(config: ConversationConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
            access_counter: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// The buffer for `session_id`, created if missing
    #[inline]
    pub fn session(&mut self, session_id: &str) -> &mut ConversationBuffer {
        self.session_at(session_id, Instant::now())
    }

    /// Like [`session`](Self::session) with an explicit access time
    #[inline]
    pub fn session_at(&mut self, session_id: &str, now: Instant) -> &mut ConversationBuffer {
        self.evict_idle(now);

        if !self.sessions.contains_key(session_id) {
            self.make_room();
            debug!("Creating conversation session {}", session_id);
        }

        self.access_counter += 1;
        let access_seq = self.access_counter;
        let config = &self.config;
        let session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                buffer: ConversationBuffer::with_config(config),
                last_access: now,
                access_seq,
            });
        session.last_access = now;
        session.access_seq = access_seq;
        &mut session.buffer
    }

    /// Look at a session without refreshing its access time
    #[inline]
    pub fn get(&self, session_id: &str) -> Option<&ConversationBuffer> {
        self.sessions.get(session_id).map(|s| &s.buffer)
    }

    #[inline]
    pub fn remove(&mut self, session_id: &str) -> Option<ConversationBuffer> {
        self.sessions.remove(session_id).map(|s| s.buffer)
    }

    /// Drop sessions idle for longer than the configured TTL, returning their ids
    #[inline]
    pub fn evict_idle(&mut self, now: Instant) -> Vec<String> {
        let Some(ttl) = self.config.idle_ttl_secs.map(Duration::from_secs) else {
            return Vec::new();
        };

        let expired = self
            .sessions
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.last_access) > ttl)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();

        for id in &expired {
            self.sessions.remove(id);
        }
        if !expired.is_empty() {
            info!("Evicted {} idle conversation sessions", expired.len());
        }
        expired
    }

    #[inline]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn make_room(&mut self) {
        while self.sessions.len() >= self.config.max_sessions.max(1) {
            let Some(oldest) = self
                .sessions
                .iter()
                .min_by_key(|(_, s)| (s.last_access, s.access_seq))
                .map(|(id, _)| id.clone())
            else {
                return;
            };
            self.sessions.remove(&oldest);
            info!("Evicted least recently used conversation session {}", oldest);
        }
    }
}
