//! Session storage for flash data carried across a redirect.
//!
//! DESIGN
//! ======
//! Sessions are identified by a random cookie token. The store is a trait so a
//! shared backend can replace the in-memory map; the adapter only needs
//! key/value access plus read-once flash entries.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

pub const SESSION_COOKIE: &str = "pagebridge_session";

/// Sessions kept by [`MemorySessionStore::new`] before the least recently
/// used one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

const SESSION_ID_LEN: usize = 64;

/// Session key holding the flash bag.
const FLASH_KEY: &str = "props";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// STORE
// =============================================================================

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, SessionError>;
    async fn set(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError>;
    async fn delete(&self, session_id: &str, key: &str) -> Result<(), SessionError>;
    /// Store a value that the next `get_flash` consumes.
    async fn flash(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError>;
    async fn get_flash(&self, session_id: &str, key: &str) -> Result<Option<Value>, SessionError>;
}

#[derive(Default)]
struct SessionData {
    values: HashMap<String, Value>,
    flash: HashMap<String, Value>,
}

impl SessionData {
    fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flash.is_empty()
    }
}

/// Process-local session store, bounded by LRU eviction. Sessions with no
/// values and no pending flash are dropped.
pub struct MemorySessionStore {
    sessions: Mutex<LruCache<String, SessionData>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    /// A zero bound falls back to [`DEFAULT_MAX_SESSIONS`].
    #[must_use]
    pub fn with_capacity(max_sessions: usize) -> Self {
        let bound = if max_sessions == 0 { DEFAULT_MAX_SESSIONS } else { max_sessions };
        let capacity = NonZeroUsize::new(bound).unwrap_or(NonZeroUsize::MIN);
        Self { sessions: Mutex::new(LruCache::new(capacity)) }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn drop_if_empty(sessions: &mut LruCache<String, SessionData>, session_id: &str) {
    if sessions.peek(session_id).is_some_and(SessionData::is_empty) {
        sessions.pop(session_id);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, SessionError> {
        let mut sessions = self.sessions.lock().await;
        Ok(sessions.get(session_id).and_then(|s| s.values.get(key).cloned()))
    }

    async fn set(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        sessions.get_or_insert_mut(session_id.to_owned(), SessionData::default).values.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.values.remove(key);
        }
        drop_if_empty(&mut sessions, session_id);
        Ok(())
    }

    async fn flash(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        sessions.get_or_insert_mut(session_id.to_owned(), SessionData::default).flash.insert(key.to_owned(), value);
        Ok(())
    }

    async fn get_flash(&self, session_id: &str, key: &str) -> Result<Option<Value>, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let value = sessions.get_mut(session_id).and_then(|s| s.flash.remove(key));
        drop_if_empty(&mut sessions, session_id);
        Ok(value)
    }
}

// =============================================================================
// FLASH BAG
// =============================================================================

/// Data surviving exactly one redirect: flash messages, field errors and old input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashBag {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flash: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Map<String, Value>>,
}

impl FlashBag {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flash.is_empty() && self.errors.is_empty() && self.old.as_ref().is_none_or(Map::is_empty)
    }
}

/// Write `bag` for the next request on this session. Empty bags are skipped.
///
/// # Errors
///
/// Returns the store's error if the write fails.
pub async fn store_flash(store: &dyn SessionStore, session_id: &str, bag: &FlashBag) -> Result<(), SessionError> {
    if bag.is_empty() {
        return Ok(());
    }
    store.flash(session_id, FLASH_KEY, serde_json::to_value(bag)?).await
}

/// Take the flash bag left by the previous request, if any.
///
/// # Errors
///
/// Returns an error if the store fails or the stored payload is malformed.
pub async fn take_flash(store: &dyn SessionStore, session_id: &str) -> Result<Option<FlashBag>, SessionError> {
    match store.get_flash(session_id, FLASH_KEY).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

// =============================================================================
// TOKENS
// =============================================================================

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex session id.
#[must_use]
pub fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Whether a client-supplied cookie value has the shape of a generated id.
#[must_use]
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
