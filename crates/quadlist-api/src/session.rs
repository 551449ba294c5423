use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};

pub const SESSION_COOKIE: &str = "quadlist_session";

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: i64,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Keyed session store: opaque token → user binding with a fixed 24-hour
/// expiry. One instance is constructed per process (and per test), injected
/// through the shared state — never a process-wide singleton. Sessions live
/// only as long as the process.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh session and return its token.
    pub fn create(&self, user_id: i64, email: &str) -> Result<String> {
        let token = generate_token();
        let data = SessionData {
            user_id,
            email: email.to_string(),
            expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
        };
        self.lock()?.insert(token.clone(), data);
        Ok(token)
    }

    /// Resolve a token, dropping it if it has expired.
    pub fn get(&self, token: &str) -> Result<Option<SessionData>> {
        let mut map = self.lock()?;
        let expired = matches!(map.get(token), Some(s) if s.expires_at <= Utc::now());
        if expired {
            map.remove(token);
            return Ok(None);
        }
        Ok(map.get(token).cloned())
    }

    /// Destroy a session unconditionally. Returns whether it existed.
    pub fn destroy(&self, token: &str) -> Result<bool> {
        Ok(self.lock()?.remove(token).is_some())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, SessionData>>> {
        self.inner
            .lock()
            .map_err(|e| anyhow!("session store lock poisoned: {}", e))
    }
}

/// 32 random bytes, hex-encoded: 256 bits of entropy. Used for session
/// tokens and email verification codes alike.
pub fn generate_token() -> String {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
