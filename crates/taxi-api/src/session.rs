//! # Login Sessions
//!
//! A session binds a random token to a driver. The token travels in the
//! `sessionid` cookie or as a bearer token. Sessions live in memory only;
//! a restart logs everyone out.
//!
//! A session expires [`SESSION_MAX_AGE_DAYS`] days after login. Expired
//! sessions are no longer returned and are pruned on the next login.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand_core::{OsRng, RngCore};
use taxi_core::DriverId;

const TOKEN_BYTES: usize = 32;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionid";

/// Session lifetime after login, two weeks.
pub const SESSION_MAX_AGE_DAYS: i64 = 14;

/// One logged-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub driver_id: DriverId,
    /// Number of index page visits during this session.
    pub num_visits: u64,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn is_live(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at < max_age
    }
}

/// Session token store keyed by the opaque token string.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    max_age: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_max_age(Duration::days(SESSION_MAX_AGE_DAYS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_age,
        }
    }

    /// Start a session for the driver and return its token. Expired
    /// sessions are dropped first.
    pub fn create(&self, driver_id: DriverId) -> String {
        let token = generate_token();
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.is_live(self.max_age, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "expired sessions pruned");
        }
        sessions.insert(
            token.clone(),
            Session {
                driver_id,
                num_visits: 0,
                created_at: now,
            },
        );
        token
    }

    /// The live session for `token`.
    pub fn get(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        self.sessions
            .read()
            .get(token)
            .filter(|s| s.is_live(self.max_age, now))
            .cloned()
    }

    /// End one session. Returns whether it existed.
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }

    /// End every session of the driver. Returns how many ended.
    pub fn remove_for_driver(&self, driver_id: DriverId) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.driver_id != driver_id);
        before - sessions.len()
    }

    /// Count an index visit and return the new total, or `None` when the
    /// session has ended or expired.
    pub fn record_visit(&self, token: &str) -> Option<u64> {
        let now = Utc::now();
        self.sessions
            .write()
            .get_mut(token)
            .filter(|s| s.is_live(self.max_age, now))
            .map(|s| {
                s.num_visits += 1;
                s.num_visits
            })
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 32 random bytes from the OS, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn create_and_lookup() {
        let store = SessionStore::new();
        let token = store.create(DriverId::new(4));
        let session = store.get(&token).unwrap();
        assert_eq!(session.driver_id, DriverId::new(4));
        assert_eq!(session.num_visits, 0);
        assert!(store.get("unknown").is_none());
    }

    #[test]
    fn visits_count_per_session() {
        let store = SessionStore::new();
        let a = store.create(DriverId::new(1));
        let b = store.create(DriverId::new(1));
        assert_eq!(store.record_visit(&a), Some(1));
        assert_eq!(store.record_visit(&a), Some(2));
        assert_eq!(store.record_visit(&b), Some(1));
        assert_eq!(store.record_visit("gone"), None);
    }

    #[test]
    fn remove_for_driver_ends_only_that_driver() {
        let store = SessionStore::new();
        store.create(DriverId::new(1));
        store.create(DriverId::new(1));
        let other = store.create(DriverId::new(2));
        assert_eq!(store.remove_for_driver(DriverId::new(1)), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&other).is_some());
    }

    fn backdate(store: &SessionStore, token: &str, age: Duration) {
        if let Some(session) = store.sessions.write().get_mut(token) {
            session.created_at = Utc::now() - age;
        }
    }

    #[test]
    fn expired_session_is_not_returned() {
        let store = SessionStore::new();
        let token = store.create(DriverId::new(1));
        backdate(&store, &token, Duration::days(SESSION_MAX_AGE_DAYS) + Duration::seconds(1));
        assert!(store.get(&token).is_none());
        assert_eq!(store.record_visit(&token), None);
    }

    #[test]
    fn session_just_inside_max_age_is_live() {
        let store = SessionStore::new();
        let token = store.create(DriverId::new(1));
        backdate(&store, &token, Duration::days(SESSION_MAX_AGE_DAYS) - Duration::minutes(1));
        assert!(store.get(&token).is_some());
        assert_eq!(store.record_visit(&token), Some(1));
    }

    #[test]
    fn login_prunes_expired_sessions() {
        let store = SessionStore::with_max_age(Duration::hours(1));
        let old = store.create(DriverId::new(1));
        let fresh = store.create(DriverId::new(2));
        backdate(&store, &old, Duration::hours(2));
        assert_eq!(store.len(), 2);

        store.create(DriverId::new(3));
        assert_eq!(store.len(), 2);
        assert!(store.get(&fresh).is_some());
        assert!(!store.remove(&old));
    }

    #[test]
    fn remove_single_session() {
        let store = SessionStore::new();
        let token = store.create(DriverId::new(1));
        assert!(store.remove(&token));
        assert!(!store.remove(&token));
        assert!(store.is_empty());
    }
}
