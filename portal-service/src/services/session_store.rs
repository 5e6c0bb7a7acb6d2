//! In-memory session registry.
//!
//! Each session is exclusively owned by its creator; the store itself is
//! shared across request handlers, so mutation goes through a closure that
//! runs under the map's entry guard.

use crate::models::session::Session;
use dashmap::DashMap;

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.session_id.clone(), session);
    }

    /// Snapshot a session by id.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|s| s.value().clone())
    }

    /// Run `f` against the live session under the entry guard. Returns
    /// `None` if the session does not exist. Do not hold the guard across
    /// awaits: callers snapshot inside the closure and do slow work after.
    pub fn with_session_mut<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Option<T> {
        self.sessions.get_mut(session_id).map(|mut s| f(s.value_mut()))
    }

    pub fn remove(&self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::MessageRole;
    use crate::models::tenant::TenantClass;

    fn session() -> Session {
        Session::new("acme".into(), TenantClass::Standard, "ctx".into(), 1)
    }

    #[test]
    fn insert_then_get_round_trips() {
        let store = SessionStore::new();
        let s = session();
        let id = s.session_id.clone();
        store.insert(s);

        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.tenant_id, "acme");
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn mutation_is_visible_to_later_reads() {
        let store = SessionStore::new();
        let s = session();
        let id = s.session_id.clone();
        store.insert(s);

        store
            .with_session_mut(&id, |s| {
                s.add_message(MessageRole::User, "hello".into());
                s.query_count += 1;
            })
            .unwrap();

        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.messages.len(), 1);
        assert_eq!(fetched.query_count, 1);
    }

    #[test]
    fn remove_ends_the_session() {
        let store = SessionStore::new();
        let s = session();
        let id = s.session_id.clone();
        store.insert(s);

        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
    }
}
