//! In-process session storage keyed by opaque id.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::session::state::Session;

#[derive(Debug)]
struct Entry {
    session: Session,
    last_seen: Instant,
}

impl Entry {
    fn is_idle(&self, max_idle: Duration) -> bool {
        self.last_seen.elapsed() > max_idle
    }
}

/// Thread-safe map of session id → session.
///
/// Only sessions that hold state are kept, and entries unused for longer
/// than `max_idle` are treated as gone.
#[derive(Debug)]
pub struct SessionStore {
    inner: DashMap<String, Entry>,
    max_idle: Duration,
}

impl SessionStore {
    pub fn new(max_idle: Duration) -> Self {
        Self {
            inner: DashMap::new(),
            max_idle,
        }
    }

    /// Copy of the live session for `id`, or a new empty one under a fresh id.
    ///
    /// The stored entry stays in place until [`SessionStore::save`] replaces it.
    pub fn checkout(&self, id: Option<&str>) -> (String, Session) {
        if let Some(id) = id {
            let live = self
                .inner
                .get(id)
                .filter(|entry| !entry.is_idle(self.max_idle))
                .map(|entry| entry.session.clone());
            if let Some(session) = live {
                return (id.to_string(), session);
            }
            self.inner.remove_if(id, |_, entry| entry.is_idle(self.max_idle));
        }
        (Uuid::new_v4().simple().to_string(), Session::default())
    }

    /// Store `session` under `id`. Empty sessions are dropped instead.
    ///
    /// Returns whether the session was kept.
    pub fn save(&self, id: String, session: Session) -> bool {
        if session.is_empty() {
            self.inner.remove(&id);
            return false;
        }
        self.inner.insert(
            id,
            Entry {
                session,
                last_seen: Instant::now(),
            },
        );
        true
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner
            .get(id)
            .filter(|entry| !entry.is_idle(self.max_idle))
            .map(|entry| entry.session.clone())
    }

    pub fn remove(&self, id: &str) {
        self.inner.remove(id);
    }

    /// Drop every idle session. Returns how many were removed.
    pub fn purge_idle(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_idle(self.max_idle));
        before.saturating_sub(self.inner.len())
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Notification;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    fn admin() -> Session {
        Session {
            role: Some("admin".into()),
            ..Session::default()
        }
    }

    #[test]
    fn test_checkout_unknown_id_starts_fresh() {
        let store = store();
        let (id, session) = store.checkout(Some("forged"));
        assert_ne!(id, "forged");
        assert!(!session.is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn test_checkout_and_save_round_trip() {
        let store = store();
        let (id, _) = store.checkout(None);
        assert!(store.save(id.clone(), admin()));

        let (same_id, session) = store.checkout(Some(&id));
        assert_eq!(same_id, id);
        assert!(session.is_admin());
    }

    #[test]
    fn test_checkout_leaves_session_in_place() {
        let store = store();
        store.save("abc".into(), admin());

        let (_, first) = store.checkout(Some("abc"));
        let (second_id, second) = store.checkout(Some("abc"));
        assert_eq!(second_id, "abc");
        assert!(first.is_admin());
        assert!(second.is_admin());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_sessions_are_not_kept() {
        let store = store();
        let (id, session) = store.checkout(None);
        assert!(!store.save(id, session));
        assert!(store.is_empty());

        // Emptied session is removed
        store.save("abc".into(), admin());
        assert!(!store.save("abc".into(), Session::default()));
        assert!(store.get("abc").is_none());

        // Flash alone is state worth keeping
        let mut session = Session::default();
        session.flash([Notification::info("Signed out")]);
        assert!(store.save("def".into(), session));
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::new(Duration::ZERO);
        store.save("abc".into(), admin());
        std::thread::sleep(Duration::from_millis(5));

        assert!(store.get("abc").is_none());
        let (id, session) = store.checkout(Some("abc"));
        assert_ne!(id, "abc");
        assert!(!session.is_admin());
        assert!(store.is_empty());

        store.save("def".into(), admin());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.purge_idle(), 1);
        assert!(store.is_empty());
    }
}
