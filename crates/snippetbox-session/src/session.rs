//! Per-request session record.

use serde_json::{Map, Value};

/// What happened to a session during a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing was written; no cookie is sent back.
    #[default]
    Unmodified,
    /// Values changed; the cookie is re-issued.
    Modified,
    /// The session was destroyed; the cookie is expired.
    Destroyed,
}

/// Key-value session state for one request.
///
/// Values are JSON values so anything that survives a JSON round trip can
/// be stored; the typed getters cover what the handlers need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    values: Map<String, Value>,
    deadline: Option<i64>,
    status: Status,
}

impl Session {
    /// Creates an empty session with no deadline yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restore(values: Map<String, Value>, deadline: i64) -> Self {
        Self {
            values,
            deadline: Some(deadline),
            status: Status::Unmodified,
        }
    }

    /// Stores `value` under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
        self.touch();
    }

    /// Returns the raw value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the value under `key` if it is an integer.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    /// Returns the value under `key` if it is a string.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Removes `key`. Removing an absent key does not modify the session.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Removes and returns the string under `key`.
    pub fn pop_string(&mut self, key: &str) -> Option<String> {
        match self.remove(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Drops every value and expires the cookie.
    pub fn destroy(&mut self) {
        self.values.clear();
        self.deadline = None;
        self.status = Status::Destroyed;
    }

    /// What happened to this session so far.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Absolute expiry in unix seconds, once one has been assigned.
    #[must_use]
    pub fn deadline(&self) -> Option<i64> {
        self.deadline
    }

    pub(crate) fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub(crate) fn ensure_deadline(&mut self, deadline: i64) -> i64 {
        *self.deadline.get_or_insert(deadline)
    }

    fn touch(&mut self) {
        self.status = Status::Modified;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_unmodified() {
        let session = Session::new();
        assert_eq!(session.status(), Status::Unmodified);
        assert!(!session.exists("flash"));
    }

    #[test]
    fn test_put_and_typed_getters() {
        let mut session = Session::new();
        session.put("authenticatedUserID", 7);
        session.put("flash", "hello");

        assert_eq!(session.get_int("authenticatedUserID"), Some(7));
        assert_eq!(session.get_string("flash"), Some("hello"));
        assert_eq!(session.get_int("flash"), None);
        assert_eq!(session.status(), Status::Modified);
    }

    #[test]
    fn test_remove_absent_key_keeps_status() {
        let mut session = Session::restore(Map::new(), 100);
        assert!(session.remove("authenticatedUserID").is_none());
        assert_eq!(session.status(), Status::Unmodified);
    }

    #[test]
    fn test_pop_string() {
        let mut session = Session::new();
        session.put("flash", "once");
        assert_eq!(session.pop_string("flash").as_deref(), Some("once"));
        assert_eq!(session.pop_string("flash"), None);
    }

    #[test]
    fn test_destroy() {
        let mut session = Session::restore(Map::new(), 100);
        session.put("authenticatedUserID", 1);
        session.destroy();

        assert!(!session.exists("authenticatedUserID"));
        assert_eq!(session.deadline(), None);
        assert_eq!(session.status(), Status::Destroyed);
    }

    #[test]
    fn test_ensure_deadline_keeps_original() {
        let mut session = Session::restore(Map::new(), 100);
        assert_eq!(session.ensure_deadline(500), 100);

        let mut fresh = Session::new();
        assert_eq!(fresh.ensure_deadline(500), 500);
    }
}
