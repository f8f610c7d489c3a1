//! Session identity store.
//!
//! Owns the single correlation token every outbound request is keyed by.

use std::collections::HashSet;

use pension_core::types::SessionId;

use crate::storage::Storage;

/// Storage key of the session id.
pub const SESSION_KEY: &str = "pension_session_id";

#[derive(Debug)]
pub struct SessionIdStore {
    storage: Storage,
    current: Option<SessionId>,
    /// Ids cleared during this process; never handed out again.
    retired: HashSet<SessionId>,
}

impl SessionIdStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            current: None,
            retired: HashSet::new(),
        }
    }

    /// The stored id, creating and persisting a new one if there is none.
    pub fn get_or_create(&mut self) -> SessionId {
        if let Some(id) = self.current() {
            return id;
        }

        let mut id = SessionId::generate();
        while self.retired.contains(&id) {
            id = SessionId::generate();
        }
        self.storage.set(SESSION_KEY, id.as_str());
        self.current = Some(id.clone());

        tracing::info!(session_id = %id, "Created session");
        id
    }

    /// The stored id, without creating one.
    pub fn current(&mut self) -> Option<SessionId> {
        if self.current.is_none() {
            self.current = self
                .storage
                .get(SESSION_KEY)
                .and_then(|raw| SessionId::parse(&raw))
                .filter(|id| !self.retired.contains(id));
        }
        self.current.clone()
    }

    /// Forget the current id. The next [`get_or_create`](Self::get_or_create)
    /// returns a different one.
    pub fn clear(&mut self) {
        let stored = self
            .storage
            .get(SESSION_KEY)
            .and_then(|raw| SessionId::parse(&raw));
        for id in self.current.take().into_iter().chain(stored) {
            tracing::debug!(session_id = %id, "Retiring session");
            self.retired.insert(id);
        }
        self.storage.remove(SESSION_KEY);
    }

    /// Replace the current id with a fresh one.
    pub fn rotate(&mut self) -> SessionId {
        self.clear();
        self.get_or_create()
    }
}
