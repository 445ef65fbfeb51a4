//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{Duration, Utc};
use snippetbox_core::{ModelError, Snippet, SnippetId, User, UserId};

use super::{
    SessionRecord, SessionStore, SessionToken, SnippetStore, StoreResult, UserStore, LATEST_LIMIT,
};
use crate::crypto::{hash_password, verify_password};

/// In-memory snippet store
pub struct InMemorySnippetStore {
    snippets: RwLock<HashMap<SnippetId, Snippet>>,
    next_id: AtomicI64,
}

impl InMemorySnippetStore {
    pub fn new() -> Self {
        Self {
            snippets: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemorySnippetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetStore for InMemorySnippetStore {
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> StoreResult<SnippetId> {
        let id = SnippetId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let created = Utc::now();
        let snippet = Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + Duration::days(expires_days),
        };
        self.snippets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, snippet);
        Ok(id)
    }

    fn get(&self, id: SnippetId) -> StoreResult<Snippet> {
        let snippets = self.snippets.read().unwrap_or_else(PoisonError::into_inner);
        match snippets.get(&id) {
            Some(snippet) if !snippet.is_expired(Utc::now()) => Ok(snippet.clone()),
            _ => Err(ModelError::NoRecord),
        }
    }

    fn latest(&self) -> StoreResult<Vec<Snippet>> {
        let now = Utc::now();
        let snippets = self.snippets.read().unwrap_or_else(PoisonError::into_inner);
        let mut latest: Vec<Snippet> = snippets
            .values()
            .filter(|s| !s.is_expired(now))
            .cloned()
            .collect();
        latest.sort_by(|a, b| b.id.0.cmp(&a.id.0));
        latest.truncate(LATEST_LIMIT);
        Ok(latest)
    }
}

/// In-memory user store
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
    next_id: AtomicI64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryUserStore {
    fn insert(&self, name: &str, email: &str, password: &str) -> StoreResult<UserId> {
        let normalized = email.to_lowercase();
        let hashed_password =
            hash_password(password).map_err(|e| ModelError::Storage(e.to_string()))?;

        // Check and insert under one write lock so two signups can't both win
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.values().any(|u| u.email == normalized) {
            return Err(ModelError::DuplicateEmail);
        }

        let id = UserId(self.next_id.fetch_add(1, Ordering::SeqCst));
        users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                email: normalized,
                hashed_password,
                created: Utc::now(),
            },
        );
        Ok(id)
    }

    fn authenticate(&self, email: &str, password: &str) -> StoreResult<UserId> {
        let normalized = email.to_lowercase();
        let user = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|u| u.email == normalized)
            .cloned()
            .ok_or(ModelError::InvalidCredentials)?;

        let valid = verify_password(password, &user.hashed_password)
            .map_err(|e| ModelError::Storage(e.to_string()))?;
        if !valid {
            return Err(ModelError::InvalidCredentials);
        }

        Ok(user.id)
    }

    fn exists(&self, id: UserId) -> StoreResult<bool> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id))
    }
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionToken, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records, expired ones included
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn find(&self, token: &SessionToken) -> StoreResult<Option<SessionRecord>> {
        Ok(self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned())
    }

    fn commit(&self, record: &SessionRecord) -> StoreResult<()> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, token: &SessionToken) -> StoreResult<()> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
        Ok(())
    }

    fn delete_expired(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
