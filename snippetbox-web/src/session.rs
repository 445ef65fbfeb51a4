//! Server-side sessions
//!
//! The browser only ever sees an opaque token in the `session` cookie. The
//! record behind it lives in a [`SessionStore`] and is loaded once per request
//! by [`load_and_save`], which hands handlers a [`Session`] through the
//! request extensions and writes any changes back after the handler ran.
//!
//! Requests carrying the same token are serialised: the middleware holds a
//! per-token lock from load to commit, so two concurrent requests can't
//! overwrite each other's changes. Requests for different tokens never
//! contend.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use tower_cookies::cookie::{time, SameSite};
use tower_cookies::{Cookie, Cookies};

use crate::crypto::generate_token;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{
    SessionData, SessionRecord, SessionStore, SessionToken, SnippetStore, StoreResult, UserStore,
};

pub const SESSION_COOKIE: &str = "session";

/// Default session lifetime, counted from creation
pub const DEFAULT_LIFETIME_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Unmodified,
    Modified,
    Destroyed,
}

#[derive(Debug)]
struct Inner {
    record: SessionRecord,
    status: Status,
    /// Not yet written to the store
    is_new: bool,
    /// Tokens to delete from the store on commit
    discarded: Vec<SessionToken>,
    lifetime: Duration,
}

/// Request-scoped handle on the current session.
///
/// Cheap to clone; all clones see the same state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

fn fresh_record(lifetime: Duration) -> SessionRecord {
    SessionRecord {
        token: SessionToken(generate_token()),
        data: SessionData {
            csrf_secret: generate_token(),
            values: Default::default(),
        },
        expires_at: Utc::now() + lifetime,
    }
}

impl Session {
    fn new(record: SessionRecord, is_new: bool, lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                record,
                status: Status::Unmodified,
                is_new,
                discarded: Vec::new(),
                lifetime,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> SessionToken {
        self.lock().record.token.clone()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.lock().record.expires_at
    }

    /// True until the session has been written to the store at least once
    pub fn is_new(&self) -> bool {
        self.lock().is_new
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().record.data.values.get(key).cloned()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.lock().record.data.values.contains_key(key)
    }

    pub fn put(&self, key: &str, value: impl Into<Value>) {
        let mut inner = self.lock();
        inner.record.data.values.insert(key.to_string(), value.into());
        inner.status = Status::Modified;
    }

    pub fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if inner.record.data.values.remove(key).is_some() {
            inner.status = Status::Modified;
        }
    }

    /// Read a string value and remove it, for one-time flash messages
    pub fn pop_string(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        let value = inner.record.data.values.remove(key)?;
        inner.status = Status::Modified;
        value.as_str().map(str::to_string)
    }

    /// Issue a new token for the same session data.
    ///
    /// The old token stops working once the request commits. Call this on
    /// every privilege change (login, logout) to prevent session fixation.
    pub fn renew_token(&self) {
        let mut inner = self.lock();
        let old = std::mem::replace(&mut inner.record.token, SessionToken(generate_token()));
        if !inner.is_new {
            inner.discarded.push(old);
        }
        inner.is_new = true;
        inner.status = Status::Modified;
    }

    /// Delete the session. Anything stored afterwards starts a new session
    /// with a new token and CSRF secret.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        let fresh = fresh_record(inner.lifetime);
        let old = std::mem::replace(&mut inner.record, fresh);
        if !inner.is_new {
            inner.discarded.push(old.token);
        }
        inner.is_new = true;
        inner.status = Status::Destroyed;
    }

    /// The CSRF secret, without marking the session for saving
    pub fn csrf_secret(&self) -> String {
        self.lock().record.data.csrf_secret.clone()
    }

    /// The CSRF secret, making sure the session is persisted so the secret
    /// survives until the form is submitted.
    ///
    /// After [`Session::destroy`] this saves the replacement session.
    pub fn issue_csrf_secret(&self) -> String {
        let mut inner = self.lock();
        if inner.is_new && inner.status != Status::Modified {
            inner.status = Status::Modified;
        }
        inner.record.data.csrf_secret.clone()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))
    }
}

/// Releases the per-token lock and drops its map entry once nobody waits on it
pub struct TokenGuard<'a> {
    locks: &'a DashMap<SessionToken, Arc<tokio::sync::Mutex<()>>>,
    token: SessionToken,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TokenGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.token, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Loads, tracks and saves sessions on top of a [`SessionStore`]
pub struct SessionManager<S> {
    store: S,
    lifetime: Duration,
    secure: bool,
    locks: DashMap<SessionToken, Arc<tokio::sync::Mutex<()>>>,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lifetime: Duration::hours(DEFAULT_LIFETIME_HOURS),
            secure: true,
            locks: DashMap::new(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Whether the session cookie carries the `Secure` attribute
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Wait for exclusive use of `token` within this process
    pub async fn acquire(&self, token: &SessionToken) -> TokenGuard<'_> {
        let lock = self.locks.entry(token.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        TokenGuard {
            locks: &self.locks,
            token: token.clone(),
            guard: Some(guard),
        }
    }

    /// A session that exists only in memory until something is stored in it
    pub fn new_session(&self) -> Session {
        Session::new(fresh_record(self.lifetime), true, self.lifetime)
    }

    /// Load the session for `token`, or start a new one when the token is
    /// missing, unknown or expired
    pub fn load(&self, token: Option<&SessionToken>) -> StoreResult<Session> {
        let Some(token) = token else {
            return Ok(self.new_session());
        };

        match self.store.find(token)? {
            Some(record) if !record.is_expired(Utc::now()) => {
                Ok(Session::new(record, false, self.lifetime))
            }
            Some(_) => {
                tracing::debug!("Session expired, starting a new one");
                self.store.delete(token)?;
                Ok(self.new_session())
            }
            None => Ok(self.new_session()),
        }
    }

    /// Write pending changes to the store.
    ///
    /// Returns the cookie the client must receive, if it changed.
    pub fn commit(&self, session: &Session) -> StoreResult<Option<Cookie<'static>>> {
        let mut inner = session.lock();

        for token in std::mem::take(&mut inner.discarded) {
            self.store.delete(&token)?;
        }

        let cookie = match inner.status {
            Status::Unmodified => None,
            Status::Modified => {
                self.store.commit(&inner.record)?;
                inner.is_new = false;
                Some(self.cookie(&inner.record))
            }
            Status::Destroyed => Some(self.removal_cookie()),
        };
        inner.status = Status::Unmodified;

        Ok(cookie)
    }

    /// Remove expired records from the backing store
    pub fn purge_expired(&self) -> StoreResult<u64> {
        self.store.delete_expired()
    }

    fn cookie(&self, record: &SessionRecord) -> Cookie<'static> {
        let remaining = (record.expires_at - Utc::now()).num_seconds().max(0);
        Cookie::build((SESSION_COOKIE, record.token.0.clone()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(remaining))
            .build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .build()
    }
}

/// Middleware: load the session before the handler and save it afterwards
pub async fn load_and_save<N, U, S>(
    State(state): State<Arc<AppState<N, U, S>>>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response
where
    N: SnippetStore,
    U: UserStore,
    S: SessionStore,
{
    let manager = &state.sessions;
    let token = cookies
        .get(SESSION_COOKIE)
        .map(|c| SessionToken(c.value().to_string()))
        .filter(|t| !t.0.is_empty());

    let _guard = match &token {
        Some(token) => Some(manager.acquire(token).await),
        None => None,
    };

    let session = match manager.load(token.as_ref()) {
        Ok(session) => session,
        Err(e) => return AppError::from(e).into_response(),
    };

    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    match manager.commit(&session) {
        Ok(Some(cookie)) => cookies.add(cookie),
        Ok(None) => {}
        Err(e) => return AppError::from(e).into_response(),
    }

    response
}
