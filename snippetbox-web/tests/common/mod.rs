//! Common test utilities for web integration tests

#![allow(dead_code)]

use std::sync::{Arc, LazyLock, RwLock};

use axum_test::{TestResponse, TestServer};
use chrono::{Duration, TimeZone, Utc};
use regex::Regex;
use snippetbox_core::{ModelError, Snippet, SnippetId, UserId};
use snippetbox_web::{
    routes, AppState, InMemorySessionStore, SessionManager, SnippetStore, StoreResult,
    TemplateCache, TemplateData, TemplateError, Templates, UserStore,
};

pub const SESSION_COOKIE: &str = "session";

static CSRF_TOKEN_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input\s+type=["']hidden["']\s+name=["']csrf_token["']\s+value=["']([^"']+)["']"#)
        .unwrap()
});

/// Snippet store holding one fixed snippet with ID 1
#[derive(Default, Clone)]
pub struct MockSnippetStore;

pub fn mock_snippet() -> Snippet {
    let created = Utc.with_ymd_and_hms(2022, 1, 1, 10, 0, 0).unwrap();
    Snippet {
        id: SnippetId(1),
        title: "An old silent pond".to_string(),
        content: "An old silent pond...".to_string(),
        created,
        expires: Utc::now() + Duration::days(365),
    }
}

impl SnippetStore for MockSnippetStore {
    fn insert(&self, _title: &str, _content: &str, _expires_days: i64) -> StoreResult<SnippetId> {
        Ok(SnippetId(2))
    }

    fn get(&self, id: SnippetId) -> StoreResult<Snippet> {
        match id.0 {
            1 => Ok(mock_snippet()),
            _ => Err(ModelError::NoRecord),
        }
    }

    fn latest(&self) -> StoreResult<Vec<Snippet>> {
        Ok(vec![mock_snippet()])
    }
}

/// User store that knows alice@example.com and treats dupe@example.com as taken
#[derive(Default, Clone)]
pub struct MockUserStore {
    /// Captured (name, email) signups
    pub inserted: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signups(&self) -> Vec<(String, String)> {
        self.inserted.read().unwrap().clone()
    }
}

impl UserStore for MockUserStore {
    fn insert(&self, name: &str, email: &str, _password: &str) -> StoreResult<UserId> {
        if email == "dupe@example.com" {
            return Err(ModelError::DuplicateEmail);
        }
        self.inserted
            .write()
            .unwrap()
            .push((name.to_string(), email.to_string()));
        Ok(UserId(2))
    }

    fn authenticate(&self, email: &str, password: &str) -> StoreResult<UserId> {
        if email == "alice@example.com" && password == "pa$$word" {
            Ok(UserId(1))
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    fn exists(&self, id: UserId) -> StoreResult<bool> {
        Ok(id.0 == 1)
    }
}

/// Templates that always fail to render
pub struct FailingTemplates;

impl Templates for FailingTemplates {
    fn render(&self, page: &str, _data: &TemplateData) -> Result<String, TemplateError> {
        Err(TemplateError::NotFound(page.to_string()))
    }
}

/// Create a test server with mock stores
pub fn create_test_server() -> (TestServer, MockUserStore) {
    let users = MockUserStore::new();
    let server = create_server_with(MockSnippetStore, users.clone(), TemplateCache::new());
    (server, users)
}

/// Create a test server around the given stores and templates
pub fn create_server_with<N, U>(snippets: N, users: U, templates: impl Templates + 'static) -> TestServer
where
    N: SnippetStore + 'static,
    U: UserStore + 'static,
{
    let state = Arc::new(AppState::new(
        snippets,
        users,
        SessionManager::new(InMemorySessionStore::new()),
        templates,
    ));

    let app = routes::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Pull the CSRF token out of a rendered form
pub fn extract_csrf_token(body: &str) -> String {
    let captures = CSRF_TOKEN_RX
        .captures(body)
        .expect("No CSRF token found in body");
    html_unescape(&captures[1])
}

fn html_unescape(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// The session token a response handed out
pub fn session_cookie(response: &TestResponse) -> String {
    response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string()
}

pub fn with_session(token: &str) -> cookie::Cookie<'static> {
    cookie::Cookie::new(SESSION_COOKIE, token.to_string())
}

/// GET a form page, returning the session token and its CSRF token
pub async fn open_form(server: &TestServer, path: &str) -> (String, String) {
    let response = server.get(path).await;
    assert_eq!(response.status_code(), 200);
    let token = session_cookie(&response);
    let csrf = extract_csrf_token(&response.text());
    (token, csrf)
}

/// Log in as alice@example.com, returning the authenticated session token
pub async fn login(server: &TestServer) -> String {
    let (token, csrf) = open_form(server, "/user/login").await;

    let response = server
        .post("/user/login")
        .add_cookie(with_session(&token))
        .form(&[
            ("email", "alice@example.com"),
            ("password", "pa$$word"),
            ("csrf_token", csrf.as_str()),
        ])
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(response.headers()["location"], "/snippet/create");

    session_cookie(&response)
}
