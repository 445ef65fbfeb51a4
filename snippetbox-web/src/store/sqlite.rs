//! SQLite-based storage implementation

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use snippetbox_core::{ModelError, Snippet, SnippetId, UserId};

use super::{
    SessionData, SessionRecord, SessionStore, SessionToken, SnippetStore, StoreResult, UserStore,
    LATEST_LIMIT,
};
use crate::crypto::{hash_password, verify_password};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-based store implementing `SnippetStore`, `UserStore` and `SessionStore`
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn storage(e: impl std::fmt::Display) -> ModelError {
    ModelError::Storage(e.to_string())
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically
fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

fn snippet_from_row(row: &Row<'_>) -> rusqlite::Result<Snippet> {
    let created: String = row.get(3)?;
    let expires: String = row.get(4)?;
    Ok(Snippet {
        id: SnippetId(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        created: from_db_time(&created)?,
        expires: from_db_time(&expires)?,
    })
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ModelError> {
        let conn = Connection::open(path).map_err(storage)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, ModelError> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ModelError> {
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ModelError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(storage)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ModelError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(storage)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(storage)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ModelError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS snippets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created TEXT NOT NULL,
                expires TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_snippets_created ON snippets(created);

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                created TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                expiry TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expiry);
            "#,
        )
        .map_err(storage)
    }
}

impl SnippetStore for SqliteStore {
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> StoreResult<SnippetId> {
        let conn = self.conn();
        let created = Utc::now();
        let expires = created + Duration::days(expires_days);

        conn.execute(
            "INSERT INTO snippets (title, content, created, expires) VALUES (?1, ?2, ?3, ?4)",
            params![title, content, to_db_time(created), to_db_time(expires)],
        )
        .map_err(storage)?;

        Ok(SnippetId(conn.last_insert_rowid()))
    }

    fn get(&self, id: SnippetId) -> StoreResult<Snippet> {
        let conn = self.conn();

        conn.query_row(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE expires > ?1 AND id = ?2",
            params![to_db_time(Utc::now()), id.0],
            snippet_from_row,
        )
        .optional()
        .map_err(storage)?
        .ok_or(ModelError::NoRecord)
    }

    fn latest(&self) -> StoreResult<Vec<Snippet>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare(
                "SELECT id, title, content, created, expires FROM snippets
                 WHERE expires > ?1 ORDER BY id DESC LIMIT ?2",
            )
            .map_err(storage)?;

        let rows = stmt
            .query_map(
                params![to_db_time(Utc::now()), LATEST_LIMIT as i64],
                snippet_from_row,
            )
            .map_err(storage)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }
}

impl UserStore for SqliteStore {
    fn insert(&self, name: &str, email: &str, password: &str) -> StoreResult<UserId> {
        let hashed_password = hash_password(password).map_err(storage)?;
        let conn = self.conn();

        let result = conn.execute(
            "INSERT INTO users (name, email, hashed_password, created) VALUES (?1, ?2, ?3, ?4)",
            params![name, email.to_lowercase(), hashed_password, to_db_time(Utc::now())],
        );

        match result {
            Ok(_) => Ok(UserId(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(ModelError::DuplicateEmail)
            }
            Err(e) => Err(storage(e)),
        }
    }

    fn authenticate(&self, email: &str, password: &str) -> StoreResult<UserId> {
        let found: Option<(i64, String)> = self
            .conn()
            .query_row(
                "SELECT id, hashed_password FROM users WHERE email = ?1",
                params![email.to_lowercase()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(storage)?;

        let (id, hashed_password) = found.ok_or(ModelError::InvalidCredentials)?;

        if !verify_password(password, &hashed_password).map_err(storage)? {
            return Err(ModelError::InvalidCredentials);
        }

        Ok(UserId(id))
    }

    fn exists(&self, id: UserId) -> StoreResult<bool> {
        self.conn()
            .query_row(
                "SELECT EXISTS(SELECT true FROM users WHERE id = ?1)",
                params![id.0],
                |row| row.get(0),
            )
            .map_err(storage)
    }
}

impl SessionStore for SqliteStore {
    fn find(&self, token: &SessionToken) -> StoreResult<Option<SessionRecord>> {
        let found: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT data, expiry FROM sessions WHERE token = ?1",
                params![token.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(storage)?;

        let Some((data, expiry)) = found else {
            return Ok(None);
        };

        let data: SessionData = serde_json::from_str(&data).map_err(storage)?;
        Ok(Some(SessionRecord {
            token: token.clone(),
            data,
            expires_at: from_db_time(&expiry).map_err(storage)?,
        }))
    }

    fn commit(&self, record: &SessionRecord) -> StoreResult<()> {
        let data = serde_json::to_string(&record.data).map_err(storage)?;

        self.conn()
            .execute(
                "INSERT OR REPLACE INTO sessions (token, data, expiry) VALUES (?1, ?2, ?3)",
                params![record.token.0, data, to_db_time(record.expires_at)],
            )
            .map_err(storage)?;

        Ok(())
    }

    fn delete(&self, token: &SessionToken) -> StoreResult<()> {
        self.conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token.0])
            .map_err(storage)?;

        Ok(())
    }

    fn delete_expired(&self) -> StoreResult<u64> {
        let removed = self
            .conn()
            .execute(
                "DELETE FROM sessions WHERE expiry <= ?1",
                params![to_db_time(Utc::now())],
            )
            .map_err(storage)?;

        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

    #[test]
    fn test_snippet_roundtrip() {
        let (store, _dir) = create_test_store();

        let id = SnippetStore::insert(&store, "An old silent pond", "An old silent pond...", 365)
            .unwrap();
        let snippet = store.get(id).unwrap();

        assert_eq!(snippet.id, id);
        assert_eq!(snippet.content, "An old silent pond...");
        assert!(snippet.expires > snippet.created);
    }

    #[test]
    fn test_expired_snippet_not_returned() {
        let (store, _dir) = create_test_store();

        let id = SnippetStore::insert(&store, "old", "expired", -1).unwrap();
        SnippetStore::insert(&store, "new", "fresh", 1).unwrap();

        assert!(matches!(store.get(id), Err(ModelError::NoRecord)));
        let latest = store.latest().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].title, "new");
    }

    #[test]
    fn test_user_duplicate_email() {
        let (store, _dir) = create_test_store();

        UserStore::insert(&store, "Bob", "bob@example.com", "validPa$$word").unwrap();
        let result = UserStore::insert(&store, "Robert", "BOB@example.com", "validPa$$word");

        assert!(matches!(result, Err(ModelError::DuplicateEmail)));
    }

    #[test]
    fn test_user_authenticate() {
        let (store, _dir) = create_test_store();

        let id = UserStore::insert(&store, "Bob", "bob@example.com", "validPa$$word").unwrap();

        assert_eq!(store.authenticate("bob@example.com", "validPa$$word").unwrap(), id);
        assert!(matches!(
            store.authenticate("bob@example.com", "nope"),
            Err(ModelError::InvalidCredentials)
        ));
        assert!(store.exists(id).unwrap());
        assert!(!store.exists(UserId(id.0 + 1)).unwrap());
    }

    #[test]
    fn test_session_roundtrip_and_expiry() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut data = SessionData {
            csrf_secret: "secret".into(),
            ..Default::default()
        };
        data.values.insert("flash".into(), serde_json::json!("hello"));

        let live = SessionRecord {
            token: SessionToken("live".into()),
            data,
            expires_at: Utc::now() + Duration::hours(12),
        };
        let stale = SessionRecord {
            token: SessionToken("stale".into()),
            data: SessionData::default(),
            expires_at: Utc::now() - Duration::minutes(1),
        };
        store.commit(&live).unwrap();
        store.commit(&stale).unwrap();

        let found = store.find(&live.token).unwrap().unwrap();
        assert_eq!(found.data, live.data);

        assert_eq!(store.delete_expired().unwrap(), 1);
        assert!(store.find(&stale.token).unwrap().is_none());

        store.delete(&live.token).unwrap();
        assert!(store.find(&live.token).unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let path = path.to_str().unwrap();

        let id = {
            let store = SqliteStore::open(path).unwrap();
            SnippetStore::insert(&store, "kept", "across reopen", 7).unwrap()
        };

        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.get(id).unwrap().title, "kept");
    }
}
