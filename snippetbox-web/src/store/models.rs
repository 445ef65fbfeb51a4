//! Session storage models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque session token carried in the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

/// Everything a session holds besides its token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Secret the CSRF token is derived from; fixed for the session's lifetime
    pub csrf_secret: String,
    pub values: HashMap<String, serde_json::Value>,
}

/// A stored session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub token: SessionToken,
    pub data: SessionData,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
