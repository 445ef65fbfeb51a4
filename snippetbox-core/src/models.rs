//! Domain records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique snippet identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnippetId(pub i64);

impl SnippetId {
    /// Parse a path segment into an identifier.
    ///
    /// Only strictly positive base-10 integers are accepted. Anything else
    /// (negative, zero, decimals, words, empty) yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Some(SnippetId(id)),
            _ => None,
        }
    }
}

impl std::fmt::Display for SnippetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// A stored text snippet
#[derive(Debug, Clone)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Snippet {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// A registered user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub created: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parse_positive_id() {
        assert_eq!(SnippetId::parse("1"), Some(SnippetId(1)));
        assert_eq!(SnippetId::parse("42"), Some(SnippetId(42)));
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for raw in ["", "0", "-1", "1.23", "foo", " 1", "1e3", "99999999999999999999"] {
            assert_eq!(SnippetId::parse(raw), None, "accepted {raw:?}");
        }
    }

    #[test]
    fn test_snippet_expiry() {
        let now = Utc::now();
        let snippet = Snippet {
            id: SnippetId(1),
            title: "An old silent pond".into(),
            content: "An old silent pond...".into(),
            created: now - Duration::days(2),
            expires: now - Duration::days(1),
        };
        assert!(snippet.is_expired(now));
        assert!(!snippet.is_expired(now - Duration::days(3)));
    }
}
