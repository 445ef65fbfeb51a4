//! Form validation
//!
//! A `Validator` accumulates errors for a single form submission. Checks are
//! plain predicates combined through [`Validator::check_field`], so handlers
//! read as a list of rules:
//!
//! ```
//! use snippetbox_core::validator::{self, Validator};
//!
//! let mut v = Validator::default();
//! v.check_field(validator::not_blank(""), "name", "This field cannot be blank");
//! assert!(!v.valid());
//! ```
//!
//! Only the first failure recorded for a field is kept. Later failing checks
//! on the same field leave the original message in place.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Loose RFC 5322 address shape, as recommended by the WHATWG for
/// `<input type="email">`.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    pub field_errors: HashMap<String, String>,
    pub non_field_errors: Vec<String>,
}

impl Validator {
    /// True when no error of any kind has been recorded.
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record `message` against `key` unless that field already failed.
    pub fn add_field_error(&mut self, key: &str, message: &str) {
        self.field_errors
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn add_non_field_error(&mut self, message: &str) {
        self.non_field_errors.push(message.to_string());
    }

    /// Record `message` against `key` when `ok` is false.
    pub fn check_field(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_field_error(key, message);
        }
    }

    pub fn field_error(&self, key: &str) -> Option<&str> {
        self.field_errors.get(key).map(String::as_str)
    }
}

/// True if `value` contains something other than whitespace.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True if `value` has at most `n` characters (not bytes).
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True if `value` has at least `n` characters (not bytes).
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}
