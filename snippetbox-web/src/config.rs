//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::session::DEFAULT_LIFETIME_HOURS;

/// Longest accepted session lifetime, one year
pub const MAX_SESSION_LIFETIME_HOURS: i64 = 24 * 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on
    pub addr: SocketAddr,

    /// SQLite database file. In-memory stores are used when unset.
    pub database: Option<PathBuf>,

    /// Directory served under `/static`
    pub static_dir: PathBuf,

    /// How long a session lives after it is created
    pub session_lifetime_hours: i64,

    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 4000)),
            database: None,
            static_dir: PathBuf::from("static"),
            session_lifetime_hours: DEFAULT_LIFETIME_HOURS,
            secure_cookies: true,
        }
    }
}

impl Config {
    /// Read configuration from `SNIPPETBOX_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("SNIPPETBOX_ADDR") {
            config.addr = parse("SNIPPETBOX_ADDR", value)?;
        }
        if let Some(value) = lookup("SNIPPETBOX_DATABASE").filter(|v| !v.is_empty()) {
            config.database = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("SNIPPETBOX_STATIC_DIR").filter(|v| !v.is_empty()) {
            config.static_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("SNIPPETBOX_SESSION_LIFETIME_HOURS") {
            let hours: i64 = parse("SNIPPETBOX_SESSION_LIFETIME_HOURS", value.clone())?;
            if !(1..=MAX_SESSION_LIFETIME_HOURS).contains(&hours) {
                return Err(ConfigError::Invalid {
                    var: "SNIPPETBOX_SESSION_LIFETIME_HOURS",
                    value,
                });
            }
            config.session_lifetime_hours = hours;
        }
        if let Some(value) = lookup("SNIPPETBOX_SECURE_COOKIES") {
            config.secure_cookies = parse("SNIPPETBOX_SECURE_COOKIES", value)?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}
