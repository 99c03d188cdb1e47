//! Login credentials sourced from the process environment

use std::fmt;

use crate::error::{E2eError, E2eResult};

pub const USERNAME_ENV: &str = "WIKI_USERNAME";
pub const PASSWORD_ENV: &str = "WIKI_PASSWORD";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read `WIKI_USERNAME` and `WIKI_PASSWORD`
    pub fn from_env() -> E2eResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through an arbitrary lookup. Missing and blank
    /// values are both configuration errors.
    pub fn from_lookup<F>(lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| E2eError::Config(format!("{} is not set", key)))
        };

        Ok(Self {
            username: read(USERNAME_ENV)?,
            password: read(PASSWORD_ENV)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
