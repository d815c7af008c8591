//! Login session.
//!
//! A [`Session`] is an explicit value owned by the caller and handed to every
//! service call. It starts anonymous, becomes authenticated on a successful
//! [`Session::login`], and ends on [`Session::logout`] or when it is dropped.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CrmError, Result};

/// The single credential pair that gates the stores.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Build a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Authentication state for one operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    username: Option<String>,
}

impl Session {
    /// An anonymous session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `username`/`password` against `expected`. On failure the session is
    /// left anonymous.
    pub fn login(&mut self, expected: &Credentials, username: &str, password: &str) -> Result<()> {
        if !expected.matches(username, password) {
            self.logout();
            warn!(username, "Rejected login");
            return Err(CrmError::Authentication("Incorrect username or password".into()));
        }
        self.authenticated = true;
        self.username = Some(username.to_string());
        info!(username, "Logged in");
        Ok(())
    }

    /// Clear the session.
    pub fn logout(&mut self) {
        if let Some(username) = self.username.take() {
            info!(username, "Logged out");
        }
        self.authenticated = false;
    }

    /// True after a successful login.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Logged-in user, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The logged-in user, or an authentication error.
    pub fn require(&self) -> Result<&str> {
        match (&self.authenticated, &self.username) {
            (true, Some(username)) => Ok(username),
            _ => Err(CrmError::Authentication("Login required".into())),
        }
    }
}
