use core::str::FromStr;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::credentials::{Credentials, PasswordLogin};
use crate::AuthError;

/// Opaque bearer token handed out at login.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionToken {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s.trim())
            .map(Self)
            .map_err(|_| AuthError::UnknownSession)
    }
}

/// An authenticated login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.issued_at <= now && now < self.expires_at
    }
}

/// Login gate: verifies credentials and tracks live sessions in memory.
///
/// Sessions do not survive a restart; operators simply log in again.
#[derive(Debug)]
pub struct SessionStore {
    login: PasswordLogin,
    ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl SessionStore {
    pub const DEFAULT_TTL_HOURS: i64 = 12;

    pub fn new(login: PasswordLogin) -> Self {
        Self::with_ttl(login, Duration::hours(Self::DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(login: PasswordLogin, ttl: Duration) -> Self {
        Self {
            login,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Verify `credentials` and open a new session.
    pub fn login(&self, credentials: &Credentials, now: DateTime<Utc>) -> Result<Session, AuthError> {
        if let Err(e) = self.login.verify(credentials) {
            warn!(username = %credentials.username.trim(), "login rejected");
            return Err(e);
        }

        let session = Session {
            token: SessionToken::new(),
            username: self.login.username().to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().map_err(|_| AuthError::poisoned())?;
        sessions.retain(|_, s| s.is_live(now));
        sessions.insert(session.token, session.clone());
        info!(username = %session.username, "session opened");
        Ok(session)
    }

    /// Close a session. Returns whether it existed.
    pub fn logout(&self, token: SessionToken) -> Result<bool, AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| AuthError::poisoned())?;
        Ok(sessions.remove(&token).is_some())
    }

    /// Resolve a bearer token to its live session.
    pub fn authenticate(&self, token: SessionToken, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let sessions = self.sessions.read().map_err(|_| AuthError::poisoned())?;
        let session = sessions.get(&token).ok_or(AuthError::UnknownSession)?;
        if !session.is_live(now) {
            return Err(AuthError::Expired);
        }
        Ok(session.clone())
    }

    pub fn is_authenticated(&self, token: SessionToken, now: DateTime<Utc>) -> bool {
        self.authenticate(token, now).is_ok()
    }
}
