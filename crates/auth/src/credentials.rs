use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Username/password pair submitted at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The single operator account allowed through the login gate.
///
/// Loaded from configuration at startup; there is no user database.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordLogin {
    username: String,
    password: String,
}

impl PasswordLogin {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Usernames compare case-insensitively after trimming; passwords exactly.
    pub fn verify(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let user_ok = credentials.username.trim().eq_ignore_ascii_case(self.username.trim());
        let pass_ok = constant_time_eq(credentials.password.as_bytes(), self.password.as_bytes());
        if user_ok && pass_ok {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl core::fmt::Debug for PasswordLogin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordLogin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
