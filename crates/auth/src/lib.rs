//! `stocktrack-auth`: username/password login gate.
//!
//! One configured operator account; a successful login yields an opaque
//! session token that the HTTP layer checks on every protected request.
//! Decoupled from HTTP and storage.

pub mod credentials;
pub mod session;

use thiserror::Error;

pub use credentials::{Credentials, PasswordLogin};
pub use session::{Session, SessionStore, SessionToken};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("unknown or closed session")]
    UnknownSession,

    #[error("session has expired")]
    Expired,

    #[error("session store unavailable: {0}")]
    Store(String),
}

impl AuthError {
    fn poisoned() -> Self {
        Self::Store("lock poisoned".to_string())
    }
}
