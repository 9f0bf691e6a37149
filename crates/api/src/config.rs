//! Process configuration for the HTTP binary.

use tracing::warn;

use stocktrack_auth::PasswordLogin;
use stocktrack_infra::ServiceConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

const BIND_VAR: &str = "STOCKTRACK_BIND";
const ADMIN_USER_VAR: &str = "STOCKTRACK_ADMIN_USER";
const ADMIN_PASSWORD_VAR: &str = "STOCKTRACK_ADMIN_PASSWORD";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub login: PasswordLogin,
    pub service: ServiceConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = non_blank(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let login = match (non_blank(ADMIN_USER_VAR), non_blank(ADMIN_PASSWORD_VAR)) {
            (Some(user), Some(password)) => PasswordLogin::new(user.trim(), password),
            _ => {
                warn!("{ADMIN_USER_VAR}/{ADMIN_PASSWORD_VAR} not set; using insecure dev login admin/admin");
                PasswordLogin::new("admin", "admin")
            }
        };

        Self {
            bind_addr,
            login,
            service: ServiceConfig::from_lookup(&lookup),
        }
    }
}
