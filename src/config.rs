//! Application configuration
//!
//! Runtime settings come from the environment; validation boundaries used
//! across the services live here as constants.

use std::env;

// ===== Validation limits =====

/// Shortest bookable cita in minutes
pub const MIN_CITA_DURATION_MIN: u32 = 15;

/// Longest bookable cita in minutes (4 hours)
pub const MAX_CITA_DURATION_MIN: u32 = 240;

/// Largest accepted buffer around a cita in minutes
pub const MAX_BUFFER_MIN: u32 = 120;

/// Calificacion bounds for notas
pub const MIN_CALIFICACION: i64 = 1;
pub const MAX_CALIFICACION: i64 = 10;

/// Default page size for paginated listings
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Hard cap on page size to keep listing queries bounded
pub const MAX_PER_PAGE: i64 = 100;

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_path: String,
    pub admin_password: String,
    /// Base64-free raw key material for the session cookie; a random key
    /// is generated at startup when unset, which invalidates sessions on
    /// restart.
    pub session_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "data/gimnasia.db".to_string());
        let admin_password =
            env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()); // Default password, change this!
        let session_key = env::var("SESSION_KEY").ok();

        Self {
            port,
            database_path,
            admin_password,
            session_key,
        }
    }
}
