use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};

/// The longest session lifetime accepted from `SESSION_DURATION_DAYS`.
pub const MAX_SESSION_DURATION_DAYS: i64 = 3650;

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// Whether cookies are marked `Secure`.
    pub secure_cookies: bool,
    /// Failed logins tolerated per client before lockout.
    pub login_max_failures: u32,
    /// How long a locked-out client has to wait, in seconds.
    pub login_lockout_secs: u64,
    /// Registration attempts allowed per client and window.
    pub register_max_attempts: u32,
    /// The registration rate-limit window, in seconds.
    pub register_window_secs: u64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a `Config` from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let session_duration_days: i64 = var_or("SESSION_DURATION_DAYS", "7")
            .parse()
            .context("Invalid SESSION_DURATION_DAYS")?;
        if !(1..=MAX_SESSION_DURATION_DAYS).contains(&session_duration_days) {
            anyhow::bail!(
                "SESSION_DURATION_DAYS must be between 1 and {}",
                MAX_SESSION_DURATION_DAYS
            );
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            bind_addr: var_or("BIND_ADDR", "127.0.0.1:3000")
                .parse()
                .context("Invalid BIND_ADDR")?,
            session_duration_days,
            secure_cookies: var_or("APP_ENV", "development") == "production",
            login_max_failures: var_or("LOGIN_MAX_FAILURES", "5")
                .parse()
                .context("Invalid LOGIN_MAX_FAILURES")?,
            login_lockout_secs: var_or("LOGIN_LOCKOUT_SECS", "900")
                .parse()
                .context("Invalid LOGIN_LOCKOUT_SECS")?,
            register_max_attempts: var_or("REGISTER_MAX_ATTEMPTS", "5")
                .parse()
                .context("Invalid REGISTER_MAX_ATTEMPTS")?,
            register_window_secs: var_or("REGISTER_WINDOW_SECS", "3600")
                .parse()
                .context("Invalid REGISTER_WINDOW_SECS")?,
        })
    }

    /// Session lifetime in seconds, used for the Redis TTL and cookie max-age.
    pub fn session_ttl_secs(&self) -> u64 {
        (self.session_duration_days * 86400) as u64
    }
}
