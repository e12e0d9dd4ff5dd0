//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Process-wide configuration, loaded once at boot.
///
/// Covers the environment inputs consumed by the core: Scheduling Store
/// URL, the timing knobs for the dispatcher/planner loops, and the HTTP
/// port for the Mutation API boundary and health check.
#[derive(Debug, Clone)]
pub struct Config {
    /// Scheduling Store (Redis-compatible) connection string.
    pub scheduling_store_url: String,
    /// User Directory base URL. The core only ever reads/writes a user's
    /// subscription state through this interface; account management lives
    /// entirely on the other side of it.
    pub user_directory_url: String,
    /// JWT signing secret, consumed by the Mutation API boundary only — the
    /// core itself never inspects a token.
    pub jwt_secret: String,
    /// JWT issuer claim checked by the boundary on every request.
    pub jwt_issuer: String,
    /// HTTP port for the Mutation API boundary and health check.
    pub port: u16,
    /// Dispatcher tick cadence. Spec fixes this at "~1 s"; configurable for tests.
    pub dispatch_tick: Duration,
    /// Queue planner expansion cadence. Spec: 10 min.
    pub expansion_interval: Duration,
    /// Sliding window horizon. Spec: 2 h.
    pub planning_window: Duration,
    /// Catalogue GC retention for terminal Job Records. Spec: 24 h default.
    pub execution_history_retention: Duration,
    /// Bounded concurrency envelope for the Executor.
    pub executor_max_concurrency: usize,
    /// Shutdown grace window before force-cancelling outstanding Executor tasks.
    pub shutdown_grace: Duration,
    /// Display-only timezone name; cron expansion itself remains UTC-normalised.
    pub display_timezone: String,
}

impl Config {
    /// Load configuration from environment variables, optionally via a `.env`
    /// file in development.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            scheduling_store_url: env::var("SCHEDULING_STORE_URL")
                .context("SCHEDULING_STORE_URL must be set")?,
            user_directory_url: env::var("USER_DIRECTORY_URL")
                .context("USER_DIRECTORY_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "helpers-core".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            dispatch_tick: Duration::from_millis(
                env::var("DISPATCH_TICK_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .context("DISPATCH_TICK_MS must be a valid number")?,
            ),
            expansion_interval: Duration::from_secs(
                env::var("EXPANSION_INTERVAL_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .context("EXPANSION_INTERVAL_SECS must be a valid number")?,
            ),
            planning_window: Duration::from_secs(
                env::var("PLANNING_WINDOW_SECS")
                    .unwrap_or_else(|_| "7200".to_string())
                    .parse()
                    .context("PLANNING_WINDOW_SECS must be a valid number")?,
            ),
            execution_history_retention: Duration::from_secs(
                env::var("EXECUTION_HISTORY_RETENTION_SECS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .context("EXECUTION_HISTORY_RETENTION_SECS must be a valid number")?,
            ),
            executor_max_concurrency: env::var("EXECUTOR_MAX_CONCURRENCY")
                .unwrap_or_else(|_| "64".to_string())
                .parse()
                .context("EXECUTOR_MAX_CONCURRENCY must be a valid number")?,
            shutdown_grace: Duration::from_secs(
                env::var("SHUTDOWN_GRACE_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("SHUTDOWN_GRACE_SECS must be a valid number")?,
            ),
            display_timezone: env::var("DISPLAY_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
        })
    }
}
