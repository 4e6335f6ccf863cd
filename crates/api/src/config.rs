//! # API Configuration Module
//!
//! Loads the SlotBook server configuration from environment variables,
//! with defaults where a sensible one exists.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `JWT_SECRET`: HS256 secret used to verify caller tokens (required)
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `BOOKING_CANCELLATION_CUTOFF_HOURS`: Minimum lead time for cancellations (default: 24)
//! - `BOOKING_CUTOFF_APPLIES_TO_TUTORS`: Whether tutors honour the cutoff (default: true)
//! - `SLOT_RELEASE_ON_CANCEL`: `free` or `retire` (default: free)

use eyre::{Result, WrapErr, eyre};
use slotbook_core::policy::{BookingPolicy, DEFAULT_CANCELLATION_CUTOFF_HOURS, SlotRelease};
use std::env;
use tracing::Level;

/// Configuration for the SlotBook API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use slotbook_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    pub database_max_connections: u32,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Secret the caller tokens are signed with
    pub jwt_secret: String,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Cancellation cutoff and slot release rules
    pub booking_policy: BookingPolicy,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is not set
    /// - A numeric or boolean setting cannot be parsed
    /// - `SLOT_RELEASE_ON_CANCEL` names an unknown policy
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Network settings
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("API_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Database settings
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| eyre!("DATABASE_URL environment variable must be set"))?;
        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .wrap_err("Invalid DATABASE_MAX_CONNECTIONS value")?;

        // Logging settings
        let log_level = match lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS")
            .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect());

        // Security settings
        let jwt_secret =
            lookup("JWT_SECRET").ok_or_else(|| eyre!("JWT_SECRET environment variable must be set"))?;

        // Performance settings
        let request_timeout = lookup("API_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .unwrap_or(30);

        // Booking policy
        let cancellation_cutoff_hours = match lookup("BOOKING_CANCELLATION_CUTOFF_HOURS") {
            Some(value) => value
                .parse()
                .wrap_err("Invalid BOOKING_CANCELLATION_CUTOFF_HOURS value")?,
            None => DEFAULT_CANCELLATION_CUTOFF_HOURS,
        };
        let cutoff_applies_to_tutors = match lookup("BOOKING_CUTOFF_APPLIES_TO_TUTORS") {
            Some(value) => value
                .parse()
                .wrap_err("Invalid BOOKING_CUTOFF_APPLIES_TO_TUTORS value")?,
            None => true,
        };
        let release_on_cancel = match lookup("SLOT_RELEASE_ON_CANCEL") {
            Some(value) => value.parse::<SlotRelease>().map_err(|e| eyre!(e))?,
            None => SlotRelease::default(),
        };

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections,
            log_level,
            cors_origins,
            jwt_secret,
            request_timeout,
            booking_policy: BookingPolicy {
                cancellation_cutoff_hours,
                cutoff_applies_to_tutors,
                release_on_cancel,
            },
        })
    }

    /// Returns the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
