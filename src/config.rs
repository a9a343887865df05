// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Number of questions a generated test aims for.
pub const TARGET_QUESTION_COUNT: usize = 20;

/// Minimum qualifying questions required before a test can start.
pub const MIN_QUESTION_COUNT: usize = 5;

/// Test duration in seconds (20 minutes).
pub const TEST_DURATION_SECS: u32 = 20 * 60;

/// Tokens granted to a fresh account at registration.
pub const SIGNUP_TOKENS: i64 = 5;

/// Rows per INSERT statement during bulk ingestion.
pub const INSERT_BATCH_SIZE: usize = 50;

/// Placeholder used when a question carries no explanation.
pub const DEFAULT_EXPLANATION: &str = "Explanation not available";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}
