//! Helpers for unit and integration tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::config::{
    AdminConfig, Config, CorsConfig, DatabaseConfig, IdentityConfig, LoggingConfig, ServerConfig,
};
use crate::identity::LocalIdentityProvider;
use crate::store::SqliteStore;
use crate::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_ISSUER: &str = "recipe-box-test";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        database: DatabaseConfig {
            url: ":memory:".to_string(),
        },
        identity: IdentityConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            issuer: TEST_ISSUER.to_string(),
            token_ttl_secs: 3600,
            // bcrypt's minimum, keeps tests fast
            bcrypt_cost: 4,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
        admin: AdminConfig {
            allow_bulk_delete: true,
        },
    }
}

/// State backed by in-memory SQLite collaborators.
pub fn create_test_state() -> Arc<AppState> {
    create_test_state_with(test_config())
}

pub fn create_test_state_with(config: Config) -> Arc<AppState> {
    let store = SqliteStore::new(&config.database.url).expect("Failed to open test store");
    let identity = LocalIdentityProvider::new(&config.database.url, &config.identity)
        .expect("Failed to open test identity provider");

    Arc::new(AppState {
        config,
        identity: Arc::new(identity),
        store: Arc::new(store),
    })
}

#[derive(serde::Serialize)]
struct TestClaims {
    sub: String,
    email: String,
    iss: String,
    iat: u64,
    exp: u64,
}

fn sign(claims: &TestClaims, secret: &str) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("Failed to encode JWT")
}

/// Token the test identity provider accepts for `user_id`.
pub fn generate_test_jwt(user_id: &str, email: &str) -> String {
    let now = Utc::now();
    sign(
        &TestClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iss: TEST_ISSUER.to_string(),
            iat: now.timestamp() as u64,
            exp: (now + Duration::hours(1)).timestamp() as u64,
        },
        TEST_JWT_SECRET,
    )
}

pub fn generate_expired_jwt(user_id: &str) -> String {
    let now = Utc::now();
    sign(
        &TestClaims {
            sub: user_id.to_string(),
            email: String::new(),
            iss: TEST_ISSUER.to_string(),
            iat: (now - Duration::hours(2)).timestamp() as u64,
            exp: (now - Duration::hours(1)).timestamp() as u64,
        },
        TEST_JWT_SECRET,
    )
}

/// Correctly shaped token signed with the wrong secret.
pub fn generate_forged_jwt(user_id: &str) -> String {
    let now = Utc::now();
    sign(
        &TestClaims {
            sub: user_id.to_string(),
            email: String::new(),
            iss: TEST_ISSUER.to_string(),
            iat: now.timestamp() as u64,
            exp: (now + Duration::hours(1)).timestamp() as u64,
        },
        "not-the-test-secret",
    )
}
