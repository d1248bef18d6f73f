use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{normalize_email, Account, IdentityError, IdentityProvider, IssuedToken, Result};
use crate::config::IdentityConfig;
use crate::store::open_connection;

const MIN_PASSWORD_LEN: usize = 6;

/// Identity provider keeping accounts in SQLite and issuing HS256 bearer tokens.
pub struct LocalIdentityProvider {
    conn: Mutex<Connection>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    token_ttl_secs: u64,
    bcrypt_cost: u32,
}

/// Bearer token claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iss: String,
    iat: u64,
    exp: u64,
}

fn db_err(e: rusqlite::Error) -> IdentityError {
    IdentityError::Storage(e.to_string())
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let created_at: String = row.get(3)?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Account {
        uid: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        created_at,
    })
}

impl LocalIdentityProvider {
    pub fn new(database_url: &str, config: &IdentityConfig) -> Result<Self> {
        let conn = open_connection(database_url)
            .map_err(|e| IdentityError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                uid TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                display_name TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;

        tracing::info!("Identity provider initialized (issuer: {})", config.issuer);

        Ok(Self {
            conn: Mutex::new(conn),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            token_ttl_secs: config.token_ttl_secs,
            bcrypt_cost: config.bcrypt_cost,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| IdentityError::Storage(e.to_string()))
    }

    /// Sign a token for `uid`.
    pub fn issue_token(&self, uid: &str, email: &str) -> Result<IssuedToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: uid.to_string(),
            email: email.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp() as u64,
            exp: (now + Duration::seconds(self.token_ttl_secs as i64)).timestamp() as u64,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| IdentityError::Storage(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            uid: uid.to_string(),
            expires_in: self.token_ttl_secs,
        })
    }

    fn password_hash(&self, email: &str) -> Result<Option<(String, String)>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT uid, password_hash FROM accounts WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(db_err)
    }
}

fn validate_new_account(email: &str, password: &str) -> Result<()> {
    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
        .unwrap_or(false);
    if !well_formed {
        return Err(IdentityError::InvalidArgument(
            "The email address is improperly formatted.".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::InvalidArgument(format!(
            "The password must be a string with at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(&self, email: &str, password: &str, display_name: &str) -> Result<String> {
        let email = normalize_email(email);
        validate_new_account(&email, password)?;

        let cost = self.bcrypt_cost;
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| IdentityError::Storage(e.to_string()))?
            .map_err(|e| IdentityError::Storage(e.to_string()))?;

        let uid = uuid::Uuid::new_v4().simple().to_string();
        let conn = self.lock()?;

        let taken: Option<String> = conn
            .query_row(
                "SELECT uid FROM accounts WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(IdentityError::EmailExists);
        }

        conn.execute(
            "INSERT INTO accounts (uid, email, password_hash, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uid, email, password_hash, display_name, Utc::now().to_rfc3339()],
        )
        .map_err(db_err)?;

        tracing::info!("Created account {}", uid);
        Ok(uid)
    }

    async fn verify_token(&self, token: &str) -> Result<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims.sub)
    }

    async fn account_by_email(&self, email: &str) -> Result<Account> {
        let normalized = normalize_email(email);
        let conn = self.lock()?;
        conn.query_row(
            "SELECT uid, email, display_name, created_at FROM accounts WHERE email = ?1",
            params![normalized],
            account_from_row,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| IdentityError::AccountNotFound(email.to_string()))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT uid, email, display_name, created_at FROM accounts ORDER BY created_at")
            .map_err(db_err)?;

        let accounts = stmt
            .query_map([], account_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;

        Ok(accounts)
    }

    async fn delete_account(&self, uid: &str) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM accounts WHERE uid = ?1", params![uid])
            .map_err(db_err)?;

        if deleted == 0 {
            return Err(IdentityError::AccountNotFound(uid.to_string()));
        }
        tracing::info!("Deleted account {}", uid);
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken> {
        let email = normalize_email(email);
        let (uid, hash) = self
            .password_hash(&email)?
            .ok_or(IdentityError::InvalidCredentials)?;

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| IdentityError::Storage(e.to_string()))?
            .map_err(|e| IdentityError::Storage(e.to_string()))?;

        if !matches {
            return Err(IdentityError::InvalidCredentials);
        }

        self.issue_token(&uid, &email)
    }
}
