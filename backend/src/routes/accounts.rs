//! Signup, login, sessions and account details.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use recipe_box_common::{
    CheckSessionRequest, LoginRequest, MessageResponse, SignoutRequest, SignupRequest,
    SignupResponse, TokenRequest, TokenResponse, UserDetails,
};
use serde::Deserialize;
use serde_json::{json, Map};

use super::present;
use crate::error::{ApiError, Result};
use crate::extract::JsonBody;
use crate::identity::{normalize_email, IdentityError};
use crate::models::user::{self, UserRecord};
use crate::store::{from_document, to_document};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/signout", post(signout))
        .route("/fetch-user-details", get(fetch_user_details))
        .route("/check-session", post(check_session))
        .route("/token", post(token))
}

/// POST /signup - create an account and its user record.
async fn signup(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let (Some(email), Some(password), Some(first_name), Some(last_name)) = (
        present(&request.email),
        present(&request.password),
        present(&request.first_name),
        present(&request.last_name),
    ) else {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    };
    let email = normalize_email(email);

    let failed = |e: &dyn std::fmt::Display| {
        tracing::error!("Error creating user: {}", e);
        ApiError::bad_request(e)
    };

    let existing = state
        .store
        .query_eq(user::COLLECTION, user::EMAIL, &json!(email))
        .await
        .map_err(|e| failed(&e))?;
    if !existing.is_empty() {
        return Err(ApiError::Conflict("User with email already exists".to_string()));
    }

    let display_name = format!("{} {}", first_name, last_name);
    let uid = state
        .identity
        .create_account(&email, password, &display_name)
        .await
        .map_err(|e| failed(&e))?;

    let record = to_document(&UserRecord::new(&email, first_name, last_name)).map_err(|e| failed(&e))?;
    state
        .store
        .set(&user::doc_ref(&uid), record)
        .await
        .map_err(|e| failed(&e))?;

    tracing::info!("Signed up user {}", uid);
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            user_id: uid,
        }),
    ))
}

/// POST /login - record the client's token as the user's session id.
async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<MessageResponse>> {
    let email = present(&request.email).ok_or_else(|| ApiError::bad_request("Email is required"))?;
    let token_id = request
        .token_id
        .ok_or_else(|| ApiError::bad_request("token_id is required"))?;

    let account = state
        .identity
        .account_by_email(email)
        .await
        .map_err(ApiError::bad_request)?;

    let mut fields = Map::new();
    fields.insert(user::SESSION_ID.to_string(), json!(token_id));
    state
        .store
        .update(&user::doc_ref(&account.uid), fields)
        .await
        .map_err(ApiError::bad_request)?;

    tracing::info!("User {} logged in", account.uid);
    Ok(Json(MessageResponse::with_user("User logged in", account.uid)))
}

/// POST /signout - clear the session id of the user with this email.
async fn signout(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<SignoutRequest>,
) -> Result<Json<MessageResponse>> {
    let email = present(&request.email)
        .map(normalize_email)
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    state
        .identity
        .account_by_email(&email)
        .await
        .map_err(ApiError::bad_request)?;

    let matches = state
        .store
        .query_eq(user::COLLECTION, user::EMAIL, &json!(email))
        .await
        .map_err(ApiError::bad_request)?;
    let user_ref = matches
        .into_iter()
        .next()
        .map(|snapshot| snapshot.reference)
        .ok_or_else(|| ApiError::bad_request("User not found"))?;

    let mut fields = Map::new();
    fields.insert(user::SESSION_ID.to_string(), json!(""));
    state
        .store
        .update(&user_ref, fields)
        .await
        .map_err(ApiError::bad_request)?;

    tracing::info!("User {} logged out", user_ref.id);
    Ok(Json(MessageResponse::new("User logged out")))
}

#[derive(Debug, Deserialize)]
struct UserDetailsQuery {
    #[serde(default)]
    email: Option<String>,
}

/// GET /fetch-user-details?email= - profile, favorites and created recipes.
async fn fetch_user_details(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserDetailsQuery>,
) -> Result<Json<UserDetails>> {
    let email = present(&query.email)
        .map(normalize_email)
        .ok_or_else(|| ApiError::Message(StatusCode::BAD_REQUEST, "Email is required".to_string()))?;

    let matches = state
        .store
        .query_eq(user::COLLECTION, user::EMAIL, &json!(email))
        .await
        .map_err(ApiError::internal)?;

    let snapshot = matches
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Message(StatusCode::NOT_FOUND, "User not found".to_string()))?;
    let record: UserRecord = from_document(snapshot.data).map_err(ApiError::internal)?;

    Ok(Json(UserDetails {
        first_name: record.first_name,
        last_name: record.last_name,
        email: record.email,
        favorite_recipes: record.favorite_recipes,
        created_recipes: record.created_recipes,
    }))
}

/// POST /check-session - resolve a session id to its user.
async fn check_session(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<CheckSessionRequest>,
) -> Result<Json<MessageResponse>> {
    let session_id = present(&request.session_id)
        .ok_or_else(|| ApiError::bad_request("Session ID is missing or undefined"))?;

    let matches = state
        .store
        .query_eq(user::COLLECTION, user::SESSION_ID, &json!(session_id))
        .await
        .map_err(|e| {
            tracing::error!("Error checking session: {}", e);
            ApiError::internal(e)
        })?;

    match matches.into_iter().next() {
        Some(snapshot) => Ok(Json(MessageResponse::with_user(
            "Session valid",
            snapshot.reference.id,
        ))),
        None => Err(ApiError::Message(
            StatusCode::UNAUTHORIZED,
            "Invalid session".to_string(),
        )),
    }
}

/// POST /token - exchange email and password for a bearer token.
async fn token(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    let (Some(email), Some(password)) = (present(&request.email), present(&request.password)) else {
        return Err(ApiError::Validation("Missing email or password".to_string()));
    };

    let issued = state
        .identity
        .sign_in(email, password)
        .await
        .map_err(|e| match e {
            IdentityError::InvalidCredentials => {
                ApiError::Message(StatusCode::UNAUTHORIZED, e.to_string())
            }
            other => {
                tracing::error!("Error issuing token: {}", other);
                ApiError::internal(other)
            }
        })?;

    Ok(Json(TokenResponse {
        id_token: issued.token,
        user_id: issued.uid,
        expires_in: issued.expires_in,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Account, MockIdentityProvider};
    use crate::store::{DocRef, DocumentStore, SqliteStore};
    use crate::test_util::test_config;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state_with(identity: MockIdentityProvider) -> (Arc<AppState>, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::new(":memory:").unwrap());
        let state = Arc::new(AppState {
            config: test_config(),
            identity: Arc::new(identity),
            store: store.clone(),
        });
        (state, store)
    }

    async fn post(state: Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_signup_provider_failure_is_bad_request_and_writes_nothing() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_account()
            .returning(|_, _, _| Err(IdentityError::Storage("disk full".to_string())));
        let (state, store) = state_with(identity);

        let (status, body) = post(
            state,
            "/signup",
            json!({ "email": "ada@example.com", "password": "secret1", "firstName": "Ada", "lastName": "L" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("disk full"));
        let users = store.query_eq("users", "email", &json!("ada@example.com")).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_signup_passes_full_name_to_provider() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_account()
            .withf(|email, _, display_name| email == "ada@example.com" && display_name == "Ada Lovelace")
            .times(1)
            .returning(|_, _, _| Ok("uid-ada".to_string()));
        let (state, store) = state_with(identity);

        let (status, body) = post(
            state,
            "/signup",
            json!({ "email": "ada@example.com", "password": "secret1", "firstName": "Ada", "lastName": "Lovelace" }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["userId"], "uid-ada");
        let record = store.get(&DocRef::new("users", "uid-ada")).await.unwrap().unwrap();
        assert_eq!(record["lastName"], "Lovelace");
    }

    #[tokio::test]
    async fn test_login_unknown_email_is_bad_request() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_account_by_email()
            .returning(|email| Err(IdentityError::AccountNotFound(email.to_string())));
        let (state, _) = state_with(identity);

        let (status, body) = post(state, "/login", json!({ "email": "ghost@example.com", "token_id": "t" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_login_without_user_record_is_bad_request() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_account_by_email().returning(|email| {
            Ok(Account {
                uid: "orphan".to_string(),
                email: email.to_string(),
                display_name: None,
                created_at: Utc::now(),
            })
        });
        let (state, _) = state_with(identity);

        let (status, _) = post(state, "/login", json!({ "email": "orphan@example.com", "token_id": "t" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_storage_failure_is_internal_error() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_in()
            .returning(|_, _| Err(IdentityError::Storage("locked".to_string())));
        let (state, _) = state_with(identity);

        let (status, body) = post(state, "/token", json!({ "email": "a@b.c", "password": "secret1" })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"].is_string());
    }
}
